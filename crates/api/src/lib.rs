// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Execution API consumed from a GraphQL query engine.
//!
//! The transport never parses, validates or executes GraphQL itself; it
//! drives an engine through the [`QueryEngine`] trait and forwards whatever
//! the engine produces. An engine yields either an immediate
//! [`ExecutionResult`] or a lazy stream of results, and both single-result
//! operations and subscriptions are consumed through the same stream shape.

pub mod engine;
pub mod error;
pub mod result;

pub use engine::{
	ConnectionParams, ExecutionRequest, OperationKind, QueryEngine, ResultStream, SubscribeOutcome,
};
pub use error::{EngineError, ErrorLocation, GraphQLError, PathSegment, SyntaxError};
pub use result::ExecutionResult;
