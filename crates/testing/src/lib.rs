// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Test support: a deterministic stub GraphQL engine.
//!
//! [`StubEngine`] implements [`QueryEngine`] from the query text alone, with
//! a small catalog of fields covering the behaviors the transport has to
//! route: plain data, field errors, request errors, engine failures, delayed
//! and multi-item streams, and a stream that never produces.

pub mod engine;

pub use engine::{StubContext, StubDocument, StubEngine};
