// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Passive API documentation engine.
//!
//! DocuRift sits as a reverse proxy in front of an HTTP backend, observes
//! real request/response pairs, and synthesizes OpenAPI 3.0 and Postman
//! documents describing every endpoint it has seen.

pub mod analyzer;
pub mod api;
pub mod config;
pub mod json_paths;
pub mod normalize;
pub mod openapi;
pub mod persist;
pub mod postman;
pub mod proxy;
pub mod schema;
pub mod schema_store;

// Keep library small; main.rs remains the binary entrypoint.
