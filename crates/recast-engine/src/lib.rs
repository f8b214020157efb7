//! Recast: a traffic-rewriting engine hosted inside an intercepting proxy.
//!
//! The hosting proxy hands each exchange to [`Rewriter::on_request`] and
//! [`Rewriter::on_response`]; the engine matches it against an ordered rule
//! document, optionally delays the request, mutates the response status and
//! headers, captures the response body to disk, or replaces the body with a
//! fixture transcoded into the wire schema bound to the endpoint.

pub mod codec;
pub mod config;
pub mod error;
pub mod exchange;
pub mod fixture;
pub mod matcher;
pub mod rewriter;
pub mod schema;

pub use config::EngineConfig;
pub use error::EngineError;
pub use exchange::HttpExchange;
pub use rewriter::Rewriter;
pub use schema::{SchemaRef, SchemaRegistry};
