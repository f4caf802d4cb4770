//! HTTP surface for the inference service.
//!
//! Handlers are thin adapters: they parse the request, call into
//! `pipeline` through the shared `CoreState`, and map `PipelineError`
//! onto structured JSON errors.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve_until_ctrl_c, start_api_server, ApiServer, ServerSession};
pub use types::ApiContext;
