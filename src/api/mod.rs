//! Upload server
//!
//! Browser upload form plus a small JSON API. Run with `mycarbon-validate serve`
//! or `mycarbon-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server, AppState};
