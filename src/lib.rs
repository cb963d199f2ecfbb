//! Understudy - stateful mock of a professional-network API
//!
//! A local emulation of a third-party networked service: it tracks
//! invitations, chats, posts, and engagement as one interlinked entity
//! graph, optionally delegates reads to the real upstream and caches the
//! answers, and serves the aggregate rollups the operator dashboards
//! consume.
//!
//! ## Pieces
//!
//! - **engine**: domain stores (relationships, conversations, engagement,
//!   lifecycle), the rollup aggregator, and the dashboard action channel
//! - **store**: whole-value keyed JSON persistence (file or memory)
//! - **upstream**: optional HTTP client for cache fills and passthrough
//! - **server**: hyper http1 front end with prefix-stripped routing

pub mod config;
pub mod engine;
pub mod ids;
pub mod model;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;
pub mod upstream;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{EngineError, Result};
