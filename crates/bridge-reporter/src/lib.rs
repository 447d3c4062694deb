//! Exchange-to-oracle price reporter.
//!
//! Wires the exchange feed to the chain client:
//! - subscribes to ticker updates for one symbol
//! - throttles qualifying updates to a minimum reporting interval
//! - encodes the close price as a scaled integer
//! - submits a signed, nonce-sequenced report transaction

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, ReportSummary};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
