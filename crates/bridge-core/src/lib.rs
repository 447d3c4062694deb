//! Core domain types for the oracle price bridge.
//!
//! This crate provides the pure pieces shared by the feed, chain, and
//! reporter crates:
//! - `PriceUpdate`, `TickerEventType`: a parsed ticker event
//! - `EncodedPrice` / `encode_price`: fixed-point price encoding
//! - `ReportState`, `ReportThrottle`: minimum-interval report gating
//! - `Clock`: time source abstraction for testability

pub mod clock;
pub mod encode;
pub mod error;
pub mod throttle;
pub mod update;

pub use clock::{Clock, SystemClock};
pub use encode::{encode_price, EncodedPrice, PRICE_SCALE};
pub use error::{CoreError, Result};
pub use throttle::ReportThrottle;
pub use update::{PriceUpdate, ReportState, TickerEventType};
