//! Core contracts for affseed.
//!
//! This crate defines the error model shared by every generator, the host
//! platform collaborator the generators call through to, the structured event
//! log, and an in-process host used by the CLI sandbox and tests.

pub mod error;
pub mod events;
pub mod host;
pub mod memory;
pub mod snapshot;

pub use error::{ErrorRecord, ErrorSet, Result};
pub use events::{EventLog, EventType, LogEvent, LogFileInfo};
pub use host::{
    Account, Address, AffiliateFields, AffiliateRecord, AttributionContext, BackendHandle,
    CartLine, Host, NewAccount, NewOrder, NewProduct, OrderRecord, PriceOption, ProductRecord,
    Referral, ReferralUpdate,
};
pub use memory::{CallCounts, IntegrationConfig, MemoryConfig, MemoryHost, MemoryState, Visit};
pub use snapshot::{OrderSnapshot, ProductSnapshot};

/// Timestamp format used for record dates in snapshots and logs.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Round a monetary amount to cents.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
