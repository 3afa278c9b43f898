//! ensearch-core: shared types for name/address search and resolution
//!
//! This crate holds everything that both sides of the resolution HTTP
//! contract agree on:
//! - Query classification: is a raw string a name, an address, or neither
//! - Profile records as returned by the resolution service
//! - The bulk resolution contract (limits, deduplication, per-entry tagging)
//!
//! # Bulk contract
//!
//! | Rule | Behavior |
//! |------|----------|
//! | More than [`MAX_BULK`] inputs | whole request rejected with 400 |
//! | Duplicate inputs | resolved once, replayed at every position |
//! | Unresolvable entry | `{"type":"error","status":404}` at its position |
//! | Malformed entry | `{"type":"error","status":400}` at its position |
//! | `response_length` | always equals the number of request entries |
//!
//! Nothing in this crate performs I/O.

mod address;
mod bulk;
mod chains;
mod error;
mod profile;
mod query;

pub use address::{checksum_address, normalize_address, parse_address};
pub use bulk::{BulkEntry, BulkKind, BulkPlan, BulkResponse, ErrorBody, Resolved, ResolutionOutcome, MAX_BULK};
pub use chains::{chain_icon_url, ICON_BASE_URL};
pub use error::Error;
pub use profile::{Profile, Records};
pub use query::{
    classify, eth_suggestion, is_address_candidate, is_name_candidate,
    should_attempt_direct_lookup, Classification, Lookup, QueryKind,
};

pub type Result<T> = std::result::Result<T, Error>;

/// 20-byte Ethereum address
pub type Address = [u8; 20];
