//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `AddressState`: where a single address is in the crawl pipeline
//! - `StateLedger`: per-run record of address states with transition checks

mod address_state;
mod ledger;

// Re-export main types
pub use address_state::AddressState;
pub use ledger::StateLedger;
