//! Pure derivations from the ledger.
//!
//! Both the per-block ingestor and the full-history rebuilds go through the
//! functions here, so the incremental and bulk paths cannot drift apart.

pub mod counts;
pub mod locations;
