//! Ordinal theory primitives.
//!
//! Pure value types with no storage or runtime dependencies: inscription
//! ids, satpoints, sat positions and the fixed classification rules the
//! count aggregates are keyed by.

mod classify;
mod sat;
mod satpoint;

pub use classify::{decode_content, normalize_mime_type};
pub use sat::{
    COIN_VALUE, CYCLE_EPOCHS, DIFFCHANGE_INTERVAL, Rarity, SUBSIDY_HALVING_INTERVAL, SUPPLY, Sat,
};
pub use satpoint::{InscriptionId, ParseError, SatPoint};
