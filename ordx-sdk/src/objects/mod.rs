pub mod admin;
pub mod blocks;
pub mod inscriptions;

use serde::{Deserialize, Serialize};

/// Which location table a reposition job rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositionCriteria {
    Genesis,
    Current,
}

/// Which count category a recount job rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountCriteria {
    MimeType,
    Address,
    GenesisAddress,
    SatRarity,
    Type,
}

/// Rarity of a sat under the ordinal theory degree scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

/// Inscription classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InscriptionType {
    Blessed,
    Cursed,
}
