pub mod chain_tip;
pub mod counts;
pub mod inscriptions;
pub mod locations;

use ordx_sdk::objects::{
    CountCriteria, InscriptionType as SdkInscriptionType, RepositionCriteria,
};
use std::fmt;
use std::str::FromStr;

/// Inscription classification for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `ordx_sdk::objects::InscriptionType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "inscription_type")]
pub enum InscriptionType {
    Blessed,
    Cursed,
}

impl InscriptionType {
    /// Inscriptions with a negative number are cursed, all others blessed.
    pub fn from_number(number: i64) -> Self {
        if number < 0 {
            InscriptionType::Cursed
        } else {
            InscriptionType::Blessed
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            InscriptionType::Blessed => "blessed",
            InscriptionType::Cursed => "cursed",
        }
    }
}

impl From<InscriptionType> for SdkInscriptionType {
    fn from(value: InscriptionType) -> Self {
        match value {
            InscriptionType::Blessed => SdkInscriptionType::Blessed,
            InscriptionType::Cursed => SdkInscriptionType::Cursed,
        }
    }
}

/// Kind of a ledger location event.
///
/// Declaration order matters: at an equal ordering key a reveal sorts before
/// a transfer, both here and in the Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "location_event_kind")]
pub enum LocationEventKind {
    Reveal,
    Transfer,
}

/// Position of an event in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub block_height: u64,
    pub tx_index: u32,
    pub input_index: u32,
}

impl EventKey {
    pub fn new(block_height: u64, tx_index: u32, input_index: u32) -> Self {
        Self {
            block_height,
            tx_index,
            input_index,
        }
    }
}

/// One of the two derived location tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationTable {
    Genesis,
    Current,
}

impl LocationTable {
    pub const fn as_str(self) -> &'static str {
        match self {
            LocationTable::Genesis => "genesis",
            LocationTable::Current => "current",
        }
    }

    pub(crate) const fn table_name(self) -> &'static str {
        match self {
            LocationTable::Genesis => "genesis_locations",
            LocationTable::Current => "current_locations",
        }
    }
}

impl fmt::Display for LocationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RepositionCriteria> for LocationTable {
    fn from(value: RepositionCriteria) -> Self {
        match value {
            RepositionCriteria::Genesis => LocationTable::Genesis,
            RepositionCriteria::Current => LocationTable::Current,
        }
    }
}

impl From<LocationTable> for RepositionCriteria {
    fn from(value: LocationTable) -> Self {
        match value {
            LocationTable::Genesis => RepositionCriteria::Genesis,
            LocationTable::Current => RepositionCriteria::Current,
        }
    }
}

/// Count aggregate category.
///
/// Stored as text so that batches of `(category, key)` pairs can be bound
/// as plain `text[]` arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CountCategory {
    MimeType,
    Address,
    GenesisAddress,
    SatRarity,
    Type,
}

impl CountCategory {
    pub const ALL: [CountCategory; 5] = [
        CountCategory::MimeType,
        CountCategory::Address,
        CountCategory::GenesisAddress,
        CountCategory::SatRarity,
        CountCategory::Type,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CountCategory::MimeType => "mime_type",
            CountCategory::Address => "address",
            CountCategory::GenesisAddress => "genesis_address",
            CountCategory::SatRarity => "sat_rarity",
            CountCategory::Type => "type",
        }
    }
}

impl fmt::Display for CountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CountCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("unknown count category `{s}`"))
    }
}

impl From<CountCriteria> for CountCategory {
    fn from(value: CountCriteria) -> Self {
        match value {
            CountCriteria::MimeType => CountCategory::MimeType,
            CountCriteria::Address => CountCategory::Address,
            CountCriteria::GenesisAddress => CountCategory::GenesisAddress,
            CountCriteria::SatRarity => CountCategory::SatRarity,
            CountCriteria::Type => CountCategory::Type,
        }
    }
}

impl From<CountCategory> for CountCriteria {
    fn from(value: CountCategory) -> Self {
        match value {
            CountCategory::MimeType => CountCriteria::MimeType,
            CountCategory::Address => CountCriteria::Address,
            CountCategory::GenesisAddress => CountCriteria::GenesisAddress,
            CountCategory::SatRarity => CountCriteria::SatRarity,
            CountCategory::Type => CountCriteria::Type,
        }
    }
}

/// Postgres has no unsigned integers; every unsigned column is stored as a
/// signed one of the same width and checked on the way back out.
pub(crate) fn column_u64(value: i64, column: &'static str) -> Result<u64, sqlx::Error> {
    u64::try_from(value)
        .map_err(|_| sqlx::Error::Decode(format!("{column} out of range: {value}").into()))
}

pub(crate) fn column_u32(value: i32, column: &'static str) -> Result<u32, sqlx::Error> {
    u32::try_from(value)
        .map_err(|_| sqlx::Error::Decode(format!("{column} out of range: {value}").into()))
}

pub(crate) fn column_parse<T: FromStr>(value: &str, column: &'static str) -> Result<T, sqlx::Error>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| sqlx::Error::Decode(format!("{column}: {e}").into()))
}
