//! Public read API response types.

use serde::{Deserialize, Serialize};

use super::{CountCriteria, InscriptionType, SatRarity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationResponse {
    /// `txid:vout:offset`
    pub satpoint: String,
    pub address: Option<String>,
    pub value: Option<u64>,
    pub block_height: u64,
    pub tx_index: u32,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InscriptionResponse {
    pub id: String,
    pub number: i64,
    #[serde(rename = "type")]
    pub inscription_type: InscriptionType,
    pub content_type: String,
    pub mime_type: String,
    pub content_length: u64,
    pub fee: u64,
    pub sat_ordinal: u64,
    pub sat_rarity: SatRarity,
    pub genesis_block_height: u64,
    pub genesis_block_hash: String,
    pub genesis_timestamp: i64,
    pub genesis: Option<LocationResponse>,
    pub current: Option<LocationResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatResponse {
    pub ordinal: u64,
    pub rarity: SatRarity,
    pub coinbase_height: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountsResponse {
    pub category: CountCriteria,
    pub results: Vec<CountEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub server_version: String,
    pub status: String,
    pub block_height: Option<u64>,
}
