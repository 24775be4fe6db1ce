//! Block payloads produced by the upstream event source.
//!
//! A block carries the inscription events that happened in it, ordered by
//! transaction index. The field names follow the chainhook ordinals payload
//! so an existing event source can feed the indexer without translation.

use serde::{Deserialize, Serialize};

/// All inscription events observed in one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEvents {
    pub height: u64,
    pub hash: String,
    /// Block time as unix seconds.
    pub timestamp: i64,
    #[serde(default)]
    pub events: Vec<InscriptionEvent>,
}

/// A single reveal or transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InscriptionEvent {
    InscriptionRevealed(RevealEvent),
    InscriptionTransferred(TransferEvent),
}

impl InscriptionEvent {
    pub fn tx_index(&self) -> u32 {
        match self {
            InscriptionEvent::InscriptionRevealed(reveal) => reveal.tx_index,
            InscriptionEvent::InscriptionTransferred(transfer) => transfer.tx_index,
        }
    }

    pub fn inscription_id(&self) -> &str {
        match self {
            InscriptionEvent::InscriptionRevealed(reveal) => &reveal.inscription_id,
            InscriptionEvent::InscriptionTransferred(transfer) => &transfer.inscription_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealEvent {
    pub inscription_id: String,
    pub inscription_number: i64,
    pub content_type: String,
    pub content_length: u64,
    /// Hex encoded payload, with or without a `0x` prefix.
    pub content_bytes: String,
    pub inscription_fee: u64,
    pub inscriber_address: Option<String>,
    pub ordinal_number: u64,
    pub satpoint_post_inscription: String,
    pub inscription_output_value: u64,
    pub tx_index: u32,
    #[serde(default)]
    pub inscription_input_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub inscription_id: String,
    pub satpoint_pre_transfer: String,
    pub satpoint_post_transfer: String,
    pub destination_address: Option<String>,
    pub post_transfer_output_value: Option<u64>,
    pub tx_index: u32,
    #[serde(default)]
    pub input_index: u32,
}
