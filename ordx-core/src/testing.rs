//! Block and event builders shared by the unit tests.

use crate::config::{ConfigStore, IngestConfig};
use crate::processors::ingestor::EventIngestor;
use crate::store::MemoryStore;
use ordx_sdk::objects::blocks::{BlockEvents, InscriptionEvent, RevealEvent, TransferEvent};
use std::sync::Arc;

/// A common sat (see the rarity tests in `ordinals::sat`).
pub const COMMON_SAT: u64 = 257_418_248_345_364;

pub fn txid(seed: u8) -> String {
    format!("{seed:02x}").repeat(32)
}

pub fn inscription_id(seed: u8) -> String {
    format!("{}i0", txid(seed))
}

pub fn satpoint(seed: u8) -> String {
    format!("{}:0:0", txid(seed))
}

pub fn reveal(
    seed: u8,
    number: i64,
    content_type: &str,
    tx_index: u32,
    address: Option<&str>,
) -> InscriptionEvent {
    InscriptionEvent::InscriptionRevealed(RevealEvent {
        inscription_id: inscription_id(seed),
        inscription_number: number,
        content_type: content_type.to_string(),
        content_length: 5,
        content_bytes: "0x48656c6c6f".to_string(),
        inscription_fee: 705,
        inscriber_address: address.map(str::to_string),
        ordinal_number: COMMON_SAT,
        satpoint_post_inscription: satpoint(seed),
        inscription_output_value: 10_000,
        tx_index,
        inscription_input_index: 0,
    })
}

/// Move the inscription revealed with `seed` to the first output of `to`.
pub fn transfer(seed: u8, from: u8, to: u8, tx_index: u32, address: Option<&str>) -> InscriptionEvent {
    InscriptionEvent::InscriptionTransferred(TransferEvent {
        inscription_id: inscription_id(seed),
        satpoint_pre_transfer: satpoint(from),
        satpoint_post_transfer: satpoint(to),
        destination_address: address.map(str::to_string),
        post_transfer_output_value: Some(9_000),
        tx_index,
        input_index: 0,
    })
}

pub fn block(height: u64, events: Vec<InscriptionEvent>) -> BlockEvents {
    BlockEvents {
        height,
        hash: format!("{height:064x}"),
        timestamp: 1_676_913_207 + height as i64 * 600,
        events,
    }
}

pub fn memory_ingestor(options: IngestConfig) -> (Arc<MemoryStore>, Arc<EventIngestor>) {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Arc::new(EventIngestor::new(store.clone(), ConfigStore::new(options)));
    (store, ingestor)
}
