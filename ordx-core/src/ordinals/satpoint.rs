use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid txid `{0}`")]
    Txid(String),
    #[error("invalid inscription id `{0}`")]
    InscriptionId(String),
    #[error("invalid satpoint `{0}`")]
    SatPoint(String),
}

/// Transaction ids are 32 bytes, rendered as 64 lowercase hex characters.
/// A `0x` prefix, as emitted by some event sources, is accepted and dropped.
fn parse_txid(raw: &str) -> Option<String> {
    let txid = raw.strip_prefix("0x").unwrap_or(raw);
    if txid.len() != 64 || !txid.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(txid.to_ascii_lowercase())
}

/// `<txid>i<index>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InscriptionId {
    pub txid: String,
    pub index: u32,
}

impl fmt::Display for InscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}i{}", self.txid, self.index)
    }
}

impl FromStr for InscriptionId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError::InscriptionId(s.to_string());
        let (txid, index) = s.rsplit_once('i').ok_or_else(err)?;
        let txid = parse_txid(txid).ok_or_else(err)?;
        let index = index.parse::<u32>().map_err(|_| err())?;
        Ok(Self { txid, index })
    }
}

/// Location of a sat: `<txid>:<vout>:<offset>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SatPoint {
    pub txid: String,
    pub vout: u32,
    pub offset: u64,
}

impl fmt::Display for SatPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.txid, self.vout, self.offset)
    }
}

impl FromStr for SatPoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError::SatPoint(s.to_string());
        let mut parts = s.split(':');
        let (Some(txid), Some(vout), Some(offset), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(err());
        };
        let txid = parse_txid(txid).ok_or_else(|| ParseError::Txid(txid.to_string()))?;
        Ok(Self {
            txid,
            vout: vout.parse().map_err(|_| err())?,
            offset: offset.parse().map_err(|_| err())?,
        })
    }
}
