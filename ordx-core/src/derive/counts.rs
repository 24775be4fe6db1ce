use crate::entities::counts::CountRecord;
use crate::entities::{CountCategory, InscriptionType};
use crate::ordinals::Rarity;
use std::collections::BTreeMap;

/// The attributes of one inscription that count keys are derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InscriptionFacts {
    pub mime_type: String,
    pub sat_rarity: Rarity,
    pub inscription_type: InscriptionType,
    pub genesis_address: Option<String>,
    pub current_address: Option<String>,
}

/// The key an inscription contributes to in `category`, if any.
pub fn count_key(category: CountCategory, facts: &InscriptionFacts) -> Option<String> {
    match category {
        CountCategory::MimeType => Some(facts.mime_type.clone()),
        CountCategory::Address => facts.current_address.clone(),
        CountCategory::GenesisAddress => facts.genesis_address.clone(),
        CountCategory::SatRarity => Some(facts.sat_rarity.as_str().to_string()),
        CountCategory::Type => Some(facts.inscription_type.as_str().to_string()),
    }
}

/// Full count table of one category, sorted by key.
pub fn tally(category: CountCategory, facts: Vec<InscriptionFacts>) -> Vec<CountRecord> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for key in facts.iter().filter_map(|f| count_key(category, f)) {
        *counts.entry(key).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(key, count)| CountRecord {
            category,
            key,
            count,
        })
        .collect()
}

/// Signed count changes accumulated over one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountDeltas {
    deltas: BTreeMap<(CountCategory, String), i64>,
}

impl CountDeltas {
    pub fn add(&mut self, category: CountCategory, key: String, delta: i64) {
        *self.deltas.entry((category, key)).or_default() += delta;
    }

    /// Add `delta` to the key of each listed category that `facts` maps to.
    pub fn add_facts(&mut self, categories: &[CountCategory], facts: &InscriptionFacts, delta: i64) {
        for &category in categories {
            if let Some(key) = count_key(category, facts) {
                self.add(category, key, delta);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.values().all(|d| *d == 0)
    }

    /// Non-zero deltas, one record per `(category, key)`.
    pub fn into_records(self) -> Vec<CountRecord> {
        self.deltas
            .into_iter()
            .filter(|(_, count)| *count != 0)
            .map(|((category, key), count)| CountRecord {
                category,
                key,
                count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(mime: &str, rarity: Rarity, number: i64, genesis: &str, current: Option<&str>) -> InscriptionFacts {
        InscriptionFacts {
            mime_type: mime.to_string(),
            sat_rarity: rarity,
            inscription_type: InscriptionType::from_number(number),
            genesis_address: Some(genesis.to_string()),
            current_address: current.map(str::to_string),
        }
    }

    fn as_pairs(records: &[CountRecord]) -> Vec<(&str, i64)> {
        records.iter().map(|r| (r.key.as_str(), r.count)).collect()
    }

    #[test]
    fn tally_every_category() {
        let all = vec![
            facts("text/plain", Rarity::Common, 0, "h0", Some("h1")),
            facts("image/png", Rarity::Common, 1, "h0", Some("h0")),
            facts("image/png", Rarity::Uncommon, -3, "h2", None),
        ];

        assert_eq!(
            as_pairs(&tally(CountCategory::MimeType, all.clone())),
            [("image/png", 2), ("text/plain", 1)]
        );
        assert_eq!(
            as_pairs(&tally(CountCategory::Address, all.clone())),
            [("h0", 1), ("h1", 1)]
        );
        assert_eq!(
            as_pairs(&tally(CountCategory::GenesisAddress, all.clone())),
            [("h0", 2), ("h2", 1)]
        );
        assert_eq!(
            as_pairs(&tally(CountCategory::SatRarity, all.clone())),
            [("common", 2), ("uncommon", 1)]
        );
        assert_eq!(
            as_pairs(&tally(CountCategory::Type, all)),
            [("blessed", 2), ("cursed", 1)]
        );
    }

    #[test]
    fn deltas_cancel_out() {
        let mut deltas = CountDeltas::default();
        deltas.add(CountCategory::Address, "h0".into(), 1);
        deltas.add(CountCategory::Address, "h0".into(), -1);
        assert!(deltas.is_empty());

        deltas.add(CountCategory::Address, "h1".into(), 1);
        let f = facts("text/plain", Rarity::Rare, 5, "g", None);
        deltas.add_facts(&[CountCategory::MimeType, CountCategory::Address], &f, 1);
        let records = deltas.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].category, CountCategory::MimeType);
        assert_eq!(records[1].key, "h1");
    }
}
