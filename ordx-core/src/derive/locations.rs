use crate::entities::LocationEventKind;
use crate::entities::locations::LocationEvent;
use std::collections::BTreeMap;

/// What folding one event into an inscription's current location did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The event is not later than the current location; nothing changed.
    Stale,
    /// The event became the current location, displacing `previous`.
    Moved { previous: Option<LocationEvent> },
}

/// Fold one event into the current location of an inscription.
///
/// The current location is the event with the greatest chain order seen so
/// far. A reveal acts as the zero-th transfer. Folding an event that is
/// already current, or older than it, is a no-op, which is what makes
/// replaying a block harmless.
pub fn advance(current: &mut Option<LocationEvent>, event: &LocationEvent) -> Advance {
    if current
        .as_ref()
        .is_some_and(|existing| event.order() <= existing.order())
    {
        return Advance::Stale;
    }
    let previous = current.replace(event.clone());
    Advance::Moved { previous }
}

/// Genesis location of every inscription: its earliest reveal.
pub fn rebuild_genesis(history: Vec<LocationEvent>) -> Vec<LocationEvent> {
    let mut genesis: BTreeMap<String, LocationEvent> = BTreeMap::new();
    for event in history {
        if event.kind != LocationEventKind::Reveal {
            continue;
        }
        match genesis.get(&event.inscription_id) {
            Some(existing) if existing.order() <= event.order() => {}
            _ => {
                genesis.insert(event.inscription_id.clone(), event);
            }
        }
    }
    genesis.into_values().collect()
}

/// Current location of every revealed inscription.
///
/// Transfers of an inscription that has no reveal in the history are
/// dropped: there is nothing for them to move.
pub fn rebuild_current(mut history: Vec<LocationEvent>) -> Vec<LocationEvent> {
    history.sort_by(|a, b| a.order().cmp(&b.order()));
    let mut current: BTreeMap<String, Option<LocationEvent>> = BTreeMap::new();
    for event in &history {
        match event.kind {
            LocationEventKind::Reveal => {
                let slot = current.entry(event.inscription_id.clone()).or_default();
                advance(slot, event);
            }
            LocationEventKind::Transfer => {
                if let Some(slot) = current.get_mut(&event.inscription_id) {
                    advance(slot, event);
                }
            }
        }
    }
    current.into_values().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EventKey;

    fn event(id: &str, kind: LocationEventKind, key: (u64, u32), satpoint: &str) -> LocationEvent {
        LocationEvent {
            inscription_id: id.to_string(),
            kind,
            key: EventKey::new(key.0, key.1, 0),
            block_hash: format!("hash{}", key.0),
            timestamp: key.0 as i64 * 600,
            satpoint: satpoint.to_string(),
            address: Some(format!("addr-{satpoint}")),
            value: Some(10_000),
        }
    }

    #[test]
    fn advance_keeps_the_latest_event() {
        let reveal = event("a", LocationEventKind::Reveal, (100, 1), "s0");
        let first = event("a", LocationEventKind::Transfer, (105, 0), "s1");
        let second = event("a", LocationEventKind::Transfer, (106, 4), "s2");

        let mut current = None;
        assert_eq!(advance(&mut current, &reveal), Advance::Moved { previous: None });
        assert_eq!(
            advance(&mut current, &first),
            Advance::Moved {
                previous: Some(reveal.clone())
            }
        );
        assert!(matches!(advance(&mut current, &second), Advance::Moved { .. }));

        // Replays and late arrivals do not move it back.
        assert_eq!(advance(&mut current, &second), Advance::Stale);
        assert_eq!(advance(&mut current, &first), Advance::Stale);
        assert_eq!(advance(&mut current, &reveal), Advance::Stale);
        assert_eq!(current.unwrap().satpoint, "s2");
    }

    #[test]
    fn transfer_in_the_reveal_transaction_wins() {
        let reveal = event("a", LocationEventKind::Reveal, (100, 1), "s0");
        let same_tx = event("a", LocationEventKind::Transfer, (100, 1), "s1");
        let mut current = None;
        advance(&mut current, &same_tx);
        assert_eq!(advance(&mut current, &reveal), Advance::Stale);
        assert_eq!(current.unwrap().satpoint, "s1");
    }

    #[test]
    fn rebuilds_from_unordered_history() {
        let history = vec![
            event("b", LocationEventKind::Transfer, (210, 0), "b2"),
            event("a", LocationEventKind::Transfer, (150, 3), "a1"),
            event("a", LocationEventKind::Reveal, (100, 1), "a0"),
            event("b", LocationEventKind::Reveal, (200, 0), "b0"),
            event("b", LocationEventKind::Transfer, (205, 9), "b1"),
            event("c", LocationEventKind::Reveal, (300, 0), "c0"),
            event("orphan", LocationEventKind::Transfer, (400, 0), "x"),
        ];

        let genesis = rebuild_genesis(history.clone());
        let genesis: Vec<_> = genesis.iter().map(|e| e.satpoint.as_str()).collect();
        assert_eq!(genesis, ["a0", "b0", "c0"]);

        let current = rebuild_current(history);
        let current: Vec<_> = current.iter().map(|e| e.satpoint.as_str()).collect();
        assert_eq!(current, ["a1", "b2", "c0"]);
    }

    #[test]
    fn genesis_picks_the_earliest_reveal() {
        let history = vec![
            event("a", LocationEventKind::Reveal, (120, 0), "late"),
            event("a", LocationEventKind::Reveal, (100, 5), "early"),
        ];
        let genesis = rebuild_genesis(history);
        assert_eq!(genesis.len(), 1);
        assert_eq!(genesis[0].satpoint, "early");
    }
}
