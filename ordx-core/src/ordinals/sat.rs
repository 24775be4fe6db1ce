use ordx_sdk::objects::SatRarity;

pub const COIN_VALUE: u64 = 100_000_000;
pub const SUBSIDY_HALVING_INTERVAL: u64 = 210_000;
pub const DIFFCHANGE_INTERVAL: u64 = 2_016;
pub const CYCLE_EPOCHS: u64 = 6;

/// Total number of sats ever mined.
pub const SUPPLY: u64 = 2_099_999_997_690_000;

/// The subsidy reaches zero after this many halvings.
const SUBSIDY_EPOCHS: u64 = 33;

fn subsidy(epoch: u64) -> u64 {
    if epoch >= 64 {
        0
    } else {
        (50 * COIN_VALUE) >> epoch
    }
}

/// Rarity of a sat, ordered from least to most rare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Mythic => "mythic",
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Rarity> for SatRarity {
    fn from(value: Rarity) -> Self {
        match value {
            Rarity::Common => SatRarity::Common,
            Rarity::Uncommon => SatRarity::Uncommon,
            Rarity::Rare => SatRarity::Rare,
            Rarity::Epic => SatRarity::Epic,
            Rarity::Legendary => SatRarity::Legendary,
            Rarity::Mythic => SatRarity::Mythic,
        }
    }
}

/// A sat, identified by its ordinal position in the total supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sat(pub u64);

impl Sat {
    pub fn is_valid(self) -> bool {
        self.0 < SUPPLY
    }

    /// Height of the block whose coinbase first created this sat, and the
    /// sat's offset within that coinbase subsidy.
    ///
    /// Returns `None` for ordinals past the total supply.
    pub fn coinbase_position(self) -> Option<(u64, u64)> {
        let mut epoch_start = 0u64;
        for epoch in 0..SUBSIDY_EPOCHS {
            let per_block = subsidy(epoch);
            let epoch_supply = per_block * SUBSIDY_HALVING_INTERVAL;
            if self.0 < epoch_start + epoch_supply {
                let into_epoch = self.0 - epoch_start;
                let height = epoch * SUBSIDY_HALVING_INTERVAL + into_epoch / per_block;
                return Some((height, into_epoch % per_block));
            }
            epoch_start += epoch_supply;
        }
        None
    }

    /// Rarity by degree: the first sat of every block is uncommon, of every
    /// difficulty period rare, of every halving epoch epic, of every cycle
    /// (a halving that coincides with a difficulty adjustment) legendary, and
    /// the first sat ever mythic.
    ///
    /// Ordinals past the total supply are reported as common.
    pub fn rarity(self) -> Rarity {
        if self.0 == 0 {
            return Rarity::Mythic;
        }
        let Some((height, offset)) = self.coinbase_position() else {
            return Rarity::Common;
        };
        if offset != 0 {
            return Rarity::Common;
        }
        let halving = height % SUBSIDY_HALVING_INTERVAL == 0;
        let diffchange = height % DIFFCHANGE_INTERVAL == 0;
        match (halving, diffchange) {
            (true, true) => Rarity::Legendary,
            (true, false) => Rarity::Epic,
            (false, true) => Rarity::Rare,
            (false, false) => Rarity::Uncommon,
        }
    }
}
