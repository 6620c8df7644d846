use std::collections::HashMap;

use crate::bubbles::{Entity, Side, Tier, classify_tier, sanitize_magnitude};

#[derive(Clone, Debug, PartialEq)]
pub struct PositionRecord {
    pub wallet: String,
    pub side: Side,
    pub magnitude: f64,
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Market {
    pub id: String,
    pub title: String,
    pub positions: Vec<PositionRecord>,
}

/// One wallet's combined stake on one side of a market.
#[derive(Clone, Debug, PartialEq)]
pub struct WalletStake {
    pub entity_id: String,
    pub wallet: String,
    pub label: Option<String>,
    pub side: Side,
    pub magnitude: f64,
    pub tier: Tier,
    pub records: usize,
}

impl WalletStake {
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.wallet)
    }

    pub fn to_entity(&self) -> Entity {
        Entity::new(self.entity_id.clone(), self.side, self.magnitude)
    }
}

pub fn entity_id(wallet: &str, side: Side) -> String {
    format!("{wallet}:{}", side.label())
}

impl Market {
    /// Sums records per wallet and side, dropping empty stakes and those
    /// below `min_magnitude`. Sorted by descending stake, then id.
    pub fn stakes(&self, min_magnitude: f64) -> Vec<WalletStake> {
        let mut by_key: HashMap<(&str, Side), WalletStake> = HashMap::new();
        for record in &self.positions {
            let magnitude = sanitize_magnitude(record.magnitude);
            if magnitude <= 0.0 {
                continue;
            }

            let stake = by_key
                .entry((record.wallet.as_str(), record.side))
                .or_insert_with(|| WalletStake {
                    entity_id: entity_id(&record.wallet, record.side),
                    wallet: record.wallet.clone(),
                    label: None,
                    side: record.side,
                    magnitude: 0.0,
                    tier: Tier::Small,
                    records: 0,
                });
            stake.magnitude += magnitude;
            stake.records += 1;
            if stake.label.is_none() {
                stake.label = record.label.clone().filter(|label| !label.trim().is_empty());
            }
        }

        let min_magnitude = sanitize_magnitude(min_magnitude);
        let mut stakes = by_key
            .into_values()
            .filter(|stake| stake.magnitude >= min_magnitude)
            .map(|mut stake| {
                stake.tier = classify_tier(stake.magnitude);
                stake
            })
            .collect::<Vec<_>>();
        stakes.sort_by(|a, b| {
            b.magnitude
                .total_cmp(&a.magnitude)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        stakes
    }
}

/// Layout input for a set of stakes, sorted by id.
pub fn layout_entities(stakes: &[WalletStake]) -> Vec<Entity> {
    let mut entities = stakes.iter().map(WalletStake::to_entity).collect::<Vec<_>>();
    entities.sort_by(|a, b| a.id.cmp(&b.id));
    entities
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub markets: Vec<Market>,
}

impl Snapshot {
    pub fn market(&self, id: &str) -> Option<&Market> {
        self.markets.iter().find(|market| market.id == id)
    }

    pub fn position_count(&self) -> usize {
        self.markets.iter().map(|market| market.positions.len()).sum()
    }
}
