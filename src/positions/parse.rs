use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::bubbles::Side;

use super::record::{Market, PositionRecord, Snapshot};

const DEFAULT_MARKET_ID: &str = "all";
const DEFAULT_MARKET_TITLE: &str = "All positions";

/// Position record as served by the various position endpoints. Several
/// payloads carry more than one spelling of the same field, so each spelling
/// is read separately and resolved in a fixed order.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct RawPosition {
    id: Option<String>,
    wallet: Option<String>,
    #[serde(rename = "proxyWallet")]
    proxy_wallet: Option<String>,
    address: Option<String>,
    side: Option<Value>,
    outcome: Option<Value>,
    #[serde(rename = "outcomeIndex")]
    outcome_index: Option<Value>,
    magnitude: Option<Value>,
    size: Option<Value>,
    amount: Option<Value>,
    stake: Option<Value>,
    value: Option<Value>,
    label: Option<String>,
    name: Option<String>,
    pseudonym: Option<String>,
}

fn first_text<'a>(candidates: impl IntoIterator<Item = &'a Option<String>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_owned)
}

impl RawPosition {
    fn wallet(&self) -> Option<String> {
        first_text([&self.id, &self.wallet, &self.proxy_wallet, &self.address])
    }

    fn side(&self) -> Option<Side> {
        [&self.side, &self.outcome, &self.outcome_index]
            .into_iter()
            .flatten()
            .find_map(side_from)
    }

    fn magnitude(&self) -> Option<f64> {
        [
            &self.magnitude,
            &self.size,
            &self.amount,
            &self.stake,
            &self.value,
        ]
        .into_iter()
        .flatten()
        .find_map(number_from)
    }

    /// Display names win over pseudonyms, which are generated.
    fn label(&self) -> Option<String> {
        first_text([&self.label, &self.name, &self.pseudonym])
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct RawMarket {
    id: Option<String>,
    #[serde(rename = "conditionId")]
    condition_id: Option<String>,
    slug: Option<String>,
    title: Option<String>,
    question: Option<String>,
    positions: Vec<Value>,
}

impl RawMarket {
    fn id(&self) -> Option<String> {
        first_text([&self.id, &self.condition_id, &self.slug])
    }

    fn title(&self) -> Option<String> {
        first_text([&self.title, &self.question])
    }
}

/// Market APIs disagree on whether amounts are numbers or decimal strings.
fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn side_from(value: &Value) -> Option<Side> {
    match value {
        Value::String(text) => Side::parse(text),
        Value::Bool(true) => Some(Side::Yes),
        Value::Bool(false) => Some(Side::No),
        Value::Number(number) => match number.as_u64() {
            Some(0) => Some(Side::Yes),
            Some(1) => Some(Side::No),
            _ => None,
        },
        _ => None,
    }
}

fn parse_positions(values: &[Value], market_id: &str) -> Vec<PositionRecord> {
    let mut skipped = 0usize;
    let mut records = Vec::with_capacity(values.len());

    for value in values {
        let Ok(raw) = RawPosition::deserialize(value) else {
            skipped += 1;
            continue;
        };
        let (Some(wallet), Some(side), Some(magnitude)) =
            (raw.wallet(), raw.side(), raw.magnitude())
        else {
            skipped += 1;
            continue;
        };

        records.push(PositionRecord {
            wallet,
            side,
            magnitude,
            label: raw.label(),
        });
    }

    if skipped > 0 {
        warn!(market = market_id, skipped, "skipped unreadable position records");
    }
    records
}

/// Parses a snapshot document.
///
/// Accepts a bare array of positions, or an object with a `markets` array
/// whose entries carry their own `positions`. A bare object with a
/// `positions` array is treated as a single market.
pub fn parse_snapshot(raw: &str) -> Result<Snapshot> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON in position snapshot")?;

    match parsed {
        Value::Array(values) => Ok(Snapshot {
            markets: vec![Market {
                id: DEFAULT_MARKET_ID.to_owned(),
                title: DEFAULT_MARKET_TITLE.to_owned(),
                positions: parse_positions(&values, DEFAULT_MARKET_ID),
            }],
        }),
        Value::Object(object) => {
            if let Some(markets) = object.get("markets") {
                let markets = markets
                    .as_array()
                    .context("`markets` must be an array")?;
                let mut parsed_markets = Vec::with_capacity(markets.len());
                for (index, value) in markets.iter().enumerate() {
                    let raw = RawMarket::deserialize(value)
                        .with_context(|| format!("invalid market entry at index {index}"))?;
                    let id = raw.id().unwrap_or_else(|| format!("market-{index}"));
                    let title = raw.title().unwrap_or_else(|| id.clone());
                    let positions = parse_positions(&raw.positions, &id);
                    parsed_markets.push(Market {
                        id,
                        title,
                        positions,
                    });
                }
                return Ok(Snapshot {
                    markets: parsed_markets,
                });
            }

            let raw = RawMarket::deserialize(Value::Object(object))
                .context("snapshot object has neither `markets` nor `positions`")?;
            let id = raw.id().unwrap_or_else(|| DEFAULT_MARKET_ID.to_owned());
            let title = raw
                .title()
                .unwrap_or_else(|| DEFAULT_MARKET_TITLE.to_owned());
            let positions = parse_positions(&raw.positions, &id);
            Ok(Snapshot {
                markets: vec![Market {
                    id,
                    title,
                    positions,
                }],
            })
        }
        _ => anyhow::bail!("position snapshot must be a JSON array or object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_becomes_one_market() {
        let snapshot = parse_snapshot(
            r#"[
                {"id": "a", "side": "yes", "magnitude": 15000},
                {"id": "b", "side": "YES", "magnitude": 500}
            ]"#,
        )
        .expect("valid snapshot");

        assert_eq!(snapshot.markets.len(), 1);
        let market = &snapshot.markets[0];
        assert_eq!(market.id, "all");
        assert_eq!(market.positions.len(), 2);
        assert_eq!(market.positions[0].side, Side::Yes);
        assert_eq!(market.positions[0].magnitude, 15_000.0);
    }

    #[test]
    fn api_field_names_and_string_amounts_are_accepted() {
        let snapshot = parse_snapshot(
            r#"{"markets": [{
                "conditionId": "0xcond",
                "question": "Will it rain?",
                "positions": [
                    {"proxyWallet": "0x01", "outcome": "No", "size": "1250.5", "pseudonym": "Ana"},
                    {"wallet": "0x02", "outcome": "Yes", "amount": 75}
                ]
            }]}"#,
        )
        .expect("valid snapshot");

        let market = snapshot.market("0xcond").expect("market present");
        assert_eq!(market.title, "Will it rain?");
        assert_eq!(market.positions[0].side, Side::No);
        assert_eq!(market.positions[0].magnitude, 1_250.5);
        assert_eq!(market.positions[0].label.as_deref(), Some("Ana"));
        assert_eq!(market.positions[1].wallet, "0x02");
    }

    #[test]
    fn market_with_every_id_spelling_keeps_the_first() {
        let snapshot = parse_snapshot(
            r#"{"markets": [{
                "id": "514893",
                "conditionId": "0xc",
                "slug": "will-it-rain",
                "title": "Rain?",
                "question": "Will it rain?",
                "positions": [{"proxyWallet": "0x1", "outcome": "Yes", "size": 10}]
            }, {
                "conditionId": "0xd",
                "slug": "will-it-snow",
                "question": "Will it snow?"
            }]}"#,
        )
        .expect("valid snapshot");

        assert_eq!(snapshot.markets[0].id, "514893");
        assert_eq!(snapshot.markets[0].title, "Rain?");
        assert_eq!(snapshot.markets[0].positions.len(), 1);
        assert_eq!(snapshot.markets[1].id, "0xd");
        assert_eq!(snapshot.markets[1].title, "Will it snow?");
    }

    #[test]
    fn holder_records_with_overlapping_fields_are_kept() {
        let snapshot = parse_snapshot(
            r#"[
                {"proxyWallet": "0x1", "outcome": "Yes", "amount": 500,
                 "name": "ana", "pseudonym": "Bright-Fox"},
                {"wallet": "0x2", "proxyWallet": "0x2proxy", "outcomeIndex": 1,
                 "size": "75", "amount": 80, "value": 90, "name": " ", "pseudonym": "Calm-Owl"},
                {"address": "0x3", "side": null, "outcome": "No", "size": null, "stake": 12}
            ]"#,
        )
        .expect("valid snapshot");

        let positions = &snapshot.markets[0].positions;
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[0].label.as_deref(), Some("ana"));
        assert_eq!(positions[0].magnitude, 500.0);

        assert_eq!(positions[1].wallet, "0x2");
        assert_eq!(positions[1].side, Side::No);
        assert_eq!(positions[1].magnitude, 75.0);
        assert_eq!(positions[1].label.as_deref(), Some("Calm-Owl"));

        assert_eq!(positions[2].side, Side::No);
        assert_eq!(positions[2].magnitude, 12.0);
    }

    #[test]
    fn unreadable_records_are_skipped() {
        let snapshot = parse_snapshot(
            r#"[
                {"id": "a", "side": "maybe", "magnitude": 10},
                {"id": "b", "side": "no"},
                {"id": "", "side": "no", "magnitude": 5},
                {"id": "c", "side": "no", "magnitude": "lots"},
                {"id": "d", "side": "no", "magnitude": 42}
            ]"#,
        )
        .expect("valid snapshot");
        let positions = &snapshot.markets[0].positions;
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].wallet, "d");
    }

    #[test]
    fn empty_inputs_parse_to_empty_markets() {
        let snapshot = parse_snapshot("[]").expect("empty array");
        assert!(snapshot.markets[0].positions.is_empty());

        let snapshot = parse_snapshot(r#"{"markets": []}"#).expect("no markets");
        assert!(snapshot.markets.is_empty());
    }

    #[test]
    fn markets_without_ids_are_numbered() {
        let snapshot = parse_snapshot(r#"{"markets": [{"positions": []}, {"id": " "}]}"#)
            .expect("valid snapshot");
        assert_eq!(snapshot.markets[0].id, "market-0");
        assert_eq!(snapshot.markets[1].id, "market-1");
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(parse_snapshot("{not json").is_err());
        assert!(parse_snapshot("42").is_err());
        assert!(parse_snapshot(r#"{"markets": {}}"#).is_err());
    }
}
