use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::bubbles::live::LiveField;
use crate::bubbles::ticker::Ticker;
use crate::bubbles::zone::{LayoutResult, ZoneLayout};
use crate::bubbles::{Bubble, Container, sanitize_magnitude};
use crate::positions::{Market, Snapshot, WalletStake, layout_entities};

use super::{AppSettings, SideFilter, ViewMode, ViewModel, ZoneCache, ZoneCacheKey};

impl ViewModel {
    pub(in crate::app) const INITIAL_RANKING_ROWS: usize = 20;
    pub(in crate::app) const RANKING_PAGE_ROWS: usize = 20;
    pub(in crate::app) const RANKING_PREFETCH_MARGIN: usize = 4;

    pub(in crate::app) fn new(snapshot: Arc<Snapshot>, settings: &AppSettings) -> Self {
        let layout = &settings.layout;
        let container = Container::new(0.0, 0.0);
        let market_id = snapshot.markets.first().map(|market| market.id.clone());

        let mut model = Self {
            snapshot,
            loaded_at: Instant::now(),
            refresh_error: None,
            market_id,
            mode: settings.mode,
            side_filter: SideFilter::Both,
            min_stake: layout.refresh.min_stake,
            stake_ceiling: 0.0,
            search: String::new(),
            selected: None,
            seed: settings.seed,
            stakes: Vec::new(),
            stake_index: HashMap::new(),
            entities: Vec::new(),
            entities_revision: 0,
            container,
            zone: ZoneLayout::new(layout.zone.clone()),
            zone_cache: None,
            live: LiveField::new(
                layout.live.clone(),
                container,
                StdRng::seed_from_u64(settings.seed),
            ),
            ticker: Ticker::new(layout.live.max_delta_secs),
            animate: true,
            search_match_cache: None,
            ranking_rows_visible: Self::INITIAL_RANKING_ROWS,
        };
        model.rebuild_entities();
        model.sync_ticker();
        model
    }

    pub(in crate::app) fn market(&self) -> Option<&Market> {
        let id = self.market_id.as_deref()?;
        self.snapshot.market(id)
    }

    /// Swaps in a refreshed snapshot, keeping the current market when it is
    /// still present.
    pub(in crate::app) fn apply_snapshot(&mut self, snapshot: Arc<Snapshot>) {
        let keep_market = self
            .market_id
            .as_deref()
            .is_some_and(|id| snapshot.market(id).is_some());
        if !keep_market {
            self.market_id = snapshot.markets.first().map(|market| market.id.clone());
        }

        info!(
            markets = snapshot.markets.len(),
            positions = snapshot.position_count(),
            "applied refreshed snapshot"
        );
        self.snapshot = snapshot;
        self.loaded_at = Instant::now();
        self.refresh_error = None;
        self.rebuild_entities();
    }

    pub(in crate::app) fn select_market(&mut self, market_id: String) {
        if self.market_id.as_deref() == Some(market_id.as_str()) {
            return;
        }
        self.market_id = Some(market_id);
        self.set_selected(None);
        self.rebuild_entities();
    }

    /// Recomputes stakes and layout input from the snapshot and filters.
    pub(in crate::app) fn rebuild_entities(&mut self) {
        let all_stakes = self
            .market()
            .map(|market| market.stakes(0.0))
            .unwrap_or_default();
        self.stake_ceiling = all_stakes.first().map_or(0.0, |stake| stake.magnitude);

        let min_stake = sanitize_magnitude(self.min_stake);
        let stakes = all_stakes
            .into_iter()
            .filter(|stake| stake.magnitude >= min_stake && self.side_filter.allows(stake.side))
            .collect::<Vec<_>>();
        let entities = layout_entities(&stakes);

        self.stake_index = stakes
            .iter()
            .enumerate()
            .map(|(index, stake)| (stake.entity_id.clone(), index))
            .collect();
        self.stakes = stakes;
        self.entities = entities;
        self.entities_revision = self.entities_revision.wrapping_add(1);
        self.zone_cache = None;
        self.search_match_cache = None;
        self.ranking_rows_visible = Self::INITIAL_RANKING_ROWS;

        if let Some(selected) = &self.selected
            && !self.stake_index.contains_key(selected)
        {
            self.selected = None;
        }

        self.live.sync(&self.entities);
        debug!(
            entities = self.entities.len(),
            revision = self.entities_revision,
            "rebuilt layout input"
        );
    }

    pub(in crate::app) fn stake(&self, entity_id: &str) -> Option<&WalletStake> {
        self.stake_index
            .get(entity_id)
            .and_then(|&index| self.stakes.get(index))
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<String>) {
        if self.selected == selected {
            return;
        }
        self.selected = selected;
    }

    pub(in crate::app) fn set_mode(&mut self, mode: ViewMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.sync_ticker();
    }

    pub(in crate::app) fn sync_ticker(&mut self) {
        if self.mode == ViewMode::Live && self.animate {
            self.ticker.start();
        } else {
            self.ticker.stop();
        }
    }

    /// New random placement for both views.
    pub(in crate::app) fn reseed(&mut self) {
        self.seed = rand::random();
        self.zone_cache = None;
        self.live = LiveField::new(
            self.live.config().clone(),
            self.container,
            StdRng::seed_from_u64(self.seed),
        );
        self.live.sync(&self.entities);
        info!(seed = self.seed, "reseeded layout");
    }

    pub(in crate::app) fn set_container(&mut self, container: Container) {
        if self.container == container {
            return;
        }
        self.container = container;
        self.live.resize(container);
    }

    /// Zone layout for the current input, recomputed only when the entities,
    /// container or seed changed since the last pass.
    pub(in crate::app) fn zone_result(&mut self) -> &LayoutResult {
        let key = ZoneCacheKey {
            entities_revision: self.entities_revision,
            container: self.container,
            seed: self.seed,
        };

        let cache = match self.zone_cache.take() {
            Some(cache) if cache.key == key => cache,
            _ => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                let result = self.zone.layout(&self.entities, self.container, &mut rng);
                ZoneCache { key, result }
            }
        };
        &self.zone_cache.insert(cache).result
    }

    /// Circles for the active view, in draw order.
    pub(in crate::app) fn visible_bubbles(&mut self) -> Vec<Bubble> {
        let mut bubbles = match self.mode {
            ViewMode::Zone => self.zone_result().bubbles.clone(),
            ViewMode::Live => self.live.bubbles().cloned().collect(),
        };
        bubbles.sort_by(|a, b| {
            a.magnitude
                .total_cmp(&b.magnitude)
                .then_with(|| a.id.cmp(&b.id))
        });
        bubbles
    }

    /// Advances the live simulation. Returns whether another frame is needed.
    pub(in crate::app) fn advance_live(&mut self, now_secs: f64) -> bool {
        if self.mode != ViewMode::Live {
            return false;
        }
        self.ticker.advance(now_secs, &mut self.live)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::bubbles::Side;
    use crate::config::LayoutConfig;
    use crate::positions::parse_snapshot;

    fn snapshot(raw: &str) -> Arc<Snapshot> {
        Arc::new(parse_snapshot(raw).expect("valid snapshot"))
    }

    fn settings(mode: ViewMode) -> AppSettings {
        AppSettings {
            snapshot_path: PathBuf::from("positions.json"),
            layout: LayoutConfig::default(),
            seed: 7,
            mode,
        }
    }

    const TWO_MARKETS: &str = r#"{"markets": [
        {"id": "m1", "title": "First", "positions": [
            {"id": "0xa", "side": "yes", "magnitude": 12000},
            {"id": "0xb", "side": "no", "magnitude": 400},
            {"id": "0xc", "side": "no", "magnitude": 2500}
        ]},
        {"id": "m2", "title": "Second", "positions": [
            {"id": "0xd", "side": "yes", "magnitude": 50}
        ]}
    ]}"#;

    #[test]
    fn first_market_is_shown_initially() {
        let model = ViewModel::new(snapshot(TWO_MARKETS), &settings(ViewMode::Zone));
        assert_eq!(model.market_id.as_deref(), Some("m1"));
        assert_eq!(model.entities.len(), 3);
        assert!(model.stake("0xa:yes").is_some());
    }

    #[test]
    fn side_and_stake_filters_narrow_entities() {
        let mut model = ViewModel::new(snapshot(TWO_MARKETS), &settings(ViewMode::Zone));
        model.side_filter = SideFilter::Only(Side::No);
        model.rebuild_entities();
        assert_eq!(model.entities.len(), 2);

        model.min_stake = 1_000.0;
        model.rebuild_entities();
        let ids = model
            .entities
            .iter()
            .map(|entity| entity.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["0xc:no"]);
    }

    #[test]
    fn entities_mirror_filtered_stakes_and_ceiling_ignores_filters() {
        let mut model = ViewModel::new(snapshot(TWO_MARKETS), &settings(ViewMode::Zone));
        model.side_filter = SideFilter::Only(Side::No);
        model.min_stake = 1_000.0;
        model.rebuild_entities();

        assert_eq!(model.stake_ceiling, 12_000.0);
        let stake_ids = model
            .stakes
            .iter()
            .map(|stake| stake.entity_id.as_str())
            .collect::<Vec<_>>();
        let entity_ids = model
            .entities
            .iter()
            .map(|entity| entity.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(stake_ids, vec!["0xc:no"]);
        assert_eq!(entity_ids, stake_ids);
        assert_eq!(model.entities[0].magnitude, 2_500.0);
    }

    #[test]
    fn filtered_out_selection_is_cleared() {
        let mut model = ViewModel::new(snapshot(TWO_MARKETS), &settings(ViewMode::Zone));
        model.set_selected(Some("0xb:no".to_owned()));
        model.min_stake = 1_000.0;
        model.rebuild_entities();
        assert_eq!(model.selected, None);
    }

    #[test]
    fn refresh_keeps_market_and_live_positions() {
        let mut model = ViewModel::new(snapshot(TWO_MARKETS), &settings(ViewMode::Live));
        model.select_market("m1".to_owned());
        model.set_container(Container::new(800.0, 600.0));
        let before = model.live.bubble("0xa:yes").cloned().expect("placed");

        model.apply_snapshot(snapshot(TWO_MARKETS));
        assert_eq!(model.market_id.as_deref(), Some("m1"));
        let after = model.live.bubble("0xa:yes").expect("still placed");
        assert_eq!(after.position, before.position);
    }

    #[test]
    fn refresh_without_current_market_falls_back_to_first() {
        let mut model = ViewModel::new(snapshot(TWO_MARKETS), &settings(ViewMode::Zone));
        model.select_market("m2".to_owned());
        model.apply_snapshot(snapshot(
            r#"{"markets": [{"id": "m3", "positions": []}]}"#,
        ));
        assert_eq!(model.market_id.as_deref(), Some("m3"));
        assert!(model.entities.is_empty());
    }

    #[test]
    fn zone_layout_is_cached_until_input_changes() {
        let mut model = ViewModel::new(snapshot(TWO_MARKETS), &settings(ViewMode::Zone));
        assert!(model.zone_result().is_empty());

        model.set_container(Container::new(900.0, 600.0));
        let first = model.zone_result().bubbles.clone();
        assert_eq!(first.len(), 3);
        assert_eq!(model.zone_result().bubbles, first);

        model.seed += 1;
        let key = model.zone_cache.as_ref().map(|cache| cache.key);
        model.zone_result();
        assert_ne!(model.zone_cache.as_ref().map(|cache| cache.key), key);
    }

    #[test]
    fn ticker_only_runs_in_animated_live_mode() {
        let mut model = ViewModel::new(snapshot(TWO_MARKETS), &settings(ViewMode::Zone));
        assert!(!model.ticker.is_running());

        model.set_mode(ViewMode::Live);
        assert!(model.ticker.is_running());

        model.animate = false;
        model.sync_ticker();
        assert!(!model.ticker.is_running());

        model.animate = true;
        model.sync_ticker();
        model.set_mode(ViewMode::Zone);
        assert!(!model.ticker.is_running());
        assert!(!model.advance_live(1.0));
    }
}
