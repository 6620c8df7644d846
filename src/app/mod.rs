use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eframe::egui::{self, Context};
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::bubbles::live::LiveField;
use crate::bubbles::ticker::Ticker;
use crate::bubbles::zone::{LayoutResult, ZoneLayout};
use crate::bubbles::{Container, Entity, Side};
use crate::config::LayoutConfig;
use crate::positions::{Snapshot, TtlCache, WalletStake, load_snapshot};

mod canvas;
mod model;
mod render_utils;
mod ui;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ViewMode {
    /// Radial tier zones, recomputed on every refresh.
    Zone,
    /// Animated side and size quadrants.
    Live,
}

impl ViewMode {
    fn label(self) -> &'static str {
        match self {
            Self::Zone => "Zones",
            Self::Live => "Live",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SideFilter {
    Both,
    Only(Side),
}

impl SideFilter {
    fn allows(self, side: Side) -> bool {
        match self {
            Self::Both => true,
            Self::Only(only) => only == side,
        }
    }
}

pub struct AppSettings {
    pub snapshot_path: PathBuf,
    pub layout: LayoutConfig,
    pub seed: u64,
    pub mode: ViewMode,
}

type LoadResult = Result<Snapshot, String>;

pub struct BubbleMapApp {
    settings: AppSettings,
    cache: TtlCache<PathBuf, Arc<Snapshot>>,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    snapshot: Arc<Snapshot>,
    loaded_at: Instant,
    refresh_error: Option<String>,
    market_id: Option<String>,
    mode: ViewMode,
    side_filter: SideFilter,
    min_stake: f64,
    stake_ceiling: f64,
    search: String,
    selected: Option<String>,
    seed: u64,
    stakes: Vec<WalletStake>,
    stake_index: HashMap<String, usize>,
    entities: Vec<Entity>,
    entities_revision: u64,
    container: Container,
    zone: ZoneLayout,
    zone_cache: Option<ZoneCache>,
    live: LiveField<StdRng>,
    ticker: Ticker,
    animate: bool,
    search_match_cache: Option<SearchMatchCache>,
    ranking_rows_visible: usize,
}

struct ZoneCache {
    key: ZoneCacheKey,
    result: LayoutResult,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ZoneCacheKey {
    entities_revision: u64,
    container: Container,
    seed: u64,
}

struct SearchMatchCache {
    query: String,
    entities_revision: u64,
    matches: Arc<HashSet<String>>,
}

impl BubbleMapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let cache = TtlCache::new(settings.layout.refresh.interval());
        let state = Self::start_load(settings.snapshot_path.clone());
        Self {
            settings,
            cache,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(path: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_snapshot(&path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(path: PathBuf) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(path),
        }
    }

    fn store(&mut self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.cache
            .insert(self.settings.snapshot_path.clone(), Arc::clone(&snapshot));
        snapshot
    }

    /// Polls the background refresh and starts a new one once the cached
    /// snapshot has expired or a reload was requested.
    fn refresh_ready(&mut self, reload_requested: bool) {
        let path = self.settings.snapshot_path.clone();

        if reload_requested {
            self.cache.invalidate(&path);
        }
        if self.reload_rx.is_none() && self.cache.get(&path).is_none() {
            let purged = self.cache.purge_expired();
            info!(
                path = %path.display(),
                manual = reload_requested,
                purged,
                cached = self.cache.len(),
                "refreshing snapshot"
            );
            self.reload_rx = Some(Self::spawn_load(path.clone()));
        }

        let Some(rx) = self.reload_rx.take() else {
            return;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => {
                self.reload_rx = Some(rx);
                return;
            }
            Err(TryRecvError::Disconnected) => Err("Background load worker disconnected".to_owned()),
        };

        match result {
            Ok(snapshot) => {
                let snapshot = self.store(snapshot);
                if let AppState::Ready(model) = &mut self.state {
                    model.apply_snapshot(snapshot);
                }
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "snapshot refresh failed");
                // Keep serving the previous snapshot until the next interval.
                if let AppState::Ready(model) = &mut self.state {
                    self.cache.insert(path, Arc::clone(&model.snapshot));
                    model.refresh_error = Some(error);
                }
            }
        }
    }
}

impl eframe::App for BubbleMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(snapshot)) => {
                        let snapshot = self.store(snapshot);
                        let model = ViewModel::new(snapshot, &self.settings);
                        transition = Some(AppState::Ready(Box::new(model)));
                    }
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error(
                            "Background load worker disconnected".to_owned(),
                        ));
                    }
                    Err(TryRecvError::Empty) => {}
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading wallet positions...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load wallet positions");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        self.cache.clear();
                        transition = Some(Self::start_load(self.settings.snapshot_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(
                    ctx,
                    &self.settings.snapshot_path,
                    &mut reload_requested,
                    is_reloading,
                );
                self.refresh_ready(reload_requested);

                let wait = if self.reload_rx.is_some() {
                    Duration::from_millis(100)
                } else {
                    self.cache
                        .remaining(&self.settings.snapshot_path)
                        .unwrap_or(Duration::ZERO)
                        .min(Duration::from_secs(1))
                };
                ctx.request_repaint_after(wait);
            }
        }

        if let Some(next_state) = transition {
            if let AppState::Ready(model) = &mut self.state {
                model.ticker.stop();
            }
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
