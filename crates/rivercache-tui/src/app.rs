use rivercache_core::cache::ResourceKey;
use rivercache_core::models::{Resource, Station};
use rivercache_core::{Config, Dashboard, RiverFilter};
use tracing::warn;

// ============================================================================
// Constants
// ============================================================================

/// Number of items to scroll with PageUp/PageDown
pub const PAGE_SCROLL_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Panel with keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Stations,
    Weather,
    Alerts,
    Reports,
}

impl Panel {
    pub const ALL: [Panel; 4] = [Panel::Stations, Panel::Weather, Panel::Alerts, Panel::Reports];

    pub fn title(&self) -> &'static str {
        match self {
            Panel::Stations => "Stations",
            Panel::Weather => "Weather",
            Panel::Alerts => "Alerts",
            Panel::Reports => "Fishing Reports",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Panel::Stations => Panel::Weather,
            Panel::Weather => Panel::Alerts,
            Panel::Alerts => Panel::Reports,
            Panel::Reports => Panel::Stations,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Panel::Stations => Panel::Reports,
            Panel::Weather => Panel::Stations,
            Panel::Alerts => Panel::Weather,
            Panel::Reports => Panel::Alerts,
        }
    }
}

/// Option after (or before) `current` in `options`, wrapping around.
/// Unknown `current` starts from the first option.
pub fn cycle_option<'a>(options: &'a [String], current: &str, forward: bool) -> Option<&'a str> {
    if options.is_empty() {
        return None;
    }
    let len = options.len();
    let next = match options.iter().position(|o| o == current) {
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None => 0,
    };
    Some(&options[next])
}

fn clamp_selection(selection: usize, len: usize) -> usize {
    selection.min(len.saturating_sub(1))
}

pub struct App {
    pub state: AppState,
    pub focus: Panel,
    pub dashboard: Dashboard,
    config: Config,
    pub station_selection: usize,
    pub report_selection: usize,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(config: Config, dashboard: Dashboard) -> Self {
        Self {
            state: AppState::Normal,
            focus: Panel::Stations,
            dashboard,
            config,
            station_selection: 0,
            report_selection: 0,
            status_message: None,
        }
    }

    /// Apply pending cache updates. Called once per frame.
    pub fn tick(&mut self) {
        if self.dashboard.process_updates() > 0 {
            self.station_selection = clamp_selection(
                self.station_selection,
                self.dashboard.visible_stations().len(),
            );
            self.report_selection = clamp_selection(self.report_selection, self.reports_len());
        }
    }

    fn reports_len(&self) -> usize {
        self.dashboard
            .fishing_reports()
            .data
            .as_ref()
            .and_then(Resource::as_fishing_reports)
            .map_or(0, |r| r.len())
    }

    pub fn selected_station(&self) -> Option<&Station> {
        self.dashboard.visible_stations().get(self.station_selection)
    }

    pub fn move_selection(&mut self, delta: isize) {
        let (selection, len) = match self.focus {
            Panel::Stations => (
                &mut self.station_selection,
                self.dashboard.visible_stations().len(),
            ),
            Panel::Reports => {
                let len = self.reports_len();
                (&mut self.report_selection, len)
            }
            Panel::Weather | Panel::Alerts => return,
        };
        let moved = if delta.is_negative() {
            selection.saturating_sub(delta.unsigned_abs())
        } else {
            selection.saturating_add(delta as usize)
        };
        *selection = clamp_selection(moved, len);
    }

    /// Switch to the next (or previous) river and remember it.
    pub fn cycle_river(&mut self, forward: bool) {
        let options = self.dashboard.river_options();
        let current = self
            .dashboard
            .filter()
            .as_option()
            .unwrap_or_else(|| "all".to_string());
        let Some(choice) = cycle_option(&options, &current, forward) else {
            return;
        };

        let filter = RiverFilter::from_choice(choice);
        self.status_message = Some(format!("Showing {}", filter.label()));
        self.config.selected_river = filter.as_option();
        self.dashboard.set_filter(filter);
        self.station_selection = 0;

        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    pub fn refresh_all(&mut self) {
        let count = self.dashboard.refresh_all();
        self.status_message = Some(format!("Refreshing {} resources...", count));
    }

    /// Resource behind the focused panel; for stations, the selected
    /// station's readings when they failed, otherwise the list itself.
    pub fn focused_key(&self) -> ResourceKey {
        match self.focus {
            Panel::Stations => match self.selected_station() {
                Some(station) if self.dashboard.readings(&station.id).error.is_some() => {
                    ResourceKey::station(&station.id)
                }
                _ => ResourceKey::Stations,
            },
            Panel::Weather => self.dashboard.weather_key(),
            Panel::Alerts => ResourceKey::Alerts,
            Panel::Reports => ResourceKey::FishingReports,
        }
    }

    pub fn retry_focused(&mut self) {
        let key = self.focused_key();
        self.status_message = Some(format!("Retrying {}", key));
        self.dashboard.retry(&key);
    }
}

// ============================================================================
// Tests
// ============================================================================
