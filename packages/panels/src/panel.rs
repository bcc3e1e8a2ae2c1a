//! Panel state machine and its persisted preferences.
//!
//! ## Auto-collapse
//!
//! The controller watches which side of the breakpoint the viewport is on.
//! Crossing into narrow collapses an expanded panel and flags it as
//! automatic. Crossing back restores it only if it was auto-collapsed and
//! the last explicit preference was expanded (or never set). An explicit
//! collapse always wins.
//!
//! ## Storage keys
//!
//! ```text
//! panel.<id>.state     expanded | collapsed | floating | hidden
//! panel.<id>.width     number
//! panel.<id>.position  {"x": .., "y": ..}
//! ```

use crate::config::PanelConfig;
use crate::store::PreferenceStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    #[default]
    Expanded,
    Collapsed,
    Floating,
    Hidden,
}

impl PanelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelState::Expanded => "expanded",
            PanelState::Collapsed => "collapsed",
            PanelState::Floating => "floating",
            PanelState::Hidden => "hidden",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "expanded" => Some(PanelState::Expanded),
            "collapsed" => Some(PanelState::Collapsed),
            "floating" => Some(PanelState::Floating),
            "hidden" => Some(PanelState::Hidden),
            _ => None,
        }
    }

    /// Target of the collapse toggle
    pub fn toggled(&self) -> Self {
        match self {
            PanelState::Collapsed => PanelState::Expanded,
            PanelState::Expanded => PanelState::Collapsed,
            PanelState::Floating => PanelState::Collapsed,
            PanelState::Hidden => PanelState::Expanded,
        }
    }
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-left corner of a floating panel, in viewport px
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PanelPosition {
    pub x: f64,
    pub y: f64,
}

impl PanelPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub struct PanelController<S: PreferenceStore> {
    id: String,
    config: PanelConfig,
    store: S,
    state: PanelState,
    /// Last state the user chose explicitly
    preference: Option<PanelState>,
    auto_collapsed: bool,
    width: f64,
    resizing: bool,
    position: Option<PanelPosition>,
    /// Side of the breakpoint seen on the last viewport event
    narrow: Option<bool>,
}

impl<S: PreferenceStore> fmt::Debug for PanelController<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelController")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("preference", &self.preference)
            .field("auto_collapsed", &self.auto_collapsed)
            .field("width", &self.width)
            .field("position", &self.position)
            .finish()
    }
}

impl<S: PreferenceStore> PanelController<S> {
    /// Rebuild a panel from its stored preferences. Each value is read on its
    /// own; a missing or malformed one falls back to its default.
    pub fn restore(id: impl Into<String>, store: S, config: PanelConfig) -> Self {
        let id = id.into();

        let preference = store.get(&key(&id, "state")).and_then(|raw| {
            let parsed = PanelState::parse(&raw);
            if parsed.is_none() {
                warn!(panel = %id, value = %raw, "Malformed panel state, using default");
            }
            parsed
        });

        let width = match store.get(&key(&id, "width")) {
            None => config.clamp_width(config.default_width),
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(width) if width.is_finite() => config.clamp_width(width),
                _ => {
                    warn!(panel = %id, value = %raw, "Malformed panel width, using default");
                    config.clamp_width(config.default_width)
                }
            },
        };

        let position = store.get(&key(&id, "position")).and_then(|raw| {
            match serde_json::from_str::<PanelPosition>(&raw) {
                Ok(position) if position.x.is_finite() && position.y.is_finite() => Some(position),
                _ => {
                    warn!(panel = %id, value = %raw, "Malformed panel position, ignoring");
                    None
                }
            }
        });

        debug!(panel = %id, ?preference, width, "Restored panel");
        Self {
            state: preference.unwrap_or_default(),
            id,
            config,
            store,
            preference,
            auto_collapsed: false,
            width,
            resizing: false,
            position,
            narrow: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn preference(&self) -> Option<PanelState> {
        self.preference
    }

    pub fn is_auto_collapsed(&self) -> bool {
        self.auto_collapsed
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn is_resizing(&self) -> bool {
        self.resizing
    }

    pub fn position(&self) -> Option<PanelPosition> {
        self.position
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn persist(&mut self, field: &str, value: &str) {
        if let Err(error) = self.store.set(&key(&self.id, field), value) {
            warn!(panel = %self.id, field, %error, "Failed to persist panel preference");
        }
    }

    /// Explicit state change. Records and persists the preference.
    /// Returns true if the visible state changed.
    pub fn set_state(&mut self, state: PanelState) -> bool {
        let changed = self.state != state;
        self.state = state;
        self.preference = Some(state);
        self.auto_collapsed = false;
        if state != PanelState::Expanded && state != PanelState::Floating {
            self.resizing = false;
        }
        self.persist("state", state.as_str());
        debug!(panel = %self.id, %state, "Panel state set");
        changed
    }

    pub fn toggle_collapse(&mut self) -> PanelState {
        let next = self.state.toggled();
        self.set_state(next);
        next
    }

    /// Detach the panel, optionally placing it
    pub fn float(&mut self, position: Option<PanelPosition>) -> bool {
        if let Some(position) = position {
            self.set_position(position);
        }
        self.set_state(PanelState::Floating)
    }

    pub fn hide(&mut self) -> bool {
        self.set_state(PanelState::Hidden)
    }

    pub fn move_floating(&mut self, position: PanelPosition) -> bool {
        if self.state != PanelState::Floating {
            return false;
        }
        self.set_position(position);
        true
    }

    fn set_position(&mut self, position: PanelPosition) {
        self.position = Some(position);
        match serde_json::to_string(&position) {
            Ok(json) => self.persist("position", &json),
            Err(error) => warn!(panel = %self.id, %error, "Failed to encode panel position"),
        }
    }

    /// Feed a viewport width. Returns true if the state changed.
    pub fn on_viewport_resize(&mut self, viewport_width: f64) -> bool {
        let narrow = viewport_width < self.config.auto_collapse_breakpoint;
        if self.narrow == Some(narrow) {
            return false;
        }
        self.narrow = Some(narrow);

        if narrow {
            if self.state == PanelState::Expanded {
                self.state = PanelState::Collapsed;
                self.auto_collapsed = true;
                self.resizing = false;
                debug!(panel = %self.id, viewport_width, "Auto-collapsed panel");
                return true;
            }
            return false;
        }

        if !self.auto_collapsed {
            return false;
        }
        self.auto_collapsed = false;
        let wants_expanded = matches!(self.preference, None | Some(PanelState::Expanded));
        if self.state == PanelState::Collapsed && wants_expanded {
            self.state = PanelState::Expanded;
            debug!(panel = %self.id, viewport_width, "Restored auto-collapsed panel");
            return true;
        }
        false
    }

    /// Start a drag on the resize handle
    pub fn begin_resize(&mut self) -> bool {
        if !matches!(self.state, PanelState::Expanded | PanelState::Floating) {
            return false;
        }
        self.resizing = true;
        true
    }

    /// Follow the drag, clamped to the allowed range. Returns the live width.
    pub fn resize_to(&mut self, width: f64) -> f64 {
        if self.resizing && width.is_finite() {
            self.width = self.config.clamp_width(width);
        }
        self.width
    }

    /// Release the drag: snap to a nearby preset and persist
    pub fn end_resize(&mut self) -> Option<f64> {
        if !self.resizing {
            return None;
        }
        self.resizing = false;
        if let Some(preset) = self.config.snap_width(self.width) {
            self.width = self.config.clamp_width(preset);
        }
        let width = self.width;
        self.persist("width", &width.to_string());
        debug!(panel = %self.id, width, "Panel resized");
        Some(width)
    }
}

fn key(id: &str, field: &str) -> String {
    format!("panel.{}.{}", id, field)
}
