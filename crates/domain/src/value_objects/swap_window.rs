//! Swap windows for cantrips and spells.
//!
//! A window opens on a class level increase or a completed long rest and
//! admits one swap per kind. Committing a swap records a marker for the
//! window's event id so the same window never opens twice.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::rule_set::SwapMode;

/// What is being swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapKind {
    Cantrip,
    Spell,
}

impl fmt::Display for SwapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cantrip => write!(f, "cantrip"),
            Self::Spell => write!(f, "spell"),
        }
    }
}

/// State of a class's swap window for one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "event", rename_all = "camelCase")]
pub enum SwapWindow {
    Closed,
    OpenForLevelUp(u8),
    OpenForLongRest(String),
}

impl SwapWindow {
    pub fn is_open(&self) -> bool {
        !matches!(self, SwapWindow::Closed)
    }

    /// Window for `mode` given lifecycle facts and the consumed markers.
    pub fn resolve(mode: SwapMode, lifecycle: &Lifecycle, markers: &WindowMarkers) -> Self {
        match mode {
            SwapMode::None => SwapWindow::Closed,
            SwapMode::LevelUp => match lifecycle.level_up() {
                Some(level) if !markers.level_up.contains(&level) => {
                    SwapWindow::OpenForLevelUp(level)
                }
                _ => SwapWindow::Closed,
            },
            SwapMode::LongRest => match &lifecycle.long_rest {
                Some(id) if !markers.long_rest.contains(id) => {
                    SwapWindow::OpenForLongRest(id.clone())
                }
                _ => SwapWindow::Closed,
            },
        }
    }
}

/// Lifecycle facts for one class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lifecycle {
    pub class_level: u8,
    /// Level recorded when the class was first detected
    pub baseline_level: Option<u8>,
    /// Id of the last completed, not yet cleared long rest
    pub long_rest: Option<String>,
}

impl Lifecycle {
    /// Level whose level-up window may be open.
    pub fn level_up(&self) -> Option<u8> {
        self.baseline_level
            .filter(|baseline| self.class_level > *baseline)
            .map(|_| self.class_level)
    }

    pub fn is_level_up(&self) -> bool {
        self.level_up().is_some()
    }

    pub fn is_long_rest(&self) -> bool {
        self.long_rest.is_some()
    }
}

/// Consumed window markers for one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowMarkers {
    #[serde(default)]
    pub level_up: Vec<u8>,
    #[serde(default)]
    pub long_rest: Vec<String>,
}

/// Consumed markers for both kinds of one class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTracking {
    #[serde(default)]
    pub cantrip: WindowMarkers,
    #[serde(default)]
    pub spell: WindowMarkers,
}

impl SwapTracking {
    pub fn markers(&self, kind: SwapKind) -> &WindowMarkers {
        match kind {
            SwapKind::Cantrip => &self.cantrip,
            SwapKind::Spell => &self.spell,
        }
    }

    pub fn window(&self, kind: SwapKind, mode: SwapMode, lifecycle: &Lifecycle) -> SwapWindow {
        SwapWindow::resolve(mode, lifecycle, self.markers(kind))
    }

    /// Record that a window was used. Returns false when there was nothing
    /// to record.
    pub fn consume(&mut self, kind: SwapKind, window: &SwapWindow) -> bool {
        let markers = match kind {
            SwapKind::Cantrip => &mut self.cantrip,
            SwapKind::Spell => &mut self.spell,
        };
        match window {
            SwapWindow::Closed => false,
            SwapWindow::OpenForLevelUp(level) => {
                if markers.level_up.contains(level) {
                    return false;
                }
                markers.level_up.push(*level);
                true
            }
            SwapWindow::OpenForLongRest(id) => {
                if markers.long_rest.contains(id) {
                    return false;
                }
                markers.long_rest.push(id.clone());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle(level: u8, baseline: Option<u8>, rest: Option<&str>) -> Lifecycle {
        Lifecycle {
            class_level: level,
            baseline_level: baseline,
            long_rest: rest.map(String::from),
        }
    }

    #[test]
    fn level_up_opens_above_baseline() {
        let markers = WindowMarkers::default();
        assert_eq!(
            SwapWindow::resolve(SwapMode::LevelUp, &lifecycle(5, Some(4), None), &markers),
            SwapWindow::OpenForLevelUp(5)
        );
        assert_eq!(
            SwapWindow::resolve(SwapMode::LevelUp, &lifecycle(4, Some(4), None), &markers),
            SwapWindow::Closed
        );
        assert_eq!(
            SwapWindow::resolve(SwapMode::LevelUp, &lifecycle(4, None, None), &markers),
            SwapWindow::Closed
        );
    }

    #[test]
    fn consumed_window_closes() {
        let mut tracking = SwapTracking::default();
        let life = lifecycle(3, Some(3), Some("rest-1"));
        let window = tracking.window(SwapKind::Cantrip, SwapMode::LongRest, &life);
        assert_eq!(window, SwapWindow::OpenForLongRest("rest-1".into()));
        assert!(tracking.consume(SwapKind::Cantrip, &window));
        assert!(!tracking.consume(SwapKind::Cantrip, &window));
        assert_eq!(
            tracking.window(SwapKind::Cantrip, SwapMode::LongRest, &life),
            SwapWindow::Closed
        );
        // the other kind keeps its own window
        assert!(tracking.window(SwapKind::Spell, SwapMode::LongRest, &life).is_open());
    }

    #[test]
    fn new_rest_reopens() {
        let mut tracking = SwapTracking::default();
        tracking.consume(SwapKind::Spell, &SwapWindow::OpenForLongRest("rest-1".into()));
        let window = tracking.window(SwapKind::Spell, SwapMode::LongRest, &lifecycle(3, None, Some("rest-2")));
        assert_eq!(window, SwapWindow::OpenForLongRest("rest-2".into()));
    }

    #[test]
    fn none_mode_never_opens() {
        let life = lifecycle(9, Some(1), Some("r"));
        assert_eq!(
            SwapWindow::resolve(SwapMode::None, &life, &WindowMarkers::default()),
            SwapWindow::Closed
        );
    }

    #[test]
    fn tracking_round_trips_flag_layout() {
        let json = r#"{"cantrip": {"levelUp": [4], "longRest": []}, "spell": {"longRest": ["r1"]}}"#;
        let tracking: SwapTracking = serde_json::from_str(json).unwrap();
        assert_eq!(tracking.cantrip.level_up, vec![4]);
        assert_eq!(tracking.spell.long_rest, vec!["r1".to_string()]);
    }
}
