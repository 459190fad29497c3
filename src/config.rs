//! Compile-time window parameters and the runtime settings built from the CLI.

use crate::hooks::{ButtonBinding, Hooks};
use std::time::Duration;

/// Initial window position on the root window.
pub const WINDOW_X: i16 = 10;
pub const WINDOW_Y: i16 = 10;

/// Initial window size, also the geometry assumed before the first configure.
pub const WINDOW_WIDTH: u16 = 400;
pub const WINDOW_HEIGHT: u16 = 300;

pub const BORDER_WIDTH: u16 = 1;
pub const WINDOW_TITLE: &str = "Hello, World!";

/// Close requests are ignored until this many have been received.
pub const CLOSE_THRESHOLD: u32 = 3;

/// Cadence of the heartbeat repaint.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How long an idle loop iteration sleeps before polling again.
pub const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// RGBA fill used by the placeholder image generator.
pub const FILL_COLOR: [u8; 4] = [0, 255, 0, 255];

/// Properties applied when the top-level window is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            x: WINDOW_X,
            y: WINDOW_Y,
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            border_width: BORDER_WIDTH,
            title: WINDOW_TITLE.to_string(),
        }
    }
}

/// Everything the process needs to start, after command line parsing.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// X display name, `None` defers to the connection library's default.
    pub display: Option<String>,
    pub window: WindowConfig,
    pub report_motion: bool,
    pub bindings: Vec<ButtonBinding>,
}

impl Settings {
    pub fn hooks(&self) -> Hooks {
        let mut hooks = Hooks::default().with_motion_reports(self.report_motion);
        for binding in &self.bindings {
            hooks.bind(binding.button, binding.action.clone());
        }
        hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::ButtonAction;

    #[test]
    fn test_default_window_matches_constants() {
        let window = WindowConfig::default();
        assert_eq!((window.x, window.y), (10, 10));
        assert_eq!((window.width, window.height), (400, 300));
        assert_eq!(window.border_width, 1);
        assert_eq!(window.title, "Hello, World!");
    }

    #[test]
    fn test_default_settings_leave_hooks_silent() {
        let hooks = Settings::default().hooks();
        assert!(!hooks.reports_motion());
        assert!(hooks.action_for(1).is_none());
    }

    #[test]
    fn test_settings_bindings_reach_hooks() {
        let settings = Settings {
            report_motion: true,
            bindings: vec!["3=resize:640x480".parse().unwrap()],
            ..Default::default()
        };
        let hooks = settings.hooks();
        assert!(hooks.reports_motion());
        assert_eq!(
            hooks.action_for(3),
            Some(&ButtonAction::Resize {
                width: 640,
                height: 480
            })
        );
    }
}
