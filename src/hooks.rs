//! Optional handler behaviour that can be switched on without touching the
//! dispatch loop: pointer motion reports and per-button window actions.

use crate::surface::CursorShape;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::str::FromStr;

/// Something a button press can do to the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Move { x: i32, y: i32 },
    Resize { width: u32, height: u32 },
    Title(String),
    Cursor(CursorShape),
}

impl FromStr for ButtonAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, arg) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("expected ACTION:ARG, got {s:?}"))?;
        match kind {
            "move" => {
                let (x, y) = arg
                    .split_once(',')
                    .ok_or_else(|| anyhow!("move expects X,Y"))?;
                Ok(ButtonAction::Move {
                    x: x.trim().parse().context("invalid x")?,
                    y: y.trim().parse().context("invalid y")?,
                })
            }
            "resize" => {
                let (w, h) = arg
                    .split_once('x')
                    .ok_or_else(|| anyhow!("resize expects WxH"))?;
                let width: u32 = w.trim().parse().context("invalid width")?;
                let height: u32 = h.trim().parse().context("invalid height")?;
                if width == 0 || height == 0 {
                    bail!("resize needs a non-zero size");
                }
                Ok(ButtonAction::Resize { width, height })
            }
            "title" => Ok(ButtonAction::Title(arg.to_string())),
            "cursor" => Ok(ButtonAction::Cursor(arg.parse()?)),
            other => bail!("unknown button action {other:?}"),
        }
    }
}

/// `BUTTON=ACTION`, e.g. `3=resize:640x480`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonBinding {
    pub button: u8,
    pub action: ButtonAction,
}

impl FromStr for ButtonBinding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (button, action) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected BUTTON=ACTION, got {s:?}"))?;
        Ok(Self {
            button: button.trim().parse().context("invalid button number")?,
            action: action.parse()?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Hooks {
    report_motion: bool,
    buttons: HashMap<u8, ButtonAction>,
}

impl Hooks {
    pub fn with_motion_reports(mut self, enabled: bool) -> Self {
        self.report_motion = enabled;
        self
    }

    pub fn bind(&mut self, button: u8, action: ButtonAction) {
        self.buttons.insert(button, action);
    }

    pub fn reports_motion(&self) -> bool {
        self.report_motion
    }

    pub fn action_for(&self, button: u8) -> Option<&ButtonAction> {
        self.buttons.get(&button)
    }
}
