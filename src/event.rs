//! Window events, decoded once from the X11 protocol stream.
//!
//! Everything downstream of the surface sees only [`WindowEvent`]; raw
//! protocol structures never leave this module.

use std::fmt;
use x11rb::protocol::xproto::{self, Atom};
use x11rb::protocol::Event;

/// Last known size of the window's drawable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    FullyVisible,
    PartiallyObscured,
    FullyObscured,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::FullyVisible => "fully visible",
            Visibility::PartiallyObscured => "partially obscured",
            Visibility::FullyObscured => "fully obscured",
        })
    }
}

impl From<xproto::Visibility> for Visibility {
    fn from(state: xproto::Visibility) -> Self {
        if state == xproto::Visibility::UNOBSCURED {
            Visibility::FullyVisible
        } else if state == xproto::Visibility::PARTIALLY_OBSCURED {
            Visibility::PartiallyObscured
        } else {
            Visibility::FullyObscured
        }
    }
}

/// A key press as delivered by the server, before text decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub keycode: u8,
    /// Raw modifier/button mask from the event.
    pub state: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPress {
    pub button: u8,
    pub x: i16,
    pub y: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    KeyPress(KeyPress),
    ButtonPress(ButtonPress),
    PointerMotion { x: i16, y: i16 },
    Configure(Geometry),
    Expose(Geometry),
    CloseRequest,
    VisibilityChanged(Visibility),
    Enter { x: i16, y: i16 },
    Leave { x: i16, y: i16 },
    FocusIn,
    FocusOut,
    Map,
    Unmap,
    /// Anything not listed above. Dropped by the dispatcher.
    Other,
}

/// Atoms needed to recognise a window manager close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseProtocol {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
}

impl WindowEvent {
    pub fn from_x11(event: Event, close: CloseProtocol) -> Self {
        match event {
            Event::KeyPress(e) => WindowEvent::KeyPress(KeyPress {
                keycode: e.detail,
                state: u16::from(e.state),
            }),
            Event::ButtonPress(e) => WindowEvent::ButtonPress(ButtonPress {
                button: e.detail,
                x: e.event_x,
                y: e.event_y,
            }),
            Event::MotionNotify(e) => WindowEvent::PointerMotion {
                x: e.event_x,
                y: e.event_y,
            },
            Event::ConfigureNotify(e) => {
                WindowEvent::Configure(Geometry::new(e.width.into(), e.height.into()))
            }
            Event::Expose(e) => WindowEvent::Expose(Geometry::new(e.width.into(), e.height.into())),
            Event::ClientMessage(e)
                if e.format == 32
                    && e.type_ == close.wm_protocols
                    && e.data.as_data32()[0] == close.wm_delete_window =>
            {
                WindowEvent::CloseRequest
            }
            Event::VisibilityNotify(e) => WindowEvent::VisibilityChanged(e.state.into()),
            Event::EnterNotify(e) => WindowEvent::Enter {
                x: e.event_x,
                y: e.event_y,
            },
            Event::LeaveNotify(e) => WindowEvent::Leave {
                x: e.event_x,
                y: e.event_y,
            },
            Event::FocusIn(_) => WindowEvent::FocusIn,
            Event::FocusOut(_) => WindowEvent::FocusOut,
            Event::MapNotify(_) => WindowEvent::Map,
            Event::UnmapNotify(_) => WindowEvent::Unmap,
            _ => WindowEvent::Other,
        }
    }
}
