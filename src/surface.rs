//! The display surface: connection, window and graphics context.
//!
//! [`DisplaySurface`] is everything the dispatcher is allowed to ask of the
//! windowing system. [`X11Surface`] implements it on top of x11rb.

use crate::config::WindowConfig;
use crate::event::{CloseProtocol, WindowEvent};
use crate::image::Image;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, ConfigureWindowAux, ConnectionExt, CreateGCAux,
    CreateWindowAux, Cursor, EventMask, Font, Gcontext, ImageFormat, ImageOrder, PropMode,
    Window, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

/// Fixed part of a PutImage request, in bytes.
const PUT_IMAGE_HEADER: usize = 24;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        WM_PROTOCOLS,
        WM_DELETE_WINDOW,
        _NET_WM_NAME,
        UTF8_STRING,
    }
}

fn event_mask() -> EventMask {
    EventMask::EXPOSURE
        | EventMask::KEY_PRESS
        | EventMask::BUTTON_PRESS
        | EventMask::POINTER_MOTION
        | EventMask::STRUCTURE_NOTIFY
        | EventMask::FOCUS_CHANGE
        | EventMask::VISIBILITY_CHANGE
        | EventMask::ENTER_WINDOW
        | EventMask::LEAVE_WINDOW
}

/// Pointer shapes from the core cursor font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorShape {
    Default,
    Hand,
    Crosshair,
    Watch,
}

impl CursorShape {
    /// Glyph index in the "cursor" font, `None` for the inherited cursor.
    fn glyph(self) -> Option<u16> {
        match self {
            CursorShape::Default => None,
            CursorShape::Hand => Some(60),
            CursorShape::Crosshair => Some(34),
            CursorShape::Watch => Some(150),
        }
    }
}

impl FromStr for CursorShape {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(CursorShape::Default),
            "hand" => Ok(CursorShape::Hand),
            "crosshair" => Ok(CursorShape::Crosshair),
            "watch" => Ok(CursorShape::Watch),
            other => Err(anyhow!("unknown cursor {other:?}")),
        }
    }
}

pub trait DisplaySurface {
    /// Returns the next pending event without blocking.
    fn poll_event(&mut self) -> Result<Option<WindowEvent>>;
    fn blit(&mut self, image: &Image) -> Result<()>;
    fn move_to(&mut self, x: i32, y: i32) -> Result<()>;
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
    fn set_cursor(&mut self, shape: CursorShape) -> Result<()>;
    /// Tears the window down. Further calls are no-ops.
    fn destroy(&mut self) -> Result<()>;
}

pub struct X11Surface {
    conn: RustConnection,
    window: Window,
    gc: Gcontext,
    depth: u8,
    byte_order: ImageOrder,
    atoms: Atoms,
    cursor_font: Option<Font>,
    cursors: HashMap<CursorShape, Cursor>,
    destroyed: bool,
}

impl X11Surface {
    /// Connects and maps the top-level window described by `config`.
    pub fn open(display: Option<&str>, config: &WindowConfig) -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(display).context("failed to connect to X display")?;
        // Resolve BIG-REQUESTS now so the first blit does not wait on it.
        conn.prefetch_maximum_request_bytes();

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let depth = screen.root_depth;
        let visual = screen.root_visual;
        let white = screen.white_pixel;
        let black = screen.black_pixel;
        let byte_order = conn.setup().image_byte_order;

        if depth != 24 && depth != 32 {
            warn!(depth, "root depth is not 24/32, image uploads may look wrong");
        }

        let atoms = Atoms::new(&conn)?.reply().context("failed to intern atoms")?;

        let window = conn.generate_id()?;
        conn.create_window(
            depth,
            window,
            root,
            config.x,
            config.y,
            config.width,
            config.height,
            config.border_width,
            WindowClass::INPUT_OUTPUT,
            visual,
            &CreateWindowAux::new()
                .background_pixel(white)
                .border_pixel(black)
                .event_mask(event_mask()),
        )?;

        conn.change_property32(
            PropMode::REPLACE,
            window,
            atoms.WM_PROTOCOLS,
            AtomEnum::ATOM,
            &[atoms.WM_DELETE_WINDOW],
        )?;

        let gc = conn.generate_id()?;
        conn.create_gc(gc, window, &CreateGCAux::new())?;

        let mut surface = Self {
            conn,
            window,
            gc,
            depth,
            byte_order,
            atoms,
            cursor_font: None,
            cursors: HashMap::new(),
            destroyed: false,
        };
        surface.set_title(&config.title)?;
        surface.conn.map_window(window)?;
        surface.conn.flush()?;

        debug!(window, depth, "window created");
        Ok(surface)
    }

    /// Atoms identifying a window manager close request for this window.
    pub fn close_protocol(&self) -> CloseProtocol {
        CloseProtocol {
            wm_protocols: self.atoms.WM_PROTOCOLS,
            wm_delete_window: self.atoms.WM_DELETE_WINDOW,
        }
    }

    pub fn connection(&self) -> &RustConnection {
        &self.conn
    }

    fn cursor(&mut self, shape: CursorShape) -> Result<Cursor> {
        let Some(glyph) = shape.glyph() else {
            return Ok(x11rb::NONE);
        };
        if let Some(&cursor) = self.cursors.get(&shape) {
            return Ok(cursor);
        }

        let font = match self.cursor_font {
            Some(font) => font,
            None => {
                let font = self.conn.generate_id()?;
                self.conn.open_font(font, b"cursor")?;
                self.cursor_font = Some(font);
                font
            }
        };

        let cursor = self.conn.generate_id()?;
        self.conn.create_glyph_cursor(
            cursor,
            font,
            font,
            glyph,
            glyph + 1,
            0,
            0,
            0,
            0xffff,
            0xffff,
            0xffff,
        )?;
        self.cursors.insert(shape, cursor);
        Ok(cursor)
    }
}

impl DisplaySurface for X11Surface {
    fn poll_event(&mut self) -> Result<Option<WindowEvent>> {
        let Some(event) = self
            .conn
            .poll_for_event()
            .context("lost connection to X server")?
        else {
            return Ok(None);
        };
        if let Event::Error(err) = &event {
            warn!(?err, "X11 error");
        }
        Ok(Some(WindowEvent::from_x11(event, self.close_protocol())))
    }

    fn blit(&mut self, image: &Image) -> Result<()> {
        if image.is_empty() {
            return Ok(());
        }
        let width = u16::try_from(image.width).context("image too wide")?;
        let stride = image.width as usize * 4;
        let data = encode_pixels(image, self.byte_order);

        let budget = self.conn.maximum_request_bytes().saturating_sub(PUT_IMAGE_HEADER);
        let band_rows = (budget / stride).max(1);

        for (band, rows) in data.chunks(stride * band_rows).enumerate() {
            let y = i16::try_from(band * band_rows).context("image too tall")?;
            let height = (rows.len() / stride) as u16;
            self.conn.put_image(
                ImageFormat::Z_PIXMAP,
                self.window,
                self.gc,
                width,
                height,
                0,
                y,
                0,
                self.depth,
                rows,
            )?;
        }
        self.conn.flush()?;
        Ok(())
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
        self.conn
            .configure_window(self.window, &ConfigureWindowAux::new().x(x).y(y))?;
        self.conn.flush()?;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            bail!("cannot resize to {width}x{height}");
        }
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new().width(width).height(height),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        self.conn.change_property8(
            PropMode::REPLACE,
            self.window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            title.as_bytes(),
        )?;
        self.conn.change_property8(
            PropMode::REPLACE,
            self.window,
            self.atoms._NET_WM_NAME,
            self.atoms.UTF8_STRING,
            title.as_bytes(),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn set_cursor(&mut self, shape: CursorShape) -> Result<()> {
        let cursor = self.cursor(shape)?;
        self.conn.change_window_attributes(
            self.window,
            &ChangeWindowAttributesAux::new().cursor(cursor),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;

        for (_, cursor) in self.cursors.drain() {
            self.conn.free_cursor(cursor)?;
        }
        if let Some(font) = self.cursor_font.take() {
            self.conn.close_font(font)?;
        }
        self.conn.free_gc(self.gc)?;
        self.conn.destroy_window(self.window)?;
        self.conn.flush()?;
        debug!(window = self.window, "window destroyed");
        Ok(())
    }
}

/// RGBA to the 32 bits per pixel ZPixmap layout of the server.
fn encode_pixels(image: &Image, order: ImageOrder) -> Vec<u8> {
    let mut out = Vec::with_capacity(image.pixels.len());
    for px in image.pixels.chunks_exact(4) {
        let (r, g, b, a) = (px[0], px[1], px[2], px[3]);
        if order == ImageOrder::LSB_FIRST {
            out.extend_from_slice(&[b, g, r, a]);
        } else {
            out.extend_from_slice(&[a, r, g, b]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_lsb_first_is_bgra() {
        let image = Image::filled(2, 1, [1, 2, 3, 4]);
        assert_eq!(
            encode_pixels(&image, ImageOrder::LSB_FIRST),
            vec![3, 2, 1, 4, 3, 2, 1, 4]
        );
    }

    #[test]
    fn test_encode_msb_first_is_argb() {
        let image = Image::filled(1, 1, [1, 2, 3, 4]);
        assert_eq!(encode_pixels(&image, ImageOrder::MSB_FIRST), vec![4, 1, 2, 3]);
    }

    #[test]
    fn test_cursor_names() {
        assert_eq!("hand".parse::<CursorShape>().unwrap(), CursorShape::Hand);
        assert_eq!("default".parse::<CursorShape>().unwrap().glyph(), None);
        assert!("arrow".parse::<CursorShape>().is_err());
    }

    #[test]
    fn test_event_mask_covers_required_categories() {
        let mask = u32::from(event_mask());
        for bit in [
            EventMask::EXPOSURE,
            EventMask::KEY_PRESS,
            EventMask::BUTTON_PRESS,
            EventMask::POINTER_MOTION,
            EventMask::STRUCTURE_NOTIFY,
            EventMask::FOCUS_CHANGE,
            EventMask::VISIBILITY_CHANGE,
            EventMask::ENTER_WINDOW,
            EventMask::LEAVE_WINDOW,
        ] {
            assert_ne!(mask & u32::from(bit), 0);
        }
    }
}
