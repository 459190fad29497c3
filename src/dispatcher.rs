//! The event loop.
//!
//! Each iteration checks the heartbeat first, then polls the surface for at
//! most one event and routes it to its handler. Handlers never block, and
//! the only way out of [`Dispatcher::run`] is the close threshold being
//! exceeded (or the connection failing underneath us).

use crate::close::{CloseGuard, CloseState};
use crate::config::{IDLE_SLEEP, TICK_INTERVAL, WINDOW_HEIGHT, WINDOW_WIDTH};
use crate::event::{ButtonPress, Geometry, KeyPress, Visibility, WindowEvent};
use crate::hooks::{ButtonAction, Hooks};
use crate::image::ImageGenerator;
use crate::input::TextDecoder;
use crate::surface::DisplaySurface;
use crate::tick::Ticker;
use anyhow::Result;
use std::fmt;
use std::io::Write;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Heartbeat repaint.
    Ticked,
    /// One event dispatched.
    Handled,
    /// Nothing was ready.
    Idle,
    /// Window torn down, stop looping.
    Closed,
}

pub struct Dispatcher<S, G, W> {
    surface: S,
    generator: G,
    decoder: TextDecoder,
    hooks: Hooks,
    geometry: Geometry,
    close: CloseGuard,
    visibility: Option<Visibility>,
    ticker: Ticker,
    out: W,
}

impl<S, G, W> Dispatcher<S, G, W>
where
    S: DisplaySurface,
    G: ImageGenerator,
    W: Write,
{
    pub fn new(surface: S, generator: G, decoder: TextDecoder, hooks: Hooks, out: W) -> Self {
        Self::starting_at(surface, generator, decoder, hooks, out, Instant::now())
    }

    /// Like [`Dispatcher::new`] with the heartbeat anchored at `start`.
    pub fn starting_at(
        surface: S,
        generator: G,
        decoder: TextDecoder,
        hooks: Hooks,
        out: W,
        start: Instant,
    ) -> Self {
        Self {
            surface,
            generator,
            decoder,
            hooks,
            geometry: Geometry::new(WINDOW_WIDTH.into(), WINDOW_HEIGHT.into()),
            close: CloseGuard::default(),
            visibility: None,
            ticker: Ticker::new(TICK_INTERVAL, start),
            out,
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn close_attempts(&self) -> u32 {
        self.close.attempts()
    }

    #[cfg(test)]
    pub fn visibility(&self) -> Option<Visibility> {
        self.visibility
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_parts(self) -> (S, W) {
        (self.surface, self.out)
    }

    /// Loops until the window has been closed.
    pub fn run(&mut self) -> Result<()> {
        info!(geometry = %self.geometry, "entering event loop");
        loop {
            match self.step(Instant::now())? {
                Step::Closed => return Ok(()),
                Step::Idle => std::thread::sleep(IDLE_SLEEP),
                Step::Ticked | Step::Handled => {}
            }
        }
    }

    /// One iteration: heartbeat first, else at most one event.
    pub fn step(&mut self, now: Instant) -> Result<Step> {
        if self.close.is_closing() {
            return Ok(Step::Closed);
        }
        if self.ticker.poll(now) {
            trace!(geometry = %self.geometry, "tick");
            self.repaint();
            return Ok(Step::Ticked);
        }
        match self.surface.poll_event()? {
            Some(event) => self.dispatch(event),
            None => Ok(Step::Idle),
        }
    }

    pub fn dispatch(&mut self, event: WindowEvent) -> Result<Step> {
        match event {
            WindowEvent::Configure(geometry) | WindowEvent::Expose(geometry) => {
                self.on_resize(geometry)
            }
            WindowEvent::KeyPress(key) => self.on_key(key),
            WindowEvent::ButtonPress(button) => self.on_button(button),
            WindowEvent::PointerMotion { x, y } => {
                if self.hooks.reports_motion() {
                    self.report(format_args!("Pointer moved to ({x}, {y})"));
                }
            }
            WindowEvent::CloseRequest => return Ok(self.on_close_request()),
            WindowEvent::VisibilityChanged(visibility) => {
                self.visibility = Some(visibility);
                self.report(format_args!("Visibility: {visibility}"));
            }
            WindowEvent::Enter { x, y } => {
                self.report(format_args!("Pointer entered window at ({x}, {y})"))
            }
            WindowEvent::Leave { x, y } => {
                self.report(format_args!("Pointer left window at ({x}, {y})"))
            }
            WindowEvent::FocusIn => self.report(format_args!("Focus in")),
            WindowEvent::FocusOut => self.report(format_args!("Focus out")),
            WindowEvent::Map => self.report(format_args!("Window mapped")),
            WindowEvent::Unmap => self.report(format_args!("Window unmapped")),
            WindowEvent::Other => {}
        }
        Ok(Step::Handled)
    }

    /// Writes one report line. A closed or broken sink only costs the line.
    fn report(&mut self, line: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{line}") {
            warn!("report dropped: {e}");
        }
    }

    fn on_resize(&mut self, geometry: Geometry) {
        self.geometry = geometry;
        self.repaint();
        self.report(format_args!("Window resized to {geometry}"));
    }

    fn on_key(&mut self, key: KeyPress) {
        let decoded = self.decoder.decode(key);
        self.report(format_args!("{decoded}"));
    }

    fn on_button(&mut self, button: ButtonPress) {
        self.report(format_args!(
            "Button pressed: {} at ({}, {})",
            button.button, button.x, button.y
        ));
        let Some(action) = self.hooks.action_for(button.button).cloned() else {
            return;
        };
        debug!(button = button.button, ?action, "button action");
        let result = match &action {
            ButtonAction::Move { x, y } => self.surface.move_to(*x, *y),
            ButtonAction::Resize { width, height } => self.surface.resize(*width, *height),
            ButtonAction::Title(title) => self.surface.set_title(title),
            ButtonAction::Cursor(shape) => self.surface.set_cursor(*shape),
        };
        if let Err(e) = result {
            warn!(?action, "button action failed: {e:#}");
        }
    }

    fn on_close_request(&mut self) -> Step {
        match self.close.request() {
            CloseState::Open(attempt) => {
                let threshold = self.close.threshold();
                self.report(format_args!("Close attempt {attempt} of {threshold} ignored"));
                Step::Handled
            }
            CloseState::Closing(attempt) => {
                if let Err(e) = self.surface.destroy() {
                    warn!("window teardown failed: {e:#}");
                }
                info!(attempts = attempt, "window closed");
                self.report(format_args!("Close attempt {attempt}, closing window"));
                let _ = self.out.flush();
                Step::Closed
            }
        }
    }

    /// Regenerates the image at the recorded geometry and blits it.
    fn repaint(&mut self) {
        if self.geometry.is_empty() {
            return;
        }
        let image = self.generator.generate(self.geometry);
        if let Err(e) = self.surface.blit(&image) {
            warn!(geometry = %self.geometry, "repaint failed: {e:#}");
        }
    }
}
