//! hellowin - a single X11 window and the loop that keeps it alive
//!
//! Opens a 400x300 window, repaints it with a solid fill on every resize and
//! once a second, and reports every input, focus and visibility event on
//! stdout. Closing the window takes persistence: the first three close
//! requests are refused.
//!
//! ```text
//! hellowin                          → window on $DISPLAY
//! hellowin --report-motion          → also print pointer motion
//! hellowin --on-button 3=resize:640x480 --on-button 1=cursor:hand
//! ```

mod close;
mod config;
mod dispatcher;
mod event;
mod hooks;
mod image;
mod input;
mod surface;
mod tick;

use anyhow::Result;
use clap::Parser;
use config::{Settings, WindowConfig, FILL_COLOR};
use dispatcher::Dispatcher;
use hooks::ButtonBinding;
use image::SolidFill;
use input::{KeyboardMap, TextDecoder};
use std::io::{self, Write};
use surface::X11Surface;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;

/// Every flag is optional and defaults to the built-in constants, so running
/// without arguments is the fixed behaviour. The flags only switch on the
/// handler table's extension points (motion reports, button actions) and pick
/// the display; `RUST_LOG` only tunes stderr diagnostics, never the reports.
#[derive(Parser)]
#[command(name = "hellowin")]
#[command(about = "Minimal X11 window with an insistent close policy")]
#[command(version)]
struct Cli {
    /// X display to connect to (e.g., :0). Defaults to $DISPLAY
    #[arg(short, long)]
    display: Option<String>,

    /// Print a line for every pointer motion event
    #[arg(long)]
    report_motion: bool,

    /// Bind a mouse button to a window action, e.g. 3=resize:640x480.
    /// Actions: move:X,Y  resize:WxH  title:TEXT  cursor:default|hand|crosshair|watch
    #[arg(long = "on-button", value_name = "BUTTON=ACTION")]
    on_button: Vec<ButtonBinding>,
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        Settings {
            display: cli.display,
            window: WindowConfig::default(),
            report_motion: cli.report_motion,
            bindings: cli.on_button,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy()
                .add_directive("x11rb=warn".parse().expect("static directive")),
        )
        .with_writer(io::stderr)
        .init();

    let settings = Settings::from(Cli::parse());

    if let Err(line) = launch(&settings, open_surface, run) {
        println!("{line}");
        std::process::exit(1);
    }
}

fn open_surface(settings: &Settings) -> Result<X11Surface> {
    X11Surface::open(settings.display.as_deref(), &settings.window)
}

/// Opens the surface and hands it to `run`. A surface that cannot be opened
/// ends here, before any event loop exists. `Err` carries the line to print.
fn launch<S>(
    settings: &Settings,
    open: impl FnOnce(&Settings) -> Result<S>,
    run: impl FnOnce(S, &Settings) -> Result<()>,
) -> std::result::Result<(), String> {
    let surface = match open(settings) {
        Ok(surface) => surface,
        Err(e) => {
            error!("startup failed: {e:#}");
            return Err(format!("Unable to open X display: {e:#}"));
        }
    };
    run(surface, settings).map_err(|e| {
        error!("event loop failed: {e:#}");
        format!("Fatal: {e:#}")
    })
}

fn run(surface: X11Surface, settings: &Settings) -> Result<()> {
    let keymap = match KeyboardMap::fetch(surface.connection()) {
        Ok(map) => Some(map),
        Err(e) => {
            warn!("no keyboard map, reporting raw keycodes only: {e:#}");
            None
        }
    };
    let decoder = TextDecoder::new(keymap);
    info!(text_input = decoder.has_context(), "decoder ready");

    let mut dispatcher = Dispatcher::new(
        surface,
        SolidFill::new(FILL_COLOR),
        decoder,
        settings.hooks(),
        io::stdout().lock(),
    );
    dispatcher.run()?;

    info!(
        attempts = dispatcher.close_attempts(),
        geometry = %dispatcher.geometry(),
        "exiting"
    );
    let (_surface, mut out) = dispatcher.into_parts();
    if let Err(e) = out.flush() {
        warn!("stdout flush failed: {e}");
    }
    Ok(())
}
