//! littlebits-scope - terminal oscilloscope for the littleBits USB I/O module
//!
//! Reads the module's signal and plots one channel across the terminal,
//! refreshed about ten times a second. Press any key to quit.
//!
//! Settings live in `~/.config/littlebits/settings.json` (written with
//! defaults on first run); logs go to `scope.log` next to it, filtered by
//! `RUST_LOG`.

use std::fs::File;
use std::io::{stdout, Stdout};
use std::sync::mpsc::TryRecvError;
use std::time::Duration;

use anyhow::Context;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use littlebits::audio::{AudioBackend, CpalBackend, SampleSeries};
use littlebits::poller::{self, PollerHandle};
use littlebits::render::Oscilloscope;
use littlebits::settings::{self, Settings};
use littlebits::Reader;

fn main() -> anyhow::Result<()> {
    init_logging();
    log::info!("Starting littlebits-scope");

    let settings = if settings::settings_path().exists() {
        Settings::load()
    } else {
        let defaults = Settings::default();
        if let Err(e) = defaults.save() {
            log::warn!("Failed to write default settings: {}", e);
        }
        defaults
    };

    let backend = CpalBackend::new(settings.host.as_deref())
        .context("audio backend initialization failed")?
        .with_timeout(settings.transfer_timeout());
    for device in backend.devices().context("failed to list audio devices")? {
        log::debug!("Found device: {:?}", device);
    }

    let series = SampleSeries::new(settings.series_len());
    let device_name = settings.device_name.clone();
    let buffer_size = settings.buffer_size;
    let poller = poller::spawn(
        move || Reader::open(&backend, &device_name, buffer_size),
        buffer_size,
        series.clone(),
        terminal_width,
        settings.refresh_interval(),
    )
    .context("failed to open the littleBits reader")?;

    let scope = Oscilloscope::with_settings(settings.display.clone());
    let result = TerminalGuard::enter()
        .context("failed to set up the terminal")
        .and_then(|mut guard| {
            run_ui(
                &mut guard.terminal,
                &scope,
                &series,
                &poller,
                settings.refresh_interval(),
            )
        });

    poller.shutdown();
    log::info!("Exiting");
    result
}

/// Pipe logs to a file so they don't tear through the alternate screen.
fn init_logging() {
    let mut builder = env_logger::Builder::from_default_env();
    let path = settings::config_dir().join("scope.log");
    let file = std::fs::create_dir_all(settings::config_dir()).and_then(|_| File::create(&path));
    match file {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("Logging to stderr, cannot open {}: {}", path.display(), e),
    }
    builder.init();
}

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| usize::from(cols))
        .unwrap_or(0)
}

/// Raw mode + alternate screen, undone on drop whichever way we exit
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> std::io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = stdout().execute(EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            log::warn!("Failed to leave raw mode: {}", e);
        }
        if let Err(e) = stdout().execute(LeaveAlternateScreen) {
            log::warn!("Failed to leave alternate screen: {}", e);
        }
        if let Err(e) = self.terminal.show_cursor() {
            log::warn!("Failed to restore cursor: {}", e);
        }
    }
}

/// Repaint whenever the poller refreshes the series or the terminal is
/// resized; return on the first key press. Input is checked once per
/// `refresh` so repaints keep pace with the poller.
fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    scope: &Oscilloscope,
    series: &SampleSeries,
    poller: &PollerHandle,
    refresh: Duration,
) -> anyhow::Result<()> {
    let mut dirty = true;
    loop {
        if dirty {
            let points = series.points();
            terminal.draw(|frame| {
                let area = frame.area();
                scope.render(frame, area, &points);
            })?;
            dirty = false;
        }

        if event::poll(refresh)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(()),
                Event::Resize(..) => dirty = true,
                _ => {}
            }
        }

        loop {
            match poller.repaint.try_recv() {
                Ok(()) => dirty = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    anyhow::bail!("poller stopped unexpectedly");
                }
            }
        }
    }
}
