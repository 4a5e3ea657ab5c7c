//! Entry point for **aerial**.
//!
//! On Windows the process stops any previous instance, reserves the
//! requested strips and then sits in the notification area until the user
//! quits or the session ends.  `--dry-run` runs the same reservation
//! sequence against the in-memory desktop and prints the outcome instead.

#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use aerial::config::{self, Config, TimingConfig};
use aerial::geometry::{Monitor, MonitorId, Rect};
use aerial::padding::{PaddingConfig, PaddingToken};
use aerial::session::ReservationSession;
use aerial::simulated::SimulatedDesktop;
use aerial::traits::Displays;
use log::{error, info};
use std::path::PathBuf;

const USAGE: &str = "\
usage: aerial [--dry-run] [--config <path>] <token>...

tokens:  -<monitor><edge>=<pixels>
  monitor  p = primary, s = every secondary, a = all,
           1 = primary, other numbers = a secondary's enumeration index (from 0)
  edge     t = top, b = bottom, l = left, r = right, a = all four

examples:
  aerial -pt=40           40px at the top of the primary monitor
  aerial -ab=20 -2l=300   20px at every bottom, 300px on the left of secondary 2
  aerial -pa=0            stop the running instance
";

/// Parsed command line.
#[derive(Debug, Default)]
struct Cli {
    dry_run: bool,
    help: bool,
    config: Option<PathBuf>,
    tokens: Vec<String>,
}

fn parse_cli<I: IntoIterator<Item = String>>(args: I) -> Result<Cli, String> {
    let mut cli = Cli::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dry-run" => cli.dry_run = true,
            "--help" | "-h" => cli.help = true,
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                cli.config = Some(PathBuf::from(path));
            }
            _ => cli.tokens.push(arg),
        }
    }
    Ok(cli)
}

/// Load the config from `path` (or the default location), falling back to
/// compiled-in defaults.
fn load_config(path: Option<PathBuf>) -> Config {
    let path = path.unwrap_or_else(config::default_path);
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let cli = match parse_cli(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            error!("{}", e);
            eprint!("{}", USAGE);
            std::process::exit(2);
        }
    };
    if cli.help {
        print!("{}", USAGE);
        return;
    }
    if !cli.tokens.iter().any(|t| PaddingToken::parse(t).is_ok()) {
        info!("no padding requested, exiting");
        return;
    }

    let config = load_config(cli.config.clone());
    if cli.dry_run {
        run_dry(&cli.tokens);
    } else {
        run_daemon(config, &cli.tokens);
    }
}

/// Normal mode: supersede, reserve, then wait in the tray.
#[cfg(windows)]
fn run_daemon(config: Config, tokens: &[String]) {
    use aerial::supersede;
    use aerial::win32::desktop::Win32Desktop;
    use aerial::win32::process::Win32Processes;
    use aerial::win32::tray;
    use std::cell::RefCell;
    use std::rc::Rc;

    match supersede::current_identity() {
        Some(identity) => {
            supersede::supersede_previous(&Win32Processes, &identity, &config.timing);
        }
        None => error!("cannot determine executable name, not replacing previous instance"),
    }

    let desktop = match Win32Desktop::new() {
        Ok(d) => d,
        Err(e) => {
            error!("failed to initialise the desktop: {}", e);
            std::process::exit(1);
        }
    };
    let monitors = match desktop.monitors() {
        Ok(m) => {
            info!("found {} monitor(s)", m.len());
            m
        }
        Err(e) => {
            error!("failed to query monitors: {}", e);
            std::process::exit(1);
        }
    };

    let padding = PaddingConfig::from_args(monitors, tokens);
    if padding.is_empty() {
        info!("all amounts are zero, nothing to reserve");
        return;
    }

    let instance = desktop.instance();
    let session = Rc::new(RefCell::new(ReservationSession::new(
        desktop,
        padding,
        config.timing,
    )));
    let reserved = session.borrow_mut().apply();
    info!("holding {} reservation(s)", reserved);

    let on_end = Rc::clone(&session);
    if let Err(e) = tray::run(instance, move || {
        on_end.borrow_mut().release_all();
    }) {
        error!("tray error: {}", e);
    }
    session.borrow_mut().release_all();
    info!("exiting");
}

#[cfg(not(windows))]
fn run_daemon(_config: Config, _tokens: &[String]) {
    error!("reserving screen space requires Windows; use --dry-run to preview");
    std::process::exit(1);
}

/// `--dry-run`: apply against the simulated desktop and print the result.
fn run_dry(tokens: &[String]) {
    let desktop = SimulatedDesktop::new(dry_run_monitors());
    let monitors = match desktop.monitors() {
        Ok(m) => m,
        Err(e) => {
            error!("failed to query simulated monitors: {}", e);
            std::process::exit(1);
        }
    };

    let padding = PaddingConfig::from_args(monitors, tokens);
    print!("{}", padding);

    let mut session =
        ReservationSession::new(desktop.clone(), padding, TimingConfig::immediate());
    session.apply();
    for r in session.reservations() {
        println!("reserved {} edge of monitor {} at {}", r.edge, r.monitor, r.rect);
    }
    for (monitor, _) in session.padding().screens() {
        if let Some(area) = desktop.work_area(monitor.id) {
            println!("{} work area: {}", monitor.name, area);
        }
    }
    session.release_all();
}

/// Monitors to simulate: the real layout when it can be read, otherwise a
/// single 1920×1080 screen.
fn dry_run_monitors() -> Vec<Monitor> {
    #[cfg(windows)]
    {
        match aerial::win32::desktop::Win32Desktop::new().and_then(|d| d.monitors()) {
            Ok(m) if !m.is_empty() => return m,
            Ok(_) => {}
            Err(e) => info!("cannot read real monitors ({}), simulating one", e),
        }
    }
    vec![Monitor {
        id: MonitorId(1),
        name: "SIM1".into(),
        primary: true,
        work_area: Rect::new(0, 0, 1920, 1080),
    }]
}
