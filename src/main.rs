// Copyright (c) 2026 rezky_nightky

mod cell;
mod charset;
mod column;
mod config;
mod context;
mod frame;
mod input;
mod logging;
mod manager;
mod palette;
mod runtime;
mod size;
mod stream;
mod surface;
mod terminal;

use std::env;
use std::io;
use std::sync::Arc;
use std::time::Duration;

#[cfg(unix)]
use std::thread;

use clap::builder::styling::{AnsiColor as ClapAnsiColor, Color as ClapColor};
use clap::builder::styling::{Effects as ClapEffects, Style as ClapStyle};
use clap::builder::Styles as ClapStyles;
use clap::{CommandFactory, FromArgMatches};
use crossbeam_channel::{after, never, select, unbounded, Sender};
use log::{debug, error, info, warn};

#[cfg(unix)]
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook::iterator::Signals;

use crate::charset::GlyphSet;
use crate::config::{
    color_enabled_stdout, default_params_usage_for_help, print_list_colors, Args, ColorBg,
    RainConfig,
};
use crate::context::RainContext;
use crate::input::{key_action, InputActor, InputEvent, KeyAction};
use crate::manager::ColumnManager;
use crate::palette::build_palette;
use crate::runtime::{ColorMode, ColorScheme};
use crate::surface::{Flusher, Surface, TerminalSurface};
use crate::terminal::{restore_terminal_best_effort, Terminal};

const HELP_TEMPLATE_PLAIN: &str = "\
{before-help}{about-with-newline}
USAGE:
  {usage}

{all-args}{after-help}";

const HELP_TEMPLATE_COLOR: &str = "\
{before-help}{about-with-newline}
\x1b[1;36mUSAGE:\x1b[0m
  {usage}

{all-args}{after-help}";

const INPUT_POLL: Duration = Duration::from_millis(50);

fn build_info() -> &'static str {
    env!("GLYPHRAIN_BUILD")
}

fn git_sha() -> &'static str {
    match env!("GLYPHRAIN_GIT_SHA") {
        "" => "unknown",
        sha => sha,
    }
}

fn clap_styles() -> ClapStyles {
    ClapStyles::styled()
        .header(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Cyan))),
        )
        .usage(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Green))),
        )
        .literal(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Yellow))))
        .placeholder(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Magenta))))
}

fn default_to_ascii() -> bool {
    let lang = env::var("LANG").unwrap_or_default();
    !lang.to_ascii_uppercase().contains("UTF")
}

fn detect_color_mode_auto() -> ColorMode {
    let colorterm = env::var("COLORTERM")
        .unwrap_or_default()
        .to_ascii_lowercase();
    if colorterm.contains("truecolor") || colorterm.contains("24bit") {
        return ColorMode::TrueColor;
    }

    let term = env::var("TERM").unwrap_or_default().to_ascii_lowercase();
    if term == "dumb" {
        return ColorMode::Mono;
    }
    if term.contains("256color") {
        return ColorMode::Color256;
    }

    ColorMode::Color256
}

fn detect_color_mode(forced: Option<u16>) -> Result<ColorMode, String> {
    match forced {
        None => Ok(detect_color_mode_auto()),
        Some(0) => Ok(ColorMode::Mono),
        Some(16) => Ok(ColorMode::Color16),
        Some(8) => Ok(ColorMode::Color256),
        Some(24) => Ok(ColorMode::TrueColor),
        Some(m) => Err(format!("invalid --colormode: {} (allowed: 0,16,8,24)", m)),
    }
}

fn color_mode_label(m: ColorMode) -> &'static str {
    match m {
        ColorMode::TrueColor => "24-bit truecolor",
        ColorMode::Color256 => "8-bit (256-color)",
        ColorMode::Mono => "mono",
        ColorMode::Color16 => "16-color",
    }
}

fn parse_color_scheme(s: &str) -> Result<ColorScheme, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "green" => Ok(ColorScheme::Green),
        "green2" => Ok(ColorScheme::Green2),
        "green3" => Ok(ColorScheme::Green3),
        "yellow" => Ok(ColorScheme::Yellow),
        "orange" => Ok(ColorScheme::Orange),
        "red" => Ok(ColorScheme::Red),
        "blue" => Ok(ColorScheme::Blue),
        "cyan" => Ok(ColorScheme::Cyan),
        "gold" => Ok(ColorScheme::Gold),
        "purple" => Ok(ColorScheme::Purple),
        "gray" | "grey" => Ok(ColorScheme::Gray),
        "snow" => Ok(ColorScheme::Snow),
        _ => Err(format!("invalid color: {} (see --list-colors)", s)),
    }
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{}", msg);
    std::process::exit(1);
}

enum Exit {
    Quit,
    Deadline,
    Signal(i32),
    Fault(String),
}

#[cfg(unix)]
fn forward_signals(tx: Sender<i32>) -> io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    thread::Builder::new()
        .name("glyphrain-signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                if tx.send(sig).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}

#[cfg(windows)]
fn forward_signals(tx: Sender<i32>) -> io::Result<()> {
    ctrlc::set_handler(move || {
        let _ = tx.send(2);
    })
    .map_err(io::Error::other)
}

fn main() -> io::Result<()> {
    std::panic::set_hook(Box::new(|info| {
        restore_terminal_best_effort();
        eprintln!("{}", info);
    }));

    let mut cmd = Args::command();
    cmd = cmd.styles(clap_styles());
    cmd = cmd.before_help(default_params_usage_for_help());
    let help_template = if color_enabled_stdout() {
        HELP_TEMPLATE_COLOR
    } else {
        HELP_TEMPLATE_PLAIN
    };
    cmd = cmd.help_template(help_template);
    cmd.build();

    if cmd.get_arguments().any(|a| a.get_id().as_str() == "help") {
        cmd = cmd.mut_arg("help", |a| a.help_heading("HELP"));
    }
    cmd.build();

    let matches = cmd.get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if args.list_colors {
        print_list_colors();
        return Ok(());
    }

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.info {
        println!("Version: v{}", env!("CARGO_PKG_VERSION"));
        println!("Build: {}", build_info());
        println!("Commit: {}", git_sha());
        println!("Copyright: (c) 2026 {}", env!("CARGO_PKG_AUTHORS"));
        println!("License: {}", env!("CARGO_PKG_LICENSE"));
        println!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
        return Ok(());
    }

    let config = RainConfig::from_args(&args).unwrap_or_else(|e| fail(e));
    let color_mode = detect_color_mode(args.colormode).unwrap_or_else(|e| fail(e));
    let color_scheme = parse_color_scheme(&args.color).unwrap_or_else(|e| fail(e));
    let duration = match args.duration {
        Some(s) if !s.is_finite() => fail(format!(
            "failed to apply --duration {} (must be a finite number)",
            s
        )),
        Some(s) if s > 0.0 && !(0.1..=86400.0).contains(&s) => fail(format!(
            "failed to apply --duration {} (min 0.1 max 86400)",
            s
        )),
        Some(s) if s > 0.0 => Some(Duration::from_secs_f64(s)),
        _ => None,
    };

    if let Some(path) = logging::log_target(args.log, args.log_file.clone()) {
        if let Err(e) = logging::init(&path) {
            fail(format!("could not open log file {}: {}", path.display(), e));
        }
    }

    let charset = args.charset().resolve(default_to_ascii());
    let glyphs = GlyphSet::new(charset);
    let palette = build_palette(
        color_scheme,
        color_mode,
        args.color_bg == ColorBg::DefaultBackground,
    );
    info!(
        "charset {:?}, colors {:?} in {}, {:?}",
        charset,
        color_scheme,
        color_mode_label(color_mode),
        config
    );

    let term = Terminal::new().unwrap_or_else(|e| fail(format!("could not open terminal: {}", e)));
    let (w, h) = term.size()?;
    let surface = Arc::new(TerminalSurface::new(term, w, h, palette.bg));
    let flush_interval = config.flush_interval;
    let ctx = Arc::new(RainContext::new(
        Arc::clone(&surface) as Arc<dyn Surface>,
        glyphs,
        palette,
        config,
    ));
    let manager = ColumnManager::new(Arc::clone(&ctx));

    let (fault_tx, fault_rx) = unbounded();
    let (input_tx, input_rx) = unbounded();
    let (signal_tx, signal_rx) = unbounded();

    let exit = match start_rain(&manager, w, h) {
        Err(e) => {
            manager.shutdown();
            Exit::Fault(e.to_string())
        }
        Ok(()) => {
            let flusher = Flusher::spawn(
                Arc::clone(&surface) as Arc<dyn Surface>,
                flush_interval,
                fault_tx,
            )?;
            let input = InputActor::spawn(input_tx, INPUT_POLL)?;
            if let Err(e) = forward_signals(signal_tx.clone()) {
                warn!("could not install signal handlers: {}", e);
            }
            let deadline = duration.map(after).unwrap_or_else(never);

            let exit = loop {
                let step = select! {
                    recv(input_rx) -> msg => match msg {
                        Ok(InputEvent::Resize { width, height }) => {
                            surface.resize(width, height);
                            match manager.on_resize(width, height) {
                                Ok(()) => {
                                    debug!(
                                        "surface {:?}, width {}, {} columns, {} live streams",
                                        surface.size(),
                                        manager.width(),
                                        manager.column_count(),
                                        manager.live_streams()
                                    );
                                    None
                                }
                                Err(e) => Some(Exit::Fault(e.to_string())),
                            }
                        }
                        Ok(InputEvent::Key { code, modifiers }) => match key_action(code, modifiers) {
                            KeyAction::Quit => Some(Exit::Quit),
                            KeyAction::Clear => {
                                surface.clear();
                                None
                            }
                            KeyAction::Glyphs(c) => {
                                ctx.glyphs.select(c);
                                info!("glyphs switched to {:?}", ctx.glyphs.active());
                                None
                            }
                            KeyAction::Ignore => None,
                        },
                        Ok(InputEvent::Error(e)) => Some(Exit::Fault(e)),
                        Err(_) => Some(Exit::Fault("input thread exited".to_string())),
                    },
                    recv(fault_rx) -> fault => Some(Exit::Fault(match fault {
                        Ok(e) => e.to_string(),
                        Err(_) => "flusher exited".to_string(),
                    })),
                    recv(signal_rx) -> sig => Some(Exit::Signal(sig.unwrap_or(0))),
                    recv(deadline) -> _ => Some(Exit::Deadline),
                };
                if let Some(exit) = step {
                    break exit;
                }
            };

            manager.shutdown();
            input.join();
            flusher.join();
            exit
        }
    };
    surface.close();

    match exit {
        Exit::Quit | Exit::Deadline => {
            info!("exiting cleanly");
            println!("see you, {} out", env!("CARGO_PKG_NAME"));
            Ok(())
        }
        Exit::Signal(sig) => {
            info!("exiting on signal {}", sig);
            Ok(())
        }
        Exit::Fault(cause) => {
            error!("exiting on fault: {}", cause);
            fail(format!("glyphrain: {}", cause))
        }
    }
}

fn start_rain(manager: &ColumnManager, width: u16, height: u16) -> io::Result<()> {
    info!("starting rain on a {}x{} terminal", width, height);
    manager.on_resize(width, height)
}
