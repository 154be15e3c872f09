// Copyright (c) 2026 rezky_nightky

use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use crate::charset::Charset;

pub const DEFAULT_PARAMS_USAGE: &str = "DEFAULT PARAMS USAGE:\n  glyphrain --charset auto --color green --speedms 30,140 --length 6,18 --spawnms 9000 --flushms 40";

pub fn color_enabled_stdout() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if matches!(std::env::var("CLICOLOR").ok().as_deref(), Some("0")) {
        return false;
    }
    std::io::stdout().is_terminal()
}

pub fn default_params_usage_for_help() -> String {
    if color_enabled_stdout() {
        DEFAULT_PARAMS_USAGE.replacen(
            "DEFAULT PARAMS USAGE:",
            "\x1b[1;36mDEFAULT PARAMS USAGE:\x1b[0m",
            1,
        )
    } else {
        DEFAULT_PARAMS_USAGE.to_string()
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorBg {
    #[value(name = "black")]
    Black,
    #[value(name = "default-background")]
    DefaultBackground,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct U16Range {
    pub low: u16,
    pub high: u16,
}

impl FromStr for U16Range {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(',')
            .ok_or_else(|| "expected: NUM1,NUM2".to_string())?;
        let low: u16 = a
            .trim()
            .parse()
            .map_err(|_| "invalid low value".to_string())?;
        let high: u16 = b
            .trim()
            .parse()
            .map_err(|_| "invalid high value".to_string())?;
        if low == 0 || high == 0 || low > high {
            return Err("range must be >0 and low <= high".to_string());
        }
        Ok(Self { low, high })
    }
}

impl U16Range {
    fn require_within(self, name: &str, min: u16, max: u16) -> Result<Self, String> {
        if self.low < min || self.high > max {
            return Err(format!(
                "failed to apply {} {},{} (min {} max {})",
                name, self.low, self.high, min, max
            ));
        }
        Ok(self)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "glyphrain", version, disable_version_flag = true)]
pub struct Args {
    #[arg(
        long = "charset",
        default_value_t = Charset::Auto,
        value_enum,
        help_heading = "APPEARANCE",
        help = "Glyph alphabet (auto, kana, ascii)"
    )]
    pub charset: Charset,

    #[arg(
        short = 'a',
        long = "ascii",
        help_heading = "APPEARANCE",
        help = "Use alphanumerics instead of katakana (same as --charset ascii)"
    )]
    pub ascii: bool,

    #[arg(
        short = 'c',
        long = "color",
        default_value = "green",
        help_heading = "APPEARANCE",
        help = "Color theme (see --list-colors)"
    )]
    pub color: String,

    #[arg(
        long = "color-bg",
        default_value_t = ColorBg::Black,
        value_enum,
        help_heading = "APPEARANCE",
        help = "Background mode (black, default-background)"
    )]
    pub color_bg: ColorBg,

    #[arg(
        long = "colormode",
        help_heading = "APPEARANCE",
        help = "Force color mode (allowed: 0,16,8,24). Default: detected from COLORTERM/TERM"
    )]
    pub colormode: Option<u16>,

    #[arg(
        long = "speedms",
        default_value = "30,140",
        help_heading = "RAIN",
        help = "Per-stream tick period range in ms: LOW,HIGH (min 1 max 5000)"
    )]
    pub speed_ms: U16Range,

    #[arg(
        long = "length",
        default_value = "6,18",
        help_heading = "RAIN",
        help = "Stream length range in glyphs: LOW,HIGH (min 1 max 1000)"
    )]
    pub length: U16Range,

    #[arg(
        long = "spawnms",
        default_value_t = 9000,
        help_heading = "RAIN",
        help = "Max random delay before a column spawns a stream, in ms (max 60000)"
    )]
    pub spawn_ms: u16,

    #[arg(
        long = "flushms",
        default_value_t = 40,
        help_heading = "RAIN",
        help = "Screen flush interval in ms (min 10 max 1000)"
    )]
    pub flush_ms: u16,

    #[arg(
        long = "duration",
        help_heading = "GENERAL",
        help = "Stop after N seconds (min 0.1 max 86400; <=0 disables)"
    )]
    pub duration: Option<f64>,

    #[arg(
        short = 'l',
        long = "log",
        help_heading = "GENERAL",
        help = "Write debug log to ~/.glyphrain-log"
    )]
    pub log: bool,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        help_heading = "GENERAL",
        help = "Write debug log to PATH (implies --log)"
    )]
    pub log_file: Option<PathBuf>,

    #[arg(
        long = "list-colors",
        help_heading = "HELP",
        help = "List available color themes and exit"
    )]
    pub list_colors: bool,

    #[arg(
        long = "info",
        short = 'i',
        help_heading = "HELP",
        help = "Print version info and exit"
    )]
    pub info: bool,

    #[arg(
        long = "version",
        short = 'v',
        help_heading = "HELP",
        help = "Print version and exit"
    )]
    pub version: bool,
}

impl Args {
    pub fn charset(&self) -> Charset {
        if self.ascii {
            Charset::Ascii
        } else {
            self.charset
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RainConfig {
    pub speed_ms: U16Range,
    pub length: U16Range,
    pub spawn_delay_ms: u16,
    pub flush_interval: Duration,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            speed_ms: U16Range { low: 30, high: 140 },
            length: U16Range { low: 6, high: 18 },
            spawn_delay_ms: 9000,
            flush_interval: Duration::from_millis(40),
        }
    }
}

impl RainConfig {
    pub fn from_args(args: &Args) -> Result<Self, String> {
        let speed_ms = args.speed_ms.require_within("--speedms", 1, 5000)?;
        let length = args.length.require_within("--length", 1, 1000)?;
        if args.spawn_ms > 60000 {
            return Err(format!(
                "failed to apply --spawnms {} (min 0 max 60000)",
                args.spawn_ms
            ));
        }
        if !(10..=1000).contains(&args.flush_ms) {
            return Err(format!(
                "failed to apply --flushms {} (min 10 max 1000)",
                args.flush_ms
            ));
        }
        Ok(Self {
            speed_ms,
            length,
            spawn_delay_ms: args.spawn_ms,
            flush_interval: Duration::from_millis(args.flush_ms as u64),
        })
    }

    pub fn streams_per_column(&self, height: u16) -> usize {
        1 + height as usize / 10
    }
}

pub fn print_list_colors() {
    if color_enabled_stdout() {
        println!("\x1b[1;36mAVAILABLE COLOR THEMES:\x1b[0m");
    } else {
        println!("AVAILABLE COLOR THEMES:");
    }
    println!();
    println!("VALUE        DESCRIPTION");
    println!("green        Green theme (default)");
    println!("green2       Green variant");
    println!("green3       Green variant");
    println!("yellow       Yellow theme");
    println!("orange       Orange theme");
    println!("red          Red theme");
    println!("blue         Blue theme");
    println!("cyan         Cyan theme");
    println!("gold         Gold theme");
    println!("purple       Purple theme");
    println!("gray         Gray theme (alias: grey)");
    println!("snow         Snow / ice theme");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("glyphrain").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_rain_config_default() {
        let args = parse(&[]);
        assert_eq!(RainConfig::from_args(&args).unwrap(), RainConfig::default());
        assert_eq!(args.charset(), Charset::Auto);
    }

    #[test]
    fn ascii_flag_overrides_charset() {
        let args = parse(&["--charset", "kana", "-a"]);
        assert_eq!(args.charset(), Charset::Ascii);
    }

    #[test]
    fn range_parsing_rejects_zero_and_inverted() {
        assert!("0,5".parse::<U16Range>().is_err());
        assert!("9,5".parse::<U16Range>().is_err());
        assert!("5".parse::<U16Range>().is_err());
        assert_eq!(
            " 5 , 9 ".parse::<U16Range>().unwrap(),
            U16Range { low: 5, high: 9 }
        );
    }

    #[test]
    fn out_of_bounds_values_are_rejected() {
        let args = parse(&["--speedms", "1,6000"]);
        let err = RainConfig::from_args(&args).unwrap_err();
        assert!(err.contains("--speedms"));

        let args = parse(&["--flushms", "5"]);
        assert!(RainConfig::from_args(&args).is_err());

        let args = parse(&["--spawnms", "0"]);
        assert_eq!(RainConfig::from_args(&args).unwrap().spawn_delay_ms, 0);
    }

    #[test]
    fn streams_per_column_grows_with_height() {
        let c = RainConfig::default();
        assert_eq!(c.streams_per_column(0), 1);
        assert_eq!(c.streams_per_column(9), 1);
        assert_eq!(c.streams_per_column(24), 3);
    }
}
