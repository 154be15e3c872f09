// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

use crate::runtime::{ColorMode, ColorScheme};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub bg: Option<Color>,
    pub head: Option<Color>,
    pub head_bright: Option<Color>,
    pub trail: Option<Color>,
    pub trail_bright: Option<Color>,
}

fn from_ansi_list(list: &[u8]) -> Vec<Color> {
    list.iter().map(|&v| Color::AnsiValue(v)).collect()
}

fn from_rgb_list(list: &[u8]) -> Vec<Color> {
    list.iter().map(|&v| ansi256_to_rgb(v)).collect()
}

fn ansi256_to_rgb(v: u8) -> Color {
    const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
    match v {
        16..=231 => {
            let i = v - 16;
            Color::Rgb {
                r: CUBE_LEVELS[(i / 36) as usize],
                g: CUBE_LEVELS[((i / 6) % 6) as usize],
                b: CUBE_LEVELS[(i % 6) as usize],
            }
        }
        232..=255 => {
            let l = 8 + 10 * (v - 232);
            Color::Rgb { r: l, g: l, b: l }
        }
        _ => Color::AnsiValue(v),
    }
}

impl Palette {
    fn from_ramp(ramp: &[Color], head_bright: Color, bg: Option<Color>) -> Self {
        let last = ramp.len().saturating_sub(1);
        let at = |i: usize| ramp.get(i.min(last)).copied();
        Self {
            bg,
            head: at(last),
            head_bright: Some(head_bright),
            trail: at(ramp.len() / 3),
            trail_bright: at(ramp.len() * 2 / 3),
        }
    }

    fn mono(bg: Option<Color>) -> Self {
        Self {
            bg,
            head: None,
            head_bright: None,
            trail: None,
            trail_bright: None,
        }
    }
}

fn ramp_16(scheme: ColorScheme) -> Vec<Color> {
    match scheme {
        ColorScheme::Green | ColorScheme::Green3 => vec![Color::DarkGreen, Color::Green],
        ColorScheme::Green2 => vec![Color::DarkGrey, Color::DarkGreen, Color::Green],
        ColorScheme::Yellow => vec![Color::DarkYellow, Color::Yellow],
        ColorScheme::Gold => vec![Color::DarkGrey, Color::DarkYellow, Color::Yellow],
        ColorScheme::Orange => vec![Color::DarkRed, Color::Red, Color::Yellow],
        ColorScheme::Red => vec![Color::DarkRed, Color::Red],
        ColorScheme::Blue => vec![Color::DarkBlue, Color::Blue],
        ColorScheme::Cyan => vec![Color::DarkCyan, Color::Cyan],
        ColorScheme::Purple => vec![Color::DarkMagenta, Color::Magenta],
        ColorScheme::Gray => vec![Color::DarkGrey, Color::Grey],
        ColorScheme::Snow => vec![Color::Grey, Color::White],
    }
}

fn ramp_256(scheme: ColorScheme) -> &'static [u8] {
    match scheme {
        ColorScheme::Green => &[234, 22, 28, 35, 78, 84, 159],
        ColorScheme::Green2 => &[28, 34, 76, 84, 120, 157, 231],
        ColorScheme::Green3 => &[22, 28, 34, 70, 76, 82, 157],
        ColorScheme::Gold => &[58, 94, 172, 178, 228, 230, 231],
        ColorScheme::Yellow => &[100, 142, 184, 226, 227, 229, 230],
        ColorScheme::Orange => &[52, 94, 130, 166, 202, 208, 231],
        ColorScheme::Red => &[234, 52, 88, 124, 160, 196, 217],
        ColorScheme::Blue => &[234, 17, 18, 19, 20, 21, 75, 159],
        ColorScheme::Cyan => &[24, 25, 31, 32, 38, 45, 159],
        ColorScheme::Purple => &[60, 61, 62, 63, 69, 111, 225],
        ColorScheme::Gray => &[234, 237, 240, 243, 246, 249, 252, 255],
        ColorScheme::Snow => &[60, 67, 110, 153, 189, 195, 231],
    }
}

pub fn build_palette(scheme: ColorScheme, mode: ColorMode, default_background: bool) -> Palette {
    let bg = if default_background {
        None
    } else {
        Some(match mode {
            ColorMode::Mono | ColorMode::Color16 => Color::Black,
            ColorMode::TrueColor => Color::Rgb { r: 0, g: 0, b: 0 },
            ColorMode::Color256 => Color::AnsiValue(16),
        })
    };

    match mode {
        ColorMode::Mono => Palette::mono(bg),
        ColorMode::Color16 => Palette::from_ramp(&ramp_16(scheme), Color::White, bg),
        ColorMode::Color256 => {
            Palette::from_ramp(&from_ansi_list(ramp_256(scheme)), Color::AnsiValue(231), bg)
        }
        ColorMode::TrueColor => Palette::from_ramp(
            &from_rgb_list(ramp_256(scheme)),
            Color::Rgb {
                r: 255,
                g: 255,
                b: 255,
            },
            bg,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn green_256_uses_dark_trail_and_light_head() {
        let p = build_palette(ColorScheme::Green, ColorMode::Color256, false);
        assert_eq!(p.head, Some(Color::AnsiValue(159)));
        assert_eq!(p.trail, Some(Color::AnsiValue(28)));
        assert_eq!(p.trail_bright, Some(Color::AnsiValue(78)));
        assert_eq!(p.bg, Some(Color::AnsiValue(16)));
    }

    #[test]
    fn mono_leaves_foreground_to_terminal() {
        let p = build_palette(ColorScheme::Red, ColorMode::Mono, true);
        assert_eq!(p, Palette::mono(None));
    }

    #[test]
    fn truecolor_converts_cube_and_gray_indices() {
        assert_eq!(ansi256_to_rgb(16), Color::Rgb { r: 0, g: 0, b: 0 });
        assert_eq!(ansi256_to_rgb(231), Color::Rgb { r: 255, g: 255, b: 255 });
        assert_eq!(ansi256_to_rgb(232), Color::Rgb { r: 8, g: 8, b: 8 });
        let p = build_palette(ColorScheme::Green, ColorMode::TrueColor, false);
        assert!(matches!(p.head, Some(Color::Rgb { .. })));
    }
}
