// Copyright (c) 2026 rezky_nightky

use std::char;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charset {
    #[value(name = "auto")]
    Auto,
    #[value(name = "kana")]
    Kana,
    #[value(name = "ascii")]
    Ascii,
}

impl Charset {
    pub fn resolve(self, default_to_ascii: bool) -> Charset {
        match self {
            Charset::Auto if default_to_ascii => Charset::Ascii,
            Charset::Auto => Charset::Kana,
            other => other,
        }
    }
}

fn push_range(out: &mut Vec<char>, start: u32, end: u32) {
    for v in start..=end {
        if let Some(ch) = char::from_u32(v) {
            out.push(ch);
        }
    }
}

pub fn half_width_kana() -> Vec<char> {
    let mut out = Vec::with_capacity(63);
    push_range(&mut out, 0xFF61, 0xFF9F);
    out
}

pub fn alphanumerics() -> Vec<char> {
    let mut out = Vec::with_capacity(36);
    push_range(&mut out, 0x61, 0x7A);
    push_range(&mut out, 0x30, 0x39);
    out
}

pub struct GlyphSet {
    kana: Vec<char>,
    ascii: Vec<char>,
    use_ascii: AtomicBool,
}

impl GlyphSet {
    pub fn new(charset: Charset) -> Self {
        Self {
            kana: half_width_kana(),
            ascii: alphanumerics(),
            use_ascii: AtomicBool::new(charset == Charset::Ascii),
        }
    }

    pub fn select(&self, charset: Charset) {
        match charset {
            Charset::Ascii => self.use_ascii.store(true, Ordering::Relaxed),
            Charset::Kana => self.use_ascii.store(false, Ordering::Relaxed),
            Charset::Auto => {}
        }
    }

    pub fn active(&self) -> Charset {
        if self.use_ascii.load(Ordering::Relaxed) {
            Charset::Ascii
        } else {
            Charset::Kana
        }
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> char {
        let pool = match self.active() {
            Charset::Ascii => &self.ascii,
            _ => &self.kana,
        };
        pool[rng.random_range(0..pool.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kana_block_is_complete() {
        let k = half_width_kana();
        assert_eq!(k.len(), 63);
        assert_eq!(k[0], '｡');
        assert_eq!(*k.last().unwrap(), 'ﾟ');
    }

    #[test]
    fn auto_resolves_by_locale() {
        assert_eq!(Charset::Auto.resolve(true), Charset::Ascii);
        assert_eq!(Charset::Auto.resolve(false), Charset::Kana);
        assert_eq!(Charset::Kana.resolve(true), Charset::Kana);
    }

    #[test]
    fn pick_follows_the_selected_alphabet() {
        let glyphs = GlyphSet::new(Charset::Kana);
        let mut rng = rand::rng();
        assert!(!glyphs.pick(&mut rng).is_ascii());

        glyphs.select(Charset::Ascii);
        for _ in 0..100 {
            assert!(glyphs.pick(&mut rng).is_ascii_alphanumeric());
        }

        glyphs.select(Charset::Auto);
        assert_eq!(glyphs.active(), Charset::Ascii);
    }
}
