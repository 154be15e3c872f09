// Copyright (c) 2026 rezky_nightky

use std::sync::Arc;

use crate::charset::GlyphSet;
use crate::config::RainConfig;
use crate::palette::Palette;
use crate::size::SizeState;
use crate::surface::Surface;

pub struct RainContext {
    pub surface: Arc<dyn Surface>,
    pub size: SizeState,
    pub glyphs: GlyphSet,
    pub palette: Palette,
    pub config: RainConfig,
}

impl RainContext {
    pub fn new(
        surface: Arc<dyn Surface>,
        glyphs: GlyphSet,
        palette: Palette,
        config: RainConfig,
    ) -> Self {
        Self {
            surface,
            size: SizeState::default(),
            glyphs,
            palette,
            config,
        }
    }
}
