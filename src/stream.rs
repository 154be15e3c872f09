// Copyright (c) 2026 rezky_nightky

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::debug;
use rand::Rng;

use crate::cell::Cell;
use crate::column::ColumnShared;
use crate::config::RainConfig;
use crate::context::RainContext;
use crate::palette::Palette;

const HEAD_BRIGHT_CHANCE: f64 = 1.0 / 3.0;
const TRAIL_BRIGHT_CHANCE: f64 = 2.0 / 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StreamPhase {
    Growing,
    HeadDone,
    Draining,
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Paint {
    Head { row: u16, glyph: char },
    Trail { row: u16, glyph: char },
    Clear { row: u16 },
}

impl Paint {
    pub fn row(&self) -> u16 {
        match *self {
            Paint::Head { row, .. } | Paint::Trail { row, .. } | Paint::Clear { row } => row,
        }
    }

    fn cell<R: Rng + ?Sized>(self, palette: &Palette, rng: &mut R) -> Cell {
        match self {
            Paint::Head { glyph, .. } => {
                let bright = rng.random_bool(HEAD_BRIGHT_CHANCE);
                let fg = if bright {
                    palette.head_bright
                } else {
                    palette.head
                };
                Cell::glyph(glyph, fg, palette.bg, bright)
            }
            Paint::Trail { glyph, .. } => {
                let fg = if rng.random_bool(TRAIL_BRIGHT_CHANCE) {
                    palette.trail_bright
                } else {
                    palette.trail
                };
                Cell::glyph(glyph, fg, palette.bg, false)
            }
            Paint::Clear { .. } => Cell::blank_with_bg(palette.bg),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Advance {
    pub slot_opened: bool,
    pub terminated: bool,
}

/// Head/tail bookkeeping of one stream, free of threads and I/O.
///
/// `0 <= tail_pos <= head_pos <= length` holds after every tick.
#[derive(Clone, Debug)]
pub struct Trail {
    speed: Duration,
    length: u16,
    head_pos: u16,
    tail_pos: u16,
    phase: StreamPhase,
    last_glyph: Option<char>,
}

impl Trail {
    pub fn new(speed: Duration, length: u16) -> Self {
        Self {
            speed,
            length,
            head_pos: 0,
            tail_pos: 0,
            phase: StreamPhase::Growing,
            last_glyph: None,
        }
    }

    pub fn random<R: Rng + ?Sized>(config: &RainConfig, rng: &mut R) -> Self {
        let speed = rng.random_range(config.speed_ms.low..=config.speed_ms.high);
        let length = rng.random_range(config.length.low..=config.length.high);
        Self::new(Duration::from_millis(speed as u64), length)
    }

    pub fn speed(&self) -> Duration {
        self.speed
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn head_pos(&self) -> u16 {
        self.head_pos
    }

    pub fn tail_pos(&self) -> u16 {
        self.tail_pos
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn head_done(&self) -> bool {
        self.phase >= StreamPhase::HeadDone
    }

    pub fn advance(&mut self, height: u16, glyph: char, mut paint: impl FnMut(Paint)) -> Advance {
        let mut out = Advance::default();

        if self.phase == StreamPhase::Growing {
            let limit = self.length.min(height);
            if self.head_pos < limit {
                if let (Some(prev), Some(row)) = (self.last_glyph, self.head_pos.checked_sub(1)) {
                    paint(Paint::Trail { row, glyph: prev });
                }
                paint(Paint::Head {
                    row: self.head_pos,
                    glyph,
                });
                self.last_glyph = Some(glyph);
                self.head_pos += 1;
            }
            if self.head_pos >= limit {
                self.phase = StreamPhase::HeadDone;
            }
        }

        if self.phase == StreamPhase::HeadDone {
            self.phase = StreamPhase::Draining;
            out.slot_opened = true;
        }

        if self.phase == StreamPhase::Draining {
            if self.tail_pos < self.head_pos && self.tail_pos < height {
                paint(Paint::Clear { row: self.tail_pos });
                self.tail_pos += 1;
            }
            if self.tail_pos >= self.head_pos || self.tail_pos >= height {
                self.phase = StreamPhase::Terminated;
            }
        }

        out.terminated = self.phase == StreamPhase::Terminated;
        out
    }
}

pub(crate) struct Stream {
    id: u64,
    column: Arc<ColumnShared>,
    ctx: Arc<RainContext>,
    trail: Trail,
    stop_rx: Receiver<()>,
}

impl Stream {
    pub(crate) fn new(
        id: u64,
        column: Arc<ColumnShared>,
        ctx: Arc<RainContext>,
        trail: Trail,
        stop_rx: Receiver<()>,
    ) -> Self {
        Self {
            id,
            column,
            ctx,
            trail,
            stop_rx,
        }
    }

    pub(crate) fn run(mut self) {
        let mut rng = rand::rng();
        let col = self.column.index();

        loop {
            match self.stop_rx.recv_timeout(self.trail.speed()) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!(
                        "stream {} on column {} was stopped while {:?}",
                        self.id,
                        col,
                        self.trail.phase()
                    );
                    break;
                }
            }

            let (width, height) = self.ctx.size.get();
            let glyph = self.ctx.glyphs.pick(&mut rng);
            let ctx = &self.ctx;
            let advance = self.trail.advance(height, glyph, |p| {
                if col < width {
                    ctx.surface.set_cell(col, p.row(), p.cell(&ctx.palette, &mut rng));
                }
            });

            if advance.slot_opened {
                self.column.request_spawn();
            }
            if advance.terminated {
                debug!(
                    "stream {} on column {} finished: length {}, head {}, tail {}",
                    self.id,
                    col,
                    self.trail.length(),
                    self.trail.head_pos(),
                    self.trail.tail_pos()
                );
                break;
            }
        }

        self.column.retire(self.id);
    }
}
