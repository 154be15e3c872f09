// Copyright (c) 2026 rezky_nightky

use std::sync::atomic::{AtomicU32, Ordering};

/// Current terminal dimensions in cells.
#[derive(Debug, Default)]
pub struct SizeState {
    packed: AtomicU32,
}

fn pack(width: u16, height: u16) -> u32 {
    ((width as u32) << 16) | height as u32
}

fn unpack(v: u32) -> (u16, u16) {
    ((v >> 16) as u16, v as u16)
}

impl SizeState {
    #[cfg(test)]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            packed: AtomicU32::new(pack(width, height)),
        }
    }

    pub fn set(&self, width: u16, height: u16) -> (u16, u16) {
        unpack(self.packed.swap(pack(width, height), Ordering::AcqRel))
    }

    pub fn get(&self) -> (u16, u16) {
        unpack(self.packed.load(Ordering::Acquire))
    }

    #[cfg(test)]
    pub fn width(&self) -> u16 {
        self.get().0
    }

    pub fn height(&self) -> u16 {
        self.get().1
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn set_returns_previous_size() {
        let s = SizeState::new(80, 24);
        assert_eq!(s.set(100, 40), (80, 24));
        assert_eq!(s.get(), (100, 40));
        assert_eq!(s.width(), 100);
        assert_eq!(s.height(), 40);
    }

    #[test]
    fn extremes_survive_packing() {
        let s = SizeState::new(u16::MAX, 0);
        assert_eq!(s.get(), (u16::MAX, 0));
        s.set(0, u16::MAX);
        assert_eq!(s.get(), (0, u16::MAX));
    }

    #[test]
    fn readers_never_see_torn_pairs() {
        let s = Arc::new(SizeState::new(1, 1));
        let writer = {
            let s = s.clone();
            thread::spawn(move || {
                for i in 0..10_000u16 {
                    let v = i % 2 + 1;
                    s.set(v, v);
                }
            })
        };
        for _ in 0..10_000 {
            let (w, h) = s.get();
            assert_eq!(w, h);
        }
        writer.join().unwrap();
    }
}
