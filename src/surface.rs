// Copyright (c) 2026 rezky_nightky

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use crossterm::style::Color;
use log::{debug, error};

use crate::cell::Cell;
use crate::frame::Frame;
use crate::terminal::Terminal;

pub trait Surface: Send + Sync {
    fn set_cell(&self, col: u16, row: u16, cell: Cell);
    fn size(&self) -> (u16, u16);
    fn resize(&self, width: u16, height: u16);
    fn clear(&self);
    fn flush(&self) -> io::Result<()>;
}

struct Screen {
    frame: Frame,
    term: Option<Terminal>,
}

pub struct TerminalSurface {
    screen: Mutex<Screen>,
}

impl TerminalSurface {
    pub fn new(term: Terminal, width: u16, height: u16, bg: Option<Color>) -> Self {
        Self {
            screen: Mutex::new(Screen {
                frame: Frame::new(width, height, bg),
                term: Some(term),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn close(&self) {
        let term = self.lock().term.take();
        drop(term);
    }
}

impl Surface for TerminalSurface {
    fn set_cell(&self, col: u16, row: u16, cell: Cell) {
        self.lock().frame.set(col, row, cell);
    }

    fn size(&self) -> (u16, u16) {
        let screen = self.lock();
        (screen.frame.width, screen.frame.height)
    }

    fn resize(&self, width: u16, height: u16) {
        self.lock().frame.resize(width, height);
    }

    fn clear(&self) {
        self.lock().frame.clear();
    }

    fn flush(&self) -> io::Result<()> {
        let mut screen = self.lock();
        let Screen { frame, term } = &mut *screen;
        match term {
            Some(term) => term.draw(frame),
            None => Ok(()),
        }
    }
}

pub struct Flusher {
    handle: Option<JoinHandle<()>>,
    stop_tx: Sender<()>,
}

impl Flusher {
    /// Spawns the flush loop. The first flush error is sent on `fault_tx`
    /// and ends the loop.
    pub fn spawn(
        surface: Arc<dyn Surface>,
        interval: Duration,
        fault_tx: Sender<io::Error>,
    ) -> io::Result<Self> {
        let (stop_tx, stop_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("glyphrain-flusher".to_string())
            .spawn(move || Self::run_loop(&*surface, interval, &stop_rx, &fault_tx))?;
        Ok(Self {
            handle: Some(handle),
            stop_tx,
        })
    }

    fn run_loop(
        surface: &dyn Surface,
        interval: Duration,
        stop_rx: &Receiver<()>,
        fault_tx: &Sender<io::Error>,
    ) {
        loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => break,
            }
            if let Err(e) = surface.flush() {
                error!("flush failed: {}", e);
                let _ = fault_tx.send(e);
                break;
            }
        }
        debug!("flusher stopped");
    }

    pub fn join(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.stop();
    }
}
