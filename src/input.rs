// Copyright (c) 2026 rezky_nightky

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};

use crate::charset::Charset;
use crate::terminal::Terminal;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Resize { width: u16, height: u16 },
    Key { code: KeyCode, modifiers: KeyModifiers },
    Error(String),
}

impl InputEvent {
    pub fn from_crossterm(event: Event) -> Option<Self> {
        match event {
            Event::Resize(width, height) => Some(InputEvent::Resize { width, height }),
            Event::Key(k) if k.kind == KeyEventKind::Press => Some(InputEvent::Key {
                code: k.code,
                modifiers: k.modifiers,
            }),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Clear,
    Glyphs(Charset),
    Ignore,
}

pub fn key_action(code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
    match (code, modifiers) {
        (KeyCode::Char('c' | 'z'), m) if m.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        (KeyCode::Esc, _) | (KeyCode::Char('q'), _) => KeyAction::Quit,
        (KeyCode::Char('c'), _) => KeyAction::Clear,
        (KeyCode::Char('a'), _) => KeyAction::Glyphs(Charset::Ascii),
        (KeyCode::Char('k'), _) => KeyAction::Glyphs(Charset::Kana),
        _ => KeyAction::Ignore,
    }
}

pub struct InputActor {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl InputActor {
    pub fn spawn(sender: Sender<InputEvent>, poll_timeout: Duration) -> io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("glyphrain-input".to_string())
            .spawn(move || Self::run_loop(&sender, &flag, poll_timeout))?;
        Ok(Self {
            handle: Some(handle),
            shutdown,
        })
    }

    fn run_loop(sender: &Sender<InputEvent>, shutdown: &AtomicBool, poll_timeout: Duration) {
        while !shutdown.load(Ordering::Relaxed) {
            let event = match Terminal::poll_event(poll_timeout) {
                Ok(false) => continue,
                Ok(true) => Terminal::read_event(),
                Err(e) => Err(e),
            };
            let msg = match event {
                Ok(ev) => match InputEvent::from_crossterm(ev) {
                    Some(msg) => msg,
                    None => continue,
                },
                Err(e) => InputEvent::Error(e.to_string()),
            };
            let fatal = matches!(msg, InputEvent::Error(_));
            if sender.send(msg).is_err() || fatal {
                break;
            }
        }
    }

    pub fn join(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputActor {
    fn drop(&mut self) {
        self.stop();
    }
}
