// Copyright (c) 2026 rezky_nightky

use std::collections::HashMap;
use std::io;
#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use rand::Rng;

use crate::context::RainContext;
use crate::stream::{Stream, Trail};

// How long a column holds its spawn request while the screen has no rows.
const ZERO_HEIGHT_IDLE: Duration = Duration::from_millis(100);

/// Lifecycle of a column. `Stopped` is terminal: no spawn request is
/// serviced once the column has left `Active`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnPhase {
    Active,
    Stopping,
    Stopped,
}

struct StreamHandle {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

struct StreamSet {
    phase: ColumnPhase,
    next_id: u64,
    live: HashMap<u64, StreamHandle>,
    deferred: usize,
}

pub(crate) struct ColumnShared {
    index: u16,
    spawn_tx: Sender<()>,
    streams: Mutex<StreamSet>,
    spawned: AtomicU64,
    #[cfg(test)]
    failing_spawns: AtomicUsize,
}

impl ColumnShared {
    fn new(index: u16, spawn_tx: Sender<()>) -> Self {
        Self {
            index,
            spawn_tx,
            streams: Mutex::new(StreamSet {
                phase: ColumnPhase::Active,
                next_id: 0,
                live: HashMap::new(),
                deferred: 0,
            }),
            spawned: AtomicU64::new(0),
            #[cfg(test)]
            failing_spawns: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StreamSet> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn index(&self) -> u16 {
        self.index
    }

    pub(crate) fn request_spawn(&self) {
        // The worker owns the receiver for as long as this struct lives.
        let _ = self.spawn_tx.send(());
    }

    pub(crate) fn retire(&self, id: u64) {
        let mut set = self.lock();
        if set.live.remove(&id).is_none() {
            return;
        }
        if set.deferred > 0 && set.phase == ColumnPhase::Active {
            set.deferred -= 1;
            let _ = self.spawn_tx.send(());
        }
    }

    #[cfg(test)]
    fn phase(&self) -> ColumnPhase {
        self.lock().phase
    }

    fn live_streams(&self) -> usize {
        self.lock().live.len()
    }

    fn spawn_stream<R: Rng + ?Sized>(self: &Arc<Self>, ctx: &Arc<RainContext>, rng: &mut R) {
        let mut set = self.lock();
        if set.phase != ColumnPhase::Active {
            return;
        }

        let cap = ctx.config.streams_per_column(ctx.size.height());
        if set.live.len() >= cap {
            set.deferred += 1;
            debug!(
                "column {} at capacity ({}), deferring spawn",
                self.index, cap
            );
            return;
        }

        let id = set.next_id;
        set.next_id += 1;
        let (stop_tx, stop_rx) = bounded(1);
        let stream = Stream::new(
            id,
            Arc::clone(self),
            Arc::clone(ctx),
            Trail::random(&ctx.config, rng),
            stop_rx,
        );

        match self.start_thread(id, stream) {
            Ok(thread) => {
                set.live.insert(id, StreamHandle { stop_tx, thread });
                self.spawned.fetch_add(1, Ordering::Relaxed);
                debug!("now have {} streams in column {}", set.live.len(), self.index);
            }
            Err(e) => {
                // It may be the column's only request in flight.
                warn!("column {}: could not start stream: {}", self.index, e);
                let _ = self.spawn_tx.send(());
            }
        }
    }

    fn start_thread(&self, id: u64, stream: Stream) -> io::Result<JoinHandle<()>> {
        if let Some(e) = self.injected_failure() {
            return Err(e);
        }
        thread::Builder::new()
            .name(format!("glyphrain-stream-{}-{}", self.index, id))
            .spawn(move || stream.run())
    }

    #[cfg(test)]
    fn injected_failure(&self) -> Option<io::Error> {
        self.failing_spawns
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|_| io::Error::other("injected spawn failure"))
    }

    #[cfg(not(test))]
    fn injected_failure(&self) -> Option<io::Error> {
        None
    }

    fn begin_stop(&self) -> Vec<StreamHandle> {
        let mut set = self.lock();
        set.phase = ColumnPhase::Stopping;
        set.deferred = 0;
        set.live.drain().map(|(_, h)| h).collect()
    }

    fn finish_stop(&self) {
        self.lock().phase = ColumnPhase::Stopped;
    }
}

struct ColumnWorker {
    shared: Arc<ColumnShared>,
    ctx: Arc<RainContext>,
    stop_rx: Receiver<()>,
    spawn_rx: Receiver<()>,
}

impl ColumnWorker {
    fn run(self) {
        let mut rng = rand::rng();
        loop {
            let requested = select! {
                recv(self.stop_rx) -> _ => false,
                recv(self.spawn_rx) -> msg => msg.is_ok(),
            };
            if !requested || !self.wait_before_spawn(&mut rng) {
                break;
            }
            if self.ctx.size.height() == 0 {
                if !self.idle(ZERO_HEIGHT_IDLE) {
                    break;
                }
                self.shared.request_spawn();
                continue;
            }
            self.shared.spawn_stream(&self.ctx, &mut rng);
        }
        self.shut_down();
    }

    fn wait_before_spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        let max = self.ctx.config.spawn_delay_ms;
        self.idle(Duration::from_millis(rng.random_range(0..=max) as u64))
    }

    // False if the column was told to stop while waiting.
    fn idle(&self, wait: Duration) -> bool {
        matches!(
            self.stop_rx.recv_timeout(wait),
            Err(RecvTimeoutError::Timeout)
        )
    }

    fn shut_down(&self) {
        let handles = self.shared.begin_stop();
        let count = handles.len();
        for h in &handles {
            let _ = h.stop_tx.try_send(());
        }
        for h in handles {
            if h.thread.join().is_err() {
                warn!("a stream on column {} panicked", self.shared.index);
            }
        }
        self.shared.finish_stop();
        info!(
            "column {} stopped ({} streams stopped)",
            self.shared.index, count
        );
    }
}

pub struct Column {
    index: u16,
    shared: Arc<ColumnShared>,
    stop_tx: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl Column {
    pub fn start(index: u16, ctx: Arc<RainContext>) -> io::Result<Self> {
        let (stop_tx, stop_rx) = bounded(1);
        let (spawn_tx, spawn_rx) = unbounded();
        let shared = Arc::new(ColumnShared::new(index, spawn_tx));
        let worker = ColumnWorker {
            shared: Arc::clone(&shared),
            ctx,
            stop_rx,
            spawn_rx,
        };
        let handle = thread::Builder::new()
            .name(format!("glyphrain-column-{}", index))
            .spawn(move || worker.run())?;
        Ok(Self {
            index,
            shared,
            stop_tx,
            worker: Some(handle),
        })
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn request_spawn(&self) {
        self.shared.request_spawn();
    }

    #[cfg(test)]
    pub fn phase(&self) -> ColumnPhase {
        self.shared.phase()
    }

    pub fn live_streams(&self) -> usize {
        self.shared.live_streams()
    }

    pub fn spawned_total(&self) -> u64 {
        self.shared.spawned.load(Ordering::Relaxed)
    }

    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("column {} worker panicked", self.index);
            }
        }
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::config::{RainConfig, U16Range};
    use crate::context::testing::{context_with, quick_config, wait_until};
    use crate::surface::testing::MemorySurface;

    #[test_log::test]
    fn seeded_column_spawns_within_delay() {
        let surface = Arc::new(MemorySurface::new(1, 20));
        let ctx = context_with(surface.clone(), quick_config());
        ctx.size.set(1, 20);

        let column = Column::start(0, ctx).unwrap();
        column.request_spawn();
        assert!(wait_until(Duration::from_millis(500), || column.spawned_total() >= 1));
        assert!(wait_until(Duration::from_millis(500), || surface.writes_in_column(0) > 0));
        assert_eq!(column.phase(), ColumnPhase::Active);
    }

    #[test_log::test]
    fn streams_keep_respawning_from_a_single_seed() {
        let surface = Arc::new(MemorySurface::new(1, 10));
        let ctx = context_with(surface, quick_config());
        ctx.size.set(1, 10);

        let column = Column::start(0, ctx).unwrap();
        column.request_spawn();
        assert!(wait_until(Duration::from_secs(2), || column.spawned_total() >= 5));
    }

    #[test_log::test]
    fn live_streams_never_exceed_height_bound() {
        let surface = Arc::new(MemorySurface::new(1, 9));
        let config = quick_config();
        let cap = config.streams_per_column(9);
        let ctx = context_with(surface, config);
        ctx.size.set(1, 9);

        let column = Column::start(0, ctx).unwrap();
        for _ in 0..20 {
            column.request_spawn();
        }
        let deadline = Instant::now() + Duration::from_millis(300);
        while Instant::now() < deadline {
            assert!(column.live_streams() <= cap);
            thread::sleep(Duration::from_millis(1));
        }
        assert!(column.spawned_total() > 1);
    }

    #[test_log::test]
    fn stop_silences_every_stream() {
        let surface = Arc::new(MemorySurface::new(1, 50));
        let config = RainConfig {
            speed_ms: U16Range { low: 2, high: 4 },
            length: U16Range { low: 40, high: 40 },
            spawn_delay_ms: 0,
            ..quick_config()
        };
        let ctx = context_with(surface.clone(), config);
        ctx.size.set(1, 50);

        let column = Column::start(0, ctx).unwrap();
        for _ in 0..3 {
            column.request_spawn();
        }
        assert!(wait_until(Duration::from_millis(500), || column.live_streams() >= 1));

        let shared = Arc::clone(&column.shared);
        column.stop();
        assert_eq!(shared.phase(), ColumnPhase::Stopped);
        assert_eq!(shared.live_streams(), 0);

        let writes = surface.writes_in_column(0);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(surface.writes_in_column(0), writes);

        let spawned = shared.spawned.load(Ordering::Relaxed);
        shared.request_spawn();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(shared.spawned.load(Ordering::Relaxed), spawned);
    }

    #[test_log::test]
    fn failed_stream_start_keeps_the_column_alive() {
        let surface = Arc::new(MemorySurface::new(1, 20));
        let ctx = context_with(surface.clone(), quick_config());
        ctx.size.set(1, 20);

        let column = Column::start(0, ctx).unwrap();
        column.shared.failing_spawns.store(3, Ordering::Release);
        column.request_spawn();
        assert!(wait_until(Duration::from_secs(1), || column.spawned_total() >= 1));
        assert_eq!(column.shared.failing_spawns.load(Ordering::Acquire), 0);
        assert!(wait_until(Duration::from_millis(500), || surface.writes_in_column(0) > 0));
    }

    #[test_log::test]
    fn zero_height_holds_spawns_until_rows_return() {
        let surface = Arc::new(MemorySurface::new(1, 20));
        let config = RainConfig {
            spawn_delay_ms: 0,
            ..quick_config()
        };
        let ctx = context_with(surface, config);
        ctx.size.set(1, 0);

        let column = Column::start(0, Arc::clone(&ctx)).unwrap();
        column.request_spawn();
        thread::sleep(Duration::from_millis(250));
        assert_eq!(column.spawned_total(), 0);

        ctx.size.set(1, 20);
        assert!(wait_until(Duration::from_secs(1), || column.spawned_total() >= 1));
    }

    #[test_log::test]
    fn stop_interrupts_a_long_spawn_delay() {
        let surface = Arc::new(MemorySurface::new(1, 20));
        let config = RainConfig {
            spawn_delay_ms: 60000,
            ..quick_config()
        };
        let ctx = context_with(surface, config);
        ctx.size.set(1, 20);

        let column = Column::start(0, ctx).unwrap();
        column.request_spawn();
        thread::sleep(Duration::from_millis(10));
        let started = Instant::now();
        column.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
