// Copyright (c) 2026 rezky_nightky

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};

use crate::column::Column;
use crate::context::RainContext;

#[derive(Default)]
struct Registry {
    width: u16,
    columns: BTreeMap<u16, Column>,
}

/// Keeps exactly one running [`Column`] per terminal column.
pub struct ColumnManager {
    ctx: Arc<RainContext>,
    registry: Mutex<Registry>,
}

impl ColumnManager {
    pub fn new(ctx: Arc<RainContext>) -> Self {
        Self {
            ctx,
            registry: Mutex::new(Registry::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_resize(&self, width: u16, height: u16) -> io::Result<()> {
        let mut reg = self.lock();
        self.ctx.size.set(width, height);

        let current = reg.width;
        if width == current {
            debug!("resize to {}x{} keeps {} columns", width, height, current);
            return Ok(());
        }

        if width > current {
            info!("starting {} new columns", width - current);
            for index in current..width {
                let column = match Column::start(index, Arc::clone(&self.ctx)) {
                    Ok(c) => c,
                    Err(e) => {
                        reg.width = index;
                        return Err(e);
                    }
                };
                column.request_spawn();
                reg.columns.insert(index, column);
            }
        } else {
            info!("closing {} columns", current - width);
            let removed: Vec<Column> = (width..current)
                .rev()
                .filter_map(|index| reg.columns.remove(&index))
                .collect();
            for column in removed {
                debug!(
                    "stopping column {} after {} streams",
                    column.index(),
                    column.spawned_total()
                );
                column.stop();
            }
        }

        reg.width = width;
        Ok(())
    }

    pub fn shutdown(&self) {
        let mut reg = self.lock();
        let columns = std::mem::take(&mut reg.columns);
        reg.width = 0;
        let count = columns.len();
        for (_, column) in columns.into_iter().rev() {
            column.stop();
        }
        info!("all {} columns stopped", count);
    }

    pub fn width(&self) -> u16 {
        self.lock().width
    }

    pub fn column_count(&self) -> usize {
        self.lock().columns.len()
    }

    #[cfg(test)]
    pub fn column_indices(&self) -> Vec<u16> {
        self.lock().columns.keys().copied().collect()
    }

    pub fn live_streams(&self) -> usize {
        self.lock()
            .columns
            .values()
            .map(|c| c.live_streams())
            .sum()
    }
}

impl Drop for ColumnManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::column::ColumnPhase;
    use crate::config::{RainConfig, U16Range};
    use crate::context::testing::{context_with, quick_config, wait_until};
    use crate::surface::testing::MemorySurface;

    fn manager(surface: &Arc<MemorySurface>, config: RainConfig) -> ColumnManager {
        ColumnManager::new(context_with(Arc::clone(surface), config))
    }

    #[test_log::test]
    fn growing_from_zero_creates_every_column_and_they_all_rain() {
        let surface = Arc::new(MemorySurface::new(5, 20));
        let m = manager(&surface, quick_config());
        m.on_resize(0, 0).unwrap();
        assert_eq!(m.column_count(), 0);

        m.on_resize(5, 20).unwrap();
        assert_eq!(m.column_indices(), vec![0, 1, 2, 3, 4]);
        assert!(wait_until(Duration::from_secs(1), || {
            (0..5).all(|c| surface.writes_in_column(c) > 0)
        }));
    }

    #[test_log::test]
    fn same_size_resize_is_a_no_op() {
        let surface = Arc::new(MemorySurface::new(3, 20));
        let m = manager(&surface, quick_config());
        m.on_resize(3, 20).unwrap();
        let before = m.column_indices();
        m.on_resize(3, 20).unwrap();
        assert_eq!(m.column_indices(), before);
        assert_eq!(m.width(), 3);
    }

    #[test_log::test]
    fn height_only_change_updates_size_state() {
        let surface = Arc::new(MemorySurface::new(3, 40));
        let ctx = context_with(Arc::clone(&surface), quick_config());
        let m = ColumnManager::new(Arc::clone(&ctx));
        m.on_resize(3, 20).unwrap();
        m.on_resize(3, 40).unwrap();
        assert_eq!(ctx.size.get(), (3, 40));
        assert_eq!(m.column_count(), 3);
    }

    #[test_log::test]
    fn shrinking_stops_removed_columns_and_their_writes() {
        let surface = Arc::new(MemorySurface::new(10, 20));
        let config = RainConfig {
            length: U16Range { low: 18, high: 18 },
            spawn_delay_ms: 0,
            ..quick_config()
        };
        let m = manager(&surface, config);
        m.on_resize(10, 20).unwrap();
        assert!(wait_until(Duration::from_secs(1), || {
            (4..10).all(|c| surface.writes_in_column(c) > 0)
        }));

        m.on_resize(4, 20).unwrap();
        assert_eq!(m.column_indices(), vec![0, 1, 2, 3]);

        let frozen: Vec<usize> = (4..10).map(|c| surface.writes_in_column(c)).collect();
        thread::sleep(Duration::from_millis(40));
        let later: Vec<usize> = (4..10).map(|c| surface.writes_in_column(c)).collect();
        assert_eq!(frozen, later);
    }

    #[test_log::test]
    fn grow_then_shrink_back_leaves_original_columns() {
        let surface = Arc::new(MemorySurface::new(8, 20));
        let m = manager(&surface, quick_config());
        m.on_resize(3, 20).unwrap();
        m.on_resize(8, 20).unwrap();
        m.on_resize(3, 20).unwrap();
        assert_eq!(m.column_indices(), vec![0, 1, 2]);
        assert!(m.live_streams() <= 3 * quick_config().streams_per_column(20));
    }

    #[test_log::test]
    fn regrown_index_gets_a_fresh_column() {
        let surface = Arc::new(MemorySurface::new(2, 20));
        let config = RainConfig {
            spawn_delay_ms: 50,
            ..quick_config()
        };
        let m = manager(&surface, config);
        m.on_resize(2, 20).unwrap();
        assert!(wait_until(Duration::from_secs(1), || {
            surface.writes_in_column(1) > 0
        }));
        m.on_resize(1, 20).unwrap();
        m.on_resize(2, 20).unwrap();

        let reg = m.lock();
        let fresh = &reg.columns[&1];
        assert_eq!(fresh.index(), 1);
        assert_eq!(fresh.phase(), ColumnPhase::Active);
        assert!(fresh.spawned_total() <= 1);
    }

    #[test_log::test]
    fn concurrent_resizes_leave_a_consistent_registry() {
        let surface = Arc::new(MemorySurface::new(6, 20));
        let m = Arc::new(manager(&surface, quick_config()));
        m.on_resize(6, 20).unwrap();

        let a = {
            let m = Arc::clone(&m);
            thread::spawn(move || m.on_resize(5, 20).unwrap())
        };
        let b = {
            let m = Arc::clone(&m);
            thread::spawn(move || m.on_resize(3, 20).unwrap())
        };
        a.join().unwrap();
        b.join().unwrap();

        let reg = m.lock();
        let expect: Vec<u16> = (0..reg.width).collect();
        assert_eq!(reg.columns.keys().copied().collect::<Vec<_>>(), expect);
        assert!(reg.width == 5 || reg.width == 3);
        assert!(reg
            .columns
            .values()
            .all(|c| c.phase() == ColumnPhase::Active));
    }

    #[test_log::test]
    fn sequential_grow_then_shrink_ends_with_three_columns() {
        let surface = Arc::new(MemorySurface::new(5, 20));
        let m = manager(&surface, quick_config());
        m.on_resize(5, 20).unwrap();
        m.on_resize(3, 20).unwrap();
        assert_eq!(m.column_indices(), vec![0, 1, 2]);
    }

    #[test_log::test]
    fn shutdown_stops_everything() {
        let surface = Arc::new(MemorySurface::new(4, 20));
        let m = manager(&surface, quick_config());
        m.on_resize(4, 20).unwrap();
        assert!(wait_until(Duration::from_secs(1), || surface.total_writes() > 0));
        m.shutdown();
        assert_eq!(m.column_count(), 0);
        assert_eq!(m.width(), 0);
        let writes = surface.total_writes();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(surface.total_writes(), writes);
    }
}
