//! Background tile generation on a fixed pool of worker threads.
//!
//! Tasks wait in a bounded priority queue and workers always take the task
//! with the lowest priority value, oldest first among equals. Each task
//! carries a cancellation flag registered under its coordinate together with
//! a submission id, so a late result from an earlier submission never clears
//! the entry of a newer one. A worker inserts a finished, uncancelled tile
//! into the shared cache before publishing the result, so the cache only
//! ever receives complete bundles.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;
use harmonia_config::StreamingConfig;
use tracing::{info, warn};

use crate::cache::SharedTileCache;
use crate::coords::TileCoordinate;
use crate::error::WorldgenError;
use crate::metabolism::MetabolismSnapshot;
use crate::pipeline::{TileBundle, TileGenerator, TileRequest};

/// A request to generate a single tile.
#[derive(Clone, Debug)]
pub struct GenerationTask {
    pub request: TileRequest,
    /// Lower values are generated first; typically the squared tile
    /// distance to the viewer.
    pub priority: u64,
}

/// Outcome of one background generation.
#[derive(Debug)]
pub struct GeneratedTile {
    pub coord: TileCoordinate,
    /// Id of the submission that produced this result.
    pub submission: u64,
    /// The cached bundle, or why generation failed.
    pub result: Result<Arc<TileBundle>, WorldgenError>,
    /// Generation time in microseconds.
    pub generation_time_us: u64,
}

struct PrioritizedTask {
    task: GenerationTask,
    submission: u64,
    cancelled: Arc<AtomicBool>,
}

impl PrioritizedTask {
    fn key(&self) -> Reverse<(u64, u64)> {
        Reverse((self.task.priority, self.submission))
    }
}

impl PartialEq for PrioritizedTask {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PrioritizedTask {}

impl PartialOrd for PrioritizedTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.key().cmp(&other.key())
    }
}

struct QueueState {
    heap: BinaryHeap<PrioritizedTask>,
    closed: bool,
}

/// Bounded min-priority queue shared by the submitter and the workers.
struct TaskQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
    capacity: usize,
}

impl TaskQueue {
    fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                closed: false,
            }),
            ready: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the task back if the queue is full or closed.
    fn try_push(&self, task: PrioritizedTask) -> Result<(), PrioritizedTask> {
        let mut state = self.lock();
        if state.closed || state.heap.len() >= self.capacity {
            return Err(task);
        }
        state.heap.push(task);
        drop(state);
        self.ready.notify_one();
        Ok(())
    }

    /// Block until a task is available. `None` once the queue is closed.
    fn pop(&self) -> Option<PrioritizedTask> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(task) = state.heap.pop() {
                return Some(task);
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }
}

struct ActiveTask {
    submission: u64,
    cancelled: Arc<AtomicBool>,
}

/// Manages tile generation across a thread pool.
pub struct AsyncTileGenerator {
    queue: Arc<TaskQueue>,
    result_receiver: Receiver<GeneratedTile>,
    active_tasks: Arc<DashMap<TileCoordinate, ActiveTask>>,
    next_submission: AtomicU64,
    in_flight: Arc<AtomicU64>,
    cache: SharedTileCache,
}

impl AsyncTileGenerator {
    /// Start `thread_count` workers (minimum 1).
    ///
    /// `max_concurrent` bounds the task queue; `result_capacity` bounds the
    /// result channel.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::WorkerSpawn`] if the OS refuses a thread.
    pub fn new(
        generator: Arc<TileGenerator>,
        cache: SharedTileCache,
        thread_count: usize,
        max_concurrent: usize,
        result_capacity: usize,
    ) -> Result<Self, WorldgenError> {
        let queue = Arc::new(TaskQueue::new(max_concurrent));
        let (result_sender, result_receiver) = bounded::<GeneratedTile>(result_capacity.max(1));
        let in_flight = Arc::new(AtomicU64::new(0));
        let active_tasks = Arc::new(DashMap::new());
        let thread_count = thread_count.max(1);

        for _ in 0..thread_count {
            let queue_ref = Arc::clone(&queue);
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);
            let generator = Arc::clone(&generator);
            let cache = Arc::clone(&cache);

            let spawned = std::thread::Builder::new()
                .name("tile-gen-worker".into())
                .spawn(move || {
                    while let Some(ptask) = queue_ref.pop() {
                        run_task(&generator, &cache, &sender, ptask);
                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                });
            if let Err(e) = spawned {
                queue.close();
                return Err(WorldgenError::WorkerSpawn(e.to_string()));
            }
        }

        info!(threads = thread_count, queue = max_concurrent, "Started tile workers");
        Ok(Self {
            queue,
            result_receiver,
            active_tasks,
            next_submission: AtomicU64::new(0),
            in_flight,
            cache,
        })
    }

    /// Start a pool sized by the streaming configuration.
    ///
    /// Zero worker threads means "two fewer than the CPU cores, at least one".
    ///
    /// # Errors
    ///
    /// [`WorldgenError::WorkerSpawn`] if the OS refuses a thread.
    pub fn from_config(
        generator: Arc<TileGenerator>,
        cache: SharedTileCache,
        config: &StreamingConfig,
    ) -> Result<Self, WorldgenError> {
        let threads = match config.worker_threads {
            0 => (num_cpus::get().max(2) - 2).max(1),
            n => n as usize,
        };
        let max = config.max_in_flight as usize;
        Self::new(generator, cache, threads, max, max * 2)
    }

    /// The cache finished tiles are inserted into.
    pub fn cache(&self) -> &SharedTileCache {
        &self.cache
    }

    /// Queue a tile for background generation.
    ///
    /// Returns `Err(task)` if the queue is full or the tile is already pending.
    #[allow(clippy::result_large_err)]
    pub fn submit(&self, task: GenerationTask) -> Result<(), GenerationTask> {
        let coord = task.request.coord;
        if self.active_tasks.contains_key(&coord) {
            return Err(task);
        }
        let submission = self.next_submission.fetch_add(1, Ordering::Relaxed);
        let cancelled = Arc::new(AtomicBool::new(false));
        self.active_tasks.insert(
            coord,
            ActiveTask {
                submission,
                cancelled: Arc::clone(&cancelled),
            },
        );
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        let ptask = PrioritizedTask {
            task,
            submission,
            cancelled,
        };
        self.queue.try_push(ptask).map_err(|rejected| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            self.active_tasks.remove(&coord);
            rejected.task
        })
    }

    /// Queue every tile within `radius` rings of `center` that is neither
    /// cached nor pending, nearest first. Stops at the first full-queue
    /// rejection. Returns how many tiles were queued.
    pub fn prefetch_around(
        &self,
        center: TileCoordinate,
        radius: u32,
        seed: u64,
        metabolism: MetabolismSnapshot,
    ) -> usize {
        let cached: Vec<bool> = {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            center
                .tiles_within(radius)
                .iter()
                .map(|c| cache.contains(*c))
                .collect()
        };

        let mut submitted = 0;
        for (coord, is_cached) in center.tiles_within(radius).into_iter().zip(cached) {
            if is_cached || self.is_pending(&coord) {
                continue;
            }
            let task = GenerationTask {
                request: TileRequest::new(seed, coord, metabolism),
                priority: coord.distance_squared(center),
            };
            if self.submit(task).is_err() {
                break;
            }
            submitted += 1;
        }
        submitted
    }

    /// Cancel every pending tile farther than `radius` rings from `center`.
    /// Returns how many were cancelled.
    pub fn retain_within(&self, center: TileCoordinate, radius: u32) -> usize {
        let outside: Vec<TileCoordinate> = self
            .active_tasks
            .iter()
            .map(|entry| *entry.key())
            .filter(|c| c.ring_distance(center) > radius)
            .collect();
        for coord in &outside {
            self.cancel(coord);
        }
        outside.len()
    }

    /// Cancel a pending or in-progress tile. No-op if it already finished.
    pub fn cancel(&self, coord: &TileCoordinate) {
        if let Some((_, active)) = self.active_tasks.remove(coord) {
            active.cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Drain all finished tiles from the result channel.
    pub fn drain_results(&self) -> Vec<GeneratedTile> {
        let mut results = Vec::new();
        while let Ok(tile) = self.result_receiver.try_recv() {
            self.finish(&tile);
            results.push(tile);
        }
        results
    }

    /// Wait up to `timeout` for the next finished tile.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<GeneratedTile> {
        let tile = self.result_receiver.recv_timeout(timeout).ok()?;
        self.finish(&tile);
        Some(tile)
    }

    /// Clear the pending entry of `tile` unless a newer submission replaced it.
    fn finish(&self, tile: &GeneratedTile) {
        self.active_tasks
            .remove_if(&tile.coord, |_, active| active.submission == tile.submission);
    }

    /// Number of tasks queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns `true` if a task for `coord` is pending.
    pub fn is_pending(&self, coord: &TileCoordinate) -> bool {
        self.active_tasks.contains_key(coord)
    }
}

fn run_task(
    generator: &TileGenerator,
    cache: &SharedTileCache,
    sender: &Sender<GeneratedTile>,
    ptask: PrioritizedTask,
) {
    if ptask.cancelled.load(Ordering::Relaxed) {
        return;
    }

    let coord = ptask.task.request.coord;
    let start = Instant::now();
    let outcome = generator.generate_cancellable(&ptask.task.request, &ptask.cancelled);
    let elapsed = start.elapsed().as_micros() as u64;

    let result = match outcome {
        Ok(bundle) if !ptask.cancelled.load(Ordering::Relaxed) => {
            let bundle = Arc::new(bundle);
            cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert_at(Arc::clone(&bundle), Instant::now());
            Ok(bundle)
        }
        Ok(_) | Err(WorldgenError::Cancelled) => return,
        Err(err) => {
            warn!(%coord, error = %err, "Tile generation failed");
            Err(err)
        }
    };

    let _ = sender.send(GeneratedTile {
        coord,
        submission: ptask.submission,
        result,
        generation_time_us: elapsed,
    });
}

impl Drop for AsyncTileGenerator {
    fn drop(&mut self) {
        self.queue.close();
    }
}
