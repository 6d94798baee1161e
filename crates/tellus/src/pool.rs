//! The worker pool: pending-task queue, worker buckets and the execution
//! substrate.
//!
//! The pool owns all coordination state: the priority queue and the
//! available/busy/finished buckets live on the coordinator thread and are
//! never shared. Workers are stateless: each receives a self-contained
//! [`BuildJob`] and answers with a self-contained geometry buffer over a
//! completion channel the coordinator polls once per tick, so no locking is
//! needed on either side.
//!
//! Pending tasks are ordered by ascending chunk depth (shallow first, FIFO
//! within a depth): a missing coarse chunk is a hole over a large area,
//! while a missing fine chunk is merely lower resolution.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, RwLock};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tellus_patch::{PatchGeometry, PatchParams, build_patch};
use tracing::{debug, warn};

use crate::chunk::{ChunkId, ChunkState, ChunkStore};
use crate::error::{Error, Result};
use crate::renderer::Renderer;
use crate::tasks::{ApplyTask, DeleteTask, Task};

/// Index of a worker within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(pub(crate) usize);

impl WorkerId {
    /// The worker's index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A self-contained job posted to one worker.
#[derive(Debug, Clone)]
pub struct BuildJob {
    /// The chunk the result is destined for.
    pub chunk: ChunkId,
    /// Everything the worker needs to compute the geometry.
    pub params: PatchParams,
}

/// A finished job collected from the substrate.
#[derive(Debug)]
pub struct CompletedBuild {
    /// The worker that ran the job.
    pub worker: WorkerId,
    /// The chunk the result is destined for.
    pub chunk: ChunkId,
    /// The computed buffers.
    pub geometry: PatchGeometry,
}

/// The worker execution substrate.
///
/// [`ThreadBackend`] is the production implementation; [`InlineBackend`]
/// lets tests complete jobs deterministically in any order.
pub trait WorkerBackend {
    /// Number of workers the substrate was created with.
    fn worker_count(&self) -> usize;

    /// Hand a job to a worker. Returns `false` when the worker is lost
    /// (its thread died); the caller decides what to do with the job.
    fn post(&mut self, worker: WorkerId, job: BuildJob) -> bool;

    /// Collect whatever results have arrived. Never blocks.
    fn try_collect(&mut self) -> Vec<CompletedBuild>;
}

/// OS-thread workers fed over per-worker channels.
///
/// Results funnel back over one shared completion channel. Threads exit on
/// their own when the backend is dropped and the job channels disconnect.
pub struct ThreadBackend {
    senders: Vec<Sender<BuildJob>>,
    results: Receiver<CompletedBuild>,
}

impl ThreadBackend {
    /// Spawn `workers` threads (at least one).
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let (result_tx, results) = unbounded();
        let mut senders = Vec::with_capacity(workers);

        for index in 0..workers {
            let (job_tx, job_rx) = unbounded::<BuildJob>();
            let tx = result_tx.clone();
            thread::Builder::new()
                .name(format!("tellus-worker-{index}"))
                .spawn(move || {
                    while let Ok(job) = job_rx.recv() {
                        let completed = CompletedBuild {
                            worker: WorkerId(index),
                            chunk: job.chunk,
                            geometry: build_patch(&job.params),
                        };
                        if tx.send(completed).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|e| Error::WorkerSpawn {
                    index,
                    message: e.to_string(),
                })?;
            senders.push(job_tx);
        }

        Ok(Self { senders, results })
    }

    /// Default pool size: hardware concurrency minus one core reserved for
    /// the coordinator.
    #[must_use]
    pub fn default_worker_count() -> usize {
        num_cpus::get().saturating_sub(1).max(1)
    }
}

impl WorkerBackend for ThreadBackend {
    fn worker_count(&self) -> usize {
        self.senders.len()
    }

    fn post(&mut self, worker: WorkerId, job: BuildJob) -> bool {
        // A send failure means the worker's receiver is gone: the thread
        // panicked and is permanently lost.
        self.senders[worker.0].send(job).is_ok()
    }

    fn try_collect(&mut self) -> Vec<CompletedBuild> {
        let mut out = Vec::new();
        while let Ok(completed) = self.results.try_recv() {
            out.push(completed);
        }
        out
    }
}

#[derive(Debug, Default)]
struct InlineInner {
    workers: usize,
    dead: Vec<bool>,
    queued: Vec<(WorkerId, BuildJob)>,
    completed: Vec<CompletedBuild>,
}

/// A deterministic substrate for tests: posted jobs sit until completed
/// explicitly, in whatever order the caller chooses.
///
/// Clones share state, so a test can keep one handle while the pool owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct InlineBackend {
    inner: Arc<RwLock<InlineInner>>,
}

impl InlineBackend {
    /// Create a backend with `workers` virtual workers.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            inner: Arc::new(RwLock::new(InlineInner {
                workers,
                dead: vec![false; workers],
                queued: Vec::new(),
                completed: Vec::new(),
            })),
        }
    }

    /// Number of jobs posted but not yet completed.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.inner.read().unwrap().queued.len()
    }

    /// Chunks with queued jobs, oldest first.
    #[must_use]
    pub fn queued_chunks(&self) -> Vec<ChunkId> {
        self.inner
            .read()
            .unwrap()
            .queued
            .iter()
            .map(|(_, job)| job.chunk)
            .collect()
    }

    /// Complete the oldest queued job; returns its chunk.
    pub fn complete_next(&self) -> Option<ChunkId> {
        if self.queued_count() == 0 {
            return None;
        }
        Some(self.complete_at(0))
    }

    /// Complete the queued job at `index` (adversarial ordering).
    pub fn complete_at(&self, index: usize) -> ChunkId {
        let mut inner = self.inner.write().unwrap();
        let (worker, job) = inner.queued.remove(index);
        let chunk = job.chunk;
        let geometry = build_patch(&job.params);
        inner.completed.push(CompletedBuild {
            worker,
            chunk,
            geometry,
        });
        chunk
    }

    /// Complete the queued job for a specific chunk; returns whether one
    /// was found.
    pub fn complete_chunk(&self, chunk: ChunkId) -> bool {
        let index = {
            let inner = self.inner.read().unwrap();
            inner.queued.iter().position(|(_, job)| job.chunk == chunk)
        };
        match index {
            Some(index) => {
                self.complete_at(index);
                true
            }
            None => false,
        }
    }

    /// Complete every queued job, oldest first.
    pub fn complete_all(&self) {
        while self.complete_next().is_some() {}
    }

    /// Kill a worker: its queued jobs vanish (they will never complete)
    /// and every later post to it fails.
    pub fn fail_worker(&self, worker: WorkerId) {
        let mut inner = self.inner.write().unwrap();
        inner.dead[worker.0] = true;
        inner.queued.retain(|(w, _)| *w != worker);
    }
}

impl WorkerBackend for InlineBackend {
    fn worker_count(&self) -> usize {
        self.inner.read().unwrap().workers
    }

    fn post(&mut self, worker: WorkerId, job: BuildJob) -> bool {
        let mut inner = self.inner.write().unwrap();
        if inner.dead[worker.0] {
            return false;
        }
        inner.queued.push((worker, job));
        true
    }

    fn try_collect(&mut self) -> Vec<CompletedBuild> {
        std::mem::take(&mut self.inner.write().unwrap().completed)
    }
}

/// A pending task with its priority key.
struct Pending {
    depth: u32,
    seq: u64,
    task: Task,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the shallowest (then oldest)
        // task surfaces first.
        other
            .depth
            .cmp(&self.depth)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// In-flight bookkeeping for one busy worker.
struct InFlight {
    chunk: ChunkId,
    deletes: Vec<DeleteTask>,
}

/// The coordinator-owned worker pool.
pub struct WorkerPool {
    backend: Box<dyn WorkerBackend>,
    pending: BinaryHeap<Pending>,
    next_seq: u64,
    available: Vec<WorkerId>,
    busy: HashMap<usize, InFlight>,
    finished: Vec<WorkerId>,
    lost: usize,
}

impl WorkerPool {
    /// Create a pool with `workers` threads.
    pub fn new(workers: usize) -> Result<Self> {
        Ok(Self::with_backend(Box::new(ThreadBackend::new(workers)?)))
    }

    /// Create a pool over a custom execution substrate.
    #[must_use]
    pub fn with_backend(backend: Box<dyn WorkerBackend>) -> Self {
        let available = (0..backend.worker_count()).map(WorkerId).collect();
        Self {
            backend,
            pending: BinaryHeap::new(),
            next_seq: 0,
            available,
            busy: HashMap::new(),
            finished: Vec::new(),
            lost: 0,
        }
    }

    /// Queue a task for dispatch.
    pub fn submit(&mut self, task: Task) {
        let pending = Pending {
            depth: task.depth(),
            seq: self.next_seq,
            task,
        };
        self.next_seq += 1;
        self.pending.push(pending);
    }

    /// Whether any task is waiting.
    #[must_use]
    pub fn has_task(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Pop the highest-priority pending task.
    ///
    /// # Panics
    ///
    /// Panics when the queue is empty; callers must check
    /// [`has_task`](Self::has_task) first.
    pub fn next_task(&mut self) -> Task {
        self.pending
            .pop()
            .expect("next_task called on an empty queue; check has_task first")
            .task
    }

    /// Hand pending tasks to idle workers.
    ///
    /// Consecutive delete tasks following a build in priority order ride
    /// along with that build and fire when its geometry applies. A delete
    /// at the queue head (its build went out on an earlier tick when the
    /// worker set ran short) is returned for the deferred-delete path.
    pub(crate) fn dispatch<R: Renderer>(&mut self, store: &mut ChunkStore<R>) -> Vec<DeleteTask> {
        let mut solitary = Vec::new();

        loop {
            while let Some(delete) = self.pop_if_delete() {
                debug!(
                    depth = delete.depth,
                    "delete task with no preceding build; deferring"
                );
                solitary.push(delete);
            }
            if !self.has_task() {
                break;
            }
            let Some(worker) = self.available.pop() else {
                break;
            };

            let Task::Build(build) = self.next_task() else {
                unreachable!("queue head checked to be a build task");
            };
            let mut deletes = Vec::new();
            while let Some(delete) = self.pop_if_delete() {
                deletes.push(delete);
            }

            let Some(chunk) = store.get_mut(build.chunk) else {
                // The chunk was disposed after submission (reset); there is
                // nothing to build, but the coalesced deletes still matter.
                debug!(chunk = ?build.chunk, "dropping build for a chunk that no longer exists");
                solitary.extend(deletes);
                self.available.push(worker);
                continue;
            };

            chunk.state = ChunkState::Building;
            let job = BuildJob {
                chunk: build.chunk,
                params: build.params.clone(),
            };
            if self.backend.post(worker, job) {
                self.busy.insert(
                    worker.0,
                    InFlight {
                        chunk: build.chunk,
                        deletes,
                    },
                );
            } else {
                // The worker died before taking the job; it leaves the
                // rotation and the task goes back for the next tick.
                warn!(worker = worker.0, "worker lost; requeueing its build task");
                self.lost += 1;
                chunk.state = ChunkState::Unbuilt;
                self.submit(Task::Build(build));
                for delete in deletes {
                    self.submit(Task::Delete(delete));
                }
            }
        }

        solitary
    }

    /// Collect finished workers' results as apply tasks.
    pub(crate) fn collect(&mut self) -> Vec<ApplyTask> {
        let mut applies = Vec::new();
        for completed in self.backend.try_collect() {
            let Some(in_flight) = self.busy.remove(&completed.worker.0) else {
                debug!(
                    worker = completed.worker.0,
                    "result from a worker with no in-flight record"
                );
                continue;
            };
            self.finished.push(completed.worker);
            applies.push(ApplyTask {
                chunk: in_flight.chunk,
                geometry: completed.geometry,
                deletes: in_flight.deletes,
            });
        }
        applies
    }

    /// Merge workers that finished since the last tick back into the
    /// available set.
    pub(crate) fn recycle(&mut self) {
        self.available.append(&mut self.finished);
    }

    /// Number of tasks waiting for a worker.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of idle workers.
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    /// Number of workers with a job in flight.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.busy.len()
    }

    /// Number of workers permanently lost.
    #[must_use]
    pub fn lost_count(&self) -> usize {
        self.lost
    }

    fn pop_if_delete(&mut self) -> Option<DeleteTask> {
        let head_is_delete =
            matches!(self.pending.peek(), Some(p) if matches!(p.task, Task::Delete(_)));
        if !head_is_delete {
            return None;
        }
        match self.pending.pop() {
            Some(Pending {
                task: Task::Delete(delete),
                ..
            }) => Some(delete),
            _ => unreachable!("queue head was just checked to be a delete"),
        }
    }
}
