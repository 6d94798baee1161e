//! The chunk forge: per-frame driver of the build/delete/apply pipeline.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::chunk::{Chunk, ChunkId, ChunkState, ChunkStore, SurfaceId};
use crate::error::Result;
use crate::path::PatchPath;
use crate::pool::{ThreadBackend, WorkerBackend, WorkerPool};
use crate::renderer::Renderer;
use crate::tasks::{ApplyTask, DeleteTask, Task};

/// Counters describing the forge's current load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForgeStats {
    /// Tasks waiting for a worker.
    pub pending_tasks: usize,
    /// Workers with a job in flight.
    pub busy_workers: usize,
    /// Idle workers.
    pub available_workers: usize,
    /// Workers permanently lost since creation.
    pub lost_workers: usize,
    /// Completed builds waiting to be applied.
    pub queued_applies: usize,
    /// Delete tasks waiting on replacements.
    pub deferred_deletes: usize,
    /// Live chunks across all surfaces.
    pub chunks: usize,
    /// Live chunks with geometry.
    pub ready_chunks: usize,
}

/// The scheduler facade shared by every planet surface.
///
/// Owns the chunk store, the worker pool, the deferred-delete list and the
/// apply queue. [`update`](Self::update) runs once per render tick on the
/// coordinator thread and never blocks; worker results are consumed on
/// whatever later tick they arrive.
pub struct ChunkForge<R: Renderer> {
    store: ChunkStore<R>,
    pool: WorkerPool,
    apply_queue: VecDeque<ApplyTask>,
    deferred_deletes: Vec<DeleteTask>,
    next_surface: u32,
}

impl<R: Renderer> ChunkForge<R> {
    /// Create a forge with `workers` build threads.
    pub fn new(workers: usize) -> Result<Self> {
        Ok(Self::with_pool(WorkerPool::new(workers)?))
    }

    /// Create a forge sized to the machine: hardware concurrency minus one
    /// core reserved for the coordinator.
    pub fn for_this_machine() -> Result<Self> {
        let workers = ThreadBackend::default_worker_count();
        info!(workers, "creating chunk forge");
        Self::new(workers)
    }

    /// Create a forge over a custom worker substrate.
    #[must_use]
    pub fn with_backend(backend: Box<dyn WorkerBackend>) -> Self {
        Self::with_pool(WorkerPool::with_backend(backend))
    }

    fn with_pool(pool: WorkerPool) -> Self {
        Self {
            store: ChunkStore::new(),
            pool,
            apply_queue: VecDeque::new(),
            deferred_deletes: Vec::new(),
            next_surface: 0,
        }
    }

    /// Reserve an id for a new planet surface.
    pub fn allocate_surface(&mut self) -> SurfaceId {
        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        id
    }

    /// Create an empty chunk (disabled, unbuilt) for a surface.
    pub fn create_chunk(
        &mut self,
        surface: SurfaceId,
        path: PatchPath,
        radius: f64,
        wants_collision: bool,
        renderer: &mut R,
    ) -> ChunkId {
        let mesh = renderer.create_mesh(&path.to_string());
        self.store.insert(surface, path, radius, wants_collision, mesh)
    }

    /// Queue a task for dispatch.
    pub fn submit(&mut self, task: Task) {
        self.pool.submit(task);
    }

    /// Borrow a chunk.
    #[must_use]
    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk<R>> {
        self.store.get(id)
    }

    /// Whether a chunk exists and has geometry.
    #[must_use]
    pub fn is_ready(&self, id: ChunkId) -> bool {
        self.store.is_ready(id)
    }

    /// Run one scheduler tick. Four phases, in fixed order:
    ///
    /// 1. dispatch pending tasks to idle workers and collect finished
    ///    results into the apply queue
    /// 2. recycle finished workers into the available set
    /// 3. execute deferred deletions whose replacements are all resolved
    /// 4. apply at most one completed build; one per tick, deliberately,
    ///    so a burst of simultaneously finished workers cannot spike the
    ///    frame time with mesh uploads
    pub fn update(&mut self, renderer: &mut R) {
        let solitary = self.pool.dispatch(&mut self.store);
        self.deferred_deletes.extend(solitary);
        self.apply_queue.extend(self.pool.collect());

        self.pool.recycle();

        self.run_resolved_deletes(renderer);

        if let Some(apply) = self.apply_queue.pop_front() {
            self.apply(apply, renderer);
        }
    }

    /// Current load counters.
    #[must_use]
    pub fn stats(&self) -> ForgeStats {
        ForgeStats {
            pending_tasks: self.pool.pending_count(),
            busy_workers: self.pool.busy_count(),
            available_workers: self.pool.available_count(),
            lost_workers: self.pool.lost_count(),
            queued_applies: self.apply_queue.len(),
            deferred_deletes: self.deferred_deletes.len(),
            chunks: self.store.len(),
            ready_chunks: self.store.ready_count(),
        }
    }

    /// Dispose every chunk of a surface and forget it.
    ///
    /// Tasks and results still in flight for the removed chunks resolve
    /// harmlessly: builds are dropped at dispatch, results at apply, and
    /// deletes treat the missing chunks as already retired.
    pub fn remove_surface(&mut self, surface: SurfaceId, renderer: &mut R) {
        let ids = self.store.surface_ids(surface);
        info!(surface = surface.0, chunks = ids.len(), "removing surface");
        for id in ids {
            if let Some(mut chunk) = self.store.remove(id) {
                if let Some(collision) = chunk.collision.take() {
                    renderer.dispose_collision(collision);
                }
                renderer.dispose_mesh(chunk.mesh);
            }
        }
    }

    pub(crate) fn store_mut(&mut self) -> &mut ChunkStore<R> {
        &mut self.store
    }

    /// Apply one completed build to its chunk.
    fn apply(&mut self, task: ApplyTask, renderer: &mut R) {
        let ApplyTask {
            chunk: id,
            geometry,
            deletes,
        } = task;

        let Some(chunk) = self.store.get_mut(id) else {
            // The chunk was disposed while its build was in flight; the
            // geometry is stale, but its coalesced deletes still gate the
            // teardown of older chunks.
            debug!(chunk = ?id, "dropping geometry for a chunk that no longer exists");
            self.deferred_deletes.extend(deletes);
            return;
        };

        renderer.apply_geometry(&mut chunk.mesh, &geometry);
        chunk.state = ChunkState::Ready;
        chunk.center = geometry.center;
        chunk.bounding_radius = geometry.bounding_radius;
        if chunk.wants_collision {
            chunk.collision = Some(renderer.build_collision(&chunk.mesh, &geometry));
        }

        if deletes.is_empty() {
            // Nothing is waiting on this chunk; show it immediately.
            chunk.enabled = true;
            renderer.set_enabled(&mut chunk.mesh, true);
            return;
        }

        // The chunk replaces older geometry: it becomes visible when its
        // delete fires, together with its sibling replacements.
        for delete in deletes {
            if self.delete_is_resolved(&delete) {
                self.fire_delete(delete, renderer);
            } else {
                self.deferred_deletes.push(delete);
            }
        }
    }

    /// Execute every deferred delete whose replacements have resolved.
    fn run_resolved_deletes(&mut self, renderer: &mut R) {
        let mut waiting = Vec::new();
        for delete in std::mem::take(&mut self.deferred_deletes) {
            if self.delete_is_resolved(&delete) {
                self.fire_delete(delete, renderer);
            } else {
                waiting.push(delete);
            }
        }
        self.deferred_deletes = waiting;
    }

    fn delete_is_resolved(&self, delete: &DeleteTask) -> bool {
        delete
            .replacements
            .iter()
            .all(|&id| self.store.is_resolved(id))
    }

    /// Show the replacements, then dispose the stale chunks.
    fn fire_delete(&mut self, delete: DeleteTask, renderer: &mut R) {
        for id in &delete.replacements {
            if let Some(chunk) = self.store.get_mut(*id)
                && chunk.is_ready()
                && !chunk.enabled
            {
                chunk.enabled = true;
                renderer.set_enabled(&mut chunk.mesh, true);
            }
        }
        for id in delete.stale {
            if let Some(mut chunk) = self.store.remove(id) {
                if let Some(collision) = chunk.collision.take() {
                    renderer.dispose_collision(collision);
                }
                renderer.dispose_mesh(chunk.mesh);
            }
        }
    }
}
