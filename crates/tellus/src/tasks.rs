//! Task types flowing through the scheduler.

use tellus_patch::{PatchGeometry, PatchParams};

use crate::chunk::ChunkId;

/// Compute geometry for a chunk.
#[derive(Debug, Clone)]
pub struct BuildTask {
    /// The chunk the geometry is for.
    pub chunk: ChunkId,
    /// Quadtree depth of the chunk, for dispatch priority.
    pub depth: u32,
    /// Self-contained generation parameters handed to a worker.
    pub params: PatchParams,
}

/// Retire stale chunks once their replacements are ready.
///
/// The stale chunks stay visible until every replacement resolves; if a
/// replacement's build never completes, the stale chunks are retained
/// forever rather than leaving a hole.
#[derive(Debug, Clone)]
pub struct DeleteTask {
    /// Chunks to dispose when the task fires.
    pub stale: Vec<ChunkId>,
    /// Chunks that must all be ready (or gone) first.
    pub replacements: Vec<ChunkId>,
    /// Quadtree depth of the replacements, for dispatch priority.
    pub depth: u32,
}

/// A pending unit of scheduler work.
///
/// Closed set, matched exhaustively: adding a task kind is a compile error
/// everywhere one is consumed until handled.
#[derive(Debug, Clone)]
pub enum Task {
    /// Compute geometry.
    Build(BuildTask),
    /// Retire superseded chunks.
    Delete(DeleteTask),
}

impl Task {
    /// Dispatch priority depth; shallower tasks run first.
    #[must_use]
    pub fn depth(&self) -> u32 {
        match self {
            Task::Build(build) => build.depth,
            Task::Delete(delete) => delete.depth,
        }
    }
}

/// Completed geometry waiting to be uploaded into its chunk.
///
/// Created by the forge when a worker result arrives; carries the delete
/// tasks that were coalesced onto the build so teardown lands on the same
/// tick as the upload.
#[derive(Debug)]
pub struct ApplyTask {
    /// The chunk to populate.
    pub chunk: ChunkId,
    /// The buffers the worker produced.
    pub geometry: PatchGeometry,
    /// Deletes to fire once this chunk (and its sibling replacements) are
    /// ready.
    pub deletes: Vec<DeleteTask>,
}
