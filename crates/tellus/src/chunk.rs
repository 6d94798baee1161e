//! Chunks and the chunk store.

use std::collections::HashMap;

use glam::DVec3;

use crate::path::PatchPath;
use crate::renderer::Renderer;

/// Identifier of a chunk in the forge's store.
///
/// Ids are never reused, so a task that outlives its chunk (after a reset,
/// say) simply fails to resolve instead of touching a stranger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub(crate) u64);

/// Identifier of one planet surface among those sharing a forge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub(crate) u32);

/// Build state of a chunk's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Created; no build submitted yet.
    Unbuilt,
    /// A build task is with the worker pool.
    Building,
    /// Geometry applied; the chunk can be shown.
    Ready,
}

/// One renderable quadtree cell of a planet surface.
///
/// The mesh handle is owned here; it is created empty and populated once
/// when the chunk's build completes. Visibility is the conjunction of the
/// LOD lifecycle (`enabled`) and camera culling (`culled`).
pub struct Chunk<R: Renderer> {
    pub(crate) id: ChunkId,
    pub(crate) surface: SurfaceId,
    pub(crate) path: PatchPath,
    pub(crate) state: ChunkState,
    pub(crate) enabled: bool,
    pub(crate) culled: bool,
    pub(crate) wants_collision: bool,
    pub(crate) mesh: R::MeshHandle,
    pub(crate) collision: Option<R::CollisionHandle>,
    /// Planet-local center; estimated from the path until geometry arrives
    /// with the displaced anchor.
    pub(crate) center: DVec3,
    /// Conservative radius of a sphere around `center` containing the
    /// chunk.
    pub(crate) bounding_radius: f64,
}

impl<R: Renderer> Chunk<R> {
    /// The chunk's id.
    #[must_use]
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// The chunk's quadtree path.
    #[must_use]
    pub fn path(&self) -> PatchPath {
        self.path
    }

    /// The chunk's build state.
    #[must_use]
    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Whether geometry has been applied.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ChunkState::Ready
    }

    /// Whether the LOD lifecycle currently shows this chunk (before
    /// culling).
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Planet-local center of the chunk.
    #[must_use]
    pub fn center(&self) -> DVec3 {
        self.center
    }

    /// Bounding-sphere radius around [`center`](Self::center).
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }
}

/// Owner of every live chunk.
///
/// Chunks are referenced by id from tree nodes and tasks; the store is the
/// single place they live and die, so a chunk superseded by a split can
/// outlive its tree node until its delete task fires.
pub(crate) struct ChunkStore<R: Renderer> {
    chunks: HashMap<u64, Chunk<R>>,
    next_id: u64,
}

impl<R: Renderer> ChunkStore<R> {
    pub(crate) fn new() -> Self {
        Self {
            chunks: HashMap::new(),
            next_id: 0,
        }
    }

    /// Create a chunk with a fresh id.
    pub(crate) fn insert(
        &mut self,
        surface: SurfaceId,
        path: PatchPath,
        radius: f64,
        wants_collision: bool,
        mesh: R::MeshHandle,
    ) -> ChunkId {
        let id = ChunkId(self.next_id);
        self.next_id += 1;
        let side = path.side_length(radius);
        self.chunks.insert(
            id.0,
            Chunk {
                id,
                surface,
                path,
                state: ChunkState::Unbuilt,
                enabled: false,
                culled: false,
                wants_collision,
                mesh,
                collision: None,
                center: path.center_direction() * radius,
                bounding_radius: side,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: ChunkId) -> Option<&Chunk<R>> {
        self.chunks.get(&id.0)
    }

    pub(crate) fn get_mut(&mut self, id: ChunkId) -> Option<&mut Chunk<R>> {
        self.chunks.get_mut(&id.0)
    }

    pub(crate) fn remove(&mut self, id: ChunkId) -> Option<Chunk<R>> {
        self.chunks.remove(&id.0)
    }

    /// Whether a chunk exists and has geometry.
    pub(crate) fn is_ready(&self, id: ChunkId) -> bool {
        self.get(id).is_some_and(Chunk::is_ready)
    }

    /// Whether a chunk counts as resolved for delete purposes: ready, or
    /// gone from the store entirely (reset/dispose). A chunk stuck
    /// `Building` never resolves; that is the keep-the-old-chunk
    /// fail-safe.
    pub(crate) fn is_resolved(&self, id: ChunkId) -> bool {
        self.get(id).is_none_or(Chunk::is_ready)
    }

    pub(crate) fn len(&self) -> usize {
        self.chunks.len()
    }

    pub(crate) fn ready_count(&self) -> usize {
        self.chunks.values().filter(|c| c.is_ready()).count()
    }

    /// Ids of every chunk belonging to a surface.
    pub(crate) fn surface_ids(&self, surface: SurfaceId) -> Vec<ChunkId> {
        self.chunks
            .values()
            .filter(|c| c.surface == surface)
            .map(|c| c.id)
            .collect()
    }

    pub(crate) fn iter_surface_mut(
        &mut self,
        surface: SurfaceId,
    ) -> impl Iterator<Item = &mut Chunk<R>> {
        self.chunks.values_mut().filter(move |c| c.surface == surface)
    }
}
