//! Chunked planetary terrain LOD core.
//!
//! This crate turns an observer position into a living set of terrain
//! chunks: per-cube-face quadtrees decide what should exist, a fixed pool
//! of worker threads builds patch geometry off the coordinator thread, and
//! a per-tick scheduler (the chunk forge) applies finished geometry and
//! retires superseded chunks without ever leaving a hole in the surface.
//!
//! # Design principles
//!
//! - **Renderer-agnostic**: everything the scene graph must do is behind
//!   the [`Renderer`] trait; tests run against [`TrackingRenderer`]
//! - **Coordinator-owned state**: queues, buckets and the chunk store live
//!   on one thread; workers receive self-contained jobs and share nothing
//! - **No popping**: a superseded chunk stays visible until every one of
//!   its replacements has geometry, enforced by the delete-task pipeline
//!
//! # Example
//!
//! ```
//! use glam::DVec3;
//! use tellus::{ChunkForge, InlineBackend, NullRenderer, PlanetTerrain, TerrainSettings};
//! use tellus_patch::TerrainProfile;
//!
//! let mut renderer = NullRenderer::new();
//! let mut forge = ChunkForge::with_backend(Box::new(InlineBackend::new(2)));
//! let mut terrain = PlanetTerrain::new(
//!     6_371_000.0,
//!     TerrainProfile::default(),
//!     TerrainSettings::default(),
//!     &mut forge,
//!     &mut renderer,
//! )
//! .unwrap();
//!
//! // Per frame: refine against the observer, then run one scheduler tick.
//! terrain.update(DVec3::new(6_500_000.0, 0.0, 0.0), &mut forge, &mut renderer);
//! forge.update(&mut renderer);
//! ```

mod chunk;
mod culling;
mod error;
mod forge;
mod path;
mod pool;
mod renderer;
mod settings;
mod surface;
mod tasks;
mod tree;

pub use chunk::{Chunk, ChunkId, ChunkState, SurfaceId};
pub use culling::Frustum;
pub use error::{Error, Result};
pub use forge::{ChunkForge, ForgeStats};
pub use path::PatchPath;
pub use pool::{
    BuildJob, CompletedBuild, InlineBackend, ThreadBackend, WorkerBackend, WorkerId, WorkerPool,
};
pub use renderer::{MeshRecord, NullRenderer, Renderer, TrackingRenderer};
pub use settings::TerrainSettings;
pub use surface::PlanetTerrain;
pub use tasks::{ApplyTask, BuildTask, DeleteTask, Task};

// Re-export patch types for convenience.
pub use tellus_patch::{Face, PatchGeometry, PatchParams, TerrainProfile, UvRect};
