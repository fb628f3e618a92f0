//! Registry of optional GPU-accelerated helpers.
//!
//! Nothing here talks to a device; a backend fills the registry at startup
//! and the viewer hands it to whoever wants acceleration. The default
//! registry reports no GPU.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use crate::viewport::mesh::{FaceId, TriMesh};

/// Closest point on a mesh for a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshProjection {
    pub point: Vec3,
    pub face: FaceId,
    pub distance_sq: f32,
}

/// Projects batches of points onto a mesh.
pub trait PointsToMeshProjector {
    fn update_mesh(&mut self, mesh: Arc<TriMesh>);

    /// One entry per input point; `None` when the mesh is empty.
    fn find_projections(&mut self, points: &[Vec3]) -> Vec<Option<MeshProjection>>;
}

pub type FreeMemoryFn = Box<dyn Fn() -> u64>;
pub type ProjectorFactory = Box<dyn Fn() -> Box<dyn PointsToMeshProjector>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuVersions {
    /// Highest API version the driver supports
    pub max_driver: u32,
    pub runtime: u32,
    pub compute_major: u32,
    pub compute_minor: u32,
}

#[derive(Default)]
pub struct GpuCapabilities {
    available: bool,
    versions: GpuVersions,
    free_memory: Option<FreeMemoryFn>,
    projector_factory: Option<ProjectorFactory>,
}

impl GpuCapabilities {
    /// Registry reporting no GPU
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn new(versions: GpuVersions) -> Self {
        Self {
            available: true,
            versions,
            ..Self::default()
        }
    }

    pub fn with_free_memory(mut self, f: impl Fn() -> u64 + 'static) -> Self {
        self.free_memory = Some(Box::new(f));
        self
    }

    pub fn with_projector_factory(
        mut self,
        f: impl Fn() -> Box<dyn PointsToMeshProjector> + 'static,
    ) -> Self {
        self.projector_factory = Some(Box::new(f));
        self
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn versions(&self) -> GpuVersions {
        self.versions
    }

    /// Free device memory in bytes; 0 without a GPU or a memory query.
    pub fn free_memory(&self) -> u64 {
        match (&self.free_memory, self.available) {
            (Some(f), true) => f(),
            _ => 0,
        }
    }

    pub fn points_to_mesh_projector(&self) -> Option<Box<dyn PointsToMeshProjector>> {
        if !self.available {
            return None;
        }
        self.projector_factory.as_ref().map(|f| f())
    }
}

impl fmt::Debug for GpuCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuCapabilities")
            .field("available", &self.available)
            .field("versions", &self.versions)
            .field("free_memory", &self.free_memory.is_some())
            .field("projector_factory", &self.projector_factory.is_some())
            .finish()
    }
}
