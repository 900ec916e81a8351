//! CPU meshers for voxel chunks: face-culled cubes and marching cubes with
//! welding, smooth normals, and LOD skirts.
#![forbid(unsafe_code)]

pub mod cubes;
pub mod marching;
pub mod mesh_build;
pub mod request;
pub mod sampler;
pub mod tables;

use core::fmt;

pub use cubes::{biome_color, build_cube_mesh};
pub use marching::build_marching_mesh;
pub use mesh_build::MeshBuild;
pub use request::{MeshRequest, RenderMode};
pub use sampler::{FieldSampler, WorldVoxels};

/// A mesh build that cannot proceed yet (or was misconfigured). The
/// not-ready variants are retryable; the scheduler re-enqueues on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshError {
    /// The chunk's own voxel array has not been generated.
    VoxelsNotReady,
    /// Marching cubes at LOD 0 needs all four axis-neighbors voxel-ready.
    NeighborsNotReady,
    /// The LOD step was not a positive power of two.
    InvalidStep(i32),
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::VoxelsNotReady => write!(f, "chunk voxels not generated yet"),
            MeshError::NeighborsNotReady => {
                write!(f, "neighbor chunk voxels not resident yet")
            }
            MeshError::InvalidStep(step) => {
                write!(f, "lod step {step} is not a positive power of two")
            }
        }
    }
}

impl std::error::Error for MeshError {}

/// Dispatches to the mesher selected by `mode`.
pub fn build_chunk_mesh(mode: RenderMode, req: &MeshRequest) -> Result<MeshBuild, MeshError> {
    let built = match mode {
        RenderMode::Cubes => build_cube_mesh(req),
        RenderMode::MarchingCubes => build_marching_mesh(req),
    };
    if let Ok(mesh) = &built {
        log::trace!(
            "meshed {:?} step={} tris={}",
            req.coord,
            req.step,
            mesh.triangle_count()
        );
    }
    built
}
