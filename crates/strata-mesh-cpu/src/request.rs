use strata_chunk::{ChunkCoord, VoxelGrid};
use strata_terrain::TerrainGenerator;

use crate::sampler::{FieldSampler, WorldVoxels};
use crate::MeshError;

/// Which extraction algorithm to run for a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Cubes,
    MarchingCubes,
}

/// Everything a mesher needs to build one chunk's geometry.
///
/// `procedural_only` detaches density sampling from the streamed world:
/// neighbor voxel arrays are ignored and the terrain function is sampled
/// directly. LOD > 0 builds always run this way since voxels are only
/// resident for LOD 0 chunks. `world` stays available either way for
/// neighbor-LOD queries.
pub struct MeshRequest<'a> {
    pub coord: ChunkCoord,
    pub grid: Option<&'a VoxelGrid>,
    pub terrain: &'a TerrainGenerator,
    pub world: Option<&'a dyn WorldVoxels>,
    pub procedural_only: bool,
    pub size_xy: i32,
    pub height_z: i32,
    pub step: i32,
    pub voxel_scale: f32,
    pub seam_depth_steps: i32,
}

impl<'a> MeshRequest<'a> {
    pub(crate) fn validated_step(&self) -> Result<i32, MeshError> {
        if self.step >= 1 && self.step.count_ones() == 1 {
            Ok(self.step)
        } else {
            Err(MeshError::InvalidStep(self.step))
        }
    }

    pub(crate) fn sampler(&self) -> FieldSampler<'a> {
        let world = if self.procedural_only {
            None
        } else {
            self.world
        };
        FieldSampler {
            terrain: self.terrain,
            world,
            size_xy: self.size_xy,
            height_z: self.height_z,
        }
    }
}
