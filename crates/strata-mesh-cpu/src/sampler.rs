use strata_chunk::{ChunkCoord, VoxelGrid};
use strata_terrain::TerrainGenerator;

/// Read-only view of the streamed chunk set, as the meshers see it.
///
/// `grid` must return `Some` only for chunks whose voxel array has been
/// fully generated; a registered chunk still waiting on its voxel job is
/// indistinguishable from an absent one here.
pub trait WorldVoxels {
    fn grid(&self, coord: ChunkCoord) -> Option<&VoxelGrid>;
    fn within_render_distance(&self, coord: ChunkCoord) -> bool;
    /// Current LOD level of a registered chunk, for seam-wall decisions.
    fn lod_level(&self, coord: ChunkCoord) -> Option<i32>;
}

/// Cross-chunk density/solidity sampler with the boundary sentinels both
/// meshers rely on. With `world: None` it samples the terrain function
/// directly everywhere (procedural-only mode, used at LOD > 0).
pub struct FieldSampler<'a> {
    pub terrain: &'a TerrainGenerator,
    pub world: Option<&'a dyn WorldVoxels>,
    pub size_xy: i32,
    pub height_z: i32,
}

impl<'a> FieldSampler<'a> {
    pub fn procedural(terrain: &'a TerrainGenerator, size_xy: i32, height_z: i32) -> Self {
        Self {
            terrain,
            world: None,
            size_xy,
            height_z,
        }
    }

    pub fn with_world(
        terrain: &'a TerrainGenerator,
        world: &'a dyn WorldVoxels,
        size_xy: i32,
        height_z: i32,
    ) -> Self {
        Self {
            terrain,
            world: Some(world),
            size_xy,
            height_z,
        }
    }

    #[inline]
    fn split_global(&self, gx: i32, gy: i32) -> (ChunkCoord, i32, i32) {
        let coord = ChunkCoord::of_global(gx, gy, self.size_xy);
        (
            coord,
            gx - coord.cx * self.size_xy,
            gy - coord.cy * self.size_xy,
        )
    }

    /// Density at a global lattice point, for marching cubes.
    ///
    /// Sentinels: below the world is solid (`1.0`), at or above the world
    /// ceiling is air (`-1.0`); an in-range point whose chunk is outside
    /// render distance is air, so the surface closes off at the streamed
    /// horizon. Resident voxel data wins over the terrain function, keeping
    /// edits visible at LOD 0.
    pub fn density(&self, gx: i32, gy: i32, gz: i32) -> f32 {
        if gz < 0 {
            return 1.0;
        }
        if gz >= self.height_z {
            return -1.0;
        }
        if let Some(world) = self.world {
            let (coord, lx, ly) = self.split_global(gx, gy);
            if let Some(grid) = world.grid(coord) {
                return grid.density_local(lx, ly, gz);
            }
            if !world.within_render_distance(coord) {
                return -1.0;
            }
        }
        self.terrain.get_density(gx as f32, gy as f32, gz as f32)
    }

    /// Solidity at a global lattice point, for cube-face culling.
    ///
    /// The opposite bias from `density`: an absent or not-yet-voxel-ready
    /// neighbor chunk reads as solid so the border face is suppressed until
    /// real data arrives, instead of flashing a wall of chunk-edge quads.
    pub fn solid(&self, gx: i32, gy: i32, gz: i32) -> bool {
        if gz < 0 {
            return true;
        }
        if gz >= self.height_z {
            return false;
        }
        match self.world {
            None => self.terrain.get_density(gx as f32, gy as f32, gz as f32) >= 0.0,
            Some(world) => {
                let (coord, lx, ly) = self.split_global(gx, gy);
                let Some(grid) = world.grid(coord) else {
                    return true;
                };
                if !world.within_render_distance(coord) {
                    return true;
                }
                grid.is_solid_local(lx, ly, gz)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_terrain::TerrainParams;

    #[test]
    fn procedural_vertical_sentinels() {
        let terrain = TerrainGenerator::new(7, TerrainParams::default());
        let s = FieldSampler::procedural(&terrain, 32, 64);
        assert_eq!(s.density(5, 5, -1), 1.0);
        assert_eq!(s.density(5, 5, 64), -1.0);
        assert!(s.solid(5, 5, -3));
        assert!(!s.solid(5, 5, 64));
    }

    #[test]
    fn procedural_density_matches_terrain() {
        let terrain = TerrainGenerator::new(7, TerrainParams::default());
        let s = FieldSampler::procedural(&terrain, 32, 64);
        let d = s.density(100, -40, 10);
        assert_eq!(d, terrain.get_density(100.0, -40.0, 10.0));
        assert_eq!(s.solid(100, -40, 10), d >= 0.0);
    }
}
