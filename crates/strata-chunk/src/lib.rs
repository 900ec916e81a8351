//! Per-chunk voxel storage and bulk generation.
#![forbid(unsafe_code)]

use strata_terrain::TerrainGenerator;

/// Horizontal world-grid coordinate of a chunk. Chunks span the full world
/// height, so the grid is two-dimensional.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
        }
    }

    /// The four axis-aligned neighbors (+X, -X, +Y, -Y).
    #[inline]
    pub fn neighbors4(self) -> [ChunkCoord; 4] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, 1),
            self.offset(0, -1),
        ]
    }

    /// Chebyshev (chessboard) distance, the metric LOD rings use.
    #[inline]
    pub fn chebyshev(self, other: ChunkCoord) -> i32 {
        (self.cx - other.cx).abs().max((self.cy - other.cy).abs())
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dy = i64::from(self.cy - other.cy);
        dx * dx + dy * dy
    }

    /// Chunk containing the given global voxel column.
    #[inline]
    pub fn of_global(gx: i32, gy: i32, size_xy: i32) -> Self {
        Self {
            cx: gx.div_euclid(size_xy),
            cy: gy.div_euclid(size_xy),
        }
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// One lattice sample. Zero-initialized on chunk allocation; the density
/// sign is authoritative and `solid` mirrors `density >= 0` after any write.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Voxel {
    pub solid: bool,
    pub density: f32,
    pub material: u8,
}

/// Dense per-chunk voxel array with the fixed `x + y*s + z*s*s`
/// linearization. The grid is the only mutable voxel state for its chunk.
#[derive(Clone, Debug)]
pub struct VoxelGrid {
    pub coord: ChunkCoord,
    size_xy: i32,
    height_z: i32,
    voxels: Vec<Voxel>,
}

impl VoxelGrid {
    /// Allocates a fully zeroed grid. A chunk never partially exists: it is
    /// either absent or carries this complete array.
    pub fn new(coord: ChunkCoord, size_xy: i32, height_z: i32) -> Self {
        let size_xy = size_xy.max(1);
        let height_z = height_z.max(1);
        let total = (size_xy * size_xy * height_z) as usize;
        Self {
            coord,
            size_xy,
            height_z,
            voxels: vec![Voxel::default(); total],
        }
    }

    #[inline]
    pub fn size_xy(&self) -> i32 {
        self.size_xy
    }

    #[inline]
    pub fn height_z(&self) -> i32 {
        self.height_z
    }

    /// Linear index of a local coordinate, or `-1` when any component is out
    /// of range. The sentinel (rather than a panic) keeps boundary-walking
    /// meshing code total.
    #[inline]
    pub fn local_index(&self, x: i32, y: i32, z: i32) -> i32 {
        if x < 0 || x >= self.size_xy || y < 0 || y >= self.size_xy || z < 0 || z >= self.height_z {
            return -1;
        }
        x + y * self.size_xy + z * self.size_xy * self.size_xy
    }

    /// `false` for any out-of-range coordinate.
    #[inline]
    pub fn is_solid_local(&self, x: i32, y: i32, z: i32) -> bool {
        let idx = self.local_index(x, y, z);
        if idx < 0 {
            return false;
        }
        self.voxels[idx as usize].solid
    }

    /// Density at a local coordinate; out-of-range reads return `-1.0`
    /// (air), matching the cross-chunk sampler's above-world sentinel.
    #[inline]
    pub fn density_local(&self, x: i32, y: i32, z: i32) -> f32 {
        let idx = self.local_index(x, y, z);
        if idx < 0 {
            return -1.0;
        }
        self.voxels[idx as usize].density
    }

    #[inline]
    pub fn material_local(&self, x: i32, y: i32, z: i32) -> u8 {
        let idx = self.local_index(x, y, z);
        if idx < 0 {
            return 0;
        }
        self.voxels[idx as usize].material
    }

    /// Single-cell edit: writes the solid flag and a matching `±1` density in
    /// one step. Returns `false` (no-op) for out-of-range coordinates.
    pub fn set_voxel_local(&mut self, x: i32, y: i32, z: i32, solid: bool) -> bool {
        let idx = self.local_index(x, y, z);
        if idx < 0 {
            return false;
        }
        let v = &mut self.voxels[idx as usize];
        v.solid = solid;
        v.density = if solid { 1.0 } else { -1.0 };
        true
    }

    /// Atomic bulk replacement: the whole array is swapped by move-assignment
    /// so a consumer never observes a half-written grid. Rejected (and left
    /// untouched) if the length does not match this grid's dimensions.
    pub fn replace_voxels(&mut self, voxels: Vec<Voxel>) -> bool {
        if voxels.len() != self.voxels.len() {
            return false;
        }
        self.voxels = voxels;
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }
}

/// Bulk-generates the voxel array for a chunk by direct density sampling.
///
/// Pure function of `(terrain, coord, dimensions)` with no neighbor
/// dependency, so chunks can generate fully in parallel. The terrain height
/// is sampled once per column; density then falls linearly with `z`.
pub fn generate_voxels(
    terrain: &TerrainGenerator,
    coord: ChunkCoord,
    size_xy: i32,
    height_z: i32,
) -> Vec<Voxel> {
    let size_xy = size_xy.max(1);
    let height_z = height_z.max(1);
    let base_x = coord.cx * size_xy;
    let base_y = coord.cy * size_xy;
    let mut voxels = vec![Voxel::default(); (size_xy * size_xy * height_z) as usize];
    for y in 0..size_xy {
        for x in 0..size_xy {
            let gx = (base_x + x) as f32;
            let gy = (base_y + y) as f32;
            let height = terrain.get_terrain_height(gx, gy);
            for z in 0..height_z {
                let density = height - z as f32;
                let idx = (x + y * size_xy + z * size_xy * size_xy) as usize;
                voxels[idx] = Voxel {
                    solid: density >= 0.0,
                    density,
                    material: 0,
                };
            }
        }
    }
    voxels
}
