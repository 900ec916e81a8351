//! Naive cube-face extraction with stride-aware culling and LOD seam walls.

use strata_geom::Vec3;
use strata_terrain::Biome;

use crate::mesh_build::MeshBuild;
use crate::request::MeshRequest;
use crate::MeshError;

/// Debug vertex color for a biome.
pub fn biome_color(biome: Biome) -> [u8; 4] {
    match biome {
        Biome::Plains => [0, 255, 0, 255],
        Biome::Hills => [0, 0, 255, 255],
        Biome::Mountains => [255, 0, 0, 255],
    }
}

// Face order: +X, -X, +Y, -Y, +Z, -Z. Vertex winding gives outward-facing
// triangles with the (0,1,2)(0,2,3) index pattern.
const FACE_DIRS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

fn face_verts(face: usize, base: Vec3, s: f32) -> [Vec3; 4] {
    let o = |dx: f32, dy: f32, dz: f32| Vec3::new(base.x + dx, base.y + dy, base.z + dz);
    match face {
        0 => [o(s, 0.0, 0.0), o(s, 0.0, s), o(s, s, s), o(s, s, 0.0)],
        1 => [o(0.0, 0.0, 0.0), o(0.0, s, 0.0), o(0.0, s, s), o(0.0, 0.0, s)],
        2 => [o(0.0, s, 0.0), o(s, s, 0.0), o(s, s, s), o(0.0, s, s)],
        3 => [o(0.0, 0.0, 0.0), o(0.0, 0.0, s), o(s, 0.0, s), o(s, 0.0, 0.0)],
        4 => [o(0.0, 0.0, s), o(0.0, s, s), o(s, s, s), o(s, 0.0, s)],
        _ => [o(0.0, 0.0, 0.0), o(s, 0.0, 0.0), o(s, s, 0.0), o(0.0, s, 0.0)],
    }
}

fn face_normal(face: usize) -> Vec3 {
    let (dx, dy, dz) = FACE_DIRS[face];
    Vec3::new(dx as f32, dy as f32, dz as f32)
}

/// Builds a face-culled cube mesh for one chunk at the request's stride.
///
/// Solid cells emit a quad toward each non-solid stride-neighbor. Neighbors
/// outside the chunk go through the cross-chunk sampler and its
/// absent-means-solid bias. The bottom face is independently culled when the
/// cell below is locally solid (and always at z = 0). At LOD > 0, border
/// faces toward a chunk rendering at a different LOD are forced near the
/// terrain surface to wall off cracks between differently-sized cells.
pub fn build_cube_mesh(req: &MeshRequest) -> Result<MeshBuild, MeshError> {
    let step = req.validated_step()?;
    let size = req.size_xy;
    let height = req.height_z;
    let scale = req.voxel_scale;
    let sampler = req.sampler();

    let base_x = req.coord.cx * size;
    let base_y = req.coord.cy * size;
    let own_lod = step.ilog2() as i32;

    let cell_solid = |x: i32, y: i32, z: i32| -> bool {
        if z < 0 {
            return true;
        }
        if z >= height {
            return false;
        }
        if (0..size).contains(&x) && (0..size).contains(&y) {
            match req.grid {
                Some(grid) => grid.is_solid_local(x, y, z),
                None => req
                    .terrain
                    .get_density((base_x + x) as f32, (base_y + y) as f32, z as f32)
                    >= 0.0,
            }
        } else {
            sampler.solid(base_x + x, base_y + y, z)
        }
    };

    let mut out = MeshBuild::default();
    let cells = ((size / step) * (size / step) * (height / step).max(1)) as usize;
    out.reserve_quads(cells.min(64 * 1024));

    let mut x = 0;
    while x < size {
        let mut y = 0;
        while y < size {
            // Highest solid cell with air directly above, for the seam-wall
            // near-surface window. Lazily computed once per column.
            let mut surface_z: Option<Option<i32>> = None;
            let mut z = 0;
            while z < height {
                if !cell_solid(x, y, z) {
                    z += step;
                    continue;
                }

                let gx = base_x + x;
                let gy = base_y + y;
                let color = biome_color(req.terrain.get_dominant_biome(gx as f32, gy as f32));
                let base = Vec3::new(
                    x as f32 * scale,
                    y as f32 * scale,
                    z as f32 * scale,
                );
                let s = step as f32 * scale;

                for (face, &(dx, dy, dz)) in FACE_DIRS.iter().enumerate() {
                    let nx = x + dx * step;
                    let ny = y + dy * step;
                    let nz = z + dz * step;

                    // Bottom faces cull against the local cell below only.
                    if face == 5 && (z == 0 || cell_solid(x, y, z - step)) {
                        continue;
                    }

                    let mut emit = !cell_solid(nx, ny, nz);

                    if !emit && step > 1 && dz == 0 && (nx < 0 || nx >= size || ny < 0 || ny >= size)
                    {
                        // Neighbor chunk at a different LOD: force a seam
                        // wall, but only within the near-surface window.
                        let neighbor = req.coord.offset(dx, dy);
                        let differs = req
                            .world
                            .and_then(|w| w.lod_level(neighbor))
                            .is_some_and(|lod| lod != own_lod);
                        if differs {
                            let surf = *surface_z.get_or_insert_with(|| {
                                column_surface(&cell_solid, height, step, x, y)
                            });
                            if let Some(surf) = surf {
                                let window = req.seam_depth_steps * step;
                                emit = z <= surf && surf - z <= window;
                            }
                        }
                    }

                    if emit {
                        out.add_quad(face_verts(face, base, s), face_normal(face), color);
                    }
                }
                z += step;
            }
            y += step;
        }
        x += step;
    }

    Ok(out)
}

fn column_surface(
    cell_solid: &dyn Fn(i32, i32, i32) -> bool,
    height: i32,
    step: i32,
    x: i32,
    y: i32,
) -> Option<i32> {
    let mut z = height - step;
    while z >= 0 {
        if cell_solid(x, y, z) && !cell_solid(x, y, z + step) {
            return Some(z);
        }
        z -= step;
    }
    None
}
