//! Marching cubes extraction with vertex welding, gradient normals, and
//! LOD skirt geometry.

use hashbrown::{HashMap, HashSet};
use strata_geom::Vec3;

use crate::cubes::biome_color;
use crate::mesh_build::MeshBuild;
use crate::request::MeshRequest;
use crate::sampler::FieldSampler;
use crate::tables::{EDGE_TABLE, TRI_TABLE};
use crate::MeshError;

const ISO_LEVEL: f32 = 0.0;
const INTERP_EPS: f32 = 1e-4;

// Bourke corner numbering: bottom ring 0-3 counter-clockwise from the cell
// origin, top ring 4-7 above it.
const CORNERS: [(i32, i32, i32); 8] = [
    (0, 0, 0),
    (1, 0, 0),
    (1, 1, 0),
    (0, 1, 0),
    (0, 0, 1),
    (1, 0, 1),
    (1, 1, 1),
    (0, 1, 1),
];

// Edge index -> (corner, corner).
const EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Clamped linear interpolation along a cell edge toward the isosurface.
/// Near-equal endpoint values short-circuit to an endpoint so a vanishing
/// denominator never reaches the division.
fn vertex_interp(iso: f32, p1: Vec3, p2: Vec3, v1: f32, v2: f32) -> Vec3 {
    if (iso - v1).abs() < INTERP_EPS {
        return p1;
    }
    if (iso - v2).abs() < INTERP_EPS {
        return p2;
    }
    if (v1 - v2).abs() < INTERP_EPS {
        return p1;
    }
    let mu = ((iso - v1) / (v2 - v1)).clamp(0.0, 1.0);
    p1 + (p2 - p1) * mu
}

/// Fixed-point weld key: world-space position quantized to hundredths, so
/// vertices produced by adjacent cells (or adjacent chunks) on a shared edge
/// collapse to one index.
#[inline]
fn weld_key(origin: Vec3, v: Vec3) -> (i32, i32, i32) {
    let w = origin + v;
    (
        (w.x * 100.0).round() as i32,
        (w.y * 100.0).round() as i32,
        (w.z * 100.0).round() as i32,
    )
}

/// Builds a marching-cubes mesh for one chunk.
///
/// At LOD 0 (`procedural_only = false`) the chunk's own voxels and all four
/// axis-neighbors' voxels must be resident, otherwise the border cells would
/// mix stored and resampled densities and crack the seam; the build fails
/// with a retryable error until the scheduler has them ready. LOD > 0 builds
/// sample the terrain function directly and cannot fail this way.
pub fn build_marching_mesh(req: &MeshRequest) -> Result<MeshBuild, MeshError> {
    let step = req.validated_step()?;
    if !req.procedural_only {
        if req.grid.is_none() {
            return Err(MeshError::VoxelsNotReady);
        }
        let world = req.world.ok_or(MeshError::NeighborsNotReady)?;
        for n in req.coord.neighbors4() {
            if world.grid(n).is_none() {
                return Err(MeshError::NeighborsNotReady);
            }
        }
    }

    let size = req.size_xy;
    let height = req.height_z;
    let scale = req.voxel_scale;
    let sampler = req.sampler();
    let base_x = req.coord.cx * size;
    let base_y = req.coord.cy * size;
    let origin = Vec3::new(base_x as f32 * scale, base_y as f32 * scale, 0.0);

    // Whole-chunk gradient cache for interior normals at the finest stride.
    // Coarser strides have few enough cells that direct differencing wins.
    let gradient = if step == 1 {
        Some(compute_gradient(&sampler, base_x, base_y, size, height))
    } else {
        None
    };

    let sample_normal = |v: Vec3| -> Vec3 {
        let ix = (v.x / scale).floor() as i32;
        let iy = (v.y / scale).floor() as i32;
        let iz = (v.z / scale).floor() as i32;
        if let Some(cache) = &gradient {
            let interior = ix > 0
                && ix < size - 1
                && iy > 0
                && iy < size - 1
                && iz > 0
                && iz < height - 1;
            if interior {
                let idx = (ix + iy * size + iz * size * size) as usize;
                return -cache[idx];
            }
        }
        let gx = base_x + ix;
        let gy = base_y + iy;
        let dx = sampler.density(gx + 1, gy, iz) - sampler.density(gx - 1, gy, iz);
        let dy = sampler.density(gx, gy + 1, iz) - sampler.density(gx, gy - 1, iz);
        let dz = sampler.density(gx, gy, iz + 1) - sampler.density(gx, gy, iz - 1);
        -Vec3::new(dx, dy, dz).normalized()
    };

    let mut out = MeshBuild::default();
    let est_cells = ((size / step) * (size / step) * (height / step)).max(1) as usize;
    out.pos.reserve(est_cells * 2 * 3);
    out.idx.reserve(est_cells * 5 * 3);

    let mut weld: HashMap<(i32, i32, i32), u32> = HashMap::with_capacity(1024);
    let mut normal_acc: Vec<Vec3> = Vec::with_capacity(est_cells * 2);

    let mut x = 0;
    while x < size {
        let mut y = 0;
        while y < size {
            let mut z = 0;
            while z < height {
                let gx = base_x + x;
                let gy = base_y + y;

                let mut pos = [Vec3::ZERO; 8];
                let mut val = [0.0f32; 8];
                for (i, &(cx, cy, cz)) in CORNERS.iter().enumerate() {
                    pos[i] = Vec3::new(
                        (x + cx * step) as f32 * scale,
                        (y + cy * step) as f32 * scale,
                        (z + cz * step) as f32 * scale,
                    );
                    val[i] = sampler.density(gx + cx * step, gy + cy * step, z + cz * step);
                }

                let mut cube_index = 0usize;
                for (i, &v) in val.iter().enumerate() {
                    if v > ISO_LEVEL {
                        cube_index |= 1 << i;
                    }
                }

                let edge_bits = EDGE_TABLE[cube_index];
                if edge_bits == 0 {
                    z += step;
                    continue;
                }

                let mut vert_list = [Vec3::ZERO; 12];
                for (e, &(a, b)) in EDGES.iter().enumerate() {
                    if edge_bits & (1 << e) != 0 {
                        vert_list[e] = vertex_interp(ISO_LEVEL, pos[a], pos[b], val[a], val[b]);
                    }
                }

                let tris = &TRI_TABLE[cube_index];
                let mut i = 0;
                while tris[i] >= 0 {
                    let tri = [
                        vert_list[tris[i] as usize],
                        vert_list[tris[i + 1] as usize],
                        vert_list[tris[i + 2] as usize],
                    ];
                    let mut idx = [0u32; 3];
                    for (k, &v) in tri.iter().enumerate() {
                        let key = weld_key(origin, v);
                        idx[k] = match weld.get(&key) {
                            Some(&existing) => existing,
                            None => {
                                let color = biome_color(
                                    req.terrain.get_dominant_biome(gx as f32, gy as f32),
                                );
                                let uv = (v.x / 1000.0, v.y / 1000.0);
                                let new = out.push_vertex(v, Vec3::ZERO, uv, color);
                                weld.insert(key, new);
                                normal_acc.push(Vec3::ZERO);
                                new
                            }
                        };
                        normal_acc[idx[k] as usize] += sample_normal(v);
                    }
                    out.push_triangle(idx[0], idx[1], idx[2]);
                    i += 3;
                }
                z += step;
            }
            y += step;
        }
        x += step;
    }

    // Average and renormalize the accumulated gradients.
    for (i, acc) in normal_acc.iter().enumerate() {
        let n = acc.normalized_or_up();
        out.norm[i * 3] = n.x;
        out.norm[i * 3 + 1] = n.y;
        out.norm[i * 3 + 2] = n.z;
    }

    // Coarse builds always skirt; a fine build skirts only when some
    // neighbor renders at another level, since matched LOD 0 borders sample
    // the same resident voxels and meet exactly.
    let own_lod = step.ilog2() as i32;
    let lod_mismatch = req.world.is_some_and(|world| {
        req.coord
            .neighbors4()
            .iter()
            .any(|&n| world.lod_level(n).is_some_and(|l| l != own_lod))
    });
    if step > 1 || lod_mismatch {
        add_border_skirts(&mut out, size, scale, step);
    }

    Ok(out)
}

fn compute_gradient(
    sampler: &FieldSampler,
    base_x: i32,
    base_y: i32,
    size: i32,
    height: i32,
) -> Vec<Vec3> {
    let mut cache = vec![Vec3::ZERO; (size * size * height) as usize];
    for z in 0..height {
        for y in 0..size {
            for x in 0..size {
                let gx = base_x + x;
                let gy = base_y + y;
                let dx = sampler.density(gx + 1, gy, z) - sampler.density(gx - 1, gy, z);
                let dy = sampler.density(gx, gy + 1, z) - sampler.density(gx, gy - 1, z);
                let dz = sampler.density(gx, gy, z + 1) - sampler.density(gx, gy, z - 1);
                cache[(x + y * size + z * size * size) as usize] =
                    Vec3::new(dx, dy, dz).normalized();
            }
        }
    }
    cache
}

/// Extrudes downward quads under every surface edge lying on the chunk's XY
/// border, masking residual cracks against a neighbor meshed at another LOD.
/// Purely cosmetic; the skirt vertices are not welded.
fn add_border_skirts(out: &mut MeshBuild, size: i32, scale: f32, step: i32) {
    let max = size as f32 * scale;
    let eps = scale * 1e-3;
    let depth = step as f32 * scale;

    // (plane test, outward normal) for each of the four border planes.
    let planes: [(fn(Vec3, f32, f32) -> bool, Vec3); 4] = [
        (|v, _max, eps| v.x.abs() < eps, Vec3::new(-1.0, 0.0, 0.0)),
        (|v, max, eps| (v.x - max).abs() < eps, Vec3::new(1.0, 0.0, 0.0)),
        (|v, _max, eps| v.y.abs() < eps, Vec3::new(0.0, -1.0, 0.0)),
        (|v, max, eps| (v.y - max).abs() < eps, Vec3::new(0.0, 1.0, 0.0)),
    ];

    let vertex = |out: &MeshBuild, i: u32| -> Vec3 {
        let i = i as usize * 3;
        Vec3::new(out.pos[i], out.pos[i + 1], out.pos[i + 2])
    };
    let color = |out: &MeshBuild, i: u32| -> [u8; 4] {
        let i = i as usize * 4;
        [out.col[i], out.col[i + 1], out.col[i + 2], out.col[i + 3]]
    };

    let surface_tris = out.idx.len() / 3;
    let mut done: HashSet<(u32, u32)> = HashSet::new();

    for t in 0..surface_tris {
        let tri = [out.idx[t * 3], out.idx[t * 3 + 1], out.idx[t * 3 + 2]];
        for k in 0..3 {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            let edge = (a.min(b), a.max(b));
            if !done.insert(edge) {
                continue;
            }
            let (va, vb) = (vertex(out, a), vertex(out, b));
            for &(on_plane, normal) in &planes {
                if on_plane(va, max, eps) && on_plane(vb, max, eps) {
                    let drop = Vec3::new(0.0, 0.0, depth);
                    let (ca, cb) = (color(out, a), color(out, b));
                    let uv = |v: Vec3| (v.x / 1000.0, v.y / 1000.0);
                    let i0 = out.push_vertex(va, normal, uv(va), ca);
                    let i1 = out.push_vertex(vb, normal, uv(vb), cb);
                    let i2 = out.push_vertex(vb - drop, normal, uv(vb), cb);
                    let i3 = out.push_vertex(va - drop, normal, uv(va), ca);
                    out.push_triangle(i0, i1, i2);
                    out.push_triangle(i0, i2, i3);
                    break;
                }
            }
        }
    }
}
