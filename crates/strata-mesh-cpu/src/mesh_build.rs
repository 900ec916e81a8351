use strata_geom::Vec3;

/// CPU-side mesh buffers in the layout the render sink consumes: flat
/// position/normal arrays (xyz), flat UVs (uv), RGBA colors, and `u32`
/// triangle indices.
#[derive(Default, Clone)]
pub struct MeshBuild {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub idx: Vec<u32>,
    pub col: Vec<u8>,
}

impl MeshBuild {
    /// Clears all arrays but retains capacity for reuse across builds.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.pos.clear();
        self.norm.clear();
        self.uv.clear();
        self.idx.clear();
        self.col.clear();
    }

    /// Pre-reserve capacity for approximately `n_quads` quads worth of data.
    #[inline]
    pub fn reserve_quads(&mut self, n_quads: usize) {
        // 4 vertices per quad
        self.pos.reserve(n_quads * 4 * 3);
        self.norm.reserve(n_quads * 4 * 3);
        self.uv.reserve(n_quads * 4 * 2);
        self.col.reserve(n_quads * 4 * 4);
        self.idx.reserve(n_quads * 6);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.idx.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Appends one vertex and returns its index.
    #[inline]
    pub fn push_vertex(&mut self, p: Vec3, n: Vec3, uv: (f32, f32), rgba: [u8; 4]) -> u32 {
        let index = (self.pos.len() / 3) as u32;
        self.pos.extend_from_slice(&[p.x, p.y, p.z]);
        self.norm.extend_from_slice(&[n.x, n.y, n.z]);
        self.uv.extend_from_slice(&[uv.0, uv.1]);
        self.col.extend_from_slice(&rgba);
        index
    }

    #[inline]
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.idx.extend_from_slice(&[a, b, c]);
    }

    /// Appends a flat-shaded quad (two triangles, four unique vertices) with
    /// the face-corner UV pattern `((i==1||i==2), (i==2||i==3))`.
    pub fn add_quad(&mut self, verts: [Vec3; 4], n: Vec3, rgba: [u8; 4]) {
        let base = (self.pos.len() / 3) as u32;
        for (i, v) in verts.iter().enumerate() {
            let u = (i == 1 || i == 2) as u8 as f32;
            let w = (i == 2 || i == 3) as u8 as f32;
            self.push_vertex(*v, n, (u, w), rgba);
        }
        self.push_triangle(base, base + 1, base + 2);
        self.push_triangle(base, base + 2, base + 3);
    }
}
