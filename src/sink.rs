use strata_chunk::ChunkCoord;
use strata_mesh_cpu::MeshBuild;

/// Opaque destination for finished chunk geometry. The engine core never
/// renders; whoever owns the GPU implements this.
pub trait MeshSink {
    fn upload_chunk_mesh(&mut self, coord: ChunkCoord, lod: i32, mesh: &MeshBuild);
    fn remove_chunk(&mut self, coord: ChunkCoord);
}

/// Sink that drops everything. Useful for tests and headless ticking.
#[derive(Default)]
pub struct NullSink;

impl MeshSink for NullSink {
    fn upload_chunk_mesh(&mut self, _coord: ChunkCoord, _lod: i32, _mesh: &MeshBuild) {}
    fn remove_chunk(&mut self, _coord: ChunkCoord) {}
}
