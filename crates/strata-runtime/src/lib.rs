//! Background voxel-generation workers and the main-thread handoff.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use strata_chunk::{ChunkCoord, Voxel, generate_voxels};
use strata_terrain::TerrainGenerator;

#[derive(Clone, Copy, Debug)]
pub struct VoxelGenJob {
    pub coord: ChunkCoord,
    pub job_id: u64,
}

pub struct VoxelGenOut {
    pub coord: ChunkCoord,
    pub voxels: Vec<Voxel>,
    pub job_id: u64,
}

/// Owns the voxel-generation thread pool and its channels.
///
/// Jobs are pure functions of `(terrain, chunk coord, dimensions)`, so the
/// workers share nothing mutable. The in-flight counter is incremented on
/// the main thread at submit time and decremented on the main thread as
/// results are drained; a worker finishing early can therefore never drive
/// the count below the number of jobs the main thread believes it issued.
pub struct Runtime {
    job_tx: Sender<VoxelGenJob>,
    res_rx: Receiver<VoxelGenOut>,
    _gen_pool: Arc<ThreadPool>,
    inflight: Arc<AtomicUsize>,
    max_inflight: usize,
    next_job_id: u64,
    pub w_gen: usize,
}

impl Runtime {
    pub fn new(
        terrain: Arc<TerrainGenerator>,
        size_xy: i32,
        height_z: i32,
        max_inflight: usize,
    ) -> Self {
        let (job_tx, job_rx) = unbounded::<VoxelGenJob>();
        let (res_tx, res_rx) = unbounded::<VoxelGenOut>();

        let parallelism = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        let w_gen = parallelism
            .saturating_sub(1)
            .clamp(1, max_inflight.max(1));

        let gen_pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(w_gen)
                .thread_name(|i| format!("strata-gen-{i}"))
                .build()
                .expect("voxel gen pool"),
        );
        for _ in 0..w_gen {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let terrain = terrain.clone();
            gen_pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    let voxels = generate_voxels(&terrain, job.coord, size_xy, height_z);
                    let _ = tx.send(VoxelGenOut {
                        coord: job.coord,
                        voxels,
                        job_id: job.job_id,
                    });
                }
            });
        }

        Self {
            job_tx,
            res_rx,
            _gen_pool: gen_pool,
            inflight: Arc::new(AtomicUsize::new(0)),
            max_inflight: max_inflight.max(1),
            next_job_id: 1,
            w_gen,
        }
    }

    #[inline]
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn at_capacity(&self) -> bool {
        self.inflight() >= self.max_inflight
    }

    /// Dispatches one generation job, returning its id, or `None` when the
    /// concurrency cap is reached (the caller re-queues and retries later).
    pub fn submit(&mut self, coord: ChunkCoord) -> Option<u64> {
        if self.at_capacity() {
            return None;
        }
        let job_id = self.next_job_id;
        self.next_job_id += 1;
        self.inflight.fetch_add(1, Ordering::Relaxed);
        if self.job_tx.send(VoxelGenJob { coord, job_id }).is_err() {
            // Workers are gone; undo the reservation so we do not wedge.
            self.inflight.fetch_sub(1, Ordering::Relaxed);
            log::error!("voxel gen channel closed; job for {coord:?} dropped");
            return None;
        }
        Some(job_id)
    }

    /// Drains every completed result without blocking, releasing one
    /// in-flight slot per result. Must be called from the owning thread.
    pub fn drain_results(&self) -> Vec<VoxelGenOut> {
        let mut out = Vec::new();
        for res in self.res_rx.try_iter() {
            self.inflight.fetch_sub(1, Ordering::Relaxed);
            out.push(res);
        }
        out
    }
}
