use proptest::prelude::*;
use strata_chunk::{ChunkCoord, VoxelGrid};

proptest! {
    #[test]
    fn local_index_unique_and_dense(size in 1i32..12, height in 1i32..24) {
        let grid = VoxelGrid::new(ChunkCoord::new(0, 0), size, height);
        let total = (size * size * height) as usize;
        let mut seen = vec![false; total];
        for z in 0..height {
            for y in 0..size {
                for x in 0..size {
                    let idx = grid.local_index(x, y, z);
                    prop_assert!(idx >= 0);
                    prop_assert!((idx as usize) < total);
                    prop_assert!(!seen[idx as usize]);
                    seen[idx as usize] = true;
                }
            }
        }
        prop_assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn local_index_sentinel_out_of_range(
        size in 1i32..12,
        height in 1i32..24,
        x in -32i32..48,
        y in -32i32..48,
        z in -32i32..64,
    ) {
        let grid = VoxelGrid::new(ChunkCoord::new(0, 0), size, height);
        let in_range = x >= 0 && x < size && y >= 0 && y < size && z >= 0 && z < height;
        let idx = grid.local_index(x, y, z);
        if in_range {
            prop_assert!(idx >= 0);
        } else {
            prop_assert_eq!(idx, -1);
            prop_assert!(!grid.is_solid_local(x, y, z));
            prop_assert_eq!(grid.density_local(x, y, z), -1.0);
        }
    }

    #[test]
    fn chunk_of_global_round_trip(gx in -10_000i32..10_000, gy in -10_000i32..10_000) {
        let size = 32;
        let c = ChunkCoord::of_global(gx, gy, size);
        let lx = gx - c.cx * size;
        let ly = gy - c.cy * size;
        prop_assert!((0..size).contains(&lx));
        prop_assert!((0..size).contains(&ly));
    }
}
