use beamify_field::{Coord, VoxelField};

const MAX_LLOYD_ITERS: usize = 64;

/// Cells of one material handed to the solver together. Not necessarily connected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub material: u32,
    /// Lexicographic (x, y, z) order.
    pub cells: Vec<Coord>,
}

impl Blob {
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Splits the occupied cells of `field` into blobs of at most roughly `threshold` cells.
///
/// Materials are visited in ascending order. A material group larger than `threshold` is split
/// into `ceil(len / threshold)` spatial clusters. The result is sorted by blob size, smallest
/// first, keeping material order among equal sizes.
pub fn decompose(field: &VoxelField, threshold: usize) -> Vec<Blob> {
    let threshold = threshold.max(1);
    let mut blobs = Vec::new();
    for (material, cells) in field.groups() {
        if cells.len() <= threshold {
            blobs.push(Blob { material, cells });
            continue;
        }
        let k = cells.len().div_ceil(threshold);
        for part in kmeans_split(&cells, k) {
            blobs.push(Blob {
                material,
                cells: part,
            });
        }
    }
    blobs.sort_by_key(Blob::len);
    blobs
}

fn dist2(c: Coord, p: [f64; 3]) -> f64 {
    let dx = c.x as f64 - p[0];
    let dy = c.y as f64 - p[1];
    let dz = c.z as f64 - p[2];
    dx * dx + dy * dy + dz * dz
}

/// Deterministic Lloyd clustering of `cells` into at most `k` non-empty groups.
///
/// Centroids are seeded from evenly spaced members; ties go to the lower cluster index. Each
/// returned group keeps the input order of its cells.
pub fn kmeans_split(cells: &[Coord], k: usize) -> Vec<Vec<Coord>> {
    let n = cells.len();
    let k = k.clamp(1, n.max(1));
    if n == 0 {
        return Vec::new();
    }
    if k == 1 {
        return vec![cells.to_vec()];
    }

    let mut centroids: Vec<[f64; 3]> = (0..k)
        .map(|i| {
            let c = cells[i * n / k];
            [c.x as f64, c.y as f64, c.z as f64]
        })
        .collect();
    let mut assign = vec![usize::MAX; n];

    for iter in 0..MAX_LLOYD_ITERS {
        let mut changed = false;
        for (i, c) in cells.iter().enumerate() {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for (j, p) in centroids.iter().enumerate() {
                let d = dist2(*c, *p);
                if d < best_d {
                    best_d = d;
                    best = j;
                }
            }
            if assign[i] != best {
                assign[i] = best;
                changed = true;
            }
        }
        if !changed {
            log::trace!("k-means settled after {iter} iterations (k={k}, n={n})");
            break;
        }
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (i, c) in cells.iter().enumerate() {
            let s = &mut sums[assign[i]];
            s[0] += c.x as f64;
            s[1] += c.y as f64;
            s[2] += c.z as f64;
            counts[assign[i]] += 1;
        }
        for j in 0..k {
            // empty clusters keep their old centroid
            if counts[j] > 0 {
                let m = counts[j] as f64;
                centroids[j] = [sums[j][0] / m, sums[j][1] / m, sums[j][2] / m];
            }
        }
    }

    let mut groups: Vec<Vec<Coord>> = vec![Vec::new(); k];
    for (i, c) in cells.iter().enumerate() {
        groups[assign[i]].push(*c);
    }
    groups.retain(|g| !g.is_empty());
    groups
}
