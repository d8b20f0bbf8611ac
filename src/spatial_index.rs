//! Static balanced 2D spatial index over a fixed point set.
//!
//! Built once from an array of normalized coordinates and never rebalanced.
//! Construction partitions the array in place around coordinate medians found
//! with a Floyd-Rivest selection, alternating the split axis per recursion
//! level, until buckets shrink to `node_size` points. Queries descend the
//! same implicit tree and prune subtrees whose half-plane cannot intersect
//! the query region, visiting matches through a caller-supplied closure.
//!
//! Point indices handed to the visitor are positions in the original input
//! slice, not positions in the reordered internal storage.

/// Bucket size used when none is configured.
pub const DEFAULT_NODE_SIZE: usize = 64;

/// A static 2D index answering axis-aligned range and radius queries.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    ids: Vec<u32>,
    coords: Vec<(f64, f64)>,
    node_size: usize,
}

impl SpatialIndex {
    /// Build an index with the default bucket size.
    pub fn build(points: &[(f64, f64)]) -> Self {
        Self::with_node_size(points, DEFAULT_NODE_SIZE)
    }

    /// Build an index with an explicit bucket size (must be at least 1).
    pub fn with_node_size(points: &[(f64, f64)], node_size: usize) -> Self {
        assert!(node_size >= 1, "node size must be at least 1");
        let mut index = Self {
            ids: (0..points.len() as u32).collect(),
            coords: points.to_vec(),
            node_size,
        };
        if points.len() > 1 {
            index.sort_kd(0, points.len() - 1, 0);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Visit every point inside the closed box `[min_x, max_x] × [min_y, max_y]`.
    pub fn range(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        mut visit: impl FnMut(u32),
    ) {
        if self.coords.is_empty() {
            return;
        }
        self.range_in(
            min_x,
            min_y,
            max_x,
            max_y,
            &mut visit,
            0,
            self.coords.len() - 1,
            0,
        );
    }

    /// Visit every point within euclidean distance `r` of `(qx, qy)`.
    pub fn within(&self, qx: f64, qy: f64, r: f64, mut visit: impl FnMut(u32)) {
        if self.coords.is_empty() {
            return;
        }
        self.within_in(qx, qy, r, &mut visit, 0, self.coords.len() - 1, 0);
    }

    #[allow(clippy::too_many_arguments)]
    fn range_in(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        visit: &mut impl FnMut(u32),
        left: usize,
        right: usize,
        axis: u8,
    ) {
        if right - left <= self.node_size {
            for i in left..=right {
                let (x, y) = self.coords[i];
                if x >= min_x && x <= max_x && y >= min_y && y <= max_y {
                    visit(self.ids[i]);
                }
            }
            return;
        }

        let m = (left + right) >> 1;
        let (x, y) = self.coords[m];
        if x >= min_x && x <= max_x && y >= min_y && y <= max_y {
            visit(self.ids[m]);
        }

        if if axis == 0 { min_x <= x } else { min_y <= y } {
            self.range_in(min_x, min_y, max_x, max_y, visit, left, m - 1, 1 - axis);
        }
        if if axis == 0 { max_x >= x } else { max_y >= y } {
            self.range_in(min_x, min_y, max_x, max_y, visit, m + 1, right, 1 - axis);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn within_in(
        &self,
        qx: f64,
        qy: f64,
        r: f64,
        visit: &mut impl FnMut(u32),
        left: usize,
        right: usize,
        axis: u8,
    ) {
        let r2 = r * r;

        if right - left <= self.node_size {
            for i in left..=right {
                let (x, y) = self.coords[i];
                if sq_dist(x, y, qx, qy) <= r2 {
                    visit(self.ids[i]);
                }
            }
            return;
        }

        let m = (left + right) >> 1;
        let (x, y) = self.coords[m];
        if sq_dist(x, y, qx, qy) <= r2 {
            visit(self.ids[m]);
        }

        if if axis == 0 { qx - r <= x } else { qy - r <= y } {
            self.within_in(qx, qy, r, visit, left, m - 1, 1 - axis);
        }
        if if axis == 0 { qx + r >= x } else { qy + r >= y } {
            self.within_in(qx, qy, r, visit, m + 1, right, 1 - axis);
        }
    }

    fn sort_kd(&mut self, left: usize, right: usize, axis: u8) {
        if right - left <= self.node_size {
            return;
        }
        let m = (left + right) >> 1;
        self.select(m, left, right, axis);
        self.sort_kd(left, m - 1, 1 - axis);
        self.sort_kd(m + 1, right, 1 - axis);
    }

    /// Floyd-Rivest selection: partially sorts `[left, right]` so the element
    /// at `k` is the one a full sort would place there on the given axis.
    fn select(&mut self, k: usize, mut left: usize, mut right: usize, axis: u8) {
        while right > left {
            if right - left > 600 {
                let n = (right - left + 1) as f64;
                let m = (k - left + 1) as f64;
                let z = n.ln();
                let s = 0.5 * (2.0 * z / 3.0).exp();
                let sd = 0.5 * (z * s * (1.0 - s / n)).sqrt()
                    * if 2.0 * m < n { -1.0 } else { 1.0 };
                let new_left = left.max((k as f64 - m * s / n + sd) as usize);
                let new_right = right.min((k as f64 - m * s / n + sd + s) as usize);
                self.select(k, new_left, new_right, axis);
            }

            let t = self.coord(k, axis);
            let mut i = left;
            let mut j = right;

            self.swap_item(left, k);
            if self.coord(right, axis) > t {
                self.swap_item(left, right);
            }

            while i < j {
                self.swap_item(i, j);
                i += 1;
                j -= 1;
                while self.coord(i, axis) < t {
                    i += 1;
                }
                while self.coord(j, axis) > t {
                    j -= 1;
                }
            }

            if self.coord(left, axis) == t {
                self.swap_item(left, j);
            } else {
                j += 1;
                self.swap_item(j, right);
            }

            if j <= k {
                left = j + 1;
            }
            if k <= j {
                // j == 0 implies k == 0 and left has just moved past it, so
                // saturating here still terminates the loop.
                right = j.saturating_sub(1);
            }
        }
    }

    #[inline]
    fn coord(&self, i: usize, axis: u8) -> f64 {
        if axis == 0 { self.coords[i].0 } else { self.coords[i].1 }
    }

    #[inline]
    fn swap_item(&mut self, i: usize, j: usize) {
        self.ids.swap(i, j);
        self.coords.swap(i, j);
    }
}

#[inline]
fn sq_dist(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = ax - bx;
    let dy = ay - by;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random_points(count: usize, seed: u64) -> Vec<(f64, f64)> {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as f64 / (1u64 << 31) as f64
        };
        (0..count).map(|_| (next(), next())).collect()
    }

    fn brute_range(points: &[(f64, f64)], b: [f64; 4]) -> Vec<u32> {
        points
            .iter()
            .enumerate()
            .filter(|&(_, &(x, y))| x >= b[0] && x <= b[2] && y >= b[1] && y <= b[3])
            .map(|(i, _)| i as u32)
            .collect()
    }

    fn brute_within(points: &[(f64, f64)], qx: f64, qy: f64, r: f64) -> Vec<u32> {
        points
            .iter()
            .enumerate()
            .filter(|&(_, &(x, y))| sq_dist(x, y, qx, qy) <= r * r)
            .map(|(i, _)| i as u32)
            .collect()
    }

    #[test]
    fn test_range_matches_brute_force() {
        let points = pseudo_random_points(500, 7);
        let index = SpatialIndex::build(&points);
        let boxes = [
            [0.1, 0.1, 0.4, 0.5],
            [0.0, 0.0, 1.0, 1.0],
            [0.49, 0.49, 0.51, 0.51],
            [0.9, 0.0, 1.0, 0.1],
        ];
        for b in boxes {
            let mut found = Vec::new();
            index.range(b[0], b[1], b[2], b[3], |id| found.push(id));
            found.sort_unstable();
            let mut expected = brute_range(&points, b);
            expected.sort_unstable();
            assert_eq!(found, expected, "box {b:?}");
        }
    }

    #[test]
    fn test_within_matches_brute_force() {
        let points = pseudo_random_points(500, 11);
        let index = SpatialIndex::build(&points);
        let queries = [(0.5, 0.5, 0.2), (0.0, 0.0, 0.3), (0.9, 0.9, 0.05), (0.5, 0.5, 2.0)];
        for (qx, qy, r) in queries {
            let mut found = Vec::new();
            index.within(qx, qy, r, |id| found.push(id));
            found.sort_unstable();
            let mut expected = brute_within(&points, qx, qy, r);
            expected.sort_unstable();
            assert_eq!(found, expected, "query ({qx}, {qy}, {r})");
        }
    }

    #[test]
    fn test_small_node_size_matches_default() {
        let points = pseudo_random_points(300, 3);
        let coarse = SpatialIndex::build(&points);
        let fine = SpatialIndex::with_node_size(&points, 1);
        let mut a = Vec::new();
        let mut b = Vec::new();
        coarse.range(0.2, 0.2, 0.8, 0.8, |id| a.push(id));
        fine.range(0.2, 0.2, 0.8, 0.8, |id| b.push(id));
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::build(&[]);
        assert!(index.is_empty());
        let mut visited = false;
        index.range(0.0, 0.0, 1.0, 1.0, |_| visited = true);
        index.within(0.5, 0.5, 10.0, |_| visited = true);
        assert!(!visited);
    }

    #[test]
    fn test_single_point() {
        let index = SpatialIndex::build(&[(0.25, 0.75)]);
        let mut hits = Vec::new();
        index.within(0.25, 0.75, 0.0, |id| hits.push(id));
        assert_eq!(hits, vec![0]);
        hits.clear();
        index.range(0.3, 0.0, 1.0, 1.0, |id| hits.push(id));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_duplicate_coordinates() {
        let points = vec![(0.5, 0.5); 200];
        let index = SpatialIndex::build(&points);
        let mut hits = Vec::new();
        index.within(0.5, 0.5, 1e-9, |id| hits.push(id));
        hits.sort_unstable();
        assert_eq!(hits, (0..200).collect::<Vec<u32>>());
    }

    #[test]
    fn test_deterministic_visit_order() {
        let points = pseudo_random_points(400, 21);
        let a = SpatialIndex::build(&points);
        let b = SpatialIndex::build(&points);
        let mut order_a = Vec::new();
        let mut order_b = Vec::new();
        a.within(0.5, 0.5, 0.3, |id| order_a.push(id));
        b.within(0.5, 0.5, 0.3, |id| order_b.push(id));
        assert_eq!(order_a, order_b);
    }
}
