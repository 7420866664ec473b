//! Selection of the seed triangle that initializes the mesh.
//!
//! Bootstrapping requires three non-collinear vertices. Candidate
//! triples are drawn at random and scored on the absolute value of
//! their orientation; if no trial produces a triangle of acceptable
//! area, the input is scanned exhaustively before giving up. The
//! returned triple is ordered counterclockwise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::predicates::{GeometricOperations, Thresholds};
use crate::vertex::Vertex;

/// Number of random triples examined before falling back to the
/// exhaustive scan.
const MAX_TRIALS: usize = 30;

/// Seed for triple selection. Fixed so that runs are reproducible.
const BOOTSTRAP_SEED: u64 = 0;

/// Utility that picks three non-collinear vertices from the input.
#[derive(Debug)]
pub struct BootstrapUtility {
    geo: GeometricOperations,
    rng: StdRng,
}

impl BootstrapUtility {
    /// Create a utility for the given thresholds.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            geo: GeometricOperations::new(thresholds),
            rng: StdRng::seed_from_u64(BOOTSTRAP_SEED),
        }
    }

    /// Select three non-collinear vertices from the list, ordered
    /// counterclockwise. Returns `None` when every candidate triple
    /// is collinear (or the list is too small).
    pub fn bootstrap(&mut self, list: &[Vertex]) -> Option<[Vertex; 3]> {
        let n = list.len();
        if n < 3 {
            return None;
        }
        let min_h = self.geo.thresholds().half_plane_threshold();

        // random trials, keeping the best triple seen
        let mut best_h = 0.0_f64;
        let mut best = [0usize; 3];
        if n > 3 {
            for _ in 0..MAX_TRIALS {
                let (i, j, k) = self.random_triple(n);
                let h = self.orientation(&list[i], &list[j], &list[k]);
                if h.abs() > best_h.abs() {
                    best_h = h;
                    best = [i, j, k];
                }
            }
            if best_h.abs() > min_h {
                return Some(order_ccw(list[best[0]], list[best[1]], list[best[2]], best_h));
            }
        }

        // exhaustive scan
        for i in 0..n - 2 {
            for j in i + 1..n - 1 {
                for k in j + 1..n {
                    let h = self.orientation(&list[i], &list[j], &list[k]);
                    if h.abs() > min_h {
                        return Some(order_ccw(list[i], list[j], list[k], h));
                    }
                }
            }
        }
        None
    }

    fn orientation(&mut self, a: &Vertex, b: &Vertex, c: &Vertex) -> f64 {
        self.geo.half_plane(a.x, a.y, b.x, b.y, c.x, c.y)
    }

    fn random_triple(&mut self, n: usize) -> (usize, usize, usize) {
        let i = self.rng.gen_range(0..n);
        let mut j = self.rng.gen_range(0..n - 1);
        if j >= i {
            j += 1;
        }
        let mut k = self.rng.gen_range(0..n - 2);
        for bound in [i.min(j), i.max(j)] {
            if k >= bound {
                k += 1;
            }
        }
        (i, j, k)
    }
}

fn order_ccw(a: Vertex, b: Vertex, c: Vertex, h: f64) -> [Vertex; 3] {
    if h > 0.0 {
        [a, b, c]
    } else {
        [a, c, b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64, id: usize) -> Vertex {
        Vertex::new(x, y, 0.0, id)
    }

    fn is_ccw(t: &[Vertex; 3]) -> bool {
        let [a, b, c] = t;
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x) > 0.0
    }

    #[test]
    fn test_simple_triangle() {
        let mut bu = BootstrapUtility::new(Thresholds::new(1.0));
        let t = bu
            .bootstrap(&[v(0.0, 0.0, 0), v(1.0, 0.0, 1), v(0.0, 1.0, 2)])
            .unwrap();
        assert!(is_ccw(&t));
    }

    #[test]
    fn test_clockwise_input_is_reordered() {
        let mut bu = BootstrapUtility::new(Thresholds::new(1.0));
        let t = bu
            .bootstrap(&[v(0.0, 0.0, 0), v(0.0, 1.0, 1), v(1.0, 0.0, 2)])
            .unwrap();
        assert!(is_ccw(&t));
    }

    #[test]
    fn test_collinear_rejected() {
        let mut bu = BootstrapUtility::new(Thresholds::new(1.0));
        let pts: Vec<Vertex> = (0..4).map(|i| v(i as f64, 0.0, i)).collect();
        assert!(bu.bootstrap(&pts).is_none());
    }

    #[test]
    fn test_collinear_with_one_offset_point() {
        let mut bu = BootstrapUtility::new(Thresholds::new(1.0));
        let mut pts: Vec<Vertex> = (0..4).map(|i| v(i as f64, 0.0, i)).collect();
        pts.push(v(1.0, 1.0, 4));
        let t = bu.bootstrap(&pts).unwrap();
        assert!(is_ccw(&t));
        assert!(t.iter().any(|p| p.y == 1.0));
    }

    #[test]
    fn test_too_few_vertices() {
        let mut bu = BootstrapUtility::new(Thresholds::new(1.0));
        assert!(bu.bootstrap(&[v(0.0, 0.0, 0), v(1.0, 0.0, 1)]).is_none());
    }

    #[test]
    fn test_duplicates_do_not_bootstrap() {
        let mut bu = BootstrapUtility::new(Thresholds::new(1.0));
        let pts = vec![v(1.0, 1.0, 0), v(1.0, 1.0, 1), v(1.0, 1.0, 2)];
        assert!(bu.bootstrap(&pts).is_none());
    }
}
