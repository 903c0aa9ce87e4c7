//! Douglas-Peucker simplification of closed outlines.
//!
//! The loop is split at its two mutually farthest vertices into two
//! chains, and each chain is simplified against the segment joining its
//! ends. Chains are processed from an explicit stack rather than by
//! recursion, so deep outlines cannot exhaust the call stack.

use crate::types::{Outline, Vertex};

/// Simplify a closed outline in place.
///
/// Points whose distance to the segment spanning their chain is at most
/// `tolerance` (mesh units) are removed. Distances are compared squared.
/// The outline is re-closed afterwards and never grows. Outlines with
/// fewer than three distinct vertices are left untouched.
pub fn simplify(outline: &mut Outline, tolerance: f64) {
    let vertices = outline.vertices_mut();
    if vertices.len() < 4 {
        return;
    }

    // The closing duplicate is not part of the working range.
    let points = &vertices[..vertices.len() - 1];
    let n = points.len();
    let tolerance_sq = tolerance * tolerance;

    let (first, last) = farthest_pair(points);
    let mut removed = vec![false; n];
    let mut stack = vec![(first, last), (last, first + n)];

    while let Some((start, end)) = stack.pop() {
        if end - start < 2 {
            continue;
        }

        let a = points[start % n];
        let b = points[end % n];
        let mut max_dist = 0.0;
        let mut max_idx = start;
        for i in (start + 1)..end {
            let d = segment_distance_sq(points[i % n], a, b);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }

        if max_dist > tolerance_sq {
            stack.push((start, max_idx));
            stack.push((max_idx, end));
        } else {
            for i in (start + 1)..end {
                removed[i % n] = true;
            }
        }
    }

    let mut kept: Vec<Vertex> = points
        .iter()
        .zip(&removed)
        .filter(|&(_, r)| !*r)
        .map(|(&p, _)| p)
        .collect();
    if let Some(&head) = kept.first() {
        kept.push(head);
    }
    *vertices = kept;
}

/// Indices `(i, j)` with `i < j` of the two points farthest apart.
///
/// The first pair found in scan order wins ties.
fn farthest_pair(points: &[Vertex]) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_dist = 0;
    for (i, &p) in points.iter().enumerate() {
        for (j, &q) in points.iter().enumerate().skip(i + 1) {
            let dx = u64::from(p.x.abs_diff(q.x));
            let dy = u64::from(p.y.abs_diff(q.y));
            let d = dx * dx + dy * dy;
            if d > best_dist {
                best_dist = d;
                best = (i, j);
            }
        }
    }
    best
}

/// Squared distance from `p` to the segment `a`–`b`.
///
/// When `a` and `b` coincide, returns the squared distance from `p` to `a`.
fn segment_distance_sq(p: Vertex, a: Vertex, b: Vertex) -> f64 {
    let (px, py) = (f64::from(p.x), f64::from(p.y));
    let (ax, ay) = (f64::from(a.x), f64::from(a.y));
    let (bx, by) = (f64::from(b.x), f64::from(b.y));

    let dx = bx - ax;
    let dy = by - ay;
    let length_sq = dx.mul_add(dx, dy * dy);

    let t = if length_sq == 0.0 {
        0.0
    } else {
        (px - ax).mul_add(dx, (py - ay) * dy) / length_sq
    }
    .clamp(0.0, 1.0);

    let ex = t.mul_add(dx, ax) - px;
    let ey = t.mul_add(dy, ay) - py;
    ex.mul_add(ex, ey * ey)
}
