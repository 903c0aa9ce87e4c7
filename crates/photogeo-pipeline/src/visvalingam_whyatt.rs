//! Visvalingam-Whyatt simplification of closed outlines.
//!
//! Each interior vertex is scored by the area of the triangle it forms
//! with its neighbours; the vertex with the smallest area is removed
//! repeatedly until every remaining score exceeds the threshold.
//!
//! The outline is held in an index arena of `prev`/`next` links over its
//! entries. The list is open: the first entry and the closing duplicate
//! are its fixed ends, so the loop's starting vertex always survives.

use crate::types::{Outline, Vertex};

/// Doubly linked list node over an outline entry.
#[derive(Debug, Clone, Copy)]
struct Node {
    vertex: Vertex,
    prev: Option<usize>,
    next: Option<usize>,
    /// Doubled triangle area; only meaningful for interior nodes.
    area: u64,
}

/// Doubled area of the triangle `prev`–`v`–`next`.
fn doubled_area(prev: Vertex, v: Vertex, next: Vertex) -> u64 {
    let (ax, ay) = (i64::from(prev.x) - i64::from(v.x), i64::from(prev.y) - i64::from(v.y));
    let (bx, by) = (i64::from(next.x) - i64::from(v.x), i64::from(next.y) - i64::from(v.y));
    (ax * by - ay * bx).unsigned_abs()
}

struct Chain {
    nodes: Vec<Node>,
}

impl Chain {
    fn new(vertices: &[Vertex]) -> Self {
        let last = vertices.len().saturating_sub(1);
        let mut nodes: Vec<Node> = vertices
            .iter()
            .enumerate()
            .map(|(i, &vertex)| Node {
                vertex,
                prev: i.checked_sub(1),
                next: (i < last).then_some(i + 1),
                area: 0,
            })
            .collect();
        for i in 1..last {
            nodes[i].area = doubled_area(nodes[i - 1].vertex, nodes[i].vertex, nodes[i + 1].vertex);
        }
        Self { nodes }
    }

    fn refresh(&mut self, index: usize) {
        let node = self.nodes[index];
        if let (Some(prev), Some(next)) = (node.prev, node.next) {
            self.nodes[index].area =
                doubled_area(self.nodes[prev].vertex, node.vertex, self.nodes[next].vertex);
        }
    }

    /// The interior node with the smallest area; the first one wins ties.
    fn min_interior(&self) -> Option<(usize, u64)> {
        let mut best: Option<(usize, u64)> = None;
        let mut cursor = self.nodes.first().and_then(|n| n.next);
        while let Some(index) = cursor {
            let node = self.nodes[index];
            if node.next.is_none() {
                break;
            }
            if best.is_none_or(|(_, area)| node.area < area) {
                best = Some((index, node.area));
            }
            cursor = node.next;
        }
        best
    }

    fn remove(&mut self, index: usize) {
        let Node { prev, next, .. } = self.nodes[index];
        if let Some(prev) = prev {
            self.nodes[prev].next = next;
        }
        if let Some(next) = next {
            self.nodes[next].prev = prev;
        }
        if let Some(prev) = prev {
            self.refresh(prev);
        }
        if let Some(next) = next {
            self.refresh(next);
        }
    }

    fn into_vertices(self) -> Vec<Vertex> {
        let mut vertices = Vec::new();
        let mut cursor = (!self.nodes.is_empty()).then_some(0);
        while let Some(index) = cursor {
            vertices.push(self.nodes[index].vertex);
            cursor = self.nodes[index].next;
        }
        vertices
    }
}

/// Simplify a closed outline in place.
///
/// Vertices whose doubled triangle area is at most `threshold` (squared
/// mesh units) are removed, smallest first. The outline stays closed and
/// never grows; it may shrink to its two fixed ends, which the caller
/// discards as degenerate.
pub fn simplify(outline: &mut Outline, threshold: u64) {
    let vertices = outline.vertices_mut();
    if vertices.len() < 3 {
        return;
    }

    let mut chain = Chain::new(vertices);
    while let Some((index, area)) = chain.min_interior() {
        if area > threshold {
            break;
        }
        chain.remove(index);
    }
    *vertices = chain.into_vertices();
}
