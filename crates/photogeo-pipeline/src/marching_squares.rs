//! Marching squares over a binary mask.
//!
//! Nodes sit on pixel corners: node `(x, y)` is the top-left corner of
//! pixel `(x, y)`, giving a `(width + 1) × (height + 1)` grid. A node's
//! configuration packs its four surrounding cells as
//! `TL·8 + TR·4 + BR·2 + BL·1`, with cells outside the mask inactive.
//!
//! Vertices live in mesh space (pixel coordinates ×2). Around node
//! `(x, y)` the four side midpoints are:
//!
//! ```text
//!             A (2x, 2y-1)
//!                  |
//!   D (2x-1, 2y) --+-- B (2x+1, 2y)
//!                  |
//!             C (2x, 2y+1)
//! ```
//!
//! Every configuration other than 0 and 15 carries one directed crossing
//! edge between two sides (two at the saddle configurations 5 and 10),
//! oriented so the active cells are on its right. A walk leaves a node
//! through the edge's exit side and enters the neighbouring node through
//! the opposite side; the entry side alone selects the next edge, which
//! also resolves the saddles.

use crate::types::{Dimensions, Mask, Outline, PipelineError, Vertex};

/// One side of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// A: towards the node above.
    Top,
    /// B: towards the node to the right.
    Right,
    /// C: towards the node below.
    Bottom,
    /// D: towards the node to the left.
    Left,
}

impl Side {
    const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }

    /// The mesh vertex at this side of node `(x, y)`.
    const fn vertex(self, x: u32, y: u32) -> Vertex {
        match self {
            Self::Top => Vertex::new(2 * x, 2 * y - 1),
            Self::Right => Vertex::new(2 * x + 1, 2 * y),
            Self::Bottom => Vertex::new(2 * x, 2 * y + 1),
            Self::Left => Vertex::new(2 * x - 1, 2 * y),
        }
    }

    /// The neighbouring node reached by leaving `(x, y)` through this side.
    const fn step(self, x: u32, y: u32) -> (u32, u32) {
        match self {
            Self::Top => (x, y - 1),
            Self::Right => (x + 1, y),
            Self::Bottom => (x, y + 1),
            Self::Left => (x - 1, y),
        }
    }
}

/// A directed crossing edge inside one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    entry: Side,
    exit: Side,
}

const fn edge(entry: Side, exit: Side) -> Edge {
    Edge { entry, exit }
}

use Side::{Bottom as C, Left as D, Right as B, Top as A};

/// Crossing edges per configuration.
const EDGES: [&[Edge]; 16] = [
    &[],
    &[edge(D, C)],
    &[edge(C, B)],
    &[edge(D, B)],
    &[edge(B, A)],
    &[edge(B, A), edge(D, C)],
    &[edge(C, A)],
    &[edge(D, A)],
    &[edge(A, D)],
    &[edge(A, C)],
    &[edge(A, D), edge(C, B)],
    &[edge(A, B)],
    &[edge(B, D)],
    &[edge(B, C)],
    &[edge(C, D)],
    &[],
];

/// Node configurations plus one "assigned" flag per crossing edge.
struct NodeGrid {
    width: u32,
    height: u32,
    configurations: Vec<u8>,
    assigned: Vec<[bool; 2]>,
}

impl NodeGrid {
    fn new(mask: &Mask) -> Result<Self, PipelineError> {
        let Dimensions { width, height } = mask.dimensions();
        let len = (width as usize + 1) * (height as usize + 1);

        let mut configurations = Vec::new();
        configurations
            .try_reserve_exact(len)
            .map_err(|e| PipelineError::Allocation(format!("{len}-node grid: {e}")))?;
        let mut assigned = Vec::new();
        assigned
            .try_reserve_exact(len)
            .map_err(|e| PipelineError::Allocation(format!("{len}-node edge flags: {e}")))?;

        for y in 0..=i64::from(height) {
            for x in 0..=i64::from(width) {
                let tl = u8::from(mask.get(x - 1, y - 1));
                let tr = u8::from(mask.get(x, y - 1));
                let br = u8::from(mask.get(x, y));
                let bl = u8::from(mask.get(x - 1, y));
                configurations.push((tl << 3) | (tr << 2) | (br << 1) | bl);
            }
        }
        assigned.resize(len, [false; 2]);

        Ok(Self {
            width,
            height,
            configurations,
            assigned,
        })
    }

    const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * (self.width as usize + 1) + x as usize
    }

    fn edges(&self, x: u32, y: u32) -> &'static [Edge] {
        EDGES[usize::from(self.configurations[self.index(x, y)])]
    }

    /// The slot of the edge at `(x, y)` that is entered through `entry`.
    fn slot_entered_from(&self, x: u32, y: u32, entry: Side) -> Option<usize> {
        self.edges(x, y).iter().position(|e| e.entry == entry)
    }

    fn is_assigned(&self, x: u32, y: u32, slot: usize) -> bool {
        self.assigned[self.index(x, y)][slot]
    }

    fn assign(&mut self, x: u32, y: u32, slot: usize) {
        let index = self.index(x, y);
        self.assigned[index][slot] = true;
    }

    /// Follow the loop that starts with edge `slot` of node `(x, y)`.
    fn walk(&mut self, x: u32, y: u32, slot: usize) -> Outline {
        let start = (x, y, slot);
        let (mut x, mut y, mut slot) = start;
        let mut vertices = Vec::new();

        loop {
            assert!(
                !self.is_assigned(x, y, slot),
                "contour walk reached an edge of another loop at node ({x}, {y})",
            );
            self.assign(x, y, slot);

            let current = self.edges(x, y)[slot];
            vertices.push(current.entry.vertex(x, y));

            (x, y) = current.exit.step(x, y);
            let Some(next) = self.slot_entered_from(x, y, current.exit.opposite()) else {
                unreachable!("contour walk reached node ({x}, {y}) with no matching edge");
            };
            if (x, y, next) == start {
                break;
            }
            slot = next;
        }

        vertices.push(vertices[0]);
        Outline::new(vertices)
    }
}

/// Trace every closed boundary of `mask`.
///
/// Nodes are scanned row-major and every unassigned edge roots a new
/// loop, so outer boundaries and hole boundaries are both found. Each
/// edge belongs to exactly one loop.
///
/// # Errors
///
/// Returns [`PipelineError::Allocation`] if the node grid cannot be
/// allocated.
///
/// # Panics
///
/// Panics if a walk reaches an edge owned by another loop, which can only
/// happen if the edge table is inconsistent.
pub fn trace(mask: &Mask) -> Result<Vec<Outline>, PipelineError> {
    let mut grid = NodeGrid::new(mask)?;
    let mut outlines = Vec::new();

    for y in 0..=grid.height {
        for x in 0..=grid.width {
            for slot in 0..grid.edges(x, y).len() {
                if !grid.is_assigned(x, y, slot) {
                    outlines.push(grid.walk(x, y, slot));
                }
            }
        }
    }

    Ok(outlines)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Build a mask from rows of `#` (active) and `.` (inactive).
    fn mask(rows: &[&str]) -> Mask {
        let height = u32::try_from(rows.len()).unwrap();
        let width = u32::try_from(rows[0].len()).unwrap();
        Mask::from_fn(Dimensions { width, height }, |x, y| {
            rows[y as usize].as_bytes()[x as usize] == b'#'
        })
    }

    /// Twice the signed area; positive for clockwise loops on screen.
    fn signed_area(outline: &Outline) -> i64 {
        outline
            .vertices()
            .windows(2)
            .map(|w| {
                let (x0, y0) = (i64::from(w[0].x), i64::from(w[0].y));
                let (x1, y1) = (i64::from(w[1].x), i64::from(w[1].y));
                x0 * y1 - x1 * y0
            })
            .sum()
    }

    fn assert_well_formed(outlines: &[Outline]) {
        for outline in outlines {
            assert!(outline.is_closed());
            assert!(outline.len() >= 5, "fresh outline too short: {outline:?}");
            for w in outline.vertices().windows(2) {
                let dx = w[0].x.abs_diff(w[1].x);
                let dy = w[0].y.abs_diff(w[1].y);
                assert_eq!(dx + dy, 2, "vertices {:?} and {:?} do not share a node", w[0], w[1]);
            }
        }
    }

    #[test]
    fn configurations_zero_and_fifteen_have_no_edges() {
        assert!(EDGES[0].is_empty());
        assert!(EDGES[15].is_empty());
        for configuration in 1..15 {
            assert!(!EDGES[configuration].is_empty());
        }
    }

    #[test]
    fn empty_mask_produces_no_outlines() {
        assert!(trace(&mask(&["...", "..."])).unwrap().is_empty());
    }

    #[test]
    fn single_pixel_is_a_diamond() {
        let outlines = trace(&mask(&["#"])).unwrap();
        assert_eq!(outlines.len(), 1);
        assert_eq!(
            outlines[0].vertices(),
            &[
                Vertex::new(0, 1),
                Vertex::new(1, 0),
                Vertex::new(2, 1),
                Vertex::new(1, 2),
                Vertex::new(0, 1),
            ],
        );
    }

    #[test]
    fn interior_pixel_is_offset_in_mesh_space() {
        let outlines = trace(&mask(&["...", ".#.", "..."])).unwrap();
        assert_eq!(outlines.len(), 1);
        let vertices = outlines[0].vertices();
        assert_eq!(vertices.len(), 5);
        assert_eq!(vertices[0], Vertex::new(2, 3));
    }

    #[test]
    fn two_by_two_block_is_a_chamfered_octagon() {
        let outlines = trace(&mask(&["##", "##"])).unwrap();
        assert_eq!(outlines.len(), 1);
        assert_eq!(
            outlines[0].vertices(),
            &[
                Vertex::new(0, 1),
                Vertex::new(1, 0),
                Vertex::new(3, 0),
                Vertex::new(4, 1),
                Vertex::new(4, 3),
                Vertex::new(3, 4),
                Vertex::new(1, 4),
                Vertex::new(0, 3),
                Vertex::new(0, 1),
            ],
        );
    }

    #[test]
    fn ring_produces_outer_loop_and_hole() {
        let outlines = trace(&mask(&["###", "#.#", "###"])).unwrap();
        assert_eq!(outlines.len(), 2);
        assert_well_formed(&outlines);
        // Outer boundary first (row-major roots), clockwise; hole counter-clockwise.
        assert!(signed_area(&outlines[0]) > 0);
        assert!(signed_area(&outlines[1]) < 0);
    }

    #[test]
    fn diagonal_saddle_separates_pixels() {
        for rows in [["#.", ".#"], [".#", "#."]] {
            let outlines = trace(&mask(&rows)).unwrap();
            assert_eq!(outlines.len(), 2, "{rows:?}");
            assert_well_formed(&outlines);
            assert!(outlines.iter().all(|o| o.len() == 5));
        }
    }

    #[test]
    fn diagonal_background_pixels_form_one_hole() {
        // Saddles keep the foreground 4-connected, so background pixels
        // touching at a corner join into a single hole.
        let outlines = trace(&mask(&["####", "#.##", "##.#", "####"])).unwrap();
        assert_well_formed(&outlines);
        assert_eq!(outlines.len(), 2);
        assert!(signed_area(&outlines[0]) > 0);
        assert!(signed_area(&outlines[1]) < 0);
    }

    #[test]
    fn outlines_keep_foreground_on_the_right() {
        for rows in [&["#"][..], &["##", "##"], &["#..", "###", "..#"]] {
            let outlines = trace(&mask(rows)).unwrap();
            assert_eq!(outlines.len(), 1);
            assert!(signed_area(&outlines[0]) > 0, "{rows:?}");
        }
    }

    #[test]
    fn dense_pattern_is_well_formed() {
        let dimensions = Dimensions {
            width: 23,
            height: 17,
        };
        let mask = Mask::from_fn(dimensions, |x, y| (x * 7 + y * 13 + x * y) % 5 < 2);
        let outlines = trace(&mask).unwrap();
        assert!(!outlines.is_empty());
        assert_well_formed(&outlines);
        for outline in &outlines {
            assert!(outline.vertices().iter().all(|v| v.x <= 46 && v.y <= 34));
        }
    }

    #[test]
    fn full_mask_traces_its_border() {
        let outlines = trace(&mask(&["###", "###"])).unwrap();
        assert_eq!(outlines.len(), 1);
        assert_well_formed(&outlines);
        // One midpoint per pixel edge on the border.
        assert_eq!(outlines[0].len(), 2 * (3 + 2) + 1);
    }
}
