//! # Surface Nets Tables
//!
//! Corner and edge numbering of a unit cell, plus the 256-entry edge table
//! mapping a corner sign mask to the set of edges with a sign change.
//!
//! Corner `i` sits at offset `(i & 1, (i >> 1) & 1, (i >> 2) & 1)`.

/// Offsets of the 8 cell corners.
pub const CORNER_OFFSETS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// Corner pairs of the 12 cell edges: 4 along X, 4 along Y, 4 along Z.
pub const EDGE_CORNERS: [[usize; 2]; 12] = [
    [0, 1],
    [2, 3],
    [4, 5],
    [6, 7],
    [0, 2],
    [1, 3],
    [4, 6],
    [5, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Bitmask of crossed edges for every corner mask (bit `i` = corner `i` inside).
pub const EDGE_TABLE: [u16; 256] = build_edge_table();

const fn build_edge_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut mask = 0;
    while mask < 256 {
        let mut edges = 0u16;
        let mut edge = 0;
        while edge < 12 {
            let a = (mask >> EDGE_CORNERS[edge][0]) & 1;
            let b = (mask >> EDGE_CORNERS[edge][1]) & 1;
            if a != b {
                edges |= 1 << edge;
            }
            edge += 1;
        }
        table[mask] = edges;
        mask += 1;
    }
    table
}
