#![forbid(unsafe_code)]

pub mod kdtree;
pub mod union_find;
pub mod neighbor_grid;

pub use kdtree::KdTree;
pub use union_find::{AtomicUnionFind, UnionFind};
pub use neighbor_grid::{squared_distance, NeighborGrid};
