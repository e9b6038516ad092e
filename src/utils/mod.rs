//! Shared infrastructure: a dense bit set and graph traversal.

mod bitset;

pub mod graph;

pub use bitset::{BitSet, BitSetIter};
