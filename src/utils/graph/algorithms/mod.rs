//! Graph algorithms over the traits in [`crate::utils::graph`].

mod traversal;

pub use traversal::{dfs, postorder, reverse_postorder, DfsIterator};
