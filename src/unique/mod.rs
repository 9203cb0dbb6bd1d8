//! Single-owner pointer with a pluggable deleter.

mod compressed_pair;
mod unique_ptr;

pub use compressed_pair::CompressedPair;
pub use unique_ptr::{make_unique, UniquePtr};
