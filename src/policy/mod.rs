//! Counting and destruction policies shared by the pointer types.

mod counter;
mod delete;

pub(crate) use counter::{decrement, increment};
pub use counter::{Counter, SimpleCounter};
pub use delete::{DefaultDelete, Deleter, Destroy};
