/// A pair whose stateless half occupies no storage.
///
/// Rust lays out zero-sized fields at no cost, so an empty policy paired
/// with a pointer leaves the pair pointer-sized without any layout tricks.
/// Only stateful policies pay for their own fields.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompressedPair<F, S> {
    first: F,
    second: S,
}

impl<F, S> CompressedPair<F, S> {
    pub const fn new(first: F, second: S) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &F {
        &self.first
    }

    pub fn first_mut(&mut self) -> &mut F {
        &mut self.first
    }

    pub fn second(&self) -> &S {
        &self.second
    }

    pub fn second_mut(&mut self) -> &mut S {
        &mut self.second
    }

    pub fn into_parts(self) -> (F, S) {
        (self.first, self.second)
    }
}
