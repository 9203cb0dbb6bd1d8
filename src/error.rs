use thiserror::Error;

/// Returned when promoting a weak reference whose object is already gone.
///
/// This is also what self-observation yields for an object that was never
/// handed to a `SharedPtr`, since its weak slot is still empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expired weak reference")]
pub struct ExpiredError;
