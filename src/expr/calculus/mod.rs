
//! Subsystems for doing basic calculus on expressions, such as taking
//! derivatives.

pub mod derivative;
pub mod reify;

pub use derivative::{DifferentiationError, differentiate};
pub use reify::reify;
