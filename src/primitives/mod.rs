//! Core compute primitives (Vector, Matrix).
//!
//! Row-major dense storage shared by the preprocessing, tree, and metrics
//! modules.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
