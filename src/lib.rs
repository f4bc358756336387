pub mod dissection;
pub mod error;
pub mod graph;
pub mod nelder_mead;
pub mod objective;
pub mod render;
pub mod solver;
pub mod symmetry;
pub mod types;

pub use error::{Error, Result};
