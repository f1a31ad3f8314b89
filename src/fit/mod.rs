//! Zero-point fitting stages.
//!
//! Responsibilities:
//!
//! - select usable matched pairs (`selection`)
//! - hold out a reproducible validation sample (`reserve`)
//! - fit the zero point with iterative sigma clipping (`fitter`)

pub mod fitter;
pub mod reserve;
pub mod selection;

pub use fitter::*;
pub use reserve::*;
pub use selection::*;
