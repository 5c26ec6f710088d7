//! Mathematical utilities: least squares, linear regression, t distribution.

pub mod dist;
pub mod linregress;
pub mod ols;

pub use linregress::*;
pub use ols::*;
