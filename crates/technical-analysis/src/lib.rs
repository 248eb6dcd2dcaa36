pub mod analyzer;
pub mod config;
pub mod indicators;
pub mod momentum;
pub mod patterns;
pub mod trend_strength;
pub mod validation;
pub mod wick;


pub use analyzer::*;
pub use config::*;
pub use indicators::*;
pub use momentum::*;
pub use patterns::*;
pub use trend_strength::*;
pub use validation::*;
pub use wick::*;
