pub mod error;
pub mod series;
pub mod types;

pub use error::*;
pub use series::*;
pub use types::*;
