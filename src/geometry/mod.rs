pub mod precision;
pub mod simplify;

pub use precision::{MAX_DECIMALS, Precision, PrecisionError};
pub use simplify::simplify_geometry;
