mod base;
mod cross_entropy;
mod ctc;
mod reduction;

pub use base::*;
pub use cross_entropy::*;
pub use ctc::*;
pub use reduction::*;
