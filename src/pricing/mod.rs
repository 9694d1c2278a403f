pub mod freight;
pub mod quote;

pub use freight::{build_quote, calculate_flete};
pub use quote::assemble_quote;
