pub mod analyze;
pub mod calories;
pub mod geo;
pub mod parse;
pub mod process;
