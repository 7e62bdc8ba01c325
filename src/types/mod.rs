pub mod activity;
pub mod analysis;
pub mod terrain;
pub mod weather;
