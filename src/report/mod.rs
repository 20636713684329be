pub mod pdf;
pub mod stats;
