pub mod cache;
pub mod cloze;
pub mod stats;
pub mod utils;
