// gps/mod.rs
pub mod parser;
pub mod types;

pub use parser::process_line;
pub use types::*;
