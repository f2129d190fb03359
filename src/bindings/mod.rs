// PyO3 Bindings Module
//
// Exposes the script parser and the fingerprinting functions to the Python host.

mod api;
mod literal;
mod parser;

// Re-export for lib.rs
pub use api::{calculate_dir_hash, calculate_dir_hashes, get_str_hash};
pub use parser::PyScriptFileParser;
