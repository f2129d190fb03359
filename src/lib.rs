// pyRevit Core Utilities - native script metadata parsing and directory fingerprinting
//
// The Rust API is usable on its own; the `python` feature builds the PyO3
// extension module the add-in loads.

pub mod errors;
pub mod fingerprint;
pub mod registry;
pub mod script;

// PyO3 bindings layer
#[cfg(feature = "python")]
pub mod bindings;

pub use errors::{ExtractionError, FingerprintError, LiteralError, ScriptParseError};
pub use fingerprint::{
    calculate_dir_hash, fingerprint_batch, get_str_hash, CompiledFilter, FingerprintFilter,
};
pub use registry::ComponentRegistry;
pub use script::{LiteralValue, ScriptFileParser, ScriptMetadata};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// pyRevit core utilities Python module
#[cfg(feature = "python")]
#[pymodule]
fn pyrevit_coreutils(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    // Add Python functions
    m.add_function(wrap_pyfunction!(bindings::calculate_dir_hash, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::calculate_dir_hashes, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::get_str_hash, m)?)?;

    // Add Python classes
    m.add_class::<bindings::PyScriptFileParser>()?;

    Ok(())
}
