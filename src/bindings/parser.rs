// PyScriptFileParser - PyO3 wrapper for ScriptFileParser
//
// Parses once on construction; every extract_param call reuses the tree.

use super::literal::literal_to_py;
use crate::script::ScriptFileParser;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// Python-accessible script metadata parser
///
/// Raises ValueError on construction if the file cannot be read or parsed.
#[pyclass(name = "ScriptFileParser", frozen)]
pub struct PyScriptFileParser {
    inner: ScriptFileParser,
}

#[pymethods]
impl PyScriptFileParser {
    /// Parse the script at `file_address`
    #[new]
    #[pyo3(signature = (file_address))]
    fn new(file_address: &str) -> PyResult<Self> {
        let inner = ScriptFileParser::from_file(file_address).map_err(|e| {
            PyValueError::new_err(format!(
                "Error parsing script file: {} | {}",
                file_address, e
            ))
        })?;
        Ok(PyScriptFileParser { inner })
    }

    /// Parse in-memory source; `source_id` names the script in error messages
    #[staticmethod]
    #[pyo3(signature = (source, source_id="<string>"))]
    fn from_source(source: &str, source_id: &str) -> PyResult<Self> {
        let inner = ScriptFileParser::from_source(source, source_id).map_err(|e| {
            PyValueError::new_err(format!("Error parsing script file: {} | {}", source_id, e))
        })?;
        Ok(PyScriptFileParser { inner })
    }

    #[getter]
    fn file_addr(&self) -> &str {
        self.inner.source_id()
    }

    /// Value of the last top-level `param_name = <literal>`, or None if absent
    ///
    /// Raises:
    ///     ValueError: If the assigned value is not a literal
    fn extract_param<'py>(&self, py: Python<'py>, param_name: &str) -> PyResult<Bound<'py, PyAny>> {
        match self.inner.extract_param(param_name) {
            Ok(Some(value)) => literal_to_py(py, &value),
            Ok(None) => Ok(py.None().into_bound(py)),
            Err(e) => Err(PyValueError::new_err(format!(
                "Error parsing parameter: {} in script file for : {} | {}",
                e.name, e.source_id, e.cause
            ))),
        }
    }

    fn __repr__(&self) -> String {
        format!("ScriptFileParser({:?})", self.inner.source_id())
    }
}
