// Conversion of extracted literals into native Python objects

use crate::script::LiteralValue;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyBytes, PyDict, PyFloat, PyList, PySet, PyString, PyTuple};

/// Build the Python object a literal stands for (`Set` becomes a real `set`, etc.)
pub(crate) fn literal_to_py<'py>(
    py: Python<'py>,
    value: &LiteralValue,
) -> PyResult<Bound<'py, PyAny>> {
    let object = match value {
        LiteralValue::None => py.None().into_bound(py),
        LiteralValue::Bool(b) => PyBool::new(py, *b).to_owned().into_any(),
        LiteralValue::Int(i) => (*i).into_pyobject(py)?.into_any(),
        LiteralValue::Float(f) => PyFloat::new(py, *f).into_any(),
        LiteralValue::Str(s) => PyString::new(py, s).into_any(),
        LiteralValue::Bytes(b) => PyBytes::new(py, b).into_any(),
        LiteralValue::List(items) => PyList::new(py, convert_items(py, items)?)?.into_any(),
        LiteralValue::Tuple(items) => PyTuple::new(py, convert_items(py, items)?)?.into_any(),
        LiteralValue::Set(items) => PySet::new(py, convert_items(py, items)?)?.into_any(),
        LiteralValue::Dict(pairs) => {
            let dict = PyDict::new(py);
            for (key, item) in pairs {
                dict.set_item(literal_to_py(py, key)?, literal_to_py(py, item)?)?;
            }
            dict.into_any()
        }
    };
    Ok(object)
}

fn convert_items<'py>(
    py: Python<'py>,
    items: &[LiteralValue],
) -> PyResult<Vec<Bound<'py, PyAny>>> {
    items.iter().map(|item| literal_to_py(py, item)).collect()
}
