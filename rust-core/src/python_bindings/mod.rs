//! PyO3 bindings for a Python presentation layer

use pyo3::prelude::*;

mod spectrum_bindings;

/// Python module definition
#[pymodule]
fn effects_host(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<spectrum_bindings::PySpectrumAnalyzer>()?;

    Ok(())
}
