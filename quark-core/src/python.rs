//! Python Bindings
//!
//! A standalone atom for Python hosts. Python values do have reference
//! identity, so unlike the Rust [`Atom`](crate::reactive::Atom), `set` here
//! is gated by `is` rather than by equality: assigning the very same object
//! is a no-op, assigning an equal but distinct object notifies.
//!
//! Values are stored as `Py<PyAny>`, which is `Send + Sync` and can be held
//! without the GIL. No lock is held while Python code runs (listeners, the
//! `mutate` callback, or finalizers of replaced values).

use parking_lot::Mutex;
use pyo3::prelude::*;

use crate::reactive::listeners::deliver;

/// Python-exposed Atom type.
#[pyclass(name = "Atom")]
pub struct PyAtom {
    /// The current value.
    value: Mutex<PyObject>,

    /// The value the atom was created with.
    initial: PyObject,

    /// Listener callables, in subscription order.
    listeners: Mutex<Vec<PyObject>>,
}

impl PyAtom {
    /// Call every listener still subscribed, in subscription order.
    ///
    /// A listener that raises does not stop the pass; the first exception
    /// is re-raised once every listener has run.
    fn notify(&self, py: Python<'_>) -> PyResult<()> {
        let pending: Vec<PyObject> = self
            .listeners
            .lock()
            .iter()
            .map(|listener| listener.clone_ref(py))
            .collect();

        deliver(
            pending,
            |listener| self.listeners.lock().iter().any(|l| l.is(listener)),
            |listener| listener.call0(py).map(drop),
        )
    }
}

#[pymethods]
impl PyAtom {
    /// Create a new atom with the given initial value.
    #[new]
    fn new(py: Python<'_>, value: PyObject) -> Self {
        Self {
            initial: value.clone_ref(py),
            value: Mutex::new(value),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Get the current value.
    fn get(&self, py: Python<'_>) -> PyObject {
        self.value.lock().clone_ref(py)
    }

    /// Get the value the atom was created with.
    fn initial(&self, py: Python<'_>) -> PyObject {
        self.initial.clone_ref(py)
    }

    /// Replace the value. Returns `False` if `value` is the current object.
    fn set(&self, py: Python<'_>, value: PyObject) -> PyResult<bool> {
        let replaced = {
            let mut current = self.value.lock();
            if current.is(&value) {
                return Ok(false);
            }
            std::mem::replace(&mut *current, value)
        };
        drop(replaced);

        self.notify(py)?;
        Ok(true)
    }

    /// Call `func(value)` for an in-place edit, then notify.
    ///
    /// If `func` raises, the exception propagates and nobody is notified.
    /// If a listener raises, the remaining listeners still run and the
    /// first exception propagates afterwards.
    fn mutate(&self, py: Python<'_>, func: PyObject) -> PyResult<PyObject> {
        let value = self.get(py);
        let result = func.call1(py, (value,))?;
        self.notify(py)?;
        Ok(result)
    }

    /// Subscribe `callback`. Returns `False` if it is already subscribed.
    fn subscribe(&self, callback: PyObject) -> bool {
        let mut listeners = self.listeners.lock();
        if listeners.iter().any(|l| l.is(&callback)) {
            return false;
        }
        listeners.push(callback);
        true
    }

    /// Unsubscribe `callback`. Returns `False` if it was not subscribed.
    fn unsubscribe(&self, callback: PyObject) -> bool {
        let removed = {
            let mut listeners = self.listeners.lock();
            let position = listeners.iter().position(|l| l.is(&callback));
            position.map(|index| listeners.remove(index))
        };
        removed.is_some()
    }

    /// Get the number of listeners.
    fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn __repr__(&self, py: Python<'_>) -> String {
        let value = self.get(py);
        let repr = value
            .bind(py)
            .repr()
            .map(|r| r.to_string())
            .unwrap_or_else(|_| "?".to_string());
        format!("Atom(value={}, listeners={})", repr, self.listener_count())
    }
}
