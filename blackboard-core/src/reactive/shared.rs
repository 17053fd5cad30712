//! Shared engine handle.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::engine::Engine;
use super::report::PassReport;

/// An [`Engine`] behind a mutex, for hosts that drive one engine from
/// several threads.
///
/// The lock serializes access and nothing more. Holding the guard across a
/// call back into the same handle deadlocks.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Engine> {
        self.inner.lock()
    }

    /// Run `f` with the engine locked.
    pub fn with<T>(&self, f: impl FnOnce(&mut Engine) -> T) -> T {
        f(&mut self.inner.lock())
    }

    pub fn run_pass(&self) -> PassReport {
        self.inner.lock().run_pass(None)
    }
}

impl From<Engine> for SharedEngine {
    fn from(engine: Engine) -> Self {
        Self::new(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use std::thread;

    #[test]
    fn edits_from_other_threads_land_in_one_pass() {
        let shared = SharedEngine::new(Engine::new());
        let x = shared.with(|engine| engine.input_with(0i64)).unwrap();

        let handles: Vec<_> = (1..=4i64)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    shared.with(|engine| engine.set_input_value(x, i * 10)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let report = shared.run_pass();
        assert_eq!(report.changed, vec![x]);
        let value = shared.lock().value(x).unwrap().cloned();
        assert!(matches!(value, Some(Value::Int(v)) if v % 10 == 0 && v > 0));
    }

    #[test]
    fn engine_keeps_running_after_a_thread_panics_in_a_group() {
        let shared = SharedEngine::new(Engine::new());
        let x = shared.with(|engine| engine.input_with(0i64)).unwrap();

        let worker = shared.clone();
        let joined = thread::spawn(move || {
            worker.with(|engine| engine.group(|_| panic!("worker gave up")));
        })
        .join();
        assert!(joined.is_err());

        shared.with(|engine| engine.set_input_value(x, 7i64)).unwrap();
        let report = shared.run_pass();
        assert!(!report.is_empty());
        assert_eq!(shared.lock().value(x).unwrap(), Some(&Value::Int(7)));
    }
}
