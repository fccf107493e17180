//! Single subscribable value
//!
//! Holds the current value of an app-wide setting (theme tokens, accent mode)
//! and pushes every replacement to its listeners synchronously.

use crate::terminal::ListenerId;
use parking_lot::Mutex;
use std::sync::Arc;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Observable<T> {
    value: Mutex<T>,
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
}

impl<T: Clone + PartialEq + Send + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    /// Replace the value and notify every listener with the new one.
    ///
    /// Setting a value equal to the current one notifies nobody.
    pub fn set(&self, value: T) {
        {
            let mut current = self.value.lock();
            if *current == value {
                return;
            }
            *current = value.clone();
        }
        let listeners: Vec<Listener<T>> = self.listeners.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(&value);
        }
    }

    /// Apply `f` to a copy of the current value and publish the result
    pub fn update<F: FnOnce(&mut T)>(&self, f: F) -> T {
        let mut value = self.get();
        f(&mut value);
        self.set(value.clone());
        value
    }

    pub fn subscribe<F>(&self, id: ListenerId, listener: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.listeners.lock().push((id, Arc::new(listener)));
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.value.lock())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}
