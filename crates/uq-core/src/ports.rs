//! Interfaces to the outside world, injected into a session.
//!
//! The session never reaches for ambient globals: the durable store, the
//! address query, the clipboard and the executor all arrive through these
//! traits. In-memory implementations live here too, for tests and for hosts
//! that have nothing better.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::error::Error;
use std::fmt;
use std::task::{Context, Poll};

use futures_util::future::LocalBoxFuture;
use futures_util::task::noop_waker_ref;

/// Failure reported by a port implementation.
#[derive(Debug)]
pub struct PortError {
    message: String,
    source: Option<Box<dyn Error + 'static>>,
}

impl PortError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Error + 'static) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl Error for PortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref()
    }
}

pub type PortResult<T> = std::result::Result<T, PortError>;

/// Durable string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> PortResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PortResult<()>;
    fn remove(&self, key: &str) -> PortResult<()>;
}

/// The decoded query parameters of the current address.
pub trait QueryParams {
    fn read(&self) -> Vec<(String, String)>;
    /// Rewrite the parameters in place, without adding a history entry.
    fn replace(&self, pairs: Vec<(String, String)>) -> PortResult<()>;
}

pub trait Clipboard {
    fn write_text(&self, text: &str) -> PortResult<()>;
}

/// Runs futures on the session's single thread.
pub trait Spawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries.borrow().clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Query parameters held in memory, counting rewrites.
#[derive(Debug, Default)]
pub struct MemoryQuery {
    pairs: RefCell<Vec<(String, String)>>,
    writes: Cell<usize>,
}

impl MemoryQuery {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self {
            pairs: RefCell::new(pairs),
            writes: Cell::new(0),
        }
    }

    pub fn pairs(&self) -> Vec<(String, String)> {
        self.pairs.borrow().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl QueryParams for MemoryQuery {
    fn read(&self) -> Vec<(String, String)> {
        self.pairs()
    }

    fn replace(&self, pairs: Vec<(String, String)>) -> PortResult<()> {
        *self.pairs.borrow_mut() = pairs;
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    history: RefCell<Vec<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<String> {
        self.history.borrow().last().cloned()
    }

    pub fn history(&self) -> Vec<String> {
        self.history.borrow().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> PortResult<()> {
        self.history.borrow_mut().push(text.to_string());
        Ok(())
    }
}

/// A hand-cranked executor.
///
/// Tasks queue up until the host polls them, which lets a caller choose the
/// order in which overlapping derivations complete.
#[derive(Default)]
pub struct TaskQueue {
    tasks: RefCell<VecDeque<LocalBoxFuture<'static, ()>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Poll every queued task oldest first until none makes progress.
    pub fn run_until_stalled(&self) {
        loop {
            let mut progressed = false;
            for _ in 0..self.len() {
                let Some(task) = self.tasks.borrow_mut().pop_front() else {
                    break;
                };
                if self.poll_task(task) {
                    progressed = true;
                }
            }
            if !progressed || self.is_empty() {
                break;
            }
        }
    }

    /// Poll the most recently spawned task once. Returns whether it finished.
    pub fn run_newest(&self) -> bool {
        let task = self.tasks.borrow_mut().pop_back();
        task.is_some_and(|task| self.poll_task(task))
    }

    /// Poll the oldest queued task once. Returns whether it finished.
    pub fn run_oldest(&self) -> bool {
        let task = self.tasks.borrow_mut().pop_front();
        task.is_some_and(|task| self.poll_task(task))
    }

    fn poll_task(&self, mut task: LocalBoxFuture<'static, ()>) -> bool {
        let mut cx = Context::from_waker(noop_waker_ref());
        match task.as_mut().poll(&mut cx) {
            Poll::Ready(()) => true,
            Poll::Pending => {
                self.tasks.borrow_mut().push_back(task);
                false
            }
        }
    }
}

impl Spawner for TaskQueue {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.tasks.borrow_mut().push_back(task);
    }
}
