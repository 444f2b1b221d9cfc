//! Host-side port implementations for the terminal.

use std::cell::RefCell;
use std::io::{self, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::LocalBoxFuture;
use tokio::task::JoinHandle;
use url::Url;
use uq_core::{Clipboard, PortError, PortResult, QueryParams, Spawner};

/// Used when neither `--url` nor `UQ_URL` is given.
pub const DEFAULT_URL: &str = "uniqpass:///";

/// Spawns derivations on the current [`tokio::task::LocalSet`].
///
/// Must only be used from inside `LocalSet::run_until`.
#[derive(Default)]
pub struct LocalSpawner {
    handles: RefCell<Vec<JoinHandle<()>>>,
}

impl LocalSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for every task spawned so far, including ones spawned while
    /// waiting.
    pub async fn drain(&self) {
        loop {
            let pending: Vec<_> = self.handles.borrow_mut().drain(..).collect();
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                if let Err(e) = handle.await {
                    tracing::error!("derivation task failed: {e}");
                }
            }
        }
    }
}

impl Spawner for LocalSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        let handle = tokio::task::spawn_local(task);
        self.handles.borrow_mut().push(handle);
    }
}

/// Query parameters of a URL held for the lifetime of the process.
#[derive(Debug)]
pub struct UrlQuery {
    url: RefCell<Url>,
}

impl UrlQuery {
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: RefCell::new(Url::parse(input)?),
        })
    }

    pub fn url(&self) -> Url {
        self.url.borrow().clone()
    }
}

impl QueryParams for UrlQuery {
    fn read(&self) -> Vec<(String, String)> {
        self.url.borrow().query_pairs().into_owned().collect()
    }

    fn replace(&self, pairs: Vec<(String, String)>) -> PortResult<()> {
        let mut url = self.url.borrow_mut();
        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
        tracing::debug!(url = %url, "query rewritten");
        Ok(())
    }
}

/// Copies text by emitting an OSC 52 escape sequence.
///
/// The terminal decodes the base64 payload and places it on the system
/// clipboard. Terminals without OSC 52 support ignore the sequence.
pub struct Osc52Clipboard<W: Write> {
    out: RefCell<W>,
}

impl<W: Write> Osc52Clipboard<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl Osc52Clipboard<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> Clipboard for Osc52Clipboard<W> {
    fn write_text(&self, text: &str) -> PortResult<()> {
        let mut out = self.out.borrow_mut();
        write!(out, "\x1b]52;c;{}\x07", STANDARD.encode(text))
            .and_then(|()| out.flush())
            .map_err(|e| PortError::with_source("failed to write clipboard escape", e))
    }
}
