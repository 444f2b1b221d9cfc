//! Synchronization wiring.
//!
//! A [`Session`] binds a [`Form`] to cells, loads initial state from the
//! durable store and the address, then wires three independent flows:
//!
//! - `(secret, remember)` keeps the stored secret present or absent;
//! - `(secret, subject, limit, exclude)` derives the output field;
//! - `(subject, limit, exclude)` rewrites the address query.
//!
//! Each flow reads only cells and writes only its own sink, so the graph
//! stays acyclic. Commands (reset limit, copy) are the only path by which a
//! side effect feeds back into a cell.

use std::fmt;
use std::rc::Rc;

use futures_util::FutureExt;

use crate::cell::{Field, Getter, Setter, ValueCell};
use crate::combine::combine_latest;
use crate::derive::{CharClasses, DEFAULT_LIMIT, derive};
use crate::event::{EventSource, Trigger};
use crate::ports::{Clipboard, KeyValueStore, QueryParams, Spawner};
use crate::query::{QueryState, parse_limit};

/// Store key holding the remembered secret.
pub const SECRET_KEY: &str = "secret";

/// The bound inputs and command buttons.
#[derive(Clone)]
pub struct Form {
    pub secret: Field<String>,
    pub subject: Field<String>,
    /// Raw text of the limit input.
    pub limit: Field<String>,
    pub password: Field<String>,
    pub remember: Field<bool>,
    pub exclude: Field<CharClasses>,
    pub copy: Trigger,
    pub reset_limit: Trigger,
}

impl Form {
    pub fn new() -> Self {
        Self {
            secret: Field::default(),
            subject: Field::default(),
            limit: Field::new(DEFAULT_LIMIT.to_string()),
            password: Field::default(),
            remember: Field::default(),
            exclude: Field::default(),
            copy: Trigger::new(),
            reset_limit: Trigger::new(),
        }
    }
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

/// Cells and event sources over a [`Form`].
#[derive(Clone)]
pub struct Controls {
    pub secret: ValueCell<String>,
    pub subject: ValueCell<String>,
    /// `None` when the limit input is empty or unparseable.
    pub limit: ValueCell<Option<usize>>,
    pub password: ValueCell<String>,
    pub remember: ValueCell<bool>,
    pub exclude: ValueCell<CharClasses>,
    pub copy: EventSource,
    pub reset_limit: EventSource,
}

impl Controls {
    pub fn bind(form: &Form) -> Self {
        let limit = ValueCell::from_field(&form.limit).map(
            |get: Getter<String>| -> Getter<Option<usize>> {
                Rc::new(move || parse_limit(&get()).ok())
            },
            |set: Setter<String>| -> Setter<Option<usize>> {
                Rc::new(move |value: Option<usize>| {
                    set(value.map(|n| n.to_string()).unwrap_or_default())
                })
            },
        );

        Self {
            secret: ValueCell::from_field(&form.secret),
            subject: ValueCell::from_field(&form.subject),
            limit,
            password: ValueCell::from_field(&form.password),
            remember: ValueCell::from_field(&form.remember),
            exclude: ValueCell::from_field(&form.exclude),
            copy: EventSource::from_trigger(&form.copy),
            reset_limit: EventSource::from_trigger(&form.reset_limit),
        }
    }
}

/// The injected external interfaces.
#[derive(Clone)]
pub struct Ports {
    pub store: Rc<dyn KeyValueStore>,
    pub query: Rc<dyn QueryParams>,
    pub clipboard: Rc<dyn Clipboard>,
    pub spawner: Rc<dyn Spawner>,
}

/// Which input should receive focus after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Secret,
    Subject,
    Output,
}

impl Focus {
    pub fn as_str(self) -> &'static str {
        match self {
            Focus::Secret => "secret",
            Focus::Subject => "subject",
            Focus::Output => "output",
        }
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Session {
    controls: Controls,
    focus: Focus,
}

impl Session {
    /// Load state, pick the initial focus and wire every flow.
    ///
    /// Order: durable store, then address parameters (which override), then
    /// focus, then wiring. Wiring subscribes every flow, so each one runs
    /// once immediately with the loaded values.
    pub fn start(form: &Form, ports: Ports) -> Self {
        let controls = Controls::bind(form);
        load_from_store(&controls, ports.store.as_ref());
        load_from_query(&controls, ports.query.as_ref());
        let focus = initial_focus(&controls);
        tracing::debug!(%focus, "session loaded");
        wire(&controls, &ports);
        Self { controls, focus }
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }
}

/// A stored secret implies the remember toggle was on.
pub fn load_from_store(controls: &Controls, store: &dyn KeyValueStore) {
    match store.get(SECRET_KEY) {
        Ok(Some(secret)) => {
            controls.secret.set(secret);
            controls.remember.set(true);
        }
        Ok(None) => {}
        Err(e) => tracing::error!("failed to read stored secret: {e}"),
    }
}

pub fn load_from_query(controls: &Controls, query: &dyn QueryParams) {
    let state = QueryState::from_pairs(&query.read());
    if let Some(limit) = state.limit {
        controls.limit.set(Some(limit));
    }
    if let Some(subject) = state.subject {
        controls.subject.set(subject);
    }
    if !state.exclude.is_empty() {
        controls.exclude.set(state.exclude);
    }
}

pub fn initial_focus(controls: &Controls) -> Focus {
    if controls.secret.get().is_empty() {
        Focus::Secret
    } else if controls.subject.get().is_empty() {
        Focus::Subject
    } else {
        Focus::Output
    }
}

/// Subscribe every flow and command handler.
///
/// Overlapping derivations are not cancelled or ordered: whichever finishes
/// last writes the output field.
pub fn wire(controls: &Controls, ports: &Ports) {
    let store = Rc::clone(&ports.store);
    combine_latest((controls.secret.clone(), controls.remember.clone())).subscribe(
        move |(secret, remember)| {
            let result = if remember {
                store.set(SECRET_KEY, &secret)
            } else {
                store.remove(SECRET_KEY)
            };
            if let Err(e) = result {
                tracing::error!(remember, "failed to sync stored secret: {e}");
            }
        },
    );

    let password = controls.password.clone();
    let spawner = Rc::clone(&ports.spawner);
    combine_latest((
        controls.secret.clone(),
        controls.subject.clone(),
        controls.limit.clone(),
        controls.exclude.clone(),
    ))
    .subscribe(move |(secret, subject, limit, exclude)| {
        let password = password.clone();
        spawner.spawn(
            async move {
                let derived = derive(secret, subject, limit, exclude).await;
                password.set(derived);
            }
            .boxed_local(),
        );
    });

    let query = Rc::clone(&ports.query);
    combine_latest((
        controls.subject.clone(),
        controls.limit.clone(),
        controls.exclude.clone(),
    ))
    .subscribe(move |(subject, limit, exclude)| {
        let mut pairs = query.read();
        QueryState {
            subject: Some(subject),
            limit,
            exclude,
        }
        .apply(&mut pairs);
        if let Err(e) = query.replace(pairs) {
            tracing::error!("failed to rewrite query parameters: {e}");
        }
    });

    let limit = controls.limit.clone();
    controls
        .reset_limit
        .subscribe(move || limit.set(Some(DEFAULT_LIMIT)));

    let password = controls.password.clone();
    let clipboard = Rc::clone(&ports.clipboard);
    controls.copy.subscribe(move || {
        if let Err(e) = clipboard.write_text(&password.get()) {
            tracing::error!("failed to copy derived output: {e}");
        }
    });
}
