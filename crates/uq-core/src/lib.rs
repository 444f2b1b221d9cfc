//! Reactive cells and deterministic site-password derivation.
//!
//! Value cells wrap externally owned inputs, event sources wrap command
//! buttons, and the latest-values combinator joins them. A session wires
//! three flows over those primitives: derived output, durable secret, and
//! the address query.
//!
//! Zero I/O: every external effect goes through an injected port.

pub mod cell;
pub mod combine;
pub mod derive;
pub mod event;
pub mod ports;
pub mod query;
pub mod session;

pub use cell::{Field, Getter, Listener, Notifier, Setter, ValueCell};
pub use combine::{Combined, Listenable, Sources, combine_latest};
pub use derive::{CharClass, CharClasses, DEFAULT_LIMIT, derive, derive_password};
pub use event::{EventSource, Trigger};
pub use ports::{
    Clipboard, KeyValueStore, MemoryClipboard, MemoryQuery, MemoryStore, PortError, PortResult,
    QueryParams, Spawner, TaskQueue,
};
pub use query::{
    EXCLUDE_PARAM, InvalidLimit, LIMIT_PARAM, QueryState, SUBJECT_PARAM, parse_limit,
};
pub use session::{
    Controls, Focus, Form, Ports, SECRET_KEY, Session, initial_focus, load_from_query,
    load_from_store, wire,
};
