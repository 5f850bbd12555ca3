#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **chronik-core** – Core abstractions for the chronik event-sourcing engine.
//!
//! This crate defines the data model and the contracts the rest of the
//! ecosystem is built against: the value model event state is expressed in,
//! the domain-event and stored-record types, the recorder traits storage
//! drivers implement, and the aggregate contract the domain layer supplies.
//!
//! It deliberately contains no I/O. Storage drivers (in-memory, SQLite, ...)
//! implement the recorder traits in separate crates, and the codec pipeline
//! that turns domain events into stored records lives in `chronik-codec`.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod recorder;
pub mod registry;
pub mod value;

pub use aggregate::Aggregate;
pub use error::{Result, StoreError, TranscodingError};
pub use event::{
    DomainEvent, EventSelect, Notification, Section, Snapshot, StoredEvent,
};
pub use recorder::{EventRecorder, SnapshotRecorder};
pub use registry::EventTypeRegistry;
pub use value::{StateMap, Value};

/// Convenient prelude for importing the most common types.
pub mod prelude {
    pub use super::{
        Aggregate, DomainEvent, EventRecorder, EventSelect, EventTypeRegistry,
        Notification, Result, Section, Snapshot, SnapshotRecorder, StateMap,
        StoredEvent, StoreError, TranscodingError, Value,
    };
}
