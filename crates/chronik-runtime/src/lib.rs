#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **chronik-runtime** – Runtime layer for the chronik event-sourcing engine.
//!
//! This crate wires the pieces together: the event store facade over mapper
//! and recorder, the aggregate repository with its snapshot fast-path, the
//! notification log that slices the global stream into sections, and the
//! configuration loader that selects and keys the infrastructure from
//! environment variables.
//!
//! The [`Application`] type is the usual entry point: build it from
//! [`Settings`], register the domain's topics, and use the typed
//! repositories it hands out.

pub mod application;
pub mod config;
pub mod notification_log;
pub mod repository;
pub mod store;

pub use application::{Application, ApplicationBuilder};
pub use config::{parse_bool, CipherSettings, ConfigError, Settings, StorageConfig};
pub use notification_log::{NotificationLog, DEFAULT_SECTION_SIZE};
pub use repository::Repository;
pub use store::{EventStore, SnapshotStore};
