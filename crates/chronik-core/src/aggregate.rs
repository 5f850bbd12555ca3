//! The contract the domain layer supplies to the engine.

use uuid::Uuid;

use crate::error::Result;
use crate::event::DomainEvent;
use crate::value::StateMap;

/// A consistency boundary in the domain model whose state is the fold of its
/// event history.
///
/// Implementations buffer the events their command methods produce and hand
/// them over through [`collect_pending_events`]; the repository rebuilds
/// instances by folding stored events through [`apply`] in version order.
/// Aggregate instances are not thread-safe; confine each one to a single
/// logical actor between load and save.
///
/// [`collect_pending_events`]: Aggregate::collect_pending_events
/// [`apply`]: Aggregate::apply
pub trait Aggregate: Sized + Send {
    /// Stable topic naming this aggregate type in snapshot records.
    const TOPIC: &'static str;

    /// The identifier of this aggregate instance.
    fn id(&self) -> Uuid;

    /// The version of the last event folded into this instance.
    fn version(&self) -> u64;

    /// Build the aggregate from the first event of its stream.
    fn from_created_event(event: &DomainEvent) -> Result<Self>;

    /// Fold one subsequent event into the aggregate state.
    ///
    /// Must be deterministic: replaying the same events yields equal state.
    fn apply(&mut self, event: &DomainEvent) -> Result<()>;

    /// Drain the events recorded since construction or the last save.
    fn collect_pending_events(&mut self) -> Vec<DomainEvent>;

    /// Capture the current state for a snapshot record.
    fn snapshot_state(&self) -> StateMap;

    /// Rebuild an instance from a snapshot taken at `version`.
    fn from_snapshot(id: Uuid, version: u64, state: StateMap) -> Result<Self>;
}
