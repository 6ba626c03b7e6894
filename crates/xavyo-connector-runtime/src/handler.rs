//! Result handler pipeline
//!
//! Connectors stream search results into a [`ResultsHandler`] and sync
//! deltas into a [`SyncResultsHandler`]. A handler returns `false` to stop
//! the stream; that is an early-termination signal, not an error.
//!
//! The decorators here wrap one downstream handler each. A search chains
//! them outside-in as
//!
//! caller ⊃ [`AttributesToGetResultsHandler`] ⊃ [`FilteredResultsHandler`]
//! ⊃ [`NormalizingResultsHandler`] ⊃ [`DuplicateFilteringResultsHandler`]
//!
//! so each item is deduplicated, then normalized, then filtered on its
//! normalized values, then projected, before the caller sees it.

use std::collections::HashSet;

use crate::filter::Filter;
use crate::normalizer::ObjectNormalizerFacade;
use crate::operation::{AttributeSet, ConnectorObject};
use crate::sync::SyncDelta;

/// Consumer of search results.
pub trait ResultsHandler: Send {
    /// Handle one object. Return `false` to stop receiving objects.
    fn handle(&mut self, object: ConnectorObject) -> bool;
}

impl<F> ResultsHandler for F
where
    F: FnMut(ConnectorObject) -> bool + Send,
{
    fn handle(&mut self, object: ConnectorObject) -> bool {
        self(object)
    }
}

/// Consumer of sync deltas.
pub trait SyncResultsHandler: Send {
    /// Handle one delta. Return `false` to stop receiving deltas.
    fn handle(&mut self, delta: SyncDelta) -> bool;
}

impl<F> SyncResultsHandler for F
where
    F: FnMut(SyncDelta) -> bool + Send,
{
    fn handle(&mut self, delta: SyncDelta) -> bool {
        self(delta)
    }
}

/// Normalizes each object before forwarding it.
pub struct NormalizingResultsHandler<'a> {
    target: &'a mut dyn ResultsHandler,
    normalizer: ObjectNormalizerFacade<'a>,
}

impl<'a> NormalizingResultsHandler<'a> {
    pub fn new(target: &'a mut dyn ResultsHandler, normalizer: ObjectNormalizerFacade<'a>) -> Self {
        Self { target, normalizer }
    }
}

impl ResultsHandler for NormalizingResultsHandler<'_> {
    fn handle(&mut self, object: ConnectorObject) -> bool {
        let object = self.normalizer.normalize_object(object);
        self.target.handle(object)
    }
}

/// Keeps only the requested attributes of each object.
///
/// `__UID__` is always kept. A requested attribute the object does not carry
/// is skipped. With no request the object passes through untouched.
pub struct AttributesToGetResultsHandler<'a> {
    target: &'a mut dyn ResultsHandler,
    attributes_to_get: Option<Vec<String>>,
}

impl<'a> AttributesToGetResultsHandler<'a> {
    pub fn new(
        target: &'a mut dyn ResultsHandler,
        attributes_to_get: Option<Vec<String>>,
    ) -> Self {
        Self {
            target,
            attributes_to_get,
        }
    }
}

impl ResultsHandler for AttributesToGetResultsHandler<'_> {
    fn handle(&mut self, object: ConnectorObject) -> bool {
        let object = match &self.attributes_to_get {
            Some(names) => project(object, names),
            None => object,
        };
        self.target.handle(object)
    }
}

fn project(object: ConnectorObject, names: &[String]) -> ConnectorObject {
    object.map_attributes(|mut attributes| {
        names
            .iter()
            .filter_map(|name| attributes.remove(name))
            .collect::<AttributeSet>()
    })
}

/// Re-applies a filter in process before forwarding.
///
/// A rejected object is dropped and the stream continues.
pub struct FilteredResultsHandler<'a> {
    target: &'a mut dyn ResultsHandler,
    filter: Option<Filter>,
}

impl<'a> FilteredResultsHandler<'a> {
    /// A `None` filter accepts everything.
    pub fn new(target: &'a mut dyn ResultsHandler, filter: Option<Filter>) -> Self {
        Self { target, filter }
    }
}

impl ResultsHandler for FilteredResultsHandler<'_> {
    fn handle(&mut self, object: ConnectorObject) -> bool {
        match &self.filter {
            Some(filter) if !filter.accept(&object) => true,
            _ => self.target.handle(object),
        }
    }
}

/// Drops objects whose uid was already seen during one logical search.
///
/// Once the downstream handler has asked to stop, every later object is
/// swallowed and answered with `false`, even within the same native query.
pub struct DuplicateFilteringResultsHandler<'a> {
    target: &'a mut dyn ResultsHandler,
    seen: HashSet<String>,
    still_handling: bool,
}

impl<'a> DuplicateFilteringResultsHandler<'a> {
    pub fn new(target: &'a mut dyn ResultsHandler) -> Self {
        Self {
            target,
            seen: HashSet::new(),
            still_handling: true,
        }
    }

    /// Whether the downstream handler still wants results.
    pub fn is_still_handling(&self) -> bool {
        self.still_handling
    }
}

impl ResultsHandler for DuplicateFilteringResultsHandler<'_> {
    fn handle(&mut self, object: ConnectorObject) -> bool {
        if !self.still_handling {
            return false;
        }
        if !self.seen.insert(object.uid().value().to_string()) {
            return true;
        }
        self.still_handling = self.target.handle(object);
        self.still_handling
    }
}

/// Normalizes the object of each delta before forwarding it.
pub struct NormalizingSyncResultsHandler<'a> {
    target: &'a mut dyn SyncResultsHandler,
    normalizer: ObjectNormalizerFacade<'a>,
}

impl<'a> NormalizingSyncResultsHandler<'a> {
    pub fn new(
        target: &'a mut dyn SyncResultsHandler,
        normalizer: ObjectNormalizerFacade<'a>,
    ) -> Self {
        Self { target, normalizer }
    }
}

impl SyncResultsHandler for NormalizingSyncResultsHandler<'_> {
    fn handle(&mut self, delta: SyncDelta) -> bool {
        let delta = self.normalizer.normalize_sync_delta(delta);
        self.target.handle(delta)
    }
}

/// Keeps only the requested attributes of each delta's object.
pub struct AttributesToGetSyncResultsHandler<'a> {
    target: &'a mut dyn SyncResultsHandler,
    attributes_to_get: Option<Vec<String>>,
}

impl<'a> AttributesToGetSyncResultsHandler<'a> {
    pub fn new(
        target: &'a mut dyn SyncResultsHandler,
        attributes_to_get: Option<Vec<String>>,
    ) -> Self {
        Self {
            target,
            attributes_to_get,
        }
    }
}

impl SyncResultsHandler for AttributesToGetSyncResultsHandler<'_> {
    fn handle(&mut self, delta: SyncDelta) -> bool {
        let delta = match &self.attributes_to_get {
            Some(names) => delta.map_object(|object| project(object, names)),
            None => delta,
        };
        self.target.handle(delta)
    }
}
