//! Search orchestration
//!
//! Native filtering is best effort: a connector may over-match, ignore the
//! requested attributes, or be unable to translate the filter at all. The
//! orchestrator therefore always re-filters, re-projects, and, when the
//! filter splits into several native queries, deduplicates in process.

use tracing::debug;

use crate::capability::ConnectorInstance;
use crate::error::ConnectorResult;
use crate::filter::Filter;
use crate::handler::{
    AttributesToGetResultsHandler, DuplicateFilteringResultsHandler, FilteredResultsHandler,
    NormalizingResultsHandler, ResultsHandler,
};
use crate::normalizer::ObjectNormalizerFacade;
use crate::operation::{ConnectorObject, ObjectClass, Uid};
use crate::options::OperationOptions;

/// Runs searches against one connector instance.
#[derive(Debug, Clone, Copy)]
pub struct SearchOrchestrator<'a> {
    instance: &'a ConnectorInstance,
}

impl<'a> SearchOrchestrator<'a> {
    pub fn new(instance: &'a ConnectorInstance) -> Self {
        Self { instance }
    }

    /// Stream every object of the class matching `filter` into `handler`.
    ///
    /// The filter is normalized, then translated into native queries:
    ///
    /// - none: one unfiltered native query, filtered in process
    /// - one: that query
    /// - several: each in order, with duplicates dropped; the remaining
    ///   queries are skipped once the handler has asked to stop
    pub async fn search(
        &self,
        object_class: &ObjectClass,
        filter: Option<Filter>,
        handler: &mut dyn ResultsHandler,
        options: &OperationOptions,
    ) -> ConnectorResult<()> {
        let search = self.instance.search_op()?;
        let normalizer =
            ObjectNormalizerFacade::new(object_class, self.instance.connector().attribute_normalizer());

        let filter = filter.map(|filter| normalizer.normalize_filter(filter));
        let queries = match &filter {
            Some(filter) => search.translate(object_class, options, filter),
            None => Vec::new(),
        };

        let attributes_to_get = options.attributes_to_get().map(<[String]>::to_vec);
        let mut projection = AttributesToGetResultsHandler::new(handler, attributes_to_get);
        let mut filtered = FilteredResultsHandler::new(&mut projection, filter);
        let mut normalizing = NormalizingResultsHandler::new(&mut filtered, normalizer);

        match queries.as_slice() {
            [] => search.execute(object_class, None, &mut normalizing, options).await,
            [query] => {
                search
                    .execute(object_class, Some(query), &mut normalizing, options)
                    .await
            }
            queries => {
                debug!(
                    object_class = %object_class,
                    queries = queries.len(),
                    "Filter split into several native queries"
                );
                let mut dedup = DuplicateFilteringResultsHandler::new(&mut normalizing);
                for (index, query) in queries.iter().enumerate() {
                    search
                        .execute(object_class, Some(query), &mut dedup, options)
                        .await?;
                    if !dedup.is_still_handling() {
                        debug!(
                            object_class = %object_class,
                            skipped = queries.len() - index - 1,
                            "Handler stopped; skipping remaining native queries"
                        );
                        break;
                    }
                }
                Ok(())
            }
        }
    }

    /// Fetch one object by uid. The uid is normalized along with the filter.
    pub async fn get_object(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        options: &OperationOptions,
    ) -> ConnectorResult<Option<ConnectorObject>> {
        let mut found = None;
        let mut first = |object: ConnectorObject| {
            found = Some(object);
            false
        };
        self.search(object_class, Some(Filter::uid_eq(uid)), &mut first, options)
            .await?;
        Ok(found)
    }
}
