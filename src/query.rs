//! Search, listing and lookup over the current snapshot.
//!
//! Every result is scored with [`fuse`] against a live rating sample. Scores
//! are applied to per-request copies; the snapshot itself is never modified.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use icu_collator::Collator;
use icu_collator::options::CollatorOptions;
use tracing::{Instrument, debug, warn};

use crate::analyzers::fusion::{UserRating, fuse};
use crate::analyzers::types::{Entity, EntityDetail, EntityKind, EntitySummary};
use crate::analyzers::utility::round_to;
use crate::catalog::Catalog;
use crate::services::rating_source::RatingSource;

/// Upper bound on the number of search results.
pub const MAX_SEARCH_RESULTS: usize = 50;

/// Optional narrowing applied after the text match.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Substring that must appear in one of the related names: an instructor
    /// for course searches, a course for professor searches.
    pub related: Option<String>,
}

pub struct QueryService {
    catalog: Arc<Catalog>,
    ratings: Arc<dyn RatingSource>,
    concurrency: usize,
}

impl QueryService {
    /// `concurrency` caps the number of rating lookups in flight per request.
    pub fn new(catalog: Arc<Catalog>, ratings: Arc<dyn RatingSource>, concurrency: usize) -> Self {
        Self {
            catalog,
            ratings,
            concurrency: concurrency.max(1),
        }
    }

    /// Case-insensitive search over id, subject and description.
    ///
    /// Results keep table order and are capped at [`MAX_SEARCH_RESULTS`].
    #[tracing::instrument(skip_all, fields(kind = %kind, query = %query))]
    pub async fn search(
        &self,
        kind: EntityKind,
        query: &str,
        filters: &SearchFilters,
    ) -> Vec<EntitySummary> {
        let Some(snapshot) = self.catalog.snapshot().await else {
            return Vec::new();
        };

        let term = query.to_lowercase();
        let related = filters
            .related
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(str::to_lowercase);

        let matched: Vec<&Entity> = snapshot
            .table(kind)
            .iter()
            .filter(|e| matches_text(e, &term))
            .filter(|e| related.as_deref().is_none_or(|r| matches_related(e, r)))
            .take(MAX_SEARCH_RESULTS)
            .collect();

        debug!(matched = matched.len(), "Search matched");
        self.enrich(kind, &matched).await
    }

    /// Every entity of `kind`, sorted by id.
    #[tracing::instrument(skip_all, fields(kind = %kind))]
    pub async fn list_all(&self, kind: EntityKind) -> Vec<EntitySummary> {
        let Some(snapshot) = self.catalog.snapshot().await else {
            return Vec::new();
        };

        let entities: Vec<&Entity> = snapshot.table(kind).iter().collect();
        let mut summaries = self.enrich(kind, &entities).await;
        sort_by_locale(&mut summaries, |s| s.id.as_str());
        summaries
    }

    /// Looks up one entity by id, falling back to a case-insensitive match.
    pub async fn get_one(&self, kind: EntityKind, id: &str) -> Option<EntityDetail> {
        let snapshot = self.catalog.snapshot().await?;
        let entity = snapshot.table(kind).get(id)?;

        let rating = lookup_rating(self.ratings.as_ref(), kind, &entity.id).await;
        Some(entity.detail(scored_summary(entity, rating)))
    }

    /// Fetches one rating sample per entity, at most `concurrency` at a time,
    /// and returns the scored summaries in input order.
    #[tracing::instrument(skip_all, fields(kind = %kind, count = entities.len()))]
    async fn enrich(&self, kind: EntityKind, entities: &[&Entity]) -> Vec<EntitySummary> {
        let ratings = self.ratings.as_ref();

        stream::iter(entities.iter().copied())
            .map(|entity| {
                let span = tracing::debug_span!("rating_lookup", entity_id = %entity.id);
                async move {
                    let rating = lookup_rating(ratings, kind, &entity.id).await;
                    scored_summary(entity, rating)
                }
                .instrument(span)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Fetches a usable rating for one entity. Lookup errors and empty samples
/// both yield `None` so the entity falls back to its CSV score.
async fn lookup_rating(
    ratings: &dyn RatingSource,
    kind: EntityKind,
    id: &str,
) -> Option<UserRating> {
    match ratings.rating_sample(kind, id).await {
        Ok(sample) => sample.usable(),
        Err(e) => {
            warn!(entity_id = %id, kind = %kind, error = %e, "Rating lookup failed, using CSV score");
            None
        }
    }
}

fn scored_summary(entity: &Entity, rating: Option<UserRating>) -> EntitySummary {
    let mut summary = entity.summary();
    summary.average_gpa = fuse(entity.csv_average_gpa, rating).map(|score| round_to(score, 2));
    summary
}

fn matches_text(entity: &Entity, term: &str) -> bool {
    entity.id.to_lowercase().contains(term)
        || entity.subject.to_lowercase().contains(term)
        || entity.description.to_lowercase().contains(term)
}

fn matches_related(entity: &Entity, term: &str) -> bool {
    entity
        .related
        .iter()
        .any(|name| name.to_lowercase().contains(term))
}

/// Sorts `items` by `key` with root-locale collation, so accented names sit
/// next to their base letters and lowercase precedes uppercase on ties.
pub fn sort_by_locale<T>(items: &mut [T], key: impl Fn(&T) -> &str) {
    match Collator::try_new(Default::default(), CollatorOptions::default()) {
        Ok(collator) => items.sort_by(|a, b| collator.compare(key(a), key(b))),
        Err(e) => {
            warn!(error = %e, "Collation data unavailable, sorting by code point");
            items.sort_by(|a, b| key(a).cmp(key(b)));
        }
    }
}
