pub mod fair_share;
pub mod jitter;

use rand::Rng;

use crate::config::SelectionConfig;
use crate::model::Item;
use crate::store::{queries, EpigramStore};
use crate::types::error::{EpigramError, NotFoundError};
use crate::types::selection::{Selection, SelectionMetadata};
pub use fair_share::{
    compute_shares, CategoryChoice, CategoryPolicy, CategoryShare, CategoryTally, FairSharePolicy,
};
pub use jitter::{FetchRatioJitter, OffsetJitter, DEFAULT_FETCH_RATIO};

/// Items at or above this many characters are never selected.
pub const DEFAULT_CONTENT_LENGTH_CAP: usize = 300;

pub struct Selector<P, J> {
    policy: P,
    jitter: J,
    length_cap: usize,
}

impl Default for Selector<FairSharePolicy, FetchRatioJitter> {
    fn default() -> Self {
        Self {
            policy: FairSharePolicy,
            jitter: FetchRatioJitter::default(),
            length_cap: DEFAULT_CONTENT_LENGTH_CAP,
        }
    }
}

impl Selector<FairSharePolicy, FetchRatioJitter> {
    pub fn from_config(config: &SelectionConfig) -> Self {
        Self {
            policy: FairSharePolicy,
            jitter: FetchRatioJitter::new(config.internal_fetch_ratio),
            length_cap: config.content_length_cap,
        }
    }
}

impl<P, J> Selector<P, J>
where
    P: CategoryPolicy,
    J: OffsetJitter,
{
    pub fn new(policy: P, jitter: J, length_cap: usize) -> Self {
        Self {
            policy,
            jitter,
            length_cap,
        }
    }

    /// Select one item and record the impression, using the thread RNG.
    pub fn select(&self, store: &EpigramStore, filter: Option<&str>) -> Result<Selection, EpigramError> {
        self.select_with_rng(store, filter, &mut rand::thread_rng())
    }

    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        store: &EpigramStore,
        filter: Option<&str>,
        rng: &mut R,
    ) -> Result<Selection, EpigramError> {
        store.write_transaction(|tx| {
            // 1. Category: an explicit filter bypasses fair-share entirely
            let (category, eligible_categories) = match filter {
                Some(name) => {
                    let category = queries::category_by_name(tx, name)?
                        .ok_or_else(|| NotFoundError::Category(name.to_string()))?;
                    (category, 1)
                }
                None => {
                    // Only categories with something to show take part
                    let tallies = queries::selectable_tallies(tx, self.length_cap)?;
                    let Some(choice) = self.policy.choose(&tallies, rng) else {
                        if !queries::has_categories(tx)? {
                            return Err(EpigramError::NoContent);
                        }
                        tracing::debug!("no category has candidates, returning no-results item");
                        return Ok(Selection {
                            item: Item::no_results(),
                            impression: None,
                            selection: SelectionMetadata {
                                category: None,
                                filtered: false,
                                eligible_categories: 0,
                                candidates_considered: 0,
                                offset: 0,
                            },
                        });
                    };
                    (choice.category.clone(), choice.eligible)
                }
            };

            // 2. Candidates within the category, stalest first
            let candidates_considered = queries::count_candidates(tx, category.id, self.length_cap)?;
            let offset = self.jitter.offset(candidates_considered, rng);

            let metadata = SelectionMetadata {
                category: Some(category.name.clone()),
                filtered: filter.is_some(),
                eligible_categories,
                candidates_considered,
                offset,
            };

            let Some(item) = queries::candidate_at(tx, category.id, self.length_cap, offset)? else {
                tracing::debug!(category = %category.name, "no candidates, returning no-results item");
                return Ok(Selection {
                    item: Item::no_results(),
                    impression: None,
                    selection: metadata,
                });
            };

            // 3. Record
            let (impression, item) = queries::insert_impression(tx, &item)?;
            tracing::debug!(
                item = %item.id,
                category = %category.name,
                offset,
                candidates = candidates_considered,
                "selected item"
            );

            Ok(Selection {
                item,
                impression: Some(impression),
                selection: metadata,
            })
        })
    }
}
