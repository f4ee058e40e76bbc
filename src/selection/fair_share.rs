use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::Category;

/// Slack allowed when comparing shares, so a category sitting exactly on
/// its target is not excluded by floating-point rounding.
pub const SHARE_TOLERANCE: f64 = 1e-9;

/// A category together with the number of impressions recorded against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    pub category: Category,
    pub impressions: u64,
}

/// Target versus observed share for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub name: String,
    pub weight: u32,
    pub impressions: u64,
    pub expected_share: f64,
    pub actual_share: f64,
}

impl CategoryShare {
    /// Positive when the category is under-served.
    pub fn delta(&self) -> f64 {
        self.expected_share - self.actual_share
    }

    pub fn is_eligible(&self) -> bool {
        self.delta() >= -SHARE_TOLERANCE
    }
}

/// Compute every category's share, preserving input order.
///
/// With no impressions recorded yet every actual share is zero, so every
/// category comes out eligible.
pub fn compute_shares(tallies: &[CategoryTally]) -> Vec<CategoryShare> {
    let total_weight: u64 = tallies.iter().map(|t| u64::from(t.category.weight)).sum();
    let total_impressions: u64 = tallies.iter().map(|t| t.impressions).sum();

    tallies
        .iter()
        .map(|t| {
            let expected_share = if total_weight == 0 {
                0.0
            } else {
                f64::from(t.category.weight) / total_weight as f64
            };
            let actual_share = if total_impressions == 0 {
                0.0
            } else {
                t.impressions as f64 / total_impressions as f64
            };
            CategoryShare {
                name: t.category.name.clone(),
                weight: t.category.weight,
                impressions: t.impressions,
                expected_share,
                actual_share,
            }
        })
        .collect()
}

/// The category picked by a policy plus how many were in the running.
#[derive(Debug, Clone, Copy)]
pub struct CategoryChoice<'a> {
    pub category: &'a Category,
    pub eligible: usize,
}

/// Decides which category an unfiltered selection draws from.
pub trait CategoryPolicy {
    fn choose<'a, R: Rng + ?Sized>(&self, tallies: &'a [CategoryTally], rng: &mut R) -> Option<CategoryChoice<'a>>;
}

/// Weighted round-robin driven by impression feedback.
///
/// Categories already above their target share sit out; the rest are drawn
/// with probability proportional to their configured weight. Before the
/// first impression, and whenever rounding leaves nobody eligible, the draw
/// is uniform over all categories.
#[derive(Debug, Default, Clone, Copy)]
pub struct FairSharePolicy;

impl CategoryPolicy for FairSharePolicy {
    fn choose<'a, R: Rng + ?Sized>(&self, tallies: &'a [CategoryTally], rng: &mut R) -> Option<CategoryChoice<'a>> {
        if tallies.is_empty() {
            return None;
        }

        let total_impressions: u64 = tallies.iter().map(|t| t.impressions).sum();
        if total_impressions == 0 {
            return uniform(tallies, rng);
        }

        let shares = compute_shares(tallies);
        let eligible: Vec<&CategoryTally> = tallies
            .iter()
            .zip(&shares)
            .filter(|(_, share)| share.is_eligible())
            .map(|(tally, _)| tally)
            .collect();

        if eligible.is_empty() {
            tracing::debug!("no eligible category, falling back to uniform draw");
            return uniform(tallies, rng);
        }

        let picked = match eligible.choose_weighted(rng, |t| t.category.weight) {
            Ok(tally) => *tally,
            Err(e) => {
                tracing::debug!(error = %e, "weighted draw failed, falling back to uniform draw");
                return uniform(tallies, rng);
            }
        };

        Some(CategoryChoice {
            category: &picked.category,
            eligible: eligible.len(),
        })
    }
}

fn uniform<'a, R: Rng + ?Sized>(tallies: &'a [CategoryTally], rng: &mut R) -> Option<CategoryChoice<'a>> {
    tallies.choose(rng).map(|t| CategoryChoice {
        category: &t.category,
        eligible: tallies.len(),
    })
}
