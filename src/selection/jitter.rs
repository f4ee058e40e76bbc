use rand::Rng;

/// Fraction of the candidate list the default jitter may skip over.
pub const DEFAULT_FETCH_RATIO: f64 = 0.1;

/// Picks how far past the stalest candidate a selection lands.
pub trait OffsetJitter {
    /// Returns an offset in `0..candidate_count`, or 0 when there are no candidates.
    fn offset<R: Rng + ?Sized>(&self, candidate_count: usize, rng: &mut R) -> usize;
}

/// offset := floor(U[0, 1) * candidate_count * ratio)
///
/// With a small list the span is below one and the stalest item always
/// wins, giving a strict rotation.
#[derive(Debug, Clone, Copy)]
pub struct FetchRatioJitter {
    ratio: f64,
}

impl FetchRatioJitter {
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }
}

impl Default for FetchRatioJitter {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_RATIO)
    }
}

impl OffsetJitter for FetchRatioJitter {
    fn offset<R: Rng + ?Sized>(&self, candidate_count: usize, rng: &mut R) -> usize {
        if candidate_count == 0 || self.ratio <= 0.0 {
            return 0;
        }
        let span = candidate_count as f64 * self.ratio;
        let offset = (rng.gen::<f64>() * span) as usize;
        offset.min(candidate_count - 1)
    }
}
