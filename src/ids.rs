use rand::{seq::index, Rng};
use serde::Deserialize;
use thiserror::Error;

/// Half-open range `[min, max)` that record ids are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdRange {
    pub min: u32,
    pub max: u32,
}

impl Default for IdRange {
    fn default() -> Self {
        Self {
            min: 10000,
            max: 99999,
        }
    }
}

impl IdRange {
    pub fn len(&self) -> usize {
        self.max.saturating_sub(self.min) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot draw {requested} unique ids from a range of {available}")]
pub struct InsufficientRangeError {
    pub requested: usize,
    pub available: usize,
}

/// Draws `count` distinct ids from `range`, one per input row in row order.
/// The ids mean nothing beyond being unique within the batch.
pub fn assign_ids<R: Rng + ?Sized>(
    count: usize,
    range: IdRange,
    rng: &mut R,
) -> Result<Vec<u32>, InsufficientRangeError> {
    let available = range.len();
    if count > available {
        return Err(InsufficientRangeError {
            requested: count,
            available,
        });
    }

    Ok(index::sample(rng, available, count)
        .into_iter()
        .map(|x| range.min + x as u32)
        .collect())
}
