//! Reduction of mint events to the single largest deposit.

use crate::domain::{Address, EventPosition, FixedPoint, MintEvent, MINT_AMOUNT_DECIMALS};
use std::cmp::Ordering;

/// Largest deposit seen so far.
///
/// The zero record (amount 0, no depositor, no position) is the identity of
/// [`MaxRecord::merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxRecord {
    pub amount: FixedPoint,
    pub depositor: Option<Address>,
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
}

impl Default for MaxRecord {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<&MintEvent> for MaxRecord {
    fn from(event: &MintEvent) -> Self {
        Self {
            amount: event.amount.clone(),
            depositor: Some(event.depositor.clone()),
            block_number: Some(event.block_number),
            log_index: Some(event.log_index),
        }
    }
}

impl MaxRecord {
    pub fn zero() -> Self {
        Self {
            amount: FixedPoint::zero(MINT_AMOUNT_DECIMALS),
            depositor: None,
            block_number: None,
            log_index: None,
        }
    }

    /// True when no event has been folded in.
    pub fn is_empty(&self) -> bool {
        self.depositor.is_none()
    }

    pub fn position(&self) -> Option<EventPosition> {
        Some(EventPosition {
            block_number: self.block_number?,
            log_index: self.log_index?,
        })
    }

    /// Keep the better of two records.
    ///
    /// A strictly greater amount wins; equal amounts go to the earlier
    /// `(block_number, log_index)`. Any record beats the zero record.
    pub fn merge(self, other: MaxRecord) -> MaxRecord {
        if self.outranks(&other) {
            self
        } else {
            other
        }
    }

    fn outranks(&self, other: &MaxRecord) -> bool {
        match (self.position(), other.position()) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(mine), Some(theirs)) => match self.amount.cmp(&other.amount) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => mine <= theirs,
            },
        }
    }
}

/// Fold every event of every batch into one [`MaxRecord`].
///
/// Batches may arrive in any grouping; the result only depends on the
/// multiset of events.
pub fn reduce<'a, I>(batches: I) -> MaxRecord
where
    I: IntoIterator<Item = &'a [MintEvent]>,
{
    batches
        .into_iter()
        .flatten()
        .fold(MaxRecord::zero(), |best, event| best.merge(MaxRecord::from(event)))
}
