use chrono::NaiveDate;
use std::collections::HashMap;

use super::MarketDate;
use crate::errors::{MarketDataError, Result};

/// Ordered, gap-free sequence of trading dates.
///
/// Dates live in one ascending array; the successor of a date is the next
/// slot, resolved through an index map in O(1).
#[derive(Debug, Clone)]
pub struct MarketTimeline {
    dates: Vec<NaiveDate>,
    positions: HashMap<NaiveDate, usize>,
}

impl MarketTimeline {
    /// Builds the timeline from dates that must be non-empty and strictly increasing.
    pub fn load(ordered_dates: &[NaiveDate]) -> Result<Self> {
        if ordered_dates.is_empty() {
            return Err(MarketDataError::EmptyTimeline.into());
        }

        for pair in ordered_dates.windows(2) {
            if pair[0] >= pair[1] {
                return Err(MarketDataError::UnsortedTimeline {
                    previous: pair[0],
                    next: pair[1],
                }
                .into());
            }
        }

        let positions = ordered_dates
            .iter()
            .enumerate()
            .map(|(index, date)| (*date, index))
            .collect();

        Ok(Self {
            dates: ordered_dates.to_vec(),
            positions,
        })
    }

    /// Anchor date of the initial allocation.
    pub fn first(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Position of `date` on the timeline, failing for non-trading dates.
    pub fn position(&self, date: NaiveDate) -> Result<usize> {
        self.positions
            .get(&date)
            .copied()
            .ok_or_else(|| MarketDataError::UnknownMarketDate(date).into())
    }

    /// Next trading date, or `None` when `date` is the last one.
    pub fn successor(&self, date: NaiveDate) -> Result<Option<NaiveDate>> {
        let index = self.position(date)?;
        Ok(self.dates.get(index + 1).copied())
    }

    /// Dates in ascending order. Each call starts a fresh iteration.
    pub fn all(&self) -> impl Iterator<Item = NaiveDate> + Clone + '_ {
        self.dates.iter().copied()
    }

    /// Persistable records with their successor links.
    pub fn market_dates(&self) -> Vec<MarketDate> {
        self.dates
            .iter()
            .enumerate()
            .map(|(index, date)| MarketDate {
                date: *date,
                next_date: self.dates.get(index + 1).copied(),
            })
            .collect()
    }
}
