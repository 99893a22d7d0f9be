use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use super::{MarketTimeline, Price};
use crate::errors::{MarketDataError, Result};

/// Raw price grid: trading date -> (asset -> price).
pub type PriceGrid = BTreeMap<NaiveDate, BTreeMap<String, Decimal>>;

/// Dense, immutable lookup of price(asset, date) over the asset x timeline grid.
#[derive(Debug, Clone)]
pub struct PriceTable {
    timeline: MarketTimeline,
    // asset -> prices indexed by timeline position
    series: HashMap<String, Vec<Decimal>>,
}

impl PriceTable {
    /// Loads prices keyed by (asset, date). Every asset must be priced on every
    /// trading date; entries for unknown assets or dates are rejected.
    pub fn load(
        timeline: &MarketTimeline,
        assets: &[String],
        prices: &HashMap<(String, NaiveDate), Decimal>,
    ) -> Result<Self> {
        let mut slots: HashMap<String, Vec<Option<Decimal>>> = assets
            .iter()
            .map(|asset| (asset.clone(), vec![None; timeline.len()]))
            .collect();

        for ((asset, date), amount) in prices {
            let index = timeline.position(*date)?;
            let column = slots
                .get_mut(asset)
                .ok_or_else(|| MarketDataError::UnknownAsset(asset.clone()))?;
            column[index] = Some(*amount);
        }

        let mut series = HashMap::with_capacity(assets.len());
        for asset in assets {
            let column = slots.remove(asset).unwrap_or_default();
            let mut dense = Vec::with_capacity(timeline.len());
            for (date, slot) in timeline.all().zip(column) {
                match slot {
                    Some(amount) => dense.push(amount),
                    None => {
                        return Err(MarketDataError::MissingPrice {
                            asset: asset.clone(),
                            date,
                        }
                        .into())
                    }
                }
            }
            series.insert(asset.clone(), dense);
        }

        Ok(Self {
            timeline: timeline.clone(),
            series,
        })
    }

    /// Loads prices from the raw date -> asset grid.
    pub fn from_grid(
        timeline: &MarketTimeline,
        assets: &[String],
        grid: &PriceGrid,
    ) -> Result<Self> {
        let flattened: HashMap<(String, NaiveDate), Decimal> = grid
            .iter()
            .flat_map(|(date, row)| {
                row.iter()
                    .map(move |(asset, amount)| ((asset.clone(), *date), *amount))
            })
            .collect();
        Self::load(timeline, assets, &flattened)
    }

    pub fn get(&self, asset: &str, date: NaiveDate) -> Result<Decimal> {
        let missing = || MarketDataError::MissingPrice {
            asset: asset.to_string(),
            date,
        };
        let column = self.series.get(asset).ok_or_else(missing)?;
        let index = self.timeline.position(date)?;
        column.get(index).copied().ok_or_else(|| missing().into())
    }

    pub fn timeline(&self) -> &MarketTimeline {
        &self.timeline
    }

    /// All prices as records, ordered by date then asset.
    pub fn records(&self) -> Vec<Price> {
        let mut assets: Vec<&String> = self.series.keys().collect();
        assets.sort();

        let mut records = Vec::with_capacity(assets.len() * self.timeline.len());
        for (index, date) in self.timeline.all().enumerate() {
            for asset in &assets {
                records.push(Price {
                    asset: (*asset).clone(),
                    date,
                    amount: self.series[*asset][index],
                });
            }
        }
        records
    }
}
