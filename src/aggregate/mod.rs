//! Filters and group-wise means over the historical records.
//!
//! Used for:
//! - trend series (one region + fuel type over time) and the national
//!   monthly average, both for charting
//! - lookup-mode estimates (mean of the exact region/month/fuel matches)
//! - the category domains offered by the interactive form

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{PriceQuery, PriceRecord, TrendPoint, month_start};
use crate::error::AppError;

/// Distinct values of each field, sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Categories {
    pub regions: Vec<String>,
    pub years: Vec<i32>,
    pub months: Vec<u32>,
    pub fuel_types: Vec<String>,
}

impl Categories {
    pub fn from_records(records: &[PriceRecord]) -> Self {
        let mut regions = BTreeSet::new();
        let mut years = BTreeSet::new();
        let mut months = BTreeSet::new();
        let mut fuel_types = BTreeSet::new();
        for r in records {
            regions.insert(r.region.as_str());
            years.insert(r.year);
            months.insert(r.month);
            fuel_types.insert(r.fuel_type.as_str());
        }

        Self {
            regions: regions.into_iter().map(str::to_string).collect(),
            years: years.into_iter().collect(),
            months: months.into_iter().collect(),
            fuel_types: fuel_types.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Records matching `predicate`, in dataset order.
pub fn filter<'a, P>(records: &'a [PriceRecord], predicate: P) -> Vec<&'a PriceRecord>
where
    P: Fn(&PriceRecord) -> bool,
{
    records.iter().filter(|r| predicate(*r)).collect()
}

/// Mean price per group key.
pub fn group_mean<K, F>(records: &[&PriceRecord], key: F) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&PriceRecord) -> K,
{
    let mut sums: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for &r in records {
        let entry = sums.entry(key(r)).or_insert((0.0, 0));
        entry.0 += r.price;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(k, (sum, count))| (k, sum / count as f64))
        .collect()
}

/// Observed prices for one region and fuel type, ordered by month.
///
/// Every matching row becomes a point; rows in the same month keep their
/// dataset order.
pub fn trend_series(records: &[PriceRecord], region: &str, fuel_type: &str) -> Vec<TrendPoint> {
    let mut rows = filter(records, |r| r.region == region && r.fuel_type == fuel_type);
    rows.sort_by_key(|r| (r.year, r.month));
    rows.into_iter()
        .filter_map(|r| {
            r.date().map(|date| TrendPoint {
                date,
                price: r.price,
            })
        })
        .collect()
}

/// Mean price per month across all regions for one fuel type.
pub fn national_monthly_average(records: &[PriceRecord], fuel_type: &str) -> Vec<TrendPoint> {
    let rows = filter(records, |r| r.fuel_type == fuel_type);
    group_mean(&rows, |r| (r.year, r.month))
        .into_iter()
        .filter_map(|((year, month), price)| {
            month_start(year, month).map(|date| TrendPoint { date, price })
        })
        .collect()
}

/// Mean of the observed prices for the exact region/month/fuel combination.
///
/// An empty match is `NoMatchingData`, never a price of zero.
pub fn lookup_mean(records: &[PriceRecord], query: &PriceQuery) -> Result<f64, AppError> {
    let rows = filter(records, |r| {
        r.region == query.region
            && r.year == query.year
            && r.month == query.month
            && r.fuel_type == query.fuel_type
    });
    if rows.is_empty() {
        return Err(AppError::no_matching_data(format!(
            "No historical prices for {}.",
            query.label()
        )));
    }
    Ok(rows.iter().map(|r| r.price).sum::<f64>() / rows.len() as f64)
}
