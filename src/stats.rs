//! Pure dashboard aggregations.
//!
//! These take plain data fetched by the repositories and fold it into the
//! shapes the dashboard widgets consume. Rendering is out of scope.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};

/// Record count for one calendar day, in the caller's timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u32,
}

/// Bucket record timestamps by local calendar day, ascending by date.
///
/// `offset` is the caller's UTC offset; a record logged at 23:30 UTC can
/// belong to the next day for a user east of Greenwich.
pub fn bucket_by_day(timestamps: &[DateTime<Utc>], offset: FixedOffset) -> Vec<DayCount> {
    let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for ts in timestamps {
        let local_date = ts.with_timezone(&offset).date_naive();
        *counts.entry(local_date).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(date, count)| DayCount { date, count })
        .collect()
}

/// Fold per-set muscle contribution maps into totals per muscle.
///
/// Only finite positive contributions count; anything else in a map is
/// ignored rather than poisoning the total.
pub fn accumulate_muscle_sets<'a, I>(maps: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = &'a HashMap<String, f64>>,
{
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for map in maps {
        for (muscle, contribution) in map {
            if contribution.is_finite() && *contribution > 0.0 {
                *totals.entry(muscle.clone()).or_insert(0.0) += contribution;
            }
        }
    }
    totals
}
