use crate::models::{FetchOutcome, MarkerScoped};
use chrono::NaiveDate;

/// What a fetcher does with rows whose crawl date disagrees with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyPolicy {
    /// Any mismatch invalidates the whole result.
    DiscardAll,
    /// Mismatched rows are dropped; the rest is still returned.
    KeepConsistent,
}

/// `(current - previous) / previous * 100`, or `0.0` when there is nothing to
/// compare against.
pub fn change_pct(current: Option<f64>, previous: Option<f64>) -> f64 {
    match (current, previous) {
        (Some(current), Some(previous)) if previous != 0.0 => {
            let pct = (current - previous) / previous * 100.0;
            if pct.is_finite() {
                pct
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// `part / total * 100`, or `0.0` when the total is zero or missing.
pub fn share_pct(part: f64, total: Option<f64>) -> f64 {
    match total {
        Some(total) if total != 0.0 => part / total * 100.0,
        _ => 0.0,
    }
}

pub fn check_markers<T: MarkerScoped>(
    metric: &str,
    rows: Vec<T>,
    expected: NaiveDate,
    policy: ConsistencyPolicy,
) -> FetchOutcome<T> {
    if rows.is_empty() {
        tracing::info!(metric, crawl_date = %expected, "no data available for the crawl date");
        return FetchOutcome::Empty;
    }

    let found = mismatched_dates(&rows, expected);
    if found.is_empty() {
        tracing::debug!(
            metric,
            crawl_date = %expected,
            rows = rows.len(),
            "rows validated against crawl date"
        );
        return FetchOutcome::Rows(rows);
    }

    tracing::error!(
        metric,
        crawl_date = %expected,
        mismatched = ?found,
        "data inconsistency detected: crawl_date does not match the session crawl date"
    );

    match policy {
        ConsistencyPolicy::DiscardAll => FetchOutcome::Inconsistent { expected, found },
        ConsistencyPolicy::KeepConsistent => {
            let consistent: Vec<T> = rows
                .into_iter()
                .filter(|row| row.crawl_date() == expected)
                .collect();
            if consistent.is_empty() {
                FetchOutcome::Inconsistent { expected, found }
            } else {
                FetchOutcome::Rows(consistent)
            }
        }
    }
}

/// For windowed series: the newest row must be the session's crawl date.
pub fn check_newest_marker<T: MarkerScoped>(
    metric: &str,
    rows: Vec<T>,
    expected: NaiveDate,
) -> FetchOutcome<T> {
    let Some(newest) = rows.iter().map(MarkerScoped::crawl_date).max() else {
        tracing::info!(metric, "no historical data available");
        return FetchOutcome::Empty;
    };
    if newest != expected {
        tracing::error!(
            metric,
            crawl_date = %expected,
            newest = %newest,
            "data inconsistency detected: newest row does not match the session crawl date"
        );
        return FetchOutcome::Inconsistent {
            expected,
            found: vec![newest],
        };
    }
    FetchOutcome::Rows(rows)
}

fn mismatched_dates<T: MarkerScoped>(rows: &[T], expected: NaiveDate) -> Vec<NaiveDate> {
    let mut found: Vec<NaiveDate> = Vec::new();
    for date in rows.iter().map(MarkerScoped::crawl_date) {
        if date != expected && !found.contains(&date) {
            found.push(date);
        }
    }
    found
}
