use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rows that belong to a single crawl snapshot.
pub trait MarkerScoped {
    fn crawl_date(&self) -> NaiveDate;
}

/// Coerces the textual forms a marker column may hold into a calendar date.
pub fn coerce_crawl_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Integer markers land in TEXT columns as their decimal string.
    if trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return trimmed.parse::<i64>().ok().and_then(crawl_date_from_unix);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(stamp.date_naive());
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in FORMATS {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(stamp.date());
        }
    }
    None
}

pub fn crawl_date_from_unix(seconds: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|stamp| stamp.date_naive())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricChange {
    pub current: Option<f64>,
    pub previous: Option<f64>,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningsStatistics {
    pub total_openings: MetricChange,
    pub closed_openings: MetricChange,
    pub new_openings: MetricChange,
    pub fill_rate: MetricChange,
    pub average_weeks_to_fill: MetricChange,
    pub crawl_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalOpenings {
    pub total_openings: i64,
    pub crawl_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleShare {
    pub data_role: String,
    pub count: i64,
    pub percentage_of_total: f64,
    pub crawl_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRank {
    pub rank: i64,
    pub category: String,
    pub tool_name: String,
    pub percentage_of_openings: f64,
    pub crawl_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyOpenings {
    pub rank: i64,
    pub company_name: String,
    pub opening_count: i64,
    pub crawl_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaOpenings {
    pub region: String,
    pub sub_region: String,
    pub opening_count: i64,
    pub crawl_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolByRole {
    pub data_role: String,
    pub category: String,
    pub tool_name: String,
    pub count: i64,
    pub crawl_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolTrend {
    pub rank: i64,
    pub category: String,
    pub tool_name: String,
    pub tool_count: i64,
    pub crawl_date: NaiveDate,
}

macro_rules! marker_scoped {
    ($($ty:ty),* $(,)?) => {
        $(impl MarkerScoped for $ty {
            fn crawl_date(&self) -> NaiveDate {
                self.crawl_date
            }
        })*
    };
}

marker_scoped!(
    OpeningsStatistics,
    HistoricalOpenings,
    RoleShare,
    ToolRank,
    CompanyOpenings,
    AreaOpenings,
    ToolByRole,
    ToolTrend,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Rows,
    Empty,
    Inconsistent,
    Failed,
}

/// Result of one metric fetch. Only `Rows` carries data; every other variant
/// is something the dashboard renders as a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum FetchOutcome<T> {
    Rows(Vec<T>),
    Empty,
    Inconsistent {
        expected: NaiveDate,
        found: Vec<NaiveDate>,
    },
    Failed {
        reason: String,
    },
}

impl<T> FetchOutcome<T> {
    pub fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Self::Empty
        } else {
            Self::Rows(rows)
        }
    }

    pub fn status(&self) -> FetchStatus {
        match self {
            Self::Rows(_) => FetchStatus::Rows,
            Self::Empty => FetchStatus::Empty,
            Self::Inconsistent { .. } => FetchStatus::Inconsistent,
            Self::Failed { .. } => FetchStatus::Failed,
        }
    }

    pub fn rows(&self) -> &[T] {
        match self {
            Self::Rows(rows) => rows,
            _ => &[],
        }
    }

    pub fn into_rows(self) -> Vec<T> {
        match self {
            Self::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn map_rows<U>(self, f: impl FnMut(T) -> U) -> FetchOutcome<U> {
        match self {
            Self::Rows(rows) => FetchOutcome::Rows(rows.into_iter().map(f).collect()),
            Self::Empty => FetchOutcome::Empty,
            Self::Inconsistent { expected, found } => {
                FetchOutcome::Inconsistent { expected, found }
            }
            Self::Failed { reason } => FetchOutcome::Failed { reason },
        }
    }
}
