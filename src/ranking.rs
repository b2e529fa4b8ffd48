use crate::models::{CompanyOpenings, MetricChange, OpeningsStatistics, ToolRank};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const TOOL_RANKER_SIZE: usize = 3;
pub const COMPANY_RANKER_SIZE: usize = 5;

static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((.*?)\)").expect("valid regex"));

/// Shortens warehouse company names for display: `Acme_Corp` -> `Acme`,
/// `Foo (Bar Inc)` -> `Bar Inc`, anything else unchanged.
pub fn normalize_company_name(name: &str) -> String {
    if let Some((head, _)) = name.split_once('_') {
        return head.to_string();
    }
    if name.contains('(') && name.contains(')') {
        if let Some(inner) = PARENTHESIZED.captures(name).and_then(|caps| caps.get(1)) {
            return inner.as_str().to_string();
        }
    }
    name.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningsSummary {
    pub total_openings: f64,
    pub total_openings_change: f64,
    pub new_openings: f64,
    pub new_openings_change: f64,
    pub fill_rate: f64,
    pub fill_rate_change: f64,
    pub average_weeks_to_fill: f64,
    pub average_weeks_to_fill_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedTool {
    pub tool_name: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCompany {
    pub company_name: String,
    pub openings: i64,
}

pub type ToolRanker = [RankedTool; TOOL_RANKER_SIZE];
pub type CompanyRanker = [RankedCompany; COMPANY_RANKER_SIZE];

/// Takes the first `N` rows positionally; rows are expected to arrive already
/// ordered by rank. Returns `None` when fewer than `N` rows exist.
pub fn extract_ranked<const N: usize, T, R>(rows: &[T], pick: impl Fn(&T) -> R) -> Option<[R; N]> {
    let head = rows.get(..N)?;
    head.iter().map(pick).collect::<Vec<R>>().try_into().ok()
}

pub fn extract_tool_ranker(rows: &[ToolRank]) -> Option<ToolRanker> {
    extract_ranked(rows, |row| RankedTool {
        tool_name: row.tool_name.clone(),
        percentage: row.percentage_of_openings,
    })
}

pub fn extract_company_ranker(rows: &[CompanyOpenings]) -> Option<CompanyRanker> {
    extract_ranked(rows, |row| RankedCompany {
        company_name: row.company_name.clone(),
        openings: row.opening_count,
    })
}

pub fn extract_openings_summary(rows: &[OpeningsStatistics]) -> Option<OpeningsSummary> {
    let row = rows.first()?;
    let current = |metric: &MetricChange| metric.current.unwrap_or_default();
    Some(OpeningsSummary {
        total_openings: current(&row.total_openings),
        total_openings_change: row.total_openings.change_pct,
        new_openings: current(&row.new_openings),
        new_openings_change: row.new_openings.change_pct,
        fill_rate: current(&row.fill_rate),
        fill_rate_change: row.fill_rate.change_pct,
        average_weeks_to_fill: current(&row.average_weeks_to_fill),
        average_weeks_to_fill_change: row.average_weeks_to_fill.change_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::{extract_company_ranker, extract_tool_ranker, normalize_company_name};
    use crate::models::{CompanyOpenings, ToolRank};
    use chrono::NaiveDate;

    fn crawl_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 14).expect("valid date")
    }

    fn tool(rank: i64, name: &str, pct: f64) -> ToolRank {
        ToolRank {
            rank,
            category: "Language".to_string(),
            tool_name: name.to_string(),
            percentage_of_openings: pct,
            crawl_date: crawl_date(),
        }
    }

    #[test]
    fn normalizes_company_names() {
        assert_eq!(normalize_company_name("Acme_Corp"), "Acme");
        assert_eq!(normalize_company_name("Foo (Bar Inc)"), "Bar Inc");
        assert_eq!(normalize_company_name("PlainName"), "PlainName");
        assert_eq!(normalize_company_name("A_B (C)"), "A");
        assert_eq!(normalize_company_name("Odd) order ("), "Odd) order (");
    }

    #[test]
    fn tool_ranker_takes_rows_in_order() {
        let rows = vec![
            tool(1, "Python", 61.5),
            tool(2, "SQL", 58.0),
            tool(3, "Spark", 20.25),
            tool(4, "Go", 3.0),
        ];
        let ranker = extract_tool_ranker(&rows).expect("three rows");
        assert_eq!(ranker[0].tool_name, "Python");
        assert_eq!(ranker[2].percentage, 20.25);
    }

    #[test]
    fn ranker_needs_enough_rows() {
        let rows = vec![tool(1, "Python", 61.5), tool(2, "SQL", 58.0)];
        assert!(extract_tool_ranker(&rows).is_none());

        let companies: Vec<CompanyOpenings> = (0..4)
            .map(|idx| CompanyOpenings {
                rank: idx + 1,
                company_name: format!("Company {}", idx),
                opening_count: 50 - idx,
                crawl_date: crawl_date(),
            })
            .collect();
        assert!(extract_company_ranker(&companies).is_none());
    }
}
