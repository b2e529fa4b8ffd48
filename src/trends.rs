use crate::models::ToolByRole;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub const WILDCARD: &str = "All";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == WILDCARD {
            Self::All
        } else {
            Self::Only(trimmed.to_string())
        }
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendFilter {
    pub role: Selection,
    pub category: Selection,
}

impl TrendFilter {
    pub fn new(role: &str, category: &str) -> Self {
        Self {
            role: Selection::parse(role),
            category: Selection::parse(category),
        }
    }

    pub fn apply<'a>(&self, rows: &'a [ToolByRole]) -> Vec<&'a ToolByRole> {
        rows.iter()
            .filter(|row| self.role.matches(&row.data_role) && self.category.matches(&row.category))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolTrendPoint {
    pub tool_name: String,
    pub crawl_date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPopularity {
    pub tool_name: String,
    pub count: i64,
    pub most_popular_roles: Vec<String>,
    pub least_popular_roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendFilterOptions {
    pub roles: Vec<String>,
    pub categories: Vec<String>,
}

/// Sums values per key, keeping keys in first-seen order.
fn sum_by_key<K, I>(items: I) -> Vec<(K, i64)>
where
    K: std::hash::Hash + Eq + Clone,
    I: IntoIterator<Item = (K, i64)>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut totals: Vec<(K, i64)> = Vec::new();
    for (key, value) in items {
        match index.get(&key) {
            Some(&slot) => totals[slot].1 += value,
            None => {
                index.insert(key.clone(), totals.len());
                totals.push((key, value));
            }
        }
    }
    totals
}

/// The `k` largest totals; equal totals keep first-seen order.
fn top_k<K>(mut totals: Vec<(K, i64)>, k: usize) -> Vec<(K, i64)> {
    totals.sort_by(|left, right| right.1.cmp(&left.1));
    totals.truncate(k);
    totals
}

/// Line-chart series: one point per (tool, crawl date) for the `top_k` tools
/// by overall count, ordered by tool total then date.
pub fn tool_trend_lines(
    rows: &[ToolByRole],
    filter: &TrendFilter,
    top_k_tools: usize,
) -> Vec<ToolTrendPoint> {
    let filtered = filter.apply(rows);
    let per_date = sum_by_key(
        filtered
            .iter()
            .map(|row| ((row.tool_name.as_str(), row.crawl_date), row.count)),
    );
    let per_tool = sum_by_key(per_date.iter().map(|((tool, _), count)| (*tool, *count)));
    let kept = top_k(per_tool, top_k_tools);
    let position: HashMap<&str, usize> = kept
        .iter()
        .enumerate()
        .map(|(idx, (tool, _))| (*tool, idx))
        .collect();

    let mut points: Vec<(usize, ToolTrendPoint)> = per_date
        .into_iter()
        .filter_map(|((tool, crawl_date), count)| {
            position.get(tool).map(|&idx| {
                (
                    idx,
                    ToolTrendPoint {
                        tool_name: tool.to_string(),
                        crawl_date,
                        count,
                    },
                )
            })
        })
        .collect();
    points.sort_by(|(left_idx, left), (right_idx, right)| {
        left_idx.cmp(right_idx).then(left.crawl_date.cmp(&right.crawl_date))
    });
    points.into_iter().map(|(_, point)| point).collect()
}

/// Bar-chart view: the `top_k` tools by count summed over every date and
/// role, with the roles where each is used the most and the least.
pub fn tool_popularity(
    rows: &[ToolByRole],
    filter: &TrendFilter,
    top_k_tools: usize,
) -> Vec<ToolPopularity> {
    let filtered = filter.apply(rows);
    let per_tool = sum_by_key(filtered.iter().map(|row| (row.tool_name.as_str(), row.count)));

    top_k(per_tool, top_k_tools)
        .into_iter()
        .map(|(tool, count)| {
            let per_role = sum_by_key(
                filtered
                    .iter()
                    .filter(|row| row.tool_name == tool)
                    .map(|row| (row.data_role.as_str(), row.count)),
            );
            ToolPopularity {
                tool_name: tool.to_string(),
                count,
                most_popular_roles: roles_at(&per_role, per_role.iter().map(|(_, c)| *c).max()),
                least_popular_roles: roles_at(&per_role, per_role.iter().map(|(_, c)| *c).min()),
            }
        })
        .collect()
}

fn roles_at(per_role: &[(&str, i64)], target: Option<i64>) -> Vec<String> {
    let Some(target) = target else {
        return Vec::new();
    };
    per_role
        .iter()
        .filter(|(_, count)| *count == target)
        .map(|(role, _)| role.to_string())
        .collect()
}

/// Selector values for the trend page, wildcard first.
pub fn trend_filter_options(rows: &[ToolByRole]) -> TrendFilterOptions {
    let roles: BTreeSet<&str> = rows.iter().map(|row| row.data_role.as_str()).collect();
    let categories: BTreeSet<&str> = rows.iter().map(|row| row.category.as_str()).collect();
    let with_wildcard = |values: BTreeSet<&str>| -> Vec<String> {
        std::iter::once(WILDCARD.to_string())
            .chain(values.into_iter().map(ToString::to_string))
            .collect()
    };
    TrendFilterOptions {
        roles: with_wildcard(roles),
        categories: with_wildcard(categories),
    }
}
