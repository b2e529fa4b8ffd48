use crate::config::DashboardConfig;
use crate::errors::ReportResult;
use crate::models::{
    AreaOpenings, CompanyOpenings, FetchOutcome, HistoricalOpenings, MarkerScoped, MetricChange,
    OpeningsStatistics, RoleShare, ToolByRole, ToolRank, ToolTrend,
};
use crate::ranking::normalize_company_name;
use crate::validate::{
    change_pct, check_markers, check_newest_marker, share_pct, ConsistencyPolicy,
};
use crate::warehouse::{crawl_date_at, Warehouse};
use chrono::NaiveDate;
use rusqlite::{params, Row};

// Marker columns are compared through `crawl_day()`, the session's
// normalizer, so SQL filters and row parsing agree on the calendar day.
const OPENINGS_STATISTICS_SQL: &str = r#"
SELECT cur.total_openings, cur.prev_total_openings,
       cur.closed_openings_count, cur.prev_closed_openings_count,
       cur.new_openings_count, cur.prev_new_openings_count,
       cur.fill_rate, cur.prev_fill_rate,
       cur.average_weeks_to_fill, cur.prev_average_weeks_to_fill,
       cur.crawl_date
FROM (
    SELECT m.total_openings,
           LEAD(m.total_openings) OVER w AS prev_total_openings,
           m.closed_openings_count,
           LEAD(m.closed_openings_count) OVER w AS prev_closed_openings_count,
           m.new_openings_count,
           LEAD(m.new_openings_count) OVER w AS prev_new_openings_count,
           m.fill_rate,
           LEAD(m.fill_rate) OVER w AS prev_fill_rate,
           f.average_weeks_to_fill,
           LEAD(f.average_weeks_to_fill) OVER w AS prev_average_weeks_to_fill,
           m.crawl_date
    FROM rpt_job_openings_metrics m
    LEFT JOIN rpt_job_fill_time_statistics f
           ON crawl_day(f."current_date") = crawl_day(m.crawl_date)
    WHERE crawl_day(m.crawl_date) BETWEEN date(?1, ?2) AND date(?1)
    WINDOW w AS (ORDER BY crawl_day(m.crawl_date) DESC)
) cur
WHERE crawl_day(cur.crawl_date) = date(?1)
"#;

const OPENINGS_HISTORY_SQL: &str = r#"
SELECT recent.total_openings, recent.crawl_date
FROM (
    SELECT total_openings, crawl_date
    FROM rpt_job_openings_metrics
    ORDER BY crawl_day(crawl_date) DESC
    LIMIT ?1
) recent
ORDER BY crawl_day(recent.crawl_date) ASC
"#;

// The snapshot tables below return their newest snapshot at or before the
// session date. A table the ETL has not refreshed yet comes back with an
// older marker and is caught by the marker check.
const ROLE_BREAKDOWN_SQL: &str = r#"
SELECT data_role, count, crawl_date
FROM rpt_data_role_vacancy_trends
WHERE crawl_day(crawl_date) = (
    SELECT MAX(crawl_day(crawl_date))
    FROM rpt_data_role_vacancy_trends
    WHERE crawl_day(crawl_date) <= date(?1)
)
"#;

const TOOL_RANKING_SQL: &str = r#"
SELECT t.rank, t.category, t.tool_name, t.tool_count, m.total_openings, t.crawl_date
FROM rpt_data_tools_trends t
LEFT JOIN rpt_job_openings_metrics m ON crawl_day(m.crawl_date) = crawl_day(t.crawl_date)
WHERE crawl_day(t.crawl_date) = (
    SELECT MAX(crawl_day(crawl_date))
    FROM rpt_data_tools_trends
    WHERE crawl_day(crawl_date) <= date(?1)
)
ORDER BY t.rank ASC
LIMIT ?2
"#;

const COMPANY_RANKING_SQL: &str = r#"
SELECT rank, company_name, opening_count, crawl_date
FROM rpt_weekly_company_job_vacancies
WHERE crawl_day(crawl_date) = (
    SELECT MAX(crawl_day(crawl_date))
    FROM rpt_weekly_company_job_vacancies
    WHERE crawl_day(crawl_date) <= date(?1)
)
ORDER BY opening_count DESC
LIMIT ?2
"#;

const AREA_OPENINGS_SQL: &str = r#"
SELECT county_name_eng, district_name_eng, openings_count, crawl_date
FROM rpt_job_openings_geograph
WHERE county_name_eng IN (?2, ?3)
  AND crawl_day(crawl_date) = (
    SELECT MAX(crawl_day(crawl_date))
    FROM rpt_job_openings_geograph
    WHERE crawl_day(crawl_date) <= date(?1)
)
"#;

const TOOLS_BY_ROLE_SQL: &str = r#"
SELECT data_role, category, tool_name, count, crawl_date
FROM rpt_data_tools_by_data_role
"#;

const TOOL_TRENDS_SQL: &str = r#"
SELECT rank, category, tool_name, tool_count, crawl_date
FROM rpt_data_tools_trends
"#;

/// Reads one reporting metric per call. Every failure mode collapses into a
/// non-`Rows` [`FetchOutcome`] plus a log line; nothing is raised.
pub struct ReportDataFetcher<'a> {
    warehouse: &'a Warehouse,
    settings: &'a DashboardConfig,
    span: tracing::Span,
}

impl<'a> ReportDataFetcher<'a> {
    pub fn new(warehouse: &'a Warehouse, settings: &'a DashboardConfig) -> Self {
        let span = tracing::info_span!("render", session_id = %warehouse.session_id());
        Self {
            warehouse,
            settings,
            span,
        }
    }

    pub fn latest_crawl_date(&self) -> Option<NaiveDate> {
        let _entered = self.span.enter();
        self.warehouse.latest_crawl_date()
    }

    pub fn openings_statistics(&self, crawl_date: NaiveDate) -> FetchOutcome<OpeningsStatistics> {
        let _entered = self.span.enter();
        let offset = format!("-{} days", self.settings.comparison_days);
        let rows = self.warehouse.query_rows(
            OPENINGS_STATISTICS_SQL,
            params![crawl_date, offset],
            parse_openings_statistics_row,
        );
        self.scoped("openings_statistics", rows, crawl_date, ConsistencyPolicy::DiscardAll)
    }

    pub fn openings_history(&self, crawl_date: NaiveDate) -> FetchOutcome<HistoricalOpenings> {
        let _entered = self.span.enter();
        let limit = self.settings.history_window as i64;
        let rows = self
            .warehouse
            .query_rows(OPENINGS_HISTORY_SQL, params![limit], |row| {
                Ok(HistoricalOpenings {
                    total_openings: row.get(0)?,
                    crawl_date: crawl_date_at(row, 1)?,
                })
            })
            .map(|mut rows| {
                rows.sort_by_key(|row| row.crawl_date);
                rows
            });
        match rows {
            Ok(rows) => check_newest_marker("openings_history", rows, crawl_date),
            Err(error) => failed("openings_history", error),
        }
    }

    pub fn role_breakdown(&self, crawl_date: NaiveDate) -> FetchOutcome<RoleShare> {
        let _entered = self.span.enter();
        let rows = self
            .warehouse
            .query_rows(ROLE_BREAKDOWN_SQL, params![crawl_date], |row| {
                Ok(RoleShare {
                    data_role: row.get(0)?,
                    count: row.get(1)?,
                    percentage_of_total: 0.0,
                    crawl_date: crawl_date_at(row, 2)?,
                })
            })
            .map(with_role_shares);
        self.scoped("role_breakdown", rows, crawl_date, ConsistencyPolicy::DiscardAll)
    }

    pub fn tool_ranking(&self, crawl_date: NaiveDate) -> FetchOutcome<ToolRank> {
        let _entered = self.span.enter();
        let limit = self.settings.tool_top_n as i64;
        let rows = self.warehouse.query_rows(TOOL_RANKING_SQL, params![crawl_date, limit], |row| {
            let tool_count: i64 = row.get(3)?;
            let total_openings: Option<i64> = row.get(4)?;
            let total = total_openings.map(|total| total as f64);
            Ok(ToolRank {
                rank: row.get(0)?,
                category: row.get(1)?,
                tool_name: row.get(2)?,
                percentage_of_openings: share_pct(tool_count as f64, total),
                crawl_date: crawl_date_at(row, 5)?,
            })
        });
        self.scoped("tool_ranking", rows, crawl_date, ConsistencyPolicy::KeepConsistent)
    }

    pub fn company_ranking(&self, crawl_date: NaiveDate) -> FetchOutcome<CompanyOpenings> {
        let _entered = self.span.enter();
        let limit = self.settings.company_top_n as i64;
        let bound = params![crawl_date, limit];
        let rows = self.warehouse.query_rows(COMPANY_RANKING_SQL, bound, |row| {
            Ok(CompanyOpenings {
                rank: row.get(0)?,
                company_name: normalize_company_name(&row.get::<_, String>(1)?),
                opening_count: row.get(2)?,
                crawl_date: crawl_date_at(row, 3)?,
            })
        });
        self.scoped("company_ranking", rows, crawl_date, ConsistencyPolicy::KeepConsistent)
    }

    pub fn area_openings(&self, crawl_date: NaiveDate) -> FetchOutcome<AreaOpenings> {
        let _entered = self.span.enter();
        let regions = &self.settings.regions;
        let (Some(first), Some(second)) = (regions.first(), regions.get(1)) else {
            return FetchOutcome::Failed {
                reason: "geographic breakdown needs two regions".to_string(),
            };
        };
        let rows = self
            .warehouse
            .query_rows(AREA_OPENINGS_SQL, params![crawl_date, first, second], |row| {
                Ok(AreaOpenings {
                    region: row.get(0)?,
                    sub_region: row.get(1)?,
                    opening_count: row.get(2)?,
                    crawl_date: crawl_date_at(row, 3)?,
                })
            });
        self.scoped("area_openings", rows, crawl_date, ConsistencyPolicy::KeepConsistent)
    }

    /// Full tool-by-role series across every crawl; not marker scoped.
    pub fn tools_by_role(&self) -> FetchOutcome<ToolByRole> {
        let _entered = self.span.enter();
        let rows = self.warehouse.query_rows(TOOLS_BY_ROLE_SQL, [], |row| {
            Ok(ToolByRole {
                data_role: row.get(0)?,
                category: row.get(1)?,
                tool_name: row.get(2)?,
                count: row.get(3)?,
                crawl_date: crawl_date_at(row, 4)?,
            })
        });
        unscoped("tools_by_role", rows)
    }

    pub fn tool_trends(&self) -> FetchOutcome<ToolTrend> {
        let _entered = self.span.enter();
        let rows = self.warehouse.query_rows(TOOL_TRENDS_SQL, [], |row| {
            Ok(ToolTrend {
                rank: row.get(0)?,
                category: row.get(1)?,
                tool_name: row.get(2)?,
                tool_count: row.get(3)?,
                crawl_date: crawl_date_at(row, 4)?,
            })
        });
        unscoped("tool_trends", rows)
    }

    fn scoped<T: MarkerScoped>(
        &self,
        metric: &str,
        rows: ReportResult<Vec<T>>,
        crawl_date: NaiveDate,
        policy: ConsistencyPolicy,
    ) -> FetchOutcome<T> {
        match rows {
            Ok(rows) => check_markers(metric, rows, crawl_date, policy),
            Err(error) => failed(metric, error),
        }
    }
}

fn unscoped<T>(metric: &str, rows: ReportResult<Vec<T>>) -> FetchOutcome<T> {
    match rows {
        Ok(rows) => {
            if rows.is_empty() {
                tracing::info!(metric, "no rows found");
            }
            FetchOutcome::from_rows(rows)
        }
        Err(error) => failed(metric, error),
    }
}

fn failed<T>(metric: &str, error: impl std::fmt::Display) -> FetchOutcome<T> {
    tracing::error!(metric, error = %error, "failed to fetch reporting data");
    FetchOutcome::Failed {
        reason: error.to_string(),
    }
}

fn with_role_shares(mut rows: Vec<RoleShare>) -> Vec<RoleShare> {
    let total: i64 = rows.iter().map(|row| row.count).sum();
    for row in &mut rows {
        row.percentage_of_total = share_pct(row.count as f64, Some(total as f64));
    }
    rows
}

fn metric_change(row: &Row<'_>, current_idx: usize) -> rusqlite::Result<MetricChange> {
    let current: Option<f64> = row.get(current_idx)?;
    let previous: Option<f64> = row.get(current_idx + 1)?;
    Ok(MetricChange {
        current,
        previous,
        change_pct: change_pct(current, previous),
    })
}

fn parse_openings_statistics_row(row: &Row<'_>) -> rusqlite::Result<OpeningsStatistics> {
    Ok(OpeningsStatistics {
        total_openings: metric_change(row, 0)?,
        closed_openings: metric_change(row, 2)?,
        new_openings: metric_change(row, 4)?,
        fill_rate: metric_change(row, 6)?,
        average_weeks_to_fill: metric_change(row, 8)?,
        crawl_date: crawl_date_at(row, 10)?,
    })
}
