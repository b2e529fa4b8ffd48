use crate::config::{DashboardConfig, ReportConfig};
use crate::errors::ReportResult;
use crate::fetcher::ReportDataFetcher;
use crate::models::{
    AreaOpenings, CompanyOpenings, FetchOutcome, HistoricalOpenings, OpeningsStatistics, RoleShare,
    ToolByRole, ToolRank,
};
use crate::ranking::{
    extract_company_ranker, extract_openings_summary, extract_tool_ranker, CompanyRanker,
    OpeningsSummary, ToolRanker,
};
use crate::trends::{
    tool_popularity, tool_trend_lines, trend_filter_options, ToolPopularity, ToolTrendPoint,
    TrendFilter, TrendFilterOptions,
};
use crate::warehouse::Warehouse;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    pub crawl_date: Option<NaiveDate>,
    pub openings_statistics: FetchOutcome<OpeningsStatistics>,
    pub historical_openings: FetchOutcome<HistoricalOpenings>,
    pub role_breakdown: FetchOutcome<RoleShare>,
    pub tool_ranking: FetchOutcome<ToolRank>,
    pub company_ranking: FetchOutcome<CompanyOpenings>,
    pub area_openings: FetchOutcome<AreaOpenings>,
    pub summary: Option<OpeningsSummary>,
    pub tool_ranker: Option<ToolRanker>,
    pub company_ranker: Option<CompanyRanker>,
    pub role_caption: Option<String>,
    pub district_openings: Vec<DistrictFill>,
}

impl HomePage {
    fn without_snapshot() -> Self {
        Self {
            crawl_date: None,
            openings_statistics: FetchOutcome::Empty,
            historical_openings: FetchOutcome::Empty,
            role_breakdown: FetchOutcome::Empty,
            tool_ranking: FetchOutcome::Empty,
            company_ranking: FetchOutcome::Empty,
            area_openings: FetchOutcome::Empty,
            summary: None,
            tool_ranker: None,
            company_ranker: None,
            role_caption: None,
            district_openings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsPage {
    pub filter: TrendFilter,
    pub options: TrendFilterOptions,
    pub lines: Vec<ToolTrendPoint>,
    pub bars: Vec<ToolPopularity>,
    pub source: FetchOutcome<ToolByRole>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictFill {
    pub sub_region: String,
    pub opening_count: f64,
}

/// Opens one warehouse session, renders the home page payload, and closes
/// the session whether or not individual fetches succeeded. Only a failed
/// connection is returned as an error.
pub fn load_home_page(config: &ReportConfig) -> ReportResult<HomePage> {
    let mut warehouse = Warehouse::open(&config.warehouse)?;
    let page = build_home_page(&warehouse, &config.dashboard);
    warehouse.close();
    Ok(page)
}

pub fn build_home_page(warehouse: &Warehouse, settings: &DashboardConfig) -> HomePage {
    let fetcher = ReportDataFetcher::new(warehouse, settings);
    let Some(crawl_date) = fetcher.latest_crawl_date() else {
        tracing::info!("no newest crawl date available, skipping metric fetches");
        return HomePage::without_snapshot();
    };
    tracing::info!(crawl_date = %crawl_date, "fetching dashboard data");

    let openings_statistics = fetcher.openings_statistics(crawl_date);
    let historical_openings = fetcher.openings_history(crawl_date);
    let role_breakdown = fetcher.role_breakdown(crawl_date);
    let tool_ranking = fetcher.tool_ranking(crawl_date);
    let company_ranking = fetcher.company_ranking(crawl_date);
    let area_openings = fetcher.area_openings(crawl_date);

    HomePage {
        crawl_date: Some(crawl_date),
        summary: extract_openings_summary(openings_statistics.rows()),
        tool_ranker: extract_tool_ranker(tool_ranking.rows()),
        company_ranker: extract_company_ranker(company_ranking.rows()),
        role_caption: role_breakdown
            .rows()
            .first()
            .map(|row| role_period_caption(row.crawl_date)),
        district_openings: district_openings(area_openings.rows(), &settings.districts),
        openings_statistics,
        historical_openings,
        role_breakdown,
        tool_ranking,
        company_ranking,
        area_openings,
    }
}

pub fn load_tools_page(config: &ReportConfig, filter: TrendFilter) -> ReportResult<ToolsPage> {
    let mut warehouse = Warehouse::open(&config.warehouse)?;
    let source = ReportDataFetcher::new(&warehouse, &config.dashboard).tools_by_role();
    warehouse.close();
    Ok(build_tools_page(source, filter, &config.dashboard))
}

pub fn build_tools_page(
    source: FetchOutcome<ToolByRole>,
    filter: TrendFilter,
    settings: &DashboardConfig,
) -> ToolsPage {
    let rows = source.rows();
    ToolsPage {
        options: trend_filter_options(rows),
        lines: tool_trend_lines(rows, &filter, settings.trend_line_top_k),
        bars: tool_popularity(rows, &filter, settings.trend_bar_top_k),
        filter,
        source,
    }
}

/// Caption for the role pie: the crawl day through the following Monday,
/// e.g. `From 16 - 21 October, 2024`.
pub fn role_period_caption(crawl_date: NaiveDate) -> String {
    let days_to_monday = 7 - i64::from(crawl_date.weekday().num_days_from_monday());
    let next_monday = crawl_date + Duration::days(days_to_monday);
    format!(
        "From {} - {}",
        crawl_date.format("%d"),
        next_monday.format("%d %B, %Y")
    )
}

/// Map fill for the home page. Without a configured district list the
/// districts present in the breakdown are used as-is.
fn district_openings(rows: &[AreaOpenings], districts: &[String]) -> Vec<DistrictFill> {
    if districts.is_empty() {
        let present: Vec<String> = rows.iter().map(|row| row.sub_region.clone()).collect();
        return fill_districts(rows, &present);
    }
    fill_districts(rows, districts)
}

/// One entry per known district; districts without openings get zero.
pub fn fill_districts(rows: &[AreaOpenings], districts: &[String]) -> Vec<DistrictFill> {
    districts
        .iter()
        .map(|district| DistrictFill {
            sub_region: district.clone(),
            opening_count: rows
                .iter()
                .find(|row| &row.sub_region == district)
                .map(|row| row.opening_count as f64)
                .unwrap_or(0.0),
        })
        .collect()
}
