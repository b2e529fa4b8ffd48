#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use jobdash_report::config::ReportConfig;
use jobdash_report::warehouse::{Warehouse, REPORT_SCHEMA_SQL};
use rusqlite::{params, Connection};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Monday 2024-10-14, the newest crawl in most fixtures.
pub fn crawl_date() -> NaiveDate {
    date(2024, 10, 14)
}

pub fn weeks_before(weeks: i64) -> NaiveDate {
    crawl_date() - Duration::weeks(weeks)
}

/// Log output written while a closure ran under a scoped subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("log buffer lock");
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn error_lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains("ERROR"))
            .map(str::to_string)
            .collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a plain-text subscriber that records into [`CapturedLogs`].
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let output = tracing::subscriber::with_default(subscriber, f);
    (output, logs)
}

/// A throwaway warehouse file with the reporting schema applied.
pub struct Fixture {
    pub dir: TempDir,
    pub config: ReportConfig,
    conn: Connection,
}

impl Fixture {
    pub fn new() -> Self {
        let fixture = Self::bare();
        fixture
            .conn
            .execute_batch(REPORT_SCHEMA_SQL)
            .expect("apply report schema");
        fixture
    }

    /// A valid but table-less database.
    pub fn bare() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("warehouse.db");
        let conn = Connection::open(&path).expect("create warehouse");
        conn.execute_batch("PRAGMA user_version = 1")
            .expect("write database header");
        let mut config = ReportConfig::default();
        config.warehouse.path = path;
        Self { dir, config, conn }
    }

    pub fn open(&self) -> Warehouse {
        Warehouse::open(&self.config.warehouse).expect("open warehouse")
    }

    pub fn metrics(&self, crawl_date: &str, total: i64, closed: i64, new: i64, fill_rate: f64) {
        self.conn
            .execute(
                "INSERT INTO rpt_job_openings_metrics VALUES (?1, ?2, ?3, ?4, ?5)",
                params![total, closed, new, fill_rate, crawl_date],
            )
            .expect("insert metrics");
    }

    pub fn fill_time(&self, current_date: &str, weeks: f64) {
        self.conn
            .execute(
                "INSERT INTO rpt_job_fill_time_statistics VALUES (?1, ?2)",
                params![weeks, current_date],
            )
            .expect("insert fill time");
    }

    pub fn role(&self, crawl_date: &str, role: &str, count: i64) {
        self.conn
            .execute(
                "INSERT INTO rpt_data_role_vacancy_trends VALUES (?1, ?2, ?3)",
                params![role, count, crawl_date],
            )
            .expect("insert role");
    }

    pub fn tool(&self, crawl_date: &str, rank: i64, category: &str, tool: &str, count: i64) {
        self.conn
            .execute(
                "INSERT INTO rpt_data_tools_trends VALUES (?1, ?2, ?3, ?4, ?5)",
                params![rank, category, tool, count, crawl_date],
            )
            .expect("insert tool trend");
    }

    pub fn tool_by_role(
        &self,
        crawl_date: &str,
        role: &str,
        category: &str,
        tool: &str,
        count: i64,
    ) {
        self.conn
            .execute(
                "INSERT INTO rpt_data_tools_by_data_role VALUES (?1, ?2, ?3, ?4, ?5)",
                params![role, category, tool, count, crawl_date],
            )
            .expect("insert tool by role");
    }

    pub fn company(&self, crawl_date: &str, rank: i64, name: &str, count: i64) {
        self.conn
            .execute(
                "INSERT INTO rpt_weekly_company_job_vacancies VALUES (?1, ?2, ?3, ?4)",
                params![rank, name, count, crawl_date],
            )
            .expect("insert company");
    }

    pub fn area(&self, crawl_date: &str, county: &str, district: &str, count: i64) {
        self.conn
            .execute(
                "INSERT INTO rpt_job_openings_geograph VALUES (?1, ?2, ?3, ?4)",
                params![county, district, count, crawl_date],
            )
            .expect("insert area");
    }

    /// Two weekly snapshots with every home page metric populated.
    pub fn seed_home_page(&self) {
        self.metrics("2024-10-07", 50, 10, 0, 0.5);
        self.metrics("2024-10-14", 75, 15, 20, 0.6);
        self.fill_time("2024-10-07", 2.0);
        self.fill_time("2024-10-14", 3.0);

        self.role("2024-10-14", "Data Engineer", 30);
        self.role("2024-10-14", "Data Analyst", 70);
        self.role("2024-10-07", "Data Analyst", 12);

        self.tool("2024-10-14", 1, "Language", "Python", 60);
        self.tool("2024-10-14", 2, "Language", "SQL", 45);
        self.tool("2024-10-14", 3, "Big Data", "Spark", 15);
        self.tool("2024-10-14", 4, "Cloud", "AWS", 9);

        self.company("2024-10-14", 1, "Acme_Corp", 40);
        self.company("2024-10-14", 2, "Foo (Bar Inc)", 35);
        self.company("2024-10-14", 3, "PlainName", 30);
        self.company("2024-10-14", 4, "Globex", 20);
        self.company("2024-10-14", 5, "Initech", 10);
        self.company("2024-10-14", 6, "Hooli", 5);

        self.area("2024-10-14", "Taipei City", "Neihu District", 22);
        self.area("2024-10-14", "New Taipei City", "Banqiao District", 11);
        self.area("2024-10-14", "Taichung City", "Xitun District", 8);
    }
}
