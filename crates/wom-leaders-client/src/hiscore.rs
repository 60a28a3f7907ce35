use std::time::Duration;

use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use url::Url;
use wom_leaders_core::config::{Config, DEFAULT_BROWSER_USER_AGENT};
use wom_leaders_core::error::AppError;
use wom_leaders_core::metric::Metric;
use wom_leaders_core::models::PlayerRankEntry;
use wom_leaders_core::traits::HiscoreClient;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Scrapes ranked players from the Old School RuneScape hiscore tables.
///
/// Each request loads one `overall` page for a metric and reads the first
/// table on it. The hiscores block unknown clients, so requests are sent
/// with a browser User-Agent.
#[derive(Clone)]
pub struct HiscoreWebClient {
    client: Client,
    base_url: String,
    mode: String,
    timeout_secs: u64,
}

impl HiscoreWebClient {
    /// `mode` is the `m=` path segment, e.g. `hiscore_oldschool`.
    pub fn new(base_url: &str, mode: &str) -> Result<Self, AppError> {
        Self::build(base_url, mode, DEFAULT_BROWSER_USER_AGENT, DEFAULT_TIMEOUT)
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::build(
            config.base_url.as_str(),
            config.hiscore_mode(),
            &config.browser_user_agent,
            config.http_timeout,
        )
    }

    fn build(
        base_url: &str,
        mode: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            mode: mode.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    /// URL of one hiscore page for a metric.
    pub fn page_url(&self, metric: Metric, page: u32) -> Result<Url, AppError> {
        let raw = format!("{}/m={}/overall", self.base_url, self.mode);
        let mut url =
            Url::parse(&raw).map_err(|e| AppError::HttpError(format!("Invalid URL {raw}: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            if let Some(category) = metric.category() {
                query.append_pair("category_type", &category.to_string());
            }
            query.append_pair("table", &metric.table().to_string());
            query.append_pair("page", &page.to_string());
        }

        Ok(url)
    }
}

impl HiscoreClient for HiscoreWebClient {
    async fn fetch_page(
        &self,
        metric: Metric,
        page: u32,
    ) -> Result<Vec<PlayerRankEntry>, AppError> {
        let url = self.page_url(metric, page)?;
        tracing::debug!(%metric, page, %url, "Fetching hiscore page");

        let response = self.client.get(url.as_str()).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimitExceeded);
        }
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status_code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        parse_leaders(metric, &body)
    }
}

/// Parse the first hiscore table of a page into ranked entries.
///
/// Skill rows carry rank, name, level and experience; every other metric
/// carries rank, name and score. Empty cells are ignored and thousands
/// separators are stripped. A page without a table yields no entries.
pub fn parse_leaders(metric: Metric, html: &str) -> Result<Vec<PlayerRankEntry>, AppError> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;

    let Some(table) = document.select(&table_selector).next() else {
        return Ok(Vec::new());
    };

    let mut entries = Vec::new();
    for row in table.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(cell_text)
            .filter(|text| !text.is_empty())
            .collect();

        // Header rows use <th> only.
        if cells.is_empty() {
            continue;
        }
        if cells.len() != metric.columns() {
            return Err(AppError::ParseError(format!(
                "{metric}: expected {} columns, found {} in row {:?}",
                metric.columns(),
                cells.len(),
                cells
            )));
        }

        entries.push(parse_row(metric, &cells)?);
    }

    Ok(entries)
}

fn parse_row(metric: Metric, cells: &[String]) -> Result<PlayerRankEntry, AppError> {
    let rank = parse_number(metric, "rank", &cells[0])?;
    let player = cells[1].as_str();

    if metric.is_skill() {
        let level = parse_number(metric, "level", &cells[2])?;
        let xp = parse_number(metric, "xp", &cells[3])?;
        Ok(PlayerRankEntry::new(player, to_u32(metric, "rank", rank)?, xp)
            .with_level(to_u32(metric, "level", level)?))
    } else {
        let score = parse_number(metric, "score", &cells[2])?;
        Ok(PlayerRankEntry::new(player, to_u32(metric, "rank", rank)?, score))
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn parse_number(metric: Metric, field: &str, raw: &str) -> Result<u64, AppError> {
    raw.replace(',', "")
        .parse()
        .map_err(|_| AppError::ParseError(format!("{metric}: invalid {field} '{raw}'")))
}

fn to_u32(metric: Metric, field: &str, value: u64) -> Result<u32, AppError> {
    u32::try_from(value)
        .map_err(|_| AppError::ParseError(format!("{metric}: {field} {value} out of range")))
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::ParseError(format!("Invalid selector '{css}': {e}")))
}
