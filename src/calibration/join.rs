use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::observation::{DatasetError, Observation, open};
use crate::classifier::Classifier;
use crate::tokens::TokenTable;

/// A dated news headline
#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub date: NaiveDate,
    pub title: String,
}

/// Fear index close and the asset's next-day return for one trading day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketDay {
    pub date: NaiveDate,
    pub vix: f64,
    pub next_day_return: f64,
}

/// Reduces any supported timestamp to its calendar date.
///
/// The date is taken in the timestamp's own offset, so
/// `2016-07-01 00:00:00-04:00` is 2016-07-01 regardless of the reader's zone.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, DatasetError> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.date_naive());
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| DatasetError::InvalidDate(raw.to_string()))
}

/// Trading days keyed by normalised date
#[derive(Debug, Clone, Default)]
pub struct MarketCalendar {
    days: BTreeMap<NaiveDate, MarketDay>,
}

impl MarketCalendar {
    pub fn new(days: impl IntoIterator<Item = MarketDay>) -> Self {
        Self {
            days: days.into_iter().map(|d| (d.date, d)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// First trading day on or after `date`, at most `max_roll_days` later
    pub fn roll_forward(&self, date: NaiveDate, max_roll_days: u32) -> Option<&MarketDay> {
        let last = date + Duration::days(i64::from(max_roll_days));
        self.days.range(date..=last).next().map(|(_, day)| day)
    }
}

/// Join settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoinPolicy {
    pub max_roll_days: u32,
    /// |return| above this counts as a realised impact
    pub impact_threshold: f64,
}

impl Default for JoinPolicy {
    fn default() -> Self {
        Self {
            max_roll_days: 3,
            impact_threshold: 0.005,
        }
    }
}

/// Where each headline went
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReport {
    pub headlines: usize,
    pub unclassified: usize,
    pub missing_token: usize,
    pub unaligned: usize,
    pub rolled_forward: usize,
    pub observations: usize,
}

/// Labels historical headlines with the market reaction that followed them
#[instrument(
    skip_all,
    fields(headlines = headlines.len(), market_days = calendar.len(), asset = %asset)
)]
pub fn build_observations(
    headlines: &[Headline],
    calendar: &MarketCalendar,
    classifier: &Classifier,
    tokens: &TokenTable,
    asset: &str,
    policy: JoinPolicy,
) -> (Vec<Observation>, JoinReport) {
    let mut report = JoinReport {
        headlines: headlines.len(),
        ..JoinReport::default()
    };
    let mut observations = Vec::new();

    for headline in headlines {
        let category = classifier.classify(&headline.title);
        if category.is_sentinel() {
            report.unclassified += 1;
            continue;
        }
        let Ok(record) = tokens.lookup(category, asset) else {
            report.missing_token += 1;
            continue;
        };
        let Some(day) = calendar.roll_forward(headline.date, policy.max_roll_days) else {
            report.unaligned += 1;
            continue;
        };
        if day.date != headline.date {
            report.rolled_forward += 1;
        }
        observations.push(Observation {
            category,
            p_base: record.base_probability(),
            vix: day.vix,
            realized_impact: day.next_day_return.abs() > policy.impact_threshold,
            realized_return: day.next_day_return,
        });
    }

    report.observations = observations.len();
    if observations.is_empty() {
        warn!(?report, "Historical join produced no observations");
    } else {
        info!(?report, "Historical join finished");
    }
    (observations, report)
}

#[derive(Debug, Deserialize)]
struct HeadlineRow {
    fecha: String,
    titulo: String,
}

#[derive(Debug, Deserialize)]
struct MarketRow {
    fecha: String,
    #[serde(default)]
    vix: Option<f64>,
    #[serde(default)]
    sp500_return_1d: Option<f64>,
}

pub fn read_headlines<R: Read>(reader: R) -> Result<Vec<Headline>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut headlines = Vec::new();
    for row in csv_reader.deserialize::<HeadlineRow>() {
        let row = row?;
        if row.titulo.is_empty() {
            continue;
        }
        headlines.push(Headline {
            date: normalize_date(&row.fecha)?,
            title: row.titulo,
        });
    }
    Ok(headlines)
}

/// Rows missing the VIX or the return are dropped
pub fn read_market_days<R: Read>(reader: R) -> Result<Vec<MarketDay>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut days = Vec::new();
    for row in csv_reader.deserialize::<MarketRow>() {
        let row = row?;
        let (Some(vix), Some(next_day_return)) = (row.vix, row.sp500_return_1d) else {
            continue;
        };
        if !(vix.is_finite() && vix > 0.0 && next_day_return.is_finite()) {
            continue;
        }
        days.push(MarketDay {
            date: normalize_date(&row.fecha)?,
            vix,
            next_day_return,
        });
    }
    Ok(days)
}

pub fn load_headlines(path: &Path) -> Result<Vec<Headline>, DatasetError> {
    let headlines = read_headlines(open(path)?)?;
    info!(file = %path.display(), headlines = headlines.len(), "Headlines loaded");
    Ok(headlines)
}

pub fn load_market_calendar(path: &Path) -> Result<MarketCalendar, DatasetError> {
    let calendar = MarketCalendar::new(read_market_days(open(path)?)?);
    info!(file = %path.display(), days = calendar.len(), "Market history loaded");
    Ok(calendar)
}
