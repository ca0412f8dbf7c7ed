use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDate;
use csv::StringRecord;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{IngestError, RowIssue};
use crate::models::{InvestmentRecord, LeadRecord, Stage};
use crate::store::RecordStore;

const SNAPSHOT_PREFIX: &str = "seguimiento_";
const INVESTMENT_PREFIX: &str = "inversion_";
const STAGE_HEADERS: [&str; 2] = ["stage", "Etapa equivalente"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub file: String,
    pub line: u64,
    pub issue: RowIssue,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub snapshot_files: usize,
    pub skipped_files: Vec<String>,
    pub leads: usize,
    pub rejected: Vec<Rejection>,
    pub investment_file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    #[serde(default, alias = "Equipo de ventas")]
    course: Option<String>,
    #[serde(default, alias = "Comercial")]
    salesperson: Option<String>,
    #[serde(default, alias = "Etapa equivalente")]
    stage: Option<String>,
    #[serde(default, alias = "Marketing")]
    marketing: Option<String>,
    #[serde(default, alias = "Source.Name.2")]
    campaign: Option<String>,
}

impl SnapshotRow {
    fn into_lead(self, date: NaiveDate) -> Result<LeadRecord, RowIssue> {
        let course = non_empty(self.course).ok_or(RowIssue::MissingCourse)?;
        let stage = match non_empty(self.stage) {
            Some(raw) => Some(Stage::from_label(&raw).ok_or(RowIssue::UnknownStage(raw))?),
            None => None,
        };

        Ok(LeadRecord::new(
            date,
            course,
            stage,
            non_empty(self.salesperson).unwrap_or_default(),
            marketing_flag(self.marketing.as_deref()),
            non_empty(self.campaign).unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct InvestmentRow {
    #[serde(default, alias = "Equipo de ventas")]
    course: Option<String>,
    #[serde(default, alias = "Inversión marketing")]
    amount: Option<String>,
}

static FILE_DATE: OnceLock<Option<Regex>> = OnceLock::new();
static THOUSANDS: OnceLock<Option<Regex>> = OnceLock::new();

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Snapshot date embedded in a file name as `DD_MM_YYYY`.
pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
    let captures = cached(&FILE_DATE, r"(\d{2})_(\d{2})_(\d{4})")?.captures(name)?;
    let day = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let year = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Numeric flag coerced to a boolean; missing or non-numeric is false.
pub fn marketing_flag(raw: Option<&str>) -> bool {
    raw.and_then(parse_number).is_some_and(|value| value != 0.0)
}

/// Accepts `1250.5`, `1250,5`, `1.250,50` and `1.250`. With a comma present
/// dots are grouping; without one, dots followed by exactly three digits are.
fn parse_number(raw: &str) -> Option<f64> {
    let value: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .collect();
    let value = if value.contains(',') {
        value.replace('.', "").replace(',', ".")
    } else if cached(&THOUSANDS, r"^-?\d{1,3}(\.\d{3})+$").is_some_and(|pattern| pattern.is_match(&value)) {
        value.replace('.', "")
    } else {
        value
    };
    value.parse::<f64>().ok().filter(|number| number.is_finite())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn dated_files(dir: &Path, prefix: &str, report: &mut IngestReport) -> Result<Vec<(NaiveDate, PathBuf)>, IngestError> {
    let entries = std::fs::read_dir(dir).map_err(|source| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| IngestError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !name.starts_with(prefix) || !name.ends_with(".csv") {
            continue;
        }
        match date_from_file_name(name) {
            Some(date) => files.push((date, path.clone())),
            None => {
                warn!(file = name, "ignored: file name carries no DD_MM_YYYY date");
                report.skipped_files.push(name.to_string());
            }
        }
    }
    files.sort();
    Ok(files)
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, IngestError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let headers: StringRecord = reader
        .headers()
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(str::trim)
        .collect();
    reader.set_headers(headers);
    Ok(reader)
}

/// Reads one snapshot file. Rows with a missing course or an unknown stage
/// are rejected and recorded, never defaulted.
pub fn read_snapshot(path: &Path, date: NaiveDate, report: &mut IngestReport) -> Result<Vec<LeadRecord>, IngestError> {
    let mut reader = open_reader(path)?;
    let file = path.display().to_string();

    let has_stage = reader
        .headers()
        .map(|headers| headers.iter().any(|header| STAGE_HEADERS.contains(&header)))
        .unwrap_or(false);
    if !has_stage {
        warn!(file = %file, "equivalent stage column not found, leads load without stage");
    }

    let mut leads = Vec::new();
    for (index, result) in reader.deserialize::<SnapshotRow>().enumerate() {
        let line = index as u64 + 2;
        let issue = match result {
            Ok(row) => match row.into_lead(date) {
                Ok(lead) => {
                    leads.push(lead);
                    continue;
                }
                Err(issue) => issue,
            },
            Err(err) => RowIssue::Malformed(err.to_string()),
        };
        warn!(file = %file, line, %issue, "row rejected");
        report.rejected.push(Rejection {
            file: file.clone(),
            line,
            issue,
        });
    }

    info!(file = %file, leads = leads.len(), date = %date, "snapshot loaded");
    Ok(leads)
}

pub fn load_snapshots(dir: &Path, report: &mut IngestReport) -> Result<Vec<LeadRecord>, IngestError> {
    let mut leads = Vec::new();
    for (date, path) in dated_files(dir, SNAPSHOT_PREFIX, report)? {
        match read_snapshot(&path, date, report) {
            Ok(mut batch) => {
                report.snapshot_files += 1;
                leads.append(&mut batch);
            }
            Err(err) => {
                warn!(error = %err, "snapshot skipped");
                report.skipped_files.push(path.display().to_string());
            }
        }
    }

    if report.snapshot_files == 0 {
        return Err(IngestError::NoSnapshots(dir.to_path_buf()));
    }
    report.leads = leads.len();
    Ok(leads)
}

/// Loads only the most recent investment file; earlier ones are ignored.
pub fn load_investments(dir: &Path, report: &mut IngestReport) -> Result<Vec<InvestmentRecord>, IngestError> {
    let Some((_, path)) = dated_files(dir, INVESTMENT_PREFIX, report)?.pop() else {
        warn!(dir = %dir.display(), "no investment files");
        return Ok(Vec::new());
    };

    let mut reader = open_reader(&path)?;
    let mut records = Vec::new();
    for result in reader.deserialize::<InvestmentRow>() {
        let row = result.map_err(|source| IngestError::Csv {
            path: path.clone(),
            source,
        })?;
        let Some(course) = non_empty(row.course) else {
            continue;
        };
        let raw = non_empty(row.amount);
        let amount = raw.as_deref().and_then(parse_number);
        if let (Some(raw), None) = (&raw, amount) {
            warn!(file = %path.display(), course = %course, amount = %raw, "investment amount is not a number");
        }
        let amount = amount.map(|value| (value * 100.0).round() / 100.0);
        records.push(InvestmentRecord::new(course, amount));
    }

    info!(file = %path.display(), courses = records.len(), "investment loaded");
    report.investment_file = Some(path.display().to_string());
    Ok(records)
}

/// Builds the store from both directories. A missing or unreadable
/// investment table leaves every course without investment data.
pub fn load_store(snapshot_dir: &Path, investment_dir: &Path) -> Result<(RecordStore, IngestReport), IngestError> {
    let mut report = IngestReport::default();
    let leads = load_snapshots(snapshot_dir, &mut report)?;
    let investments = load_investments(investment_dir, &mut report).unwrap_or_else(|err| {
        warn!(error = %err, "investment unavailable");
        Vec::new()
    });

    Ok((RecordStore::new(leads, investments), report))
}
