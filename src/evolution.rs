use chrono::NaiveDate;
use serde::Serialize;

use crate::filters::FilterState;
use crate::models::{LeadRecord, Stage};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionRow {
    pub stage: Stage,
    pub total_from: usize,
    pub marketing_from: usize,
    pub total_to: usize,
    pub marketing_to: usize,
    pub delta_total: i64,
    pub delta_marketing: i64,
    /// `delta_total / total_from`; undefined when the stage was empty at `from`.
    pub delta_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionTable {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<EvolutionRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Evolution {
    /// Fewer than two snapshots exist; there is nothing to compare against.
    InsufficientHistory { snapshots: usize },
    UnknownSnapshot { date: NaiveDate },
    Comparison(EvolutionTable),
}

impl Evolution {
    pub fn table(&self) -> Option<&EvolutionTable> {
        match self {
            Evolution::Comparison(table) => Some(table),
            _ => None,
        }
    }
}

/// One point of the per-date funnel series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub counts: Vec<(Stage, usize)>,
}

/// First and last snapshot, the default comparison window.
pub fn default_range(store: &RecordStore) -> Option<(NaiveDate, NaiveDate)> {
    match store.dates() {
        [first, .., last] => Some((*first, *last)),
        _ => None,
    }
}

/// Compares stage counts between two snapshots. The period filter is ignored;
/// every other dimension applies to both dates.
pub fn compare(store: &RecordStore, from: NaiveDate, to: NaiveDate, filters: &FilterState) -> Evolution {
    let snapshots = store.dates().len();
    if snapshots < 2 {
        return Evolution::InsufficientHistory { snapshots };
    }
    for date in [from, to] {
        if !store.has_snapshot(date) {
            return Evolution::UnknownSnapshot { date };
        }
    }

    let before = snapshot_leads(store, from, filters);
    let after = snapshot_leads(store, to, filters);

    let rows = Stage::ALL
        .into_iter()
        .map(|stage| {
            let (total_from, marketing_from) = stage_totals(&before, stage);
            let (total_to, marketing_to) = stage_totals(&after, stage);
            let delta_total = total_to as i64 - total_from as i64;
            EvolutionRow {
                stage,
                total_from,
                marketing_from,
                total_to,
                marketing_to,
                delta_total,
                delta_marketing: marketing_to as i64 - marketing_from as i64,
                delta_pct: (total_from > 0).then(|| delta_total as f64 / total_from as f64),
            }
        })
        .collect();

    Evolution::Comparison(EvolutionTable { from, to, rows })
}

/// Positive-path stage counts for every snapshot under the non-period filters.
pub fn stage_series(store: &RecordStore, filters: &FilterState) -> Vec<SeriesPoint> {
    store
        .dates()
        .iter()
        .map(|&date| {
            let leads = snapshot_leads(store, date, filters);
            SeriesPoint {
                date,
                counts: Stage::POSITIVE
                    .into_iter()
                    .map(|stage| (stage, stage_totals(&leads, stage).0))
                    .collect(),
            }
        })
        .collect()
}

fn snapshot_leads<'a>(store: &'a RecordStore, date: NaiveDate, filters: &FilterState) -> Vec<&'a LeadRecord> {
    store
        .snapshot(date)
        .filter(|lead| filters.matches_ignoring_period(lead))
        .collect()
}

fn stage_totals(leads: &[&LeadRecord], stage: Stage) -> (usize, usize) {
    (
        crate::metrics::count_stage(leads, stage, None),
        crate::metrics::count_stage(leads, stage, Some(true)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{Origin, Period};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn leads_at(date: NaiveDate, stage: Stage, count: usize, is_marketing: bool) -> Vec<LeadRecord> {
        (0..count)
            .map(|_| LeadRecord::new(date, "A", Some(stage), "Lucia", is_marketing, ""))
            .collect()
    }

    fn two_snapshot_store() -> RecordStore {
        let mut leads = leads_at(day(6), Stage::Bd, 5, false);
        leads.extend(leads_at(day(13), Stage::Bd, 6, false));
        leads.extend(leads_at(day(13), Stage::Bd, 2, true));
        leads.extend(leads_at(day(13), Stage::Inscrito, 1, true));
        RecordStore::new(leads, Vec::new())
    }

    #[test]
    fn delta_between_two_snapshots() {
        let store = two_snapshot_store();
        let evolution = compare(&store, day(6), day(13), &FilterState::default());
        let table = evolution.table().expect("comparison expected");

        let bd = &table.rows[0];
        assert_eq!(bd.stage, Stage::Bd);
        assert_eq!((bd.total_from, bd.total_to), (5, 8));
        assert_eq!(bd.delta_total, 3);
        assert_eq!(bd.delta_marketing, 2);
        assert!((bd.delta_pct.unwrap() - 0.6).abs() < 1e-9);

        let inscrito = table.rows.iter().find(|row| row.stage == Stage::Inscrito).unwrap();
        assert_eq!(inscrito.delta_total, 1);
        assert_eq!(inscrito.delta_pct, None);
        assert_eq!(table.rows.len(), 8);
    }

    #[test]
    fn single_snapshot_reports_insufficient_history() {
        let store = RecordStore::new(leads_at(day(6), Stage::Bd, 3, false), Vec::new());
        assert_eq!(
            compare(&store, day(6), day(6), &FilterState::default()),
            Evolution::InsufficientHistory { snapshots: 1 }
        );
        assert_eq!(default_range(&store), None);
    }

    #[test]
    fn unknown_dates_are_reported() {
        let store = two_snapshot_store();
        assert_eq!(
            compare(&store, day(6), day(20), &FilterState::default()),
            Evolution::UnknownSnapshot { date: day(20) }
        );
    }

    #[test]
    fn period_filter_does_not_restrict_evolution() {
        let store = two_snapshot_store();
        let filters = FilterState::default()
            .with_period(Period::Week("W15-2026".to_string()))
            .with_origin(Origin::Marketing);
        let evolution = compare(&store, day(6), day(13), &filters);
        let bd = &evolution.table().unwrap().rows[0];
        assert_eq!((bd.total_from, bd.total_to), (0, 2));
    }

    #[test]
    fn series_covers_every_snapshot() {
        let store = two_snapshot_store();
        let series = stage_series(&store, &FilterState::default());
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].counts[0], (Stage::Bd, 8));
        assert_eq!(series[1].counts[4], (Stage::Inscrito, 1));
        assert_eq!(default_range(&store), Some((day(6), day(13))));
    }
}
