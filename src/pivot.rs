use serde::Serialize;

use crate::filters::FilterState;
use crate::metrics;
use crate::models::{LeadRecord, Stage, StageCount};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub label: String,
    /// `None` for the all-courses row.
    pub course: Option<String>,
    pub cells: Vec<StageCount>,
    pub total: usize,
    pub registrations: usize,
    pub conversion: f64,
    pub investment: Option<f64>,
    pub cpl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub stages: Vec<Stage>,
    pub aggregate: PivotRow,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.aggregate.total == 0
    }
}

/// Course x stage matrix over the latest snapshot. The aggregate row is
/// computed from the union of filtered leads, not summed from course rows.
pub fn build(store: &RecordStore, filters: &FilterState) -> PivotTable {
    let leads = filters.filtered(store, true);
    let investments = filters.investment_scope(store);
    let roi = metrics::roi(&leads, &investments);

    let aggregate = row(
        "TOTAL".to_string(),
        None,
        &leads,
        (roi.courses_with_investment > 0).then_some(roi.total_investment),
        roi.cpl,
    );

    let rows = investments
        .iter()
        .map(|record| {
            let course_leads: Vec<&LeadRecord> = leads
                .iter()
                .copied()
                .filter(|lead| lead.course == record.course)
                .collect();
            let marketing = course_leads.iter().filter(|lead| lead.is_marketing).count();
            let investment = record.usable_amount();
            let cpl = investment.filter(|_| marketing > 0).map(|value| value / marketing as f64);
            row(
                store.course_short(&record.course),
                Some(record.course.clone()),
                &course_leads,
                investment,
                cpl,
            )
        })
        .collect();

    PivotTable {
        stages: Stage::ALL.to_vec(),
        aggregate,
        rows,
    }
}

fn row(
    label: String,
    course: Option<String>,
    leads: &[&LeadRecord],
    investment: Option<f64>,
    cpl: Option<f64>,
) -> PivotRow {
    let registrations = metrics::count_stage(leads, Stage::Inscrito, None);
    PivotRow {
        label,
        course,
        cells: metrics::stage_counts(leads),
        total: leads.len(),
        registrations,
        conversion: metrics::ratio(registrations, leads.len()).unwrap_or(0.0),
        investment,
        cpl,
    }
}
