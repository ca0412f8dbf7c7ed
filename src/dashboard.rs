use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::evolution::{self, Evolution, SeriesPoint};
use crate::filters::FilterState;
use crate::metrics;
use crate::models::{
    CourseVolume, KeyedAdjustment, LeadRecord, Metrics, SalespersonEffectiveness,
    SalespersonOrigin, StageCount,
};
use crate::pivot::{self, PivotTable};
use crate::store::{FilterOptions, InvestmentCoverage, RecordStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub latest_date: Option<NaiveDate>,
    pub snapshots: usize,
    pub latest_leads: usize,
    pub coverage: InvestmentCoverage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdowns {
    pub course_volumes: Vec<CourseVolume>,
    pub origin_by_stage: Vec<StageCount>,
    pub salesperson_effectiveness: Vec<SalespersonEffectiveness>,
    pub salesperson_origin: Vec<SalespersonOrigin>,
    pub adjustment_by_course: Vec<KeyedAdjustment>,
    pub adjustment_by_salesperson: Vec<KeyedAdjustment>,
}

/// Every panel derived from one filter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub filters: FilterState,
    pub header: Header,
    pub options: FilterOptions,
    pub filtered_leads: usize,
    pub metrics: Metrics,
    pub breakdowns: Breakdowns,
    pub comparison: Option<(NaiveDate, NaiveDate)>,
    pub evolution: Evolution,
    pub series: Vec<SeriesPoint>,
    pub pivot: PivotTable,
}

/// Recomputes every view from the full store. Without an explicit
/// comparison the first and last snapshots are compared.
pub fn compute_view(
    store: &RecordStore,
    filters: &FilterState,
    comparison: Option<(NaiveDate, NaiveDate)>,
) -> DashboardView {
    let leads: Vec<&LeadRecord> = filters.filtered(store, true);
    let investments = filters.investment_scope(store);

    let comparison = comparison.or_else(|| evolution::default_range(store));
    let evolution = match comparison {
        Some((from, to)) => evolution::compare(store, from, to, filters),
        None => Evolution::InsufficientHistory {
            snapshots: store.dates().len(),
        },
    };

    DashboardView {
        filters: filters.clone(),
        header: Header {
            latest_date: store.latest_date(),
            snapshots: store.dates().len(),
            latest_leads: store.latest_snapshot().count(),
            coverage: store.investment_coverage(),
        },
        options: store.filter_options(),
        filtered_leads: leads.len(),
        metrics: metrics::metrics(&leads, &investments),
        breakdowns: Breakdowns {
            course_volumes: metrics::course_volumes(&leads),
            origin_by_stage: metrics::origin_by_stage(&leads),
            salesperson_effectiveness: metrics::salesperson_effectiveness(&leads),
            salesperson_origin: metrics::salesperson_origin(&leads),
            adjustment_by_course: metrics::adjustment_by_course(&leads),
            adjustment_by_salesperson: metrics::adjustment_by_salesperson(&leads),
        },
        comparison,
        evolution,
        series: evolution::stage_series(store, filters),
        pivot: pivot::build(store, filters),
    }
}

/// Session over an immutable store. Filter state is owned here and every
/// mutation recomputes the whole view before returning.
#[derive(Debug)]
pub struct Dashboard<'a> {
    store: &'a RecordStore,
    filters: FilterState,
    comparison: Option<(NaiveDate, NaiveDate)>,
    view: DashboardView,
}

impl<'a> Dashboard<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self::with_filters(store, FilterState::default())
    }

    pub fn with_filters(store: &'a RecordStore, filters: FilterState) -> Self {
        let comparison = evolution::default_range(store);
        let view = compute_view(store, &filters, comparison);
        Self {
            store,
            filters,
            comparison,
            view,
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn into_view(self) -> DashboardView {
        self.view
    }

    /// Applies a filter change and refreshes every panel.
    pub fn update_filters(&mut self, change: impl FnOnce(&mut FilterState)) -> &DashboardView {
        change(&mut self.filters);
        self.refresh()
    }

    pub fn clear_filters(&mut self) -> &DashboardView {
        self.filters.clear();
        self.refresh()
    }

    pub fn select_comparison(&mut self, from: NaiveDate, to: NaiveDate) -> &DashboardView {
        self.comparison = Some((from, to));
        self.refresh()
    }

    fn refresh(&mut self) -> &DashboardView {
        self.view = compute_view(self.store, &self.filters, self.comparison);
        debug!(
            filtered = self.view.filtered_leads,
            default_filters = self.filters.is_default(),
            "dashboard recomputed"
        );
        &self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Origin;
    use crate::models::{InvestmentRecord, Stage};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    fn sample_store() -> RecordStore {
        RecordStore::new(
            vec![
                LeadRecord::new(day(1), "A", Some(Stage::Bd), "Lucia", true, ""),
                LeadRecord::new(day(8), "A", Some(Stage::Inscrito), "Lucia", true, ""),
                LeadRecord::new(day(8), "B", Some(Stage::Bd), "Marta", false, ""),
            ],
            vec![InvestmentRecord::new("A", Some(80.0))],
        )
    }

    #[test]
    fn filter_change_propagates_to_every_panel() {
        let store = sample_store();
        let mut dashboard = Dashboard::new(&store);
        assert_eq!(dashboard.view().filtered_leads, 2);

        let view = dashboard.update_filters(|filters| filters.set_origin(Origin::Marketing));
        assert_eq!(view.filtered_leads, 1);
        assert_eq!(view.pivot.aggregate.total, 1);
        assert_eq!(view.metrics.conversion.total_leads, 1);
        assert_eq!(view.filters.origin(), Origin::Marketing);

        let bd = &view.evolution.table().unwrap().rows[0];
        assert_eq!((bd.total_from, bd.total_to), (1, 0));
    }

    #[test]
    fn clearing_restores_the_default_view() {
        let store = sample_store();
        let initial = Dashboard::new(&store).into_view();

        let mut dashboard = Dashboard::new(&store);
        dashboard.update_filters(|filters| filters.set_course(Some("B".to_string())));
        dashboard.clear_filters();
        assert_eq!(dashboard.view(), &initial);
    }

    #[test]
    fn empty_store_produces_a_view() {
        let store = RecordStore::default();
        let view = Dashboard::new(&store).into_view();
        assert_eq!(view.filtered_leads, 0);
        assert_eq!(view.metrics.roi.cpl, None);
        assert_eq!(view.evolution, Evolution::InsufficientHistory { snapshots: 0 });
        assert!(view.pivot.is_empty());
    }
}
