use std::fmt::Write;

use crate::dashboard::DashboardView;
use crate::evolution::Evolution;
use crate::filters::{FilterState, Origin, Period};
use crate::format;
use crate::models::{KeyedAdjustment, Metrics, Stage};
use crate::pivot::{PivotRow, PivotTable};
use crate::table::{Table, TableSorts};

pub const FUNNEL: &str = "funnel";
pub const COURSES: &str = "courses";
pub const SALESPEOPLE: &str = "salespeople";
pub const SALESPEOPLE_ORIGIN: &str = "salespeople-origin";
pub const ROI: &str = "roi";
pub const EVOLUTION: &str = "evolution";
pub const ADJUSTMENT_COURSE: &str = "adjustment-course";
pub const ADJUSTMENT_SALESPERSON: &str = "adjustment-salesperson";
pub const PIVOT: &str = "pivot";

pub fn describe_filters(filters: &FilterState) -> String {
    if filters.is_default() {
        return "no filters".to_string();
    }
    let mut parts = Vec::new();
    if let Some(course) = filters.course() {
        parts.push(format!("course {course}"));
    }
    if let Some(salesperson) = filters.salesperson() {
        parts.push(format!("salesperson {salesperson}"));
    }
    match filters.origin() {
        Origin::All => {}
        Origin::Marketing => parts.push("marketing only".to_string()),
        Origin::NonMarketing => parts.push("non-marketing only".to_string()),
    }
    match filters.period() {
        Period::None => {}
        Period::Week(week) => parts.push(format!("week {week}")),
        Period::Month(month) => parts.push(format!("month {month}")),
    }
    if let Some(campaign) = filters.campaign() {
        parts.push(format!("campaign {campaign}"));
    }
    parts.join(", ")
}

pub fn funnel_table(metrics: &Metrics) -> Table {
    let mut table = Table::new(["Stage", "Total", "Marketing", "Non-marketing", "Step conv."]);
    for step in &metrics.funnel {
        table.push_row(vec![
            step.stage.to_string(),
            format::count(step.total),
            format::count(step.marketing),
            format::count(step.non_marketing),
            step.step_conversion
                .map(|value| format::percent(Some(value)))
                .unwrap_or_default(),
        ]);
    }
    if metrics.conversion.total_leads == 0 {
        table.rows.clear();
    }
    table
}

pub fn course_table(view: &DashboardView) -> Table {
    let mut table = Table::new(["Course", "Leads", "Registrations"]);
    for volume in &view.breakdowns.course_volumes {
        table.push_row(vec![
            volume.course_short.clone(),
            format::count(volume.leads),
            format::count(volume.registrations),
        ]);
    }
    table
}

pub fn salesperson_table(view: &DashboardView) -> Table {
    let rows = &view.breakdowns.salesperson_effectiveness;
    let mut table = Table::new([
        "Salesperson",
        "Closing rate",
        "Total",
        "Registrations",
        "Interested",
        "Contacted",
        "Requests",
    ]);
    for row in rows {
        table.push_row(vec![
            row.salesperson.clone(),
            format::percent(Some(row.closing_rate)),
            format::count(row.total),
            format::count(row.inscrito),
            format::count(row.interesado),
            format::count(row.contactado),
            format::count(row.solicitud),
        ]);
    }
    let total: usize = rows.iter().map(|row| row.total).sum();
    let inscrito: usize = rows.iter().map(|row| row.inscrito).sum();
    table.push_footer(vec![
        "Total".to_string(),
        format::percent(crate::metrics::ratio(inscrito, total)),
        format::count(total),
        format::count(inscrito),
        format::count(rows.iter().map(|row| row.interesado).sum()),
        format::count(rows.iter().map(|row| row.contactado).sum()),
        format::count(rows.iter().map(|row| row.solicitud).sum()),
    ]);
    table
}

pub fn salesperson_origin_table(view: &DashboardView) -> Table {
    let mut table = Table::new([
        "Salesperson",
        "Mkt leads",
        "Mkt reg.",
        "Mkt conv.",
        "Other leads",
        "Other reg.",
        "Other conv.",
        "Mkt share",
    ]);
    for row in &view.breakdowns.salesperson_origin {
        table.push_row(vec![
            row.salesperson.clone(),
            format::count(row.marketing_leads),
            format::count(row.marketing_registrations),
            format::percent(row.marketing_conversion),
            format::count(row.other_leads),
            format::count(row.other_registrations),
            format::percent(row.other_conversion),
            format::percent(Some(row.marketing_share)),
        ]);
    }
    table
}

pub fn roi_table(metrics: &Metrics) -> Table {
    let roi = &metrics.roi;
    let mut table = Table::new([
        "Course",
        "Investment",
        "Mkt leads",
        "Mkt registrations",
        "CPL",
        "CPI",
        "Mkt conv.",
        "Investment share",
    ]);
    for row in &roi.per_course {
        let label = if row.available {
            row.course_short.clone()
        } else {
            format!("{} (no investment data)", row.course_short)
        };
        table.push_row(vec![
            label,
            format::currency(row.investment),
            format::count(row.marketing_leads),
            format::count(row.marketing_registrations),
            format::currency(row.cpl),
            format::currency(row.cpi),
            format::percent(Some(row.conversion)),
            format::percent(row.investment_share),
        ]);
    }
    table.push_footer(vec![
        "Total".to_string(),
        format::currency(Some(roi.total_investment)),
        format::count(roi.marketing_leads),
        format::count(roi.marketing_registrations),
        format::currency(roi.cpl),
        format::currency(roi.cpi),
        format::percent(Some(roi.marketing_conversion)),
        String::new(),
    ]);
    table
}

pub fn evolution_table(evolution: &Evolution) -> Option<Table> {
    let comparison = evolution.table()?;
    let mut table = Table::new([
        "Stage".to_string(),
        format!("Total {}", format::date(comparison.from)),
        "Mkt".to_string(),
        format!("Total {}", format::date(comparison.to)),
        "Mkt".to_string(),
        "Δ Total".to_string(),
        "Δ Mkt".to_string(),
        "Δ%".to_string(),
    ]);
    for row in &comparison.rows {
        table.push_row(vec![
            row.stage.to_string(),
            format::count(row.total_from),
            format::count(row.marketing_from),
            format::count(row.total_to),
            format::count(row.marketing_to),
            format::delta(row.delta_total),
            format::delta(row.delta_marketing),
            format::percent(row.delta_pct),
        ]);
    }
    Some(table)
}

pub fn adjustment_table(first_column: &str, rows: &[KeyedAdjustment]) -> Table {
    let mut table = Table::new([
        first_column,
        "Mkt leads",
        "No cumple",
        "Extrarradio",
        "Invalid",
        "Adjustment rate",
        "Valid share",
    ]);
    for row in rows {
        let adjustment = &row.adjustment;
        table.push_row(vec![
            row.key.clone(),
            format::count(adjustment.marketing_leads),
            format::count(adjustment.no_cumple),
            format::count(adjustment.extrarradio),
            format::count(adjustment.invalid),
            format::percent(adjustment.rate),
            format::percent(adjustment.valid_share),
        ]);
    }
    table
}

/// Flat pivot: per stage a total and a marketing column, then row totals.
/// The all-courses row is a footer so it never moves when sorting.
pub fn pivot_table(pivot: &PivotTable) -> Table {
    let mut headers = vec!["Course".to_string()];
    for stage in &pivot.stages {
        headers.push(format!("{stage} T"));
        headers.push(format!("{stage} M"));
    }
    headers.extend(["Total", "Registrations", "Conv.", "Investment", "CPL"].map(str::to_string));

    let mut table = Table::new(headers);
    if pivot.is_empty() {
        return table;
    }
    for row in &pivot.rows {
        table.push_row(pivot_cells(row));
    }
    table.push_footer(pivot_cells(&pivot.aggregate));
    table
}

fn pivot_cells(row: &PivotRow) -> Vec<String> {
    let mut cells = vec![row.label.clone()];
    for cell in &row.cells {
        cells.push(format::count(cell.total));
        cells.push(format::count(cell.marketing));
    }
    cells.push(format::count(row.total));
    cells.push(format::count(row.registrations));
    cells.push(format::percent(Some(row.conversion)));
    cells.push(format::currency(row.investment));
    cells.push(format::currency(row.cpl));
    cells
}

pub fn build_report(view: &DashboardView, sorts: &TableSorts) -> String {
    let mut output = String::new();
    let metrics = &view.metrics;
    let conversion = &metrics.conversion;
    let header = &view.header;

    let _ = writeln!(output, "# Lead Funnel Dashboard");
    match header.latest_date {
        Some(date) => {
            let _ = writeln!(
                output,
                "Data as of {} ({} snapshots), {}",
                format::date(date),
                header.snapshots,
                describe_filters(&view.filters)
            );
        }
        None => {
            let _ = writeln!(output, "No snapshot data loaded.");
        }
    }
    if header.coverage.is_complete() {
        let _ = writeln!(output, "Investment: complete");
    } else {
        let _ = writeln!(
            output,
            "Investment: {}/{} courses",
            header.coverage.courses_with_investment, header.coverage.course_count
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Total leads: {}", format::count(conversion.total_leads));
    let _ = writeln!(
        output,
        "- Marketing leads: {} ({} of total)",
        format::count(conversion.marketing_leads),
        format::percent(conversion.marketing_share)
    );
    let _ = writeln!(output, "- Registrations: {}", format::count(conversion.registrations));
    let _ = writeln!(output, "- Global conversion: {}", format::percent(Some(conversion.global)));
    let _ = writeln!(
        output,
        "- Marketing conversion: {}",
        format::percent(Some(conversion.marketing))
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "### Funnel");
    output.push_str(&sorts.apply(FUNNEL, &funnel_table(metrics)).to_markdown());

    let _ = writeln!(output);
    let _ = writeln!(output, "### Leads by course");
    output.push_str(&sorts.apply(COURSES, &course_table(view)).to_markdown());

    let _ = writeln!(output);
    let _ = writeln!(output, "### Origin by stage");
    if view.breakdowns.origin_by_stage.is_empty() {
        let _ = writeln!(output, "_No data for the current filters._");
    }
    for count in &view.breakdowns.origin_by_stage {
        let _ = writeln!(
            output,
            "- {}: {} marketing, {} other",
            count.stage,
            count.marketing,
            count.non_marketing()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sales team");
    output.push_str(&sorts.apply(SALESPEOPLE, &salesperson_table(view)).to_markdown());
    let _ = writeln!(output);
    output.push_str(
        &sorts
            .apply(SALESPEOPLE_ORIGIN, &salesperson_origin_table(view))
            .to_markdown(),
    );

    let roi = &metrics.roi;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Marketing ROI");
    if roi.courses_without_investment.is_empty() {
        let _ = writeln!(output, "All courses have investment data.");
    } else {
        let _ = writeln!(
            output,
            "> No investment data for: {}. ROI for those courses is unavailable.",
            roi.courses_without_investment.join(", ")
        );
    }
    let _ = writeln!(
        output,
        "- Total investment: {} ({}/{} courses)",
        format::currency(Some(roi.total_investment)),
        roi.courses_with_investment,
        roi.course_count
    );
    let _ = writeln!(output, "- CPL: {}", format::currency(roi.cpl));
    let _ = writeln!(output, "- CPI: {}", format::currency(roi.cpi));
    let _ = writeln!(output);
    output.push_str(&sorts.apply(ROI, &roi_table(metrics)).to_markdown());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Evolution");
    match &view.evolution {
        Evolution::InsufficientHistory { snapshots } => {
            let _ = writeln!(
                output,
                "Only {snapshots} snapshot(s) available; add more history to compare dates."
            );
        }
        Evolution::UnknownSnapshot { date } => {
            let _ = writeln!(output, "No snapshot exists for {}.", format::date(*date));
        }
        Evolution::Comparison(_) => {
            if let Some(table) = evolution_table(&view.evolution) {
                output.push_str(&sorts.apply(EVOLUTION, &table).to_markdown());
            }
        }
    }
    if view.series.len() > 1 {
        let _ = writeln!(output);
        let mut series = Table::new(
            std::iter::once("Date".to_string()).chain(Stage::POSITIVE.iter().map(|stage| stage.to_string())),
        );
        for point in &view.series {
            let mut row = vec![format::date(point.date)];
            row.extend(point.counts.iter().map(|(_, count)| format::count(*count)));
            series.push_row(row);
        }
        output.push_str(&series.to_markdown());
    }

    let adjustment = &metrics.adjustment;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Campaign fit");
    let _ = writeln!(
        output,
        "- No cumple: {}, Extrarradio: {}, invalid: {}",
        adjustment.no_cumple, adjustment.extrarradio, adjustment.invalid
    );
    let _ = writeln!(
        output,
        "- Adjustment rate: {} (valid {})",
        format::percent(adjustment.rate),
        format::percent(adjustment.valid_share)
    );
    let _ = writeln!(output);
    output.push_str(
        &sorts
            .apply(
                ADJUSTMENT_COURSE,
                &adjustment_table("Course", &view.breakdowns.adjustment_by_course),
            )
            .to_markdown(),
    );
    let _ = writeln!(output);
    output.push_str(
        &sorts
            .apply(
                ADJUSTMENT_SALESPERSON,
                &adjustment_table("Salesperson", &view.breakdowns.adjustment_by_salesperson),
            )
            .to_markdown(),
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pivot");
    output.push_str(&sorts.apply(PIVOT, &pivot_table(&view.pivot)).to_markdown());

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::compute_view;
    use crate::models::{InvestmentRecord, LeadRecord};
    use crate::store::RecordStore;
    use chrono::NaiveDate;

    fn sample_store() -> RecordStore {
        let date = NaiveDate::from_ymd_opt(2026, 6, 8).unwrap();
        RecordStore::new(
            vec![
                LeadRecord::new(date, "A", Some(Stage::Inscrito), "Lucia", true, ""),
                LeadRecord::new(date, "A", Some(Stage::Bd), "Lucia", false, ""),
                LeadRecord::new(date, "B", Some(Stage::NoCumple), "Marta", true, ""),
            ],
            vec![InvestmentRecord::new("A", Some(100.0))],
        )
    }

    #[test]
    fn report_flags_missing_investment() {
        let store = sample_store();
        let view = compute_view(&store, &FilterState::default(), None);
        let report = build_report(&view, &TableSorts::default());

        assert!(report.contains("No investment data for: B"));
        assert!(report.contains("B (no investment data)"));
        assert!(report.contains("- CPL: 100,00€"));
        assert!(report.contains("Only 1 snapshot(s) available"));
    }

    #[test]
    fn pivot_table_keeps_aggregate_as_footer() {
        let store = sample_store();
        let view = compute_view(&store, &FilterState::default(), None);
        let table = pivot_table(&view.pivot);

        assert_eq!(table.headers.len(), 1 + 16 + 5);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.footer[0][0], "TOTAL");
        let total_column = table.column_index("Total").unwrap();
        assert_eq!(table.footer[0][total_column], "3");
    }

    #[test]
    fn empty_filters_render_empty_states() {
        let store = sample_store();
        let filters = FilterState::default().with_campaign("none");
        let view = compute_view(&store, &filters, None);
        let report = build_report(&view, &TableSorts::default());

        assert!(report.contains("campaign none"));
        assert!(report.contains("_No data for the current filters._"));
        assert!(funnel_table(&view.metrics).is_empty());
    }

    #[test]
    fn funnel_step_conversion_is_blank_without_previous_leads() {
        let store = sample_store();
        let view = compute_view(&store, &FilterState::default(), None);
        let table = funnel_table(&view.metrics);
        assert_eq!(table.rows[0][4], "");
        assert_eq!(table.rows[1][0], "BD");
        assert_eq!(table.rows[1][4], "");
    }
}
