use chrono::NaiveDate;
use lead_funnel_dashboard::metrics;
use lead_funnel_dashboard::{
    compute_view, sort_rows, Evolution, FilterState, InvestmentRecord, LeadRecord, Origin, Period,
    RecordStore, SortDirection, Stage,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

fn history() -> RecordStore {
    let mut leads = Vec::new();
    let courses = ["Policia", "Bombero", "Guardia Civil"];
    let salespeople = ["Lucia", "Marta", ""];
    let campaigns = ["meta", "google", ""];
    for (snapshot, date) in [day(2), day(9), day(16)].into_iter().enumerate() {
        for i in 0..48 {
            let stage = Stage::ALL[(i + snapshot) % Stage::ALL.len()];
            leads.push(LeadRecord::new(
                date,
                courses[i % courses.len()],
                Some(stage),
                salespeople[i % salespeople.len()],
                i % 4 != 0,
                campaigns[(i / 2) % campaigns.len()],
            ));
        }
    }
    RecordStore::new(
        leads,
        vec![
            InvestmentRecord::new("Policia", Some(1200.0)),
            InvestmentRecord::new("Bombero", Some(450.5)),
        ],
    )
}

fn filter_states() -> Vec<FilterState> {
    vec![
        FilterState::default(),
        FilterState::default().with_course("Policia"),
        FilterState::default().with_salesperson("Marta"),
        FilterState::default().with_origin(Origin::Marketing),
        FilterState::default().with_origin(Origin::NonMarketing),
        FilterState::default().with_period(Period::Week("W12-2026".to_string())),
        FilterState::default().with_period(Period::Week("W10-2026".to_string())),
        FilterState::default().with_campaign("meta"),
        FilterState::default()
            .with_course("Guardia Civil")
            .with_origin(Origin::Marketing)
            .with_campaign("google"),
    ]
}

#[test]
fn stage_buckets_partition_the_filtered_latest_snapshot() {
    let store = history();
    for filters in filter_states() {
        let leads = filters.filtered(&store, true);
        let counts = metrics::stage_counts(&leads);
        assert_eq!(counts.iter().map(|count| count.total).sum::<usize>(), leads.len());
    }
}

#[test]
fn pivot_aggregate_agrees_with_metrics() {
    let store = history();
    for filters in filter_states() {
        let view = compute_view(&store, &filters, None);
        let aggregate = &view.pivot.aggregate;

        assert_eq!(aggregate.total, view.metrics.conversion.total_leads);
        assert_eq!(aggregate.registrations, view.metrics.conversion.registrations);
        assert_eq!(aggregate.conversion, view.metrics.conversion.global);
        assert_eq!(aggregate.cpl, view.metrics.roi.cpl);
        for step in &view.metrics.funnel {
            let cell = aggregate.cells.iter().find(|cell| cell.stage == step.stage).unwrap();
            assert_eq!(cell.total, step.total);
            assert_eq!(cell.marketing, step.marketing);
        }
    }
}

#[test]
fn unrounded_ratios_feed_the_aggregate_cpl() {
    let store = history();
    let view = compute_view(&store, &FilterState::default(), None);
    let roi = &view.metrics.roi;
    let expected = 1650.5 / roi.invested_marketing_leads as f64;
    assert_eq!(roi.cpl, Some(expected));
    assert_eq!(roi.courses_without_investment, vec!["Guardia Civil".to_string()]);
}

#[test]
fn worked_example_from_two_leads() {
    let date = day(16);
    let store = RecordStore::new(
        vec![
            LeadRecord::new(date, "A", Some(Stage::Inscrito), "", true, ""),
            LeadRecord::new(date, "A", Some(Stage::Bd), "", false, ""),
        ],
        vec![InvestmentRecord::new("A", Some(100.0))],
    );
    let view = compute_view(&store, &FilterState::default(), None);

    assert_eq!(view.metrics.conversion.marketing, 1.0);
    assert_eq!(view.metrics.conversion.global, 0.5);
    assert_eq!(view.metrics.roi.cpl, Some(100.0));
    assert_eq!(view.metrics.roi.cpi, Some(100.0));
    assert_eq!(view.evolution, Evolution::InsufficientHistory { snapshots: 1 });
}

#[test]
fn evolution_ignores_period_but_not_course() {
    let store = history();
    let filters = FilterState::default()
        .with_course("Policia")
        .with_period(Period::Week("W10-2026".to_string()));
    let view = compute_view(&store, &filters, Some((day(2), day(16))));
    let table = view.evolution.table().expect("three snapshots");

    let from_total: usize = table.rows.iter().map(|row| row.total_from).sum();
    assert_eq!(from_total, 16);
    assert_eq!(view.filtered_leads, 0);
}

#[test]
fn rendered_currency_sorts_numerically() {
    let rows = vec![
        vec!["10€".to_string()],
        vec!["2€".to_string()],
        vec!["100€".to_string()],
    ];
    let sorted = sort_rows(&rows, 0, SortDirection::Ascending);
    let order: Vec<&str> = sorted.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(order, vec!["2€", "10€", "100€"]);
}
