use std::collections::{BTreeMap, HashSet};

use crate::models::{
    Adjustment, Conversion, CourseRoi, CourseVolume, FunnelStep, InvestmentRecord, KeyedAdjustment,
    LeadRecord, Metrics, RoiSummary, SalespersonEffectiveness, SalespersonOrigin, Stage,
    StageCount,
};

/// Leads at `stage`, optionally restricted to one marketing origin.
pub fn count_stage(leads: &[&LeadRecord], stage: Stage, marketing: Option<bool>) -> usize {
    leads
        .iter()
        .filter(|lead| lead.stage == Some(stage))
        .filter(|lead| marketing.map_or(true, |flag| lead.is_marketing == flag))
        .count()
}

pub fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

pub fn funnel(leads: &[&LeadRecord]) -> Vec<FunnelStep> {
    let mut steps: Vec<FunnelStep> = Vec::with_capacity(Stage::FUNNEL.len());
    for stage in Stage::FUNNEL {
        let total = count_stage(leads, stage, None);
        let marketing = count_stage(leads, stage, Some(true));
        let step_conversion = steps
            .last()
            .and_then(|previous| ratio(total, previous.total));
        steps.push(FunnelStep {
            stage,
            total,
            marketing,
            non_marketing: total - marketing,
            step_conversion,
        });
    }
    steps
}

/// Counts for all eight stages. Leads without a stage fall in no bucket.
pub fn stage_counts(leads: &[&LeadRecord]) -> Vec<StageCount> {
    Stage::ALL
        .into_iter()
        .map(|stage| StageCount {
            stage,
            total: count_stage(leads, stage, None),
            marketing: count_stage(leads, stage, Some(true)),
        })
        .collect()
}

/// Marketing/non-marketing split of the stages that actually occur.
pub fn origin_by_stage(leads: &[&LeadRecord]) -> Vec<StageCount> {
    stage_counts(leads)
        .into_iter()
        .filter(|count| count.total > 0)
        .collect()
}

pub fn conversion(leads: &[&LeadRecord]) -> Conversion {
    let total_leads = leads.len();
    let marketing_leads = leads.iter().filter(|lead| lead.is_marketing).count();
    let registrations = count_stage(leads, Stage::Inscrito, None);
    let marketing_registrations = count_stage(leads, Stage::Inscrito, Some(true));

    Conversion {
        total_leads,
        marketing_leads,
        non_marketing_leads: total_leads - marketing_leads,
        registrations,
        marketing_registrations,
        global: ratio(registrations, total_leads).unwrap_or(0.0),
        marketing: ratio(marketing_registrations, marketing_leads).unwrap_or(0.0),
        marketing_share: ratio(marketing_leads, total_leads),
    }
}

/// ROI over marketing leads. `investments` is the per-course table in scope;
/// courses without investment data contribute volume but not to CPL/CPI.
pub fn roi(leads: &[&LeadRecord], investments: &[InvestmentRecord]) -> RoiSummary {
    let marketing: Vec<&LeadRecord> = leads.iter().copied().filter(|lead| lead.is_marketing).collect();
    let invested: HashSet<&str> = investments
        .iter()
        .filter(|record| record.available)
        .map(|record| record.course.as_str())
        .collect();

    let total_investment: f64 = investments.iter().filter_map(InvestmentRecord::usable_amount).sum();
    let marketing_registrations = marketing.iter().filter(|lead| lead.is_registration()).count();
    let invested_leads: Vec<&LeadRecord> = marketing
        .iter()
        .copied()
        .filter(|lead| invested.contains(lead.course.as_str()))
        .collect();
    let invested_registrations = invested_leads.iter().filter(|lead| lead.is_registration()).count();

    let per_course: Vec<CourseRoi> = investments
        .iter()
        .map(|record| {
            let course_leads = marketing.iter().filter(|lead| lead.course == record.course).count();
            let course_registrations = marketing
                .iter()
                .filter(|lead| lead.course == record.course && lead.is_registration())
                .count();
            let amount = record.usable_amount();
            let course_short = leads
                .iter()
                .find(|lead| lead.course == record.course)
                .map(|lead| lead.course_short.clone())
                .unwrap_or_else(|| crate::models::short_name(&record.course));

            CourseRoi {
                course: record.course.clone(),
                course_short,
                investment: amount,
                available: record.available,
                marketing_leads: course_leads,
                marketing_registrations: course_registrations,
                cpl: amount.and_then(|value| per_unit(value, course_leads)),
                cpi: amount.and_then(|value| per_unit(value, course_registrations)),
                conversion: ratio(course_registrations, course_leads).unwrap_or(0.0),
                investment_share: amount.filter(|_| total_investment > 0.0).map(|value| value / total_investment),
            }
        })
        .collect();

    let courses_without_investment = per_course
        .iter()
        .filter(|row| !row.available)
        .map(|row| row.course_short.clone())
        .collect();

    RoiSummary {
        total_investment,
        courses_with_investment: invested.len(),
        course_count: investments.len(),
        courses_without_investment,
        marketing_leads: marketing.len(),
        marketing_registrations,
        invested_marketing_leads: invested_leads.len(),
        invested_marketing_registrations: invested_registrations,
        cpl: per_unit(total_investment, invested_leads.len()),
        cpi: per_unit(total_investment, invested_registrations),
        marketing_conversion: ratio(marketing_registrations, marketing.len()).unwrap_or(0.0),
        per_course,
    }
}

fn per_unit(amount: f64, units: usize) -> Option<f64> {
    if units == 0 {
        None
    } else {
        Some(amount / units as f64)
    }
}

/// Campaign fit among marketing leads: `No cumple` and `Extrarradio` count as
/// invalid, `No interesado` does not.
pub fn adjustment(leads: &[&LeadRecord]) -> Adjustment {
    let marketing: Vec<&LeadRecord> = leads.iter().copied().filter(|lead| lead.is_marketing).collect();
    let no_cumple = count_stage(&marketing, Stage::NoCumple, None);
    let extrarradio = count_stage(&marketing, Stage::Extrarradio, None);
    let invalid = marketing
        .iter()
        .filter(|lead| lead.stage.is_some_and(Stage::is_disqualified))
        .count();
    let rate = ratio(invalid, marketing.len());

    Adjustment {
        marketing_leads: marketing.len(),
        no_cumple,
        extrarradio,
        invalid,
        rate,
        valid_share: rate.map(|value| 1.0 - value),
    }
}

pub fn adjustment_by_course(leads: &[&LeadRecord]) -> Vec<KeyedAdjustment> {
    adjustment_by(leads, |lead| lead.course_short.as_str())
}

pub fn adjustment_by_salesperson(leads: &[&LeadRecord]) -> Vec<KeyedAdjustment> {
    adjustment_by(leads, |lead| lead.salesperson.as_str())
}

fn adjustment_by<'a>(leads: &[&'a LeadRecord], key: impl Fn(&'a LeadRecord) -> &'a str) -> Vec<KeyedAdjustment> {
    group_by(leads, key)
        .into_iter()
        .map(|(key, group)| KeyedAdjustment {
            key: key.to_string(),
            adjustment: adjustment(&group),
        })
        .collect()
}

/// Groups leads by a non-empty key, keys sorted.
fn group_by<'a>(
    leads: &[&'a LeadRecord],
    key: impl Fn(&'a LeadRecord) -> &'a str,
) -> BTreeMap<&'a str, Vec<&'a LeadRecord>> {
    let mut groups: BTreeMap<&str, Vec<&LeadRecord>> = BTreeMap::new();
    for lead in leads.iter().copied() {
        let value = key(lead);
        if value.is_empty() {
            continue;
        }
        groups.entry(value).or_default().push(lead);
    }
    groups
}

/// Lead and registration volume per course, largest first.
pub fn course_volumes(leads: &[&LeadRecord]) -> Vec<CourseVolume> {
    let mut volumes: Vec<CourseVolume> = group_by(leads, |lead| lead.course_short.as_str())
        .into_iter()
        .map(|(course, group)| CourseVolume {
            course_short: course.to_string(),
            leads: group.len(),
            registrations: group.iter().filter(|lead| lead.is_registration()).count(),
        })
        .collect();
    volumes.sort_by(|a, b| b.leads.cmp(&a.leads));
    volumes
}

pub fn salesperson_effectiveness(leads: &[&LeadRecord]) -> Vec<SalespersonEffectiveness> {
    group_by(leads, |lead| lead.salesperson.as_str())
        .into_iter()
        .map(|(salesperson, group)| {
            let inscrito = count_stage(&group, Stage::Inscrito, None);
            SalespersonEffectiveness {
                salesperson: salesperson.to_string(),
                total: group.len(),
                contactado: count_stage(&group, Stage::Contactado, None),
                interesado: count_stage(&group, Stage::Interesado, None),
                solicitud: count_stage(&group, Stage::Solicitud, None),
                inscrito,
                closing_rate: ratio(inscrito, group.len()).unwrap_or(0.0),
            }
        })
        .collect()
}

pub fn salesperson_origin(leads: &[&LeadRecord]) -> Vec<SalespersonOrigin> {
    group_by(leads, |lead| lead.salesperson.as_str())
        .into_iter()
        .map(|(salesperson, group)| {
            let (marketing, other): (Vec<&LeadRecord>, Vec<&LeadRecord>) =
                group.iter().copied().partition(|lead| lead.is_marketing);
            let marketing_registrations = marketing.iter().filter(|lead| lead.is_registration()).count();
            let other_registrations = other.iter().filter(|lead| lead.is_registration()).count();
            SalespersonOrigin {
                salesperson: salesperson.to_string(),
                marketing_leads: marketing.len(),
                marketing_registrations,
                marketing_conversion: ratio(marketing_registrations, marketing.len()),
                other_leads: other.len(),
                other_registrations,
                other_conversion: ratio(other_registrations, other.len()),
                marketing_share: ratio(marketing.len(), group.len()).unwrap_or(0.0),
            }
        })
        .collect()
}

pub fn metrics(leads: &[&LeadRecord], investments: &[InvestmentRecord]) -> Metrics {
    Metrics {
        funnel: funnel(leads),
        stages: stage_counts(leads),
        conversion: conversion(leads),
        roi: roi(leads, investments),
        adjustment: adjustment(leads),
    }
}
