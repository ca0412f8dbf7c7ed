use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Equivalent stage of a lead. Funnel stages come first, terminal negative
/// stages last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Stage {
    #[serde(rename = "BD")]
    Bd,
    Solicitud,
    Contactado,
    Interesado,
    Inscrito,
    #[serde(rename = "No interesado")]
    NoInteresado,
    #[serde(rename = "No cumple")]
    NoCumple,
    Extrarradio,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Bd,
        Stage::Solicitud,
        Stage::Contactado,
        Stage::Interesado,
        Stage::Inscrito,
        Stage::NoInteresado,
        Stage::NoCumple,
        Stage::Extrarradio,
    ];

    /// Display order of the funnel: requests arrive before the database load.
    pub const FUNNEL: [Stage; 5] = [
        Stage::Solicitud,
        Stage::Bd,
        Stage::Contactado,
        Stage::Interesado,
        Stage::Inscrito,
    ];

    /// Positive path in pipeline order, used for the evolution series.
    pub const POSITIVE: [Stage; 5] = [
        Stage::Bd,
        Stage::Solicitud,
        Stage::Contactado,
        Stage::Interesado,
        Stage::Inscrito,
    ];

    /// Stages that count against campaign fit. `NoInteresado` is deliberately absent.
    pub const DISQUALIFIED: [Stage; 2] = [Stage::NoCumple, Stage::Extrarradio];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Bd => "BD",
            Stage::Solicitud => "Solicitud",
            Stage::Contactado => "Contactado",
            Stage::Interesado => "Interesado",
            Stage::Inscrito => "Inscrito",
            Stage::NoInteresado => "No interesado",
            Stage::NoCumple => "No cumple",
            Stage::Extrarradio => "Extrarradio",
        }
    }

    /// Parses an equivalent-stage value. `INSCRITO PTE BONO` is a synonym of
    /// `Inscrito`. Returns `None` for anything outside the closed set.
    pub fn from_label(raw: &str) -> Option<Stage> {
        let value = raw.trim();
        if value == "INSCRITO PTE BONO" {
            return Some(Stage::Inscrito);
        }
        Stage::ALL.into_iter().find(|stage| stage.label() == value)
    }

    pub fn is_disqualified(self) -> bool {
        Stage::DISQUALIFIED.contains(&self)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One lead as seen in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadRecord {
    pub date: NaiveDate,
    pub course: String,
    pub course_short: String,
    pub stage: Option<Stage>,
    pub salesperson: String,
    pub is_marketing: bool,
    pub week: String,
    pub month: String,
    pub campaign: String,
}

impl LeadRecord {
    pub fn new(
        date: NaiveDate,
        course: impl Into<String>,
        stage: Option<Stage>,
        salesperson: impl Into<String>,
        is_marketing: bool,
        campaign: impl Into<String>,
    ) -> Self {
        let course = course.into();
        Self {
            date,
            course_short: short_name(&course),
            course,
            stage,
            salesperson: salesperson.into(),
            is_marketing,
            week: week_label(date),
            month: month_label(date),
            campaign: campaign.into(),
        }
    }

    pub fn is_registration(&self) -> bool {
        self.stage == Some(Stage::Inscrito)
    }
}

/// Display name of a course. Sales-team names are shown as they are.
pub fn short_name(course: &str) -> String {
    course.trim().to_string()
}

pub fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("W{:02}-{}", iso.week(), iso.year())
}

pub fn month_label(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentRecord {
    pub course: String,
    pub amount: Option<f64>,
    pub available: bool,
}

impl InvestmentRecord {
    pub fn new(course: impl Into<String>, amount: Option<f64>) -> Self {
        let amount = amount.filter(|value| value.is_finite() && *value >= 0.0);
        Self {
            course: course.into(),
            available: amount.is_some_and(|value| value > 0.0),
            amount,
        }
    }

    pub fn unavailable(course: impl Into<String>) -> Self {
        Self::new(course, None)
    }

    /// Amount usable for ROI, only when the course has investment data.
    pub fn usable_amount(&self) -> Option<f64> {
        if self.available {
            self.amount
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStep {
    pub stage: Stage,
    pub total: usize,
    pub marketing: usize,
    pub non_marketing: usize,
    /// `total / previous.total`; `None` for the first step or an empty previous step.
    pub step_conversion: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: Stage,
    pub total: usize,
    pub marketing: usize,
}

impl StageCount {
    pub fn non_marketing(&self) -> usize {
        self.total - self.marketing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub total_leads: usize,
    pub marketing_leads: usize,
    pub non_marketing_leads: usize,
    pub registrations: usize,
    pub marketing_registrations: usize,
    pub global: f64,
    pub marketing: f64,
    pub marketing_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseRoi {
    pub course: String,
    pub course_short: String,
    pub investment: Option<f64>,
    pub available: bool,
    pub marketing_leads: usize,
    pub marketing_registrations: usize,
    pub cpl: Option<f64>,
    pub cpi: Option<f64>,
    pub conversion: f64,
    pub investment_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiSummary {
    pub total_investment: f64,
    pub courses_with_investment: usize,
    pub course_count: usize,
    pub courses_without_investment: Vec<String>,
    /// Marketing leads of every course in scope.
    pub marketing_leads: usize,
    pub marketing_registrations: usize,
    /// Marketing leads of courses with investment data; the CPL denominator.
    pub invested_marketing_leads: usize,
    pub invested_marketing_registrations: usize,
    pub cpl: Option<f64>,
    pub cpi: Option<f64>,
    pub marketing_conversion: f64,
    pub per_course: Vec<CourseRoi>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adjustment {
    pub marketing_leads: usize,
    pub no_cumple: usize,
    pub extrarradio: usize,
    pub invalid: usize,
    pub rate: Option<f64>,
    pub valid_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyedAdjustment {
    pub key: String,
    pub adjustment: Adjustment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub funnel: Vec<FunnelStep>,
    pub stages: Vec<StageCount>,
    pub conversion: Conversion,
    pub roi: RoiSummary,
    pub adjustment: Adjustment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseVolume {
    pub course_short: String,
    pub leads: usize,
    pub registrations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalespersonEffectiveness {
    pub salesperson: String,
    pub total: usize,
    pub contactado: usize,
    pub interesado: usize,
    pub solicitud: usize,
    pub inscrito: usize,
    pub closing_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalespersonOrigin {
    pub salesperson: String,
    pub marketing_leads: usize,
    pub marketing_registrations: usize,
    pub marketing_conversion: Option<f64>,
    pub other_leads: usize,
    pub other_registrations: usize,
    pub other_conversion: Option<f64>,
    pub marketing_share: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonym_normalizes_to_inscrito() {
        assert_eq!(Stage::from_label("INSCRITO PTE BONO"), Some(Stage::Inscrito));
        assert_eq!(Stage::from_label(" No cumple "), Some(Stage::NoCumple));
        assert_eq!(Stage::from_label("Matriculado"), None);
    }

    #[test]
    fn week_and_month_follow_iso_calendar() {
        let date = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(week_label(date), "W53-2026");
        assert_eq!(month_label(date), "2027-01");

        let lead = LeadRecord::new(
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            " Oposiciones ",
            Some(Stage::Bd),
            "Marta",
            true,
            "",
        );
        assert_eq!(lead.week, "W10-2026");
        assert_eq!(lead.course_short, "Oposiciones");
    }

    #[test]
    fn investment_is_available_only_for_positive_amounts() {
        assert!(InvestmentRecord::new("A", Some(120.0)).available);
        assert!(!InvestmentRecord::new("A", Some(0.0)).available);
        assert!(!InvestmentRecord::new("A", None).available);

        let negative = InvestmentRecord::new("A", Some(-5.0));
        assert_eq!(negative.amount, None);
        assert_eq!(negative.usable_amount(), None);
    }
}
