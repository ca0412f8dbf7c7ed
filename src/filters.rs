use serde::Serialize;

use crate::models::{InvestmentRecord, LeadRecord};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Origin {
    #[default]
    All,
    Marketing,
    NonMarketing,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum Period {
    #[default]
    None,
    Week(String),
    Month(String),
}

/// Current filter selection. `None` on a text dimension means "all".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterState {
    course: Option<String>,
    salesperson: Option<String>,
    origin: Origin,
    period: Period,
    campaign: Option<String>,
}

impl FilterState {
    pub fn course(&self) -> Option<&str> {
        self.course.as_deref()
    }

    pub fn salesperson(&self) -> Option<&str> {
        self.salesperson.as_deref()
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn campaign(&self) -> Option<&str> {
        self.campaign.as_deref()
    }

    pub fn set_course(&mut self, course: Option<String>) {
        self.course = course;
    }

    pub fn set_salesperson(&mut self, salesperson: Option<String>) {
        self.salesperson = salesperson;
    }

    pub fn set_origin(&mut self, origin: Origin) {
        self.origin = origin;
    }

    pub fn set_period(&mut self, period: Period) {
        self.period = period;
    }

    pub fn set_campaign(&mut self, campaign: Option<String>) {
        self.campaign = campaign;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_course(mut self, course: impl Into<String>) -> Self {
        self.course = Some(course.into());
        self
    }

    pub fn with_salesperson(mut self, salesperson: impl Into<String>) -> Self {
        self.salesperson = Some(salesperson.into());
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn with_campaign(mut self, campaign: impl Into<String>) -> Self {
        self.campaign = Some(campaign.into());
        self
    }

    /// Same selection with the period dimension reset; evolution spans dates.
    pub fn without_period(&self) -> Self {
        Self {
            period: Period::None,
            ..self.clone()
        }
    }

    pub fn matches(&self, lead: &LeadRecord) -> bool {
        self.matches_ignoring_period(lead)
            && match &self.period {
                Period::None => true,
                Period::Week(week) => lead.week == *week,
                Period::Month(month) => lead.month == *month,
            }
    }

    pub fn matches_ignoring_period(&self, lead: &LeadRecord) -> bool {
        if self.course.as_ref().is_some_and(|course| lead.course != *course) {
            return false;
        }
        if self
            .salesperson
            .as_ref()
            .is_some_and(|salesperson| lead.salesperson != *salesperson)
        {
            return false;
        }
        match self.origin {
            Origin::Marketing if !lead.is_marketing => return false,
            Origin::NonMarketing if lead.is_marketing => return false,
            _ => {}
        }
        if self
            .campaign
            .as_ref()
            .is_some_and(|campaign| lead.campaign != *campaign)
        {
            return false;
        }
        true
    }

    /// Leads passing every active dimension. With `restrict_to_latest`, leads
    /// outside the store's latest snapshot are dropped first.
    pub fn filtered<'a>(&self, store: &'a RecordStore, restrict_to_latest: bool) -> Vec<&'a LeadRecord> {
        let latest = store.latest_date();
        store
            .leads()
            .iter()
            .filter(|lead| !restrict_to_latest || Some(lead.date) == latest)
            .filter(|lead| self.matches(lead))
            .collect()
    }

    /// Investment table of the courses the course filter lets through.
    pub fn investment_scope(&self, store: &RecordStore) -> Vec<InvestmentRecord> {
        store
            .course_investments()
            .into_iter()
            .filter(|record| self.course.as_ref().map_or(true, |course| record.course == *course))
            .collect()
    }
}
