use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{InvestmentRecord, LeadRecord};

/// Immutable lead history plus the active investment table.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    leads: Vec<LeadRecord>,
    investments: BTreeMap<String, InvestmentRecord>,
    dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub courses: Vec<String>,
    pub salespeople: Vec<String>,
    pub weeks: Vec<String>,
    pub months: Vec<String>,
    pub campaigns: Vec<String>,
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvestmentCoverage {
    pub courses_with_investment: usize,
    pub course_count: usize,
    pub missing: Vec<String>,
}

impl InvestmentCoverage {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl RecordStore {
    /// Later investment rows for the same course replace earlier ones, but
    /// a row without a positive amount never replaces one that had it.
    pub fn new(leads: Vec<LeadRecord>, investments: Vec<InvestmentRecord>) -> Self {
        let dates: BTreeSet<NaiveDate> = leads.iter().map(|lead| lead.date).collect();
        let mut table: BTreeMap<String, InvestmentRecord> = BTreeMap::new();
        for record in investments {
            match table.entry(record.course.trim().to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    if record.available || !slot.get().available {
                        slot.insert(record);
                    }
                }
            }
        }

        Self {
            leads,
            investments: table,
            dates: dates.into_iter().collect(),
        }
    }

    pub fn leads(&self) -> &[LeadRecord] {
        &self.leads
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// Distinct snapshot dates, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn has_snapshot(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    pub fn snapshot(&self, date: NaiveDate) -> impl Iterator<Item = &LeadRecord> + '_ {
        self.leads.iter().filter(move |lead| lead.date == date)
    }

    pub fn latest_snapshot(&self) -> impl Iterator<Item = &LeadRecord> + '_ {
        let latest = self.latest_date();
        self.leads
            .iter()
            .filter(move |lead| Some(lead.date) == latest)
    }

    /// Courses present in the latest snapshot, sorted.
    pub fn courses(&self) -> Vec<String> {
        distinct(self.latest_snapshot().map(|lead| lead.course.as_str()))
    }

    pub fn course_short(&self, course: &str) -> String {
        self.leads
            .iter()
            .find(|lead| lead.course == course)
            .map(|lead| lead.course_short.clone())
            .unwrap_or_else(|| crate::models::short_name(course))
    }

    /// Investment table restricted to the latest snapshot's courses: one
    /// record per course, unavailable when the investment file had no
    /// positive amount for it.
    pub fn course_investments(&self) -> Vec<InvestmentRecord> {
        self.courses()
            .into_iter()
            .map(|course| match self.investments.get(&course) {
                Some(record) => InvestmentRecord::new(course, record.amount),
                None => InvestmentRecord::unavailable(course),
            })
            .collect()
    }

    pub fn investment_coverage(&self) -> InvestmentCoverage {
        let table = self.course_investments();
        let missing: Vec<String> = table
            .iter()
            .filter(|record| !record.available)
            .map(|record| self.course_short(&record.course))
            .collect();

        InvestmentCoverage {
            courses_with_investment: table.len() - missing.len(),
            course_count: table.len(),
            missing,
        }
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            courses: self.courses(),
            salespeople: distinct(self.latest_snapshot().map(|lead| lead.salesperson.as_str())),
            weeks: distinct(self.leads.iter().map(|lead| lead.week.as_str())),
            months: distinct(self.leads.iter().map(|lead| lead.month.as_str())),
            campaigns: distinct(self.leads.iter().map(|lead| lead.campaign.as_str())),
            dates: self.dates.clone(),
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn lead(date: NaiveDate, course: &str, salesperson: &str) -> LeadRecord {
        LeadRecord::new(date, course, Some(Stage::Bd), salesperson, false, "")
    }

    fn sample_store() -> RecordStore {
        RecordStore::new(
            vec![
                lead(day(9), "Bombero", "Lucia"),
                lead(day(2), "Policia", "Marta"),
                lead(day(9), "Policia", ""),
                lead(day(2), "Guardia Civil", "Lucia"),
            ],
            vec![
                InvestmentRecord::new("Policia", Some(50.0)),
                InvestmentRecord::new("Policia", Some(300.0)),
                InvestmentRecord::new("Guardia Civil", Some(900.0)),
            ],
        )
    }

    #[test]
    fn dates_are_distinct_and_sorted() {
        let store = sample_store();
        assert_eq!(store.dates(), &[day(2), day(9)]);
        assert_eq!(store.latest_date(), Some(day(9)));
        assert_eq!(store.latest_snapshot().count(), 2);
    }

    #[test]
    fn courses_come_from_latest_snapshot() {
        let store = sample_store();
        assert_eq!(store.courses(), vec!["Bombero".to_string(), "Policia".to_string()]);

        let options = store.filter_options();
        assert_eq!(options.salespeople, vec!["Lucia".to_string()]);
        assert_eq!(options.dates.len(), 2);
    }

    #[test]
    fn investment_table_flags_missing_courses() {
        let store = sample_store();
        let table = store.course_investments();
        assert_eq!(table.len(), 2);
        assert!(!table[0].available);
        assert_eq!(table[1].amount, Some(300.0));

        let coverage = store.investment_coverage();
        assert_eq!(coverage.courses_with_investment, 1);
        assert_eq!(coverage.missing, vec!["Bombero".to_string()]);
        assert!(!coverage.is_complete());
    }

    #[test]
    fn blank_duplicate_keeps_positive_investment() {
        let store = RecordStore::new(
            vec![lead(day(9), "C", "Lucia"), lead(day(9), "D", "Lucia")],
            vec![
                InvestmentRecord::new("C", Some(500.0)),
                InvestmentRecord::new("C", None),
                InvestmentRecord::new("D", None),
                InvestmentRecord::new("D", Some(0.0)),
                InvestmentRecord::new("D", Some(120.0)),
            ],
        );
        let table = store.course_investments();
        assert_eq!(table[0].amount, Some(500.0));
        assert!(table[0].available);
        assert_eq!(table[1].amount, Some(120.0));
        assert!(store.investment_coverage().is_complete());
    }

    #[test]
    fn empty_store_has_no_latest_date() {
        let store = RecordStore::default();
        assert!(store.is_empty());
        assert_eq!(store.latest_date(), None);
        assert!(store.courses().is_empty());
        assert!(store.investment_coverage().is_complete());
    }
}
