//! Funnel, conversion, ROI and campaign-fit analytics over a weekly snapshot
//! history of sales leads.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod evolution;
pub mod filters;
pub mod format;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod pivot;
pub mod report;
pub mod store;
pub mod table;

pub use dashboard::{compute_view, Dashboard, DashboardView};
pub use evolution::Evolution;
pub use filters::{FilterState, Origin, Period};
pub use models::{InvestmentRecord, LeadRecord, Stage};
pub use store::RecordStore;
pub use table::{sort_rows, SortDirection};
