use std::path::PathBuf;

use clap::{ArgGroup, Args, ValueEnum};

use crate::filters::{FilterState, Origin, Period};

pub const SNAPSHOT_DIR_ENV: &str = "FUNNEL_SNAPSHOT_DIR";
pub const INVESTMENT_DIR_ENV: &str = "FUNNEL_INVESTMENT_DIR";

#[derive(Debug, Clone, Args)]
pub struct DataArgs {
    /// Directory holding seguimiento_DD_MM_YYYY.csv snapshots
    #[arg(long, env = SNAPSHOT_DIR_ENV, default_value = "datos/seguimiento", global = true)]
    pub snapshots: PathBuf,
    /// Directory holding inversion_DD_MM_YYYY.csv tables
    #[arg(long, env = INVESTMENT_DIR_ENV, default_value = "datos/inversion", global = true)]
    pub investment: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OriginArg {
    #[default]
    All,
    Marketing,
    NonMarketing,
}

impl From<OriginArg> for Origin {
    fn from(value: OriginArg) -> Self {
        match value {
            OriginArg::All => Origin::All,
            OriginArg::Marketing => Origin::Marketing,
            OriginArg::NonMarketing => Origin::NonMarketing,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
#[command(group(
    ArgGroup::new("period")
        .args(["week", "month"])
        .multiple(false)
))]
pub struct FilterArgs {
    #[arg(long)]
    pub course: Option<String>,
    #[arg(long)]
    pub salesperson: Option<String>,
    #[arg(long, value_enum, default_value_t = OriginArg::All)]
    pub origin: OriginArg,
    /// ISO week label, e.g. W10-2026
    #[arg(long)]
    pub week: Option<String>,
    /// Month label, e.g. 2026-03
    #[arg(long)]
    pub month: Option<String>,
    #[arg(long)]
    pub campaign: Option<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> FilterState {
        let period = match (&self.week, &self.month) {
            (Some(week), _) => Period::Week(week.clone()),
            (None, Some(month)) => Period::Month(month.clone()),
            (None, None) => Period::None,
        };

        let mut filters = FilterState::default();
        filters.set_course(self.course.clone());
        filters.set_salesperson(self.salesperson.clone());
        filters.set_origin(self.origin.into());
        filters.set_period(period);
        filters.set_campaign(self.campaign.clone());
        filters
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub snapshot_dir: PathBuf,
    pub investment_dir: PathBuf,
    pub filters: FilterState,
}

impl Settings {
    pub fn resolve(data: &DataArgs, filters: &FilterArgs) -> Self {
        Self {
            snapshot_dir: data.snapshots.clone(),
            investment_dir: data.investment.clone(),
            filters: filters.to_filters(),
        }
    }
}
