use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// The twelve mobility exports the loader understands.
///
/// Declaration order is the classification scan order: a file name is
/// matched against each kind's suffix in turn and the first hit wins, which
/// is what keeps `HOME_REACH_MONTHLY.csv` away from `REACH_MONTHLY.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    AgeMonthly,
    HomeReachMonthly,
    WorkReachMonthly,
    ReachMonthly,
    DeviceMonthly,
    GenderMonthly,
    NationalityMonthly,
    MobilityTypeMonthly,
    WorkAvgDistanceMonthly,
    HomeAvgDistanceMonthly,
    ReachHourly,
    ReachDays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictAction {
    DoNothing,
    DoUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// One destination record per retained row, duplicates included.
    PassThrough,
    /// One destination record per polygon with `slots` value columns.
    FoldByKey {
        slots: usize,
        /// The record's date follows the latest row instead of the first.
        latest_date: bool,
    },
}

/// Destination table shape. The first two columns are always `date, polygon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableLayout {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub conflict_columns: &'static [&'static str],
    pub action: ConflictAction,
}

impl TableLayout {
    pub fn value_columns(&self) -> &'static [&'static str] {
        &self.columns[2..]
    }

    /// Columns overwritten by `DO UPDATE`; empty for `DO NOTHING`.
    pub fn update_columns(&self) -> &'static [&'static str] {
        match self.action {
            ConflictAction::DoNothing => &[],
            ConflictAction::DoUpdate => self.value_columns(),
        }
    }
}

pub const POLYGON_COLUMN: &str = "POLYGON_L8";

impl DatasetKind {
    pub const ALL: [DatasetKind; 12] = [
        DatasetKind::AgeMonthly,
        DatasetKind::HomeReachMonthly,
        DatasetKind::WorkReachMonthly,
        DatasetKind::ReachMonthly,
        DatasetKind::DeviceMonthly,
        DatasetKind::GenderMonthly,
        DatasetKind::NationalityMonthly,
        DatasetKind::MobilityTypeMonthly,
        DatasetKind::WorkAvgDistanceMonthly,
        DatasetKind::HomeAvgDistanceMonthly,
        DatasetKind::ReachHourly,
        DatasetKind::ReachDays,
    ];

    pub fn all() -> &'static [DatasetKind] {
        &Self::ALL
    }

    pub fn pattern(&self) -> &'static str {
        match self {
            DatasetKind::AgeMonthly => "AGE_MONTHLY.csv",
            DatasetKind::HomeReachMonthly => "HOME_REACH_MONTHLY.csv",
            DatasetKind::WorkReachMonthly => "WORK_REACH_MONTHLY.csv",
            DatasetKind::ReachMonthly => "REACH_MONTHLY.csv",
            DatasetKind::DeviceMonthly => "DEVICE_MONTHLY.csv",
            DatasetKind::GenderMonthly => "GENDER_MONTHLY.csv",
            DatasetKind::NationalityMonthly => "NATIONALITY_MONTHLY.csv",
            DatasetKind::MobilityTypeMonthly => "MOBILITY_TYPE_MONTHLY.csv",
            DatasetKind::WorkAvgDistanceMonthly => "WORK_AVG_DISTANCE_MONTHLY.csv",
            DatasetKind::HomeAvgDistanceMonthly => "HOME_AVG_DISTANCE_MONTHLY.csv",
            DatasetKind::ReachHourly => "REACH_HOURLY.csv",
            DatasetKind::ReachDays => "REACH_DAYS.csv",
        }
    }

    pub fn pipeline_name(&self) -> &'static str {
        match self {
            DatasetKind::AgeMonthly => "age_monthly",
            DatasetKind::HomeReachMonthly => "home_reach_monthly",
            DatasetKind::WorkReachMonthly => "work_reach_monthly",
            DatasetKind::ReachMonthly => "reach_monthly",
            DatasetKind::DeviceMonthly => "device_monthly",
            DatasetKind::GenderMonthly => "gender_monthly",
            DatasetKind::NationalityMonthly => "nationality_monthly",
            DatasetKind::MobilityTypeMonthly => "mobility_type_monthly",
            DatasetKind::WorkAvgDistanceMonthly => "avg_work_distance",
            DatasetKind::HomeAvgDistanceMonthly => "avg_home_distance",
            DatasetKind::ReachHourly => "reach_hourly",
            DatasetKind::ReachDays => "reach_days",
        }
    }

    pub fn date_column(&self) -> &'static str {
        match self {
            DatasetKind::ReachDays => "DATA_DATE",
            _ => "MONTH",
        }
    }

    pub fn aggregation(&self) -> Aggregation {
        match self {
            DatasetKind::AgeMonthly
            | DatasetKind::ReachMonthly
            | DatasetKind::DeviceMonthly
            | DatasetKind::HomeReachMonthly
            | DatasetKind::WorkReachMonthly
            | DatasetKind::ReachHourly
            | DatasetKind::ReachDays => Aggregation::PassThrough,
            DatasetKind::GenderMonthly
            | DatasetKind::NationalityMonthly
            | DatasetKind::MobilityTypeMonthly => Aggregation::FoldByKey {
                slots: 3,
                latest_date: false,
            },
            DatasetKind::WorkAvgDistanceMonthly | DatasetKind::HomeAvgDistanceMonthly => {
                Aggregation::FoldByKey {
                    slots: 1,
                    latest_date: true,
                }
            }
        }
    }

    pub fn layout(&self) -> TableLayout {
        use ConflictAction::*;

        match self {
            DatasetKind::AgeMonthly => TableLayout {
                table: "age_wise_user_reaches",
                columns: &["date", "polygon", "age_group", "user_reach"],
                conflict_columns: &["polygon", "age_group"],
                action: DoNothing,
            },
            DatasetKind::ReachMonthly => TableLayout {
                table: "monthly_overviews",
                columns: &[
                    "date",
                    "polygon",
                    "impressions",
                    "user_reach",
                    "daily_average_impressions",
                    "daily_average_user_reach",
                    "weekdays_impressions",
                    "weekdays_user_reach",
                    "weekends_impressions",
                    "weekends_user_reach",
                ],
                conflict_columns: &["polygon"],
                action: DoNothing,
            },
            DatasetKind::DeviceMonthly => TableLayout {
                table: "device_types",
                columns: &["date", "polygon", "device_brand", "user_reach"],
                conflict_columns: &["polygon", "device_brand"],
                action: DoNothing,
            },
            DatasetKind::HomeReachMonthly | DatasetKind::WorkReachMonthly => TableLayout {
                table: "mobility_state_wise_user_reaches",
                columns: &["date", "polygon", "mobility_type", "user_reach", "state"],
                conflict_columns: &["polygon", "mobility_type", "state"],
                action: DoNothing,
            },
            DatasetKind::ReachHourly => TableLayout {
                table: "hourly_trends",
                columns: &[
                    "date",
                    "polygon",
                    "weekday",
                    "hour",
                    "impressions",
                    "user_reach",
                    "daily_average_impressions",
                    "daily_average_user_reach",
                ],
                conflict_columns: &["polygon", "weekday", "hour"],
                action: DoNothing,
            },
            DatasetKind::ReachDays => TableLayout {
                table: "daily_trends",
                columns: &["date", "polygon", "weekday", "impressions", "user_reach"],
                conflict_columns: &["polygon", "date"],
                action: DoNothing,
            },
            DatasetKind::GenderMonthly => TableLayout {
                table: "gender_nationality_user_reaches",
                columns: &[
                    "date",
                    "polygon",
                    "gender_male_reaches",
                    "gender_female_reaches",
                    "gender_other_reaches",
                ],
                conflict_columns: &["polygon"],
                action: DoUpdate,
            },
            DatasetKind::NationalityMonthly => TableLayout {
                table: "gender_nationality_user_reaches",
                columns: &[
                    "date",
                    "polygon",
                    "nationality_malaysian_reaches",
                    "nationality_non_malaysian_reaches",
                    "nationality_other_reaches",
                ],
                conflict_columns: &["polygon"],
                action: DoUpdate,
            },
            DatasetKind::MobilityTypeMonthly => TableLayout {
                table: "mobility_type_wise_user_reaches",
                columns: &[
                    "date",
                    "polygon",
                    "home_user_reach",
                    "work_user_reach",
                    "passerby_user_reach",
                ],
                conflict_columns: &["polygon"],
                action: DoUpdate,
            },
            DatasetKind::WorkAvgDistanceMonthly => TableLayout {
                table: "mobility_type_wise_user_reaches",
                columns: &["date", "polygon", "avg_work_distance"],
                conflict_columns: &["polygon"],
                action: DoUpdate,
            },
            DatasetKind::HomeAvgDistanceMonthly => TableLayout {
                table: "mobility_type_wise_user_reaches",
                columns: &["date", "polygon", "avg_home_distance"],
                conflict_columns: &["polygon"],
                action: DoUpdate,
            },
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pipeline_name())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        DatasetKind::ALL
            .iter()
            .copied()
            .find(|kind| {
                kind.pipeline_name().eq_ignore_ascii_case(trimmed)
                    || kind.pattern().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| format!("unknown dataset kind '{trimmed}'"))
    }
}

/// Finds the first kind whose pattern is a suffix of `file_name`.
pub fn classify(file_name: &str) -> Option<DatasetKind> {
    DatasetKind::ALL
        .iter()
        .copied()
        .find(|kind| file_name.ends_with(kind.pattern()))
}
