use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CapacityStatus {
    Available,
    Comfortable,
    Busy,
    Full,
    Overbooked,
}

impl CapacityStatus {
    /// 0 → available, (0,70] comfortable, (70,90] busy, (90,100] full,
    /// above 100 overbooked. Each bound is inclusive on the lower variant.
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization <= 0.0 {
            CapacityStatus::Available
        } else if utilization <= 70.0 {
            CapacityStatus::Comfortable
        } else if utilization <= 90.0 {
            CapacityStatus::Busy
        } else if utilization <= 100.0 {
            CapacityStatus::Full
        } else {
            CapacityStatus::Overbooked
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityStatus::Available => "available",
            CapacityStatus::Comfortable => "comfortable",
            CapacityStatus::Busy => "busy",
            CapacityStatus::Full => "full",
            CapacityStatus::Overbooked => "overbooked",
        }
    }
}

impl fmt::Display for CapacityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayCapacity {
    pub date: NaiveDate,
    pub available_minutes: i64,
    pub total_minutes_scheduled: i64,
    pub utilization_percentage: f64,
    pub status: CapacityStatus,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub task_count: usize,
}

impl DayCapacity {
    pub fn free_minutes(&self) -> i64 {
        (self.available_minutes - self.total_minutes_scheduled).max(0)
    }

    pub fn is_working_day(&self) -> bool {
        !self.is_weekend && !self.is_holiday
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCapacitySummary {
    pub week_start: NaiveDate,
    pub days: Vec<DayCapacity>,
    pub total_available_minutes: i64,
    pub total_scheduled_minutes: i64,
    pub average_utilization: f64,
    pub busiest_day: Option<NaiveDate>,
    pub lightest_day: Option<NaiveDate>,
    pub overbooked_days: usize,
    pub status: CapacityStatus,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CapacityDisplay {
    pub color: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleGap {
    pub date: NaiveDate,
    pub free_minutes: i64,
    pub available_minutes: i64,
    pub utilization_percentage: f64,
}

impl ScheduleGap {
    pub fn fits(&self, minutes: i64) -> bool {
        minutes > 0 && minutes <= self.free_minutes
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleGaps {
    pub gaps: Vec<ScheduleGap>,
}

impl ScheduleGaps {
    pub fn can_fit(&self, minutes: i64) -> bool {
        self.gaps.iter().any(|gap| gap.fits(minutes))
    }

    pub fn first_fit(&self, minutes: i64) -> Option<&ScheduleGap> {
        self.gaps.iter().find(|gap| gap.fits(minutes))
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BufferRecommendation {
    pub recommended_buffer_percent: u32,
    #[serde(default)]
    pub average_overrun_percent: Option<f64>,
    pub sample_size: usize,
    pub reason: String,
}
