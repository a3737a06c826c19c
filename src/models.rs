use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    pub emp_no: String,
    pub name: String,
    pub dept: String,
}

impl Employee {
    /// Stand-in for an id the directory does not know about.
    pub fn placeholder(emp_no: &str) -> Self {
        Self {
            emp_no: emp_no.to_string(),
            name: String::new(),
            dept: String::new(),
        }
    }
}

/// When a training starts: a whole day, or a specific time on that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventStart {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl EventStart {
    pub fn date(&self) -> NaiveDate {
        match self {
            EventStart::Date(date) => *date,
            EventStart::DateTime(at) => at.date(),
        }
    }

    pub fn at(&self) -> NaiveDateTime {
        match self {
            EventStart::Date(date) => date.and_time(NaiveTime::MIN),
            EventStart::DateTime(at) => *at,
        }
    }
}

impl fmt::Display for EventStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStart::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            EventStart::DateTime(at) => write!(f, "{}", at.format("%Y-%m-%dT%H:%M")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub title: String,
    /// `None` when the backend sent no start or one that could not be read.
    pub start: Option<EventStart>,
    pub end: Option<NaiveDateTime>,
    pub all_day: bool,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetail {
    pub event: Event,
    pub enrolled_emp_nos: Vec<String>,
    pub completed_emp_nos: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrollmentRecord {
    pub enrolled: u32,
    pub completed: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrollmentTotals {
    pub total_assigned: u64,
    pub total_completed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalSummary {
    pub total_assigned: u64,
    pub total_completed: u64,
    pub overall_percent: u32,
    pub avg_percent: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventProgressView {
    pub enrolled: Vec<Employee>,
    pub completed: Vec<Employee>,
    pub in_progress: Vec<Employee>,
    pub progress: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmployeeProgress {
    pub enrolled: u32,
    pub completed: u32,
    pub pct: u32,
}

/// One row of an imported roster, contact fields included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub emp_no: String,
    pub name: String,
    pub dept: String,
    pub phone: String,
    pub email: String,
}

impl RosterEntry {
    pub fn employee(&self) -> Employee {
        Employee {
            emp_no: self.emp_no.clone(),
            name: self.name.clone(),
            dept: self.dept.clone(),
        }
    }
}

/// Input for scheduling a new training.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeStanding {
    pub employee: Employee,
    pub progress: EmployeeProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentSummary {
    pub dept: String,
    pub employees: usize,
    pub assigned: u64,
    pub completed: u64,
    pub percent: u32,
}
