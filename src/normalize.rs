//! Raw wire records and their conversion into canonical models.
//!
//! Every field of a raw record may be missing. Optional text that is absent or
//! blank becomes `None`; required text that is absent becomes an empty string.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::warn;

use crate::error::{ConsoleError, Result};
use crate::models::{Employee, Event, EventDetail, EventStart};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEmployee {
    pub emp_no: Option<String>,
    pub name: Option<String>,
    pub dept: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEvent {
    pub id: Option<String>,
    pub title: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub all_day: Option<bool>,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEventDetail {
    #[serde(flatten)]
    pub event: RawEvent,
    pub enrolled_emp_nos: Option<Vec<String>>,
    pub completed_emp_nos: Option<Vec<String>>,
}

pub fn normalize_employee(raw: RawEmployee) -> Result<Employee> {
    let emp_no = required_text(raw.emp_no);
    if emp_no.is_empty() {
        return Err(ConsoleError::validation("employee number is empty"));
    }

    Ok(Employee {
        emp_no,
        name: required_text(raw.name),
        dept: required_text(raw.dept),
    })
}

/// Normalizes a directory snapshot, dropping entries without an employee number.
pub fn normalize_directory(raw: Vec<RawEmployee>) -> Vec<Employee> {
    let mut employees = Vec::with_capacity(raw.len());
    for record in raw {
        match normalize_employee(record) {
            Ok(employee) => employees.push(employee),
            Err(err) => warn!("skipping directory entry: {err}"),
        }
    }
    employees
}

/// Events are taken as sent. An absent or unreadable start or end becomes
/// `None` so the event's membership still counts toward the totals.
pub fn normalize_event(raw: RawEvent) -> Event {
    let id = required_text(raw.id);
    let start = optional_text(raw.start).and_then(|value| {
        let parsed = parse_event_time(&value);
        if parsed.is_none() {
            warn!(event = %id, start = %value, "unreadable start");
        }
        parsed
    });
    let end = optional_text(raw.end).and_then(|value| {
        let parsed = parse_event_time(&value).map(|end| end.at());
        if parsed.is_none() {
            warn!(event = %id, end = %value, "unreadable end");
        }
        parsed
    });
    let all_day = raw
        .all_day
        .unwrap_or(matches!(start, Some(EventStart::Date(_))));

    Event {
        id,
        title: required_text(raw.title),
        start,
        end,
        all_day,
        location: optional_text(raw.location),
        description: optional_text(raw.description),
    }
}

pub fn normalize_detail(raw: RawEventDetail) -> EventDetail {
    EventDetail {
        event: normalize_event(raw.event),
        enrolled_emp_nos: trimmed_ids(raw.enrolled_emp_nos),
        completed_emp_nos: trimmed_ids(raw.completed_emp_nos),
    }
}

/// Accepts `2025-09-18`, `2025-09-10T09:00`, `2025-09-10T09:00:00` and RFC 3339.
pub fn parse_event_time(value: &str) -> Option<EventStart> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(EventStart::Date(date));
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(value, format) {
            return Some(EventStart::DateTime(at));
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|at| EventStart::DateTime(at.naive_local()))
}

fn required_text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn trimmed_ids(ids: Option<Vec<String>>) -> Vec<String> {
    ids.unwrap_or_default()
        .into_iter()
        .map(|id| id.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn employee_requires_an_emp_no() {
        let raw = RawEmployee {
            emp_no: Some("   ".to_string()),
            name: Some("Ha Eun-hyun".to_string()),
            dept: None,
        };
        assert!(matches!(
            normalize_employee(raw),
            Err(ConsoleError::Validation { .. })
        ));
    }

    #[test]
    fn employee_missing_fields_become_empty() {
        let raw = RawEmployee {
            emp_no: Some(" 6465 ".to_string()),
            name: None,
            dept: None,
        };
        let employee = normalize_employee(raw).unwrap();
        assert_eq!(employee.emp_no, "6465");
        assert_eq!(employee.name, "");
        assert_eq!(employee.dept, "");
    }

    #[test]
    fn directory_drops_entries_without_ids() {
        let raw: Vec<RawEmployee> = serde_json::from_str(
            r#"[{"empNo":"1755","name":"Ha Eun-hyun","dept":"Safety"},{"name":"nobody"}]"#,
        )
        .unwrap();
        let employees = normalize_directory(raw);
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0].dept, "Safety");
    }

    #[test]
    fn date_only_start_is_all_day() {
        let raw: RawEvent = serde_json::from_str(
            r#"{"id":"ev-1","title":"Fire drill","start":"2025-09-18","location":"  "}"#,
        )
        .unwrap();
        let event = normalize_event(raw);
        assert!(event.all_day);
        assert_eq!(
            event.start,
            Some(EventStart::Date(NaiveDate::from_ymd_opt(2025, 9, 18).unwrap()))
        );
        assert_eq!(event.location, None);
        assert_eq!(event.end, None);
    }

    #[test]
    fn timed_event_keeps_end() {
        let raw: RawEvent = serde_json::from_str(
            r#"{"id":"ev-2","title":"Hard hat","start":"2025-09-10T09:00","end":"2025-09-10T10:00","allDay":false}"#,
        )
        .unwrap();
        let event = normalize_event(raw);
        assert!(!event.all_day);
        let end = event.end.unwrap();
        assert_eq!(end.time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn unreadable_start_is_kept_as_undated() {
        let raw = RawEvent {
            id: Some("ev-3".to_string()),
            start: Some("next tuesday".to_string()),
            end: Some("later".to_string()),
            ..RawEvent::default()
        };
        let event = normalize_event(raw);
        assert_eq!(event.id, "ev-3");
        assert_eq!(event.start, None);
        assert_eq!(event.end, None);
        assert!(!event.all_day);
    }

    #[test]
    fn detail_without_start_keeps_membership() {
        let raw: RawEventDetail = serde_json::from_str(
            r#"{"id":"ev-x","title":"Ladders","enrolledEmpNos":["A","B","C"],"completedEmpNos":[]}"#,
        )
        .unwrap();
        let detail = normalize_detail(raw);
        assert_eq!(detail.event.start, None);
        assert_eq!(detail.enrolled_emp_nos, vec!["A", "B", "C"]);
    }

    #[test]
    fn rfc3339_start_is_accepted() {
        let parsed = parse_event_time("2025-10-02T14:00:00+09:00").unwrap();
        assert_eq!(parsed.to_string(), "2025-10-02T14:00");
    }

    #[test]
    fn detail_without_membership_arrays_is_empty() {
        let raw: RawEventDetail =
            serde_json::from_str(r#"{"id":"ev-4","title":"Scaffold","start":"2025-10-02"}"#)
                .unwrap();
        let detail = normalize_detail(raw);
        assert!(detail.enrolled_emp_nos.is_empty());
        assert!(detail.completed_emp_nos.is_empty());
    }

    #[test]
    fn detail_keeps_duplicate_ids() {
        let raw: RawEventDetail = serde_json::from_str(
            r#"{"id":"ev-5","start":"2025-10-15","enrolledEmpNos":["A"," A","B"],"completedEmpNos":["A"]}"#,
        )
        .unwrap();
        let detail = normalize_detail(raw);
        assert_eq!(detail.enrolled_emp_nos, vec!["A", "A", "B"]);
        assert_eq!(detail.completed_emp_nos, vec!["A"]);
    }
}
