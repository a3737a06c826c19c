//! Calendar-side helpers: turning a drafted training into an event, searching
//! and ordering the event list.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{ConsoleError, Result};
use crate::models::{Event, EventStart, NewEvent};

/// Body sent to the backend when creating an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub title: String,
    pub start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

impl NewEvent {
    /// A draft with neither time is an all-day event. Any time makes it a
    /// timed event; a missing start time then means midnight.
    pub fn window(&self) -> (EventStart, Option<NaiveDateTime>, bool) {
        let has_time = self.start_time.is_some() || self.end_time.is_some();
        if !has_time {
            return (EventStart::Date(self.date), None, true);
        }
        let start = self.date.and_time(self.start_time.unwrap_or(NaiveTime::MIN));
        let end = self.end_time.map(|time| self.date.and_time(time));
        (EventStart::DateTime(start), end, false)
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ConsoleError::validation("event title is required"));
        }
        Ok(())
    }

    pub fn payload(&self) -> EventPayload {
        let (start, end, all_day) = self.window();
        EventPayload {
            title: self.title.trim().to_string(),
            start: start.to_string(),
            end: end.map(|at| at.format("%Y-%m-%dT%H:%M").to_string()),
            all_day,
            location: self.location.clone(),
            description: self.description.clone(),
            instructor: self.instructor.clone(),
            capacity: self.capacity,
        }
    }

    pub fn into_event(self, id: String) -> Event {
        let (start, end, all_day) = self.window();
        Event {
            id,
            title: self.title.trim().to_string(),
            start: Some(start),
            end,
            all_day,
            location: self.location,
            description: self.description,
        }
    }
}

/// Keeps events whose title or location contains `query`; a blank query keeps all.
pub fn filter_events<'a>(events: &'a [Event], query: &str) -> Vec<&'a Event> {
    let needle = query.trim();
    if needle.is_empty() {
        return events.iter().collect();
    }
    events
        .iter()
        .filter(|event| {
            event.title.contains(needle)
                || event
                    .location
                    .as_deref()
                    .is_some_and(|location| location.contains(needle))
        })
        .collect()
}

/// Newest first; undated events go last.
pub fn sort_recent_first(events: &mut [Event]) {
    events.sort_by(|a, b| {
        let a = a.start.map(|start| start.at());
        let b = b.start.map(|start| start.at());
        b.cmp(&a)
    });
}

/// Events starting inside `[from, to)`; either bound may be open. An undated
/// event only passes when both bounds are open.
pub fn events_between<'a>(
    events: &'a [Event],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|event| {
            let Some(day) = event.start.map(|start| start.date()) else {
                return from.is_none() && to.is_none();
            };
            from.is_none_or(|from| day >= from) && to.is_none_or(|to| day < to)
        })
        .collect()
}

/// Date and time columns for listing an event.
pub fn display_when(event: &Event) -> (String, String) {
    let Some(start) = event.start else {
        return ("----------".to_string(), "unscheduled".to_string());
    };
    let date = start.date().format("%Y-%m-%d").to_string();
    if event.all_day {
        return (date, "all day".to_string());
    }
    let from = start.at().format("%H:%M").to_string();
    let time = match event.end {
        Some(end) => format!("{from}-{}", end.format("%H:%M")),
        None => from,
    };
    (date, time)
}
