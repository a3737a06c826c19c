//! REST backend client.
//!
//! Responses wrap their payload in an envelope (`{"events": [...]}`,
//! `{"event": {...}}`, `{"employees": [...]}`). A list field that is missing
//! or not an array reads as an empty list.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{ConsoleError, Result};
use crate::models::{Employee, Event, EventDetail, NewEvent, RosterEntry};
use crate::normalize::{
    normalize_detail, normalize_directory, normalize_event, RawEmployee, RawEvent, RawEventDetail,
};
use crate::provider::{DataProvider, ScheduleStore};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventsEnvelope {
    events: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmployeesEnvelope {
    employees: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailEnvelope {
    event: Option<RawEventDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BulkReply {
    #[serde(alias = "count")]
    inserted: Option<usize>,
}

pub struct HttpProvider {
    client: Client,
    base: Url,
}

impl HttpProvider {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|err| ConsoleError::validation(format!("bad API base '{base}': {err}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConsoleError::fetch)?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| ConsoleError::validation(format!("bad endpoint {path}: {err}")))
    }

    fn event_url(&self, id: &str) -> Result<Url> {
        let mut url = self.endpoint("/api/events")?;
        url.path_segments_mut()
            .map_err(|_| ConsoleError::validation("API base cannot carry a path"))?
            .push(id);
        Ok(url)
    }

    fn events_url(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Url> {
        let mut url = self.endpoint("/api/events")?;
        if start.is_some() || end.is_some() {
            let mut query = url.query_pairs_mut();
            if let Some(start) = start {
                query.append_pair("start", &start.format("%Y-%m-%d").to_string());
            }
            if let Some(end) = end {
                query.append_pair("end", &end.format("%Y-%m-%d").to_string());
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, missing_id: Option<&str>) -> Result<T> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(ConsoleError::fetch)?;
        let response = check_status(response, missing_id)?;
        response.json::<T>().await.map_err(ConsoleError::fetch)
    }

    /// Events whose start falls in the given calendar range.
    pub async fn list_events_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Event>> {
        let envelope: EventsEnvelope = self.get_json(self.events_url(start, end)?, None).await?;
        let raw: Vec<RawEvent> = decode_list(envelope.events)?;
        Ok(raw.into_iter().map(normalize_event).collect())
    }
}

fn check_status(response: Response, missing_id: Option<&str>) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = missing_id {
            return Err(ConsoleError::not_found(id));
        }
    }
    if !status.is_success() {
        return Err(ConsoleError::fetch(format!(
            "{} answered {status}",
            response.url()
        )));
    }
    Ok(response)
}

/// Rows the backend reports as stored. An unreadable reply falls back to the
/// number submitted.
fn accepted_count(body: &str, submitted: usize) -> usize {
    match serde_json::from_str::<BulkReply>(body) {
        Ok(reply) => reply.inserted.unwrap_or(submitted),
        Err(err) => {
            warn!(submitted, "unreadable bulk reply: {err}");
            submitted
        }
    }
}

fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>> {
    match value {
        Value::Array(_) => serde_json::from_value(value).map_err(ConsoleError::fetch),
        _ => Ok(Vec::new()),
    }
}

/// Accepts either `{"event": {...}}` or the bare event object.
fn decode_created(value: Value) -> Result<Event> {
    let raw = match value {
        Value::Object(mut map) if map.contains_key("event") => {
            map.remove("event").unwrap_or(Value::Null)
        }
        other => other,
    };
    let raw: RawEvent = serde_json::from_value(raw).map_err(ConsoleError::fetch)?;
    Ok(normalize_event(raw))
}

#[async_trait]
impl DataProvider for HttpProvider {
    fn source_tag(&self) -> &'static str {
        "http"
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        self.list_events_between(None, None).await
    }

    async fn event_detail(&self, id: &str) -> Result<EventDetail> {
        let envelope: DetailEnvelope = self.get_json(self.event_url(id)?, Some(id)).await?;
        let raw = envelope
            .event
            .ok_or_else(|| ConsoleError::fetch(format!("detail for {id} had no event")))?;
        Ok(normalize_detail(raw))
    }

    async fn employee_directory(&self) -> Result<Vec<Employee>> {
        let url = self.endpoint("/api/employees")?;
        let envelope: EmployeesEnvelope = self.get_json(url, None).await?;
        let raw: Vec<RawEmployee> = decode_list(envelope.employees)?;
        Ok(normalize_directory(raw))
    }
}

#[async_trait]
impl ScheduleStore for HttpProvider {
    async fn create_event(&self, event: NewEvent) -> Result<Event> {
        event.validate()?;
        let response = self
            .client
            .post(self.endpoint("/api/events")?)
            .json(&event.payload())
            .send()
            .await
            .map_err(ConsoleError::fetch)?;
        let body: Value = check_status(response, None)?
            .json()
            .await
            .map_err(ConsoleError::fetch)?;
        let created = decode_created(body)?;
        info!(id = %created.id, "event created");
        Ok(created)
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.event_url(id)?)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(ConsoleError::fetch)?;
        check_status(response, Some(id))?;
        info!(id, "event deleted");
        Ok(())
    }

    async fn submit_roster(&self, entries: Vec<RosterEntry>) -> Result<usize> {
        let submitted = entries.len();
        let response = self
            .client
            .post(self.endpoint("/api/employees/bulk")?)
            .json(&json!({ "employees": entries }))
            .send()
            .await
            .map_err(ConsoleError::fetch)?;
        let body = check_status(response, None)?
            .text()
            .await
            .map_err(ConsoleError::fetch)?;
        Ok(accepted_count(&body, submitted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> HttpProvider {
        HttpProvider::new("http://localhost:4000", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn event_ids_are_path_encoded() {
        let url = provider().event_url("ev 1/a").unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/api/events/ev%201%2Fa");
    }

    #[test]
    fn range_becomes_query_parameters() {
        let start = NaiveDate::from_ymd_opt(2025, 9, 1);
        let end = NaiveDate::from_ymd_opt(2025, 10, 1);
        let url = provider().events_url(start, end).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4000/api/events?start=2025-09-01&end=2025-10-01"
        );
        let open = provider().events_url(None, None).unwrap();
        assert_eq!(open.as_str(), "http://localhost:4000/api/events");
    }

    #[test]
    fn bad_base_is_rejected() {
        assert!(HttpProvider::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn non_array_lists_read_as_empty() {
        let envelope: EventsEnvelope = serde_json::from_str(r#"{"events": null}"#).unwrap();
        let events: Vec<RawEvent> = decode_list(envelope.events).unwrap();
        assert!(events.is_empty());

        let envelope: EmployeesEnvelope = serde_json::from_str("{}").unwrap();
        let employees: Vec<RawEmployee> = decode_list(envelope.employees).unwrap();
        assert!(employees.is_empty());
    }

    #[test]
    fn detail_envelope_decodes_membership() {
        let envelope: DetailEnvelope = serde_json::from_str(
            r#"{"event": {"id": "ev-1", "title": "Fire drill", "start": "2025-09-18",
                "allDay": true, "enrolledEmpNos": ["6465", "5665"], "completedEmpNos": ["5665"]}}"#,
        )
        .unwrap();
        let detail = normalize_detail(envelope.event.unwrap());
        assert_eq!(detail.enrolled_emp_nos, vec!["6465", "5665"]);
        assert_eq!(detail.completed_emp_nos, vec!["5665"]);
    }

    #[test]
    fn created_event_accepts_both_shapes() {
        let wrapped = json!({"event": {"id": "ev-9", "title": "Ladders", "start": "2025-11-01"}});
        assert_eq!(decode_created(wrapped).unwrap().id, "ev-9");
        let bare = json!({"id": "ev-10", "title": "Ladders", "start": "2025-11-01T09:00"});
        assert!(!decode_created(bare).unwrap().all_day);
    }

    #[test]
    fn bulk_reply_reads_count_alias() {
        let reply: BulkReply = serde_json::from_str(r#"{"count": 4}"#).unwrap();
        assert_eq!(reply.inserted, Some(4));
        assert_eq!(accepted_count(r#"{"inserted": 2}"#, 5), 2);
    }

    #[test]
    fn unreadable_bulk_reply_falls_back_to_submitted() {
        assert_eq!(accepted_count("<html>ok</html>", 5), 5);
        assert_eq!(accepted_count("", 3), 3);
        assert_eq!(accepted_count("{}", 4), 4);
    }

    #[test]
    fn listed_events_without_start_are_kept() {
        let envelope: EventsEnvelope = serde_json::from_str(
            r#"{"events": [{"id": "ev-ok", "start": "2025-09-10"}, {"id": "ev-nostart"}]}"#,
        )
        .unwrap();
        let raw: Vec<RawEvent> = decode_list(envelope.events).unwrap();
        let events: Vec<Event> = raw.into_iter().map(normalize_event).collect();
        let ids: Vec<&str> = events.iter().map(|event| event.id.as_str()).collect();
        assert_eq!(ids, vec!["ev-ok", "ev-nostart"]);
        assert_eq!(events[1].start, None);
    }
}
