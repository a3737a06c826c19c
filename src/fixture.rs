//! In-memory data source seeded with a small demo organization.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ConsoleError, Result};
use crate::models::{Employee, Event, EventDetail, NewEvent, RosterEntry};
use crate::normalize::{normalize_detail, normalize_directory, RawEmployee, RawEventDetail};
use crate::provider::{DataProvider, ScheduleStore};
use crate::schedule::sort_recent_first;

const SEED_EMPLOYEES: &str = r#"[
  {"empNo": "6465", "name": "Kim Jun-hyuk", "dept": "Production"},
  {"empNo": "5665", "name": "Sim Min-sik", "dept": "R&D"},
  {"empNo": "1755", "name": "Ha Eun-hyun", "dept": "Safety Management"},
  {"empNo": "2024-001", "name": "Park So-eun", "dept": "HR"},
  {"empNo": "2024-002", "name": "Lee Do-yoon", "dept": "Quality"},
  {"empNo": "3001", "name": "Jung Woo-sung", "dept": "Production Support"}
]"#;

const SEED_EVENTS: &str = r#"[
  {"id": "ev-2025-09-10-0900", "title": "Hard hat fitting", "start": "2025-09-10T09:00",
   "end": "2025-09-10T10:00", "allDay": false, "location": "Practice Room 1",
   "description": "Hands-on fitting and inspection checkpoints",
   "enrolledEmpNos": ["6465", "5665", "1755", "2024-001"], "completedEmpNos": ["6465", "1755"]},
  {"id": "ev-2025-09-18-all", "title": "Fire evacuation drill", "start": "2025-09-18",
   "allDay": true, "location": "Exhibition Hall", "description": "Evacuation route walk-through",
   "enrolledEmpNos": ["6465", "5665", "2024-002", "2024-001", "3001"], "completedEmpNos": ["5665"]},
  {"id": "ev-2025-10-02-1400", "title": "Scaffold safety", "start": "2025-10-02T14:00",
   "end": "2025-10-02T16:00", "allDay": false, "location": "Lecture Room 2",
   "enrolledEmpNos": ["6465", "2024-001", "2024-002"], "completedEmpNos": []},
  {"id": "ev-2025-10-15-1000", "title": "Hazardous chemical handling", "start": "2025-10-15T10:00",
   "end": "2025-10-15T12:00", "allDay": false, "location": "Lab B103",
   "enrolledEmpNos": ["5665", "1755", "3001"], "completedEmpNos": ["3001"]}
]"#;

#[derive(Debug, Default)]
struct FixtureState {
    employees: Vec<Employee>,
    events: Vec<Event>,
    membership: HashMap<String, (Vec<String>, Vec<String>)>,
}

#[derive(Debug, Default)]
pub struct FixtureProvider {
    state: Mutex<FixtureState>,
}

impl FixtureProvider {
    pub fn new(employees: Vec<Employee>, details: Vec<EventDetail>) -> Self {
        let mut state = FixtureState {
            employees,
            ..FixtureState::default()
        };
        for detail in details {
            state.membership.insert(
                detail.event.id.clone(),
                (detail.enrolled_emp_nos, detail.completed_emp_nos),
            );
            state.events.push(detail.event);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// The demo organization: six employees and four trainings.
    pub fn seeded() -> Result<Self> {
        let employees: Vec<RawEmployee> = serde_json::from_str(SEED_EMPLOYEES)
            .map_err(|err| ConsoleError::validation(format!("seed employees: {err}")))?;
        let details: Vec<RawEventDetail> = serde_json::from_str(SEED_EVENTS)
            .map_err(|err| ConsoleError::validation(format!("seed events: {err}")))?;
        let details = details.into_iter().map(normalize_detail).collect();
        Ok(Self::new(normalize_directory(employees), details))
    }
}

#[async_trait]
impl DataProvider for FixtureProvider {
    fn source_tag(&self) -> &'static str {
        "fixture"
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        let mut events = self.state.lock().await.events.clone();
        sort_recent_first(&mut events);
        Ok(events)
    }

    async fn event_detail(&self, id: &str) -> Result<EventDetail> {
        let state = self.state.lock().await;
        let event = state
            .events
            .iter()
            .find(|event| event.id == id)
            .cloned()
            .ok_or_else(|| ConsoleError::not_found(id))?;
        let (enrolled_emp_nos, completed_emp_nos) =
            state.membership.get(id).cloned().unwrap_or_default();
        Ok(EventDetail {
            event,
            enrolled_emp_nos,
            completed_emp_nos,
        })
    }

    async fn employee_directory(&self) -> Result<Vec<Employee>> {
        Ok(self.state.lock().await.employees.clone())
    }
}

#[async_trait]
impl ScheduleStore for FixtureProvider {
    async fn create_event(&self, event: NewEvent) -> Result<Event> {
        event.validate()?;
        let event = event.into_event(format!("ev-{}", Uuid::new_v4()));
        self.state.lock().await.events.push(event.clone());
        debug!(id = %event.id, "fixture event created");
        Ok(event)
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let before = state.events.len();
        state.events.retain(|event| event.id != id);
        if state.events.len() == before {
            return Err(ConsoleError::not_found(id));
        }
        state.membership.remove(id);
        Ok(())
    }

    async fn submit_roster(&self, entries: Vec<RosterEntry>) -> Result<usize> {
        let mut state = self.state.lock().await;
        let count = entries.len();
        for entry in entries {
            let employee = entry.employee();
            let position = state
                .employees
                .iter()
                .position(|existing| existing.emp_no == employee.emp_no);
            match position {
                Some(position) => state.employees[position] = employee,
                None => state.employees.push(employee),
            }
        }
        Ok(count)
    }
}
