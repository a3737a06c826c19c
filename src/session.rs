//! Viewer session: fetches through an injected provider, aggregates, and keeps
//! the most recent result for display.
//!
//! Both the overview and the detail pane are guarded by a request sequence
//! number. A fetch that resolves after a newer request has started is dropped
//! without touching state.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::aggregate::build_global_summary;
use crate::error::{ConsoleError, Result};
use crate::index::{build_enrollment_index, EnrollmentIndex};
use crate::models::{
    Employee, EmployeeProgress, Event, EventDetail, EventProgressView, GlobalSummary,
};
use crate::provider::DataProvider;
use crate::query::query_employee_progress;
use crate::view::{build_event_progress_view, EmployeeDirectory};

/// Everything computed from one full refresh.
#[derive(Debug)]
pub struct Overview {
    pub events: Vec<Event>,
    pub details: Vec<EventDetail>,
    pub directory: EmployeeDirectory,
    pub index: EnrollmentIndex,
    pub summary: GlobalSummary,
}

impl Overview {
    pub fn employee_progress(&self, emp_no: &str) -> EmployeeProgress {
        query_employee_progress(&self.index, emp_no)
    }

    /// Everyone enrolled in at least one training, by employee number. Ids
    /// the directory does not know appear as placeholders.
    pub fn enrolled_employees(&self) -> Vec<Employee> {
        let mut emp_nos: Vec<&str> = self
            .details
            .iter()
            .flat_map(|detail| detail.enrolled_emp_nos.iter())
            .map(String::as_str)
            .collect();
        emp_nos.sort_unstable();
        emp_nos.dedup();
        emp_nos
            .into_iter()
            .map(|emp_no| self.directory.resolve(emp_no))
            .collect()
    }
}

#[derive(Debug)]
pub struct DetailPane {
    pub detail: EventDetail,
    pub view: EventProgressView,
}

#[derive(Debug, Clone)]
pub enum OverviewState {
    Loading,
    Ready(Arc<Overview>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum DetailState {
    Idle,
    Loading { event_id: String },
    Ready(Arc<DetailPane>),
}

/// Result of a request that may have been overtaken by a newer one.
#[derive(Debug)]
pub enum Outcome<T> {
    Applied(T),
    Superseded,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Superseded => None,
        }
    }
}

struct SessionState {
    overview: OverviewState,
    overview_seq: u64,
    detail: DetailState,
    detail_seq: u64,
}

#[derive(Clone)]
pub struct ViewerSession {
    provider: Arc<dyn DataProvider>,
    state: Arc<Mutex<SessionState>>,
}

impl ViewerSession {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(SessionState {
                overview: OverviewState::Loading,
                overview_seq: 0,
                detail: DetailState::Idle,
                detail_seq: 0,
            })),
        }
    }

    pub async fn overview_state(&self) -> OverviewState {
        self.state.lock().await.overview.clone()
    }

    pub async fn detail_state(&self) -> DetailState {
        self.state.lock().await.detail.clone()
    }

    /// Aggregate progress for one employee, once the overview is ready.
    pub async fn employee_progress(&self, emp_no: &str) -> Option<EmployeeProgress> {
        match &self.state.lock().await.overview {
            OverviewState::Ready(overview) => Some(overview.employee_progress(emp_no)),
            _ => None,
        }
    }

    /// Re-fetches every event detail and the directory, then rebuilds the
    /// index and summary from scratch. Any failed fetch fails the refresh.
    pub async fn refresh(&self) -> Result<Outcome<Arc<Overview>>> {
        let seq = {
            let mut state = self.state.lock().await;
            state.overview_seq += 1;
            state.overview = OverviewState::Loading;
            state.overview_seq
        };

        let loaded = load_overview(Arc::clone(&self.provider)).await;

        let mut state = self.state.lock().await;
        if state.overview_seq != seq {
            debug!(seq, "discarding superseded overview");
            return Ok(Outcome::Superseded);
        }
        match loaded {
            Ok(overview) => {
                let overview = Arc::new(overview);
                state.overview = OverviewState::Ready(Arc::clone(&overview));
                Ok(Outcome::Applied(overview))
            }
            Err(err) => {
                state.overview = OverviewState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Loads one event's detail together with the directory.
    pub async fn open_detail(&self, event_id: &str) -> Result<Outcome<Arc<DetailPane>>> {
        let seq = {
            let mut state = self.state.lock().await;
            state.detail_seq += 1;
            state.detail = DetailState::Loading {
                event_id: event_id.to_string(),
            };
            state.detail_seq
        };

        let fetched = tokio::try_join!(
            self.provider.event_detail(event_id),
            self.provider.employee_directory()
        );

        let mut state = self.state.lock().await;
        if state.detail_seq != seq {
            debug!(event_id, seq, "discarding superseded detail");
            return Ok(Outcome::Superseded);
        }
        match fetched {
            Ok((detail, employees)) => {
                let directory = EmployeeDirectory::new(employees);
                let view = build_event_progress_view(&detail, &directory);
                let pane = Arc::new(DetailPane { detail, view });
                state.detail = DetailState::Ready(Arc::clone(&pane));
                Ok(Outcome::Applied(pane))
            }
            Err(err) => {
                state.detail = DetailState::Idle;
                Err(err)
            }
        }
    }

    /// Closes the detail pane; a detail fetch still in flight is dropped.
    pub async fn close_detail(&self) {
        let mut state = self.state.lock().await;
        state.detail_seq += 1;
        state.detail = DetailState::Idle;
    }
}

async fn load_overview(provider: Arc<dyn DataProvider>) -> Result<Overview> {
    let events = provider.list_events().await?;
    let (details, employees) = tokio::try_join!(
        fetch_all_details(Arc::clone(&provider), &events),
        provider.employee_directory()
    )?;

    let (index, totals) = build_enrollment_index(&details);
    let summary = build_global_summary(&index, &totals);
    info!(
        source = provider.source_tag(),
        events = events.len(),
        employees = employees.len(),
        overall = summary.overall_percent,
        average = summary.avg_percent,
        "overview rebuilt"
    );

    Ok(Overview {
        events,
        details,
        directory: EmployeeDirectory::new(employees),
        index,
        summary,
    })
}

/// Fetches every event's detail concurrently, in event order.
async fn fetch_all_details(
    provider: Arc<dyn DataProvider>,
    events: &[Event],
) -> Result<Vec<EventDetail>> {
    let mut tasks = JoinSet::new();
    for (position, event) in events.iter().enumerate() {
        let provider = Arc::clone(&provider);
        let id = event.id.clone();
        tasks.spawn(async move { (position, provider.event_detail(&id).await) });
    }

    let mut details: Vec<Option<EventDetail>> = vec![None; events.len()];
    while let Some(joined) = tasks.join_next().await {
        let (position, result) = joined.map_err(ConsoleError::fetch)?;
        details[position] = Some(result?);
    }
    Ok(details.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureProvider;
    use crate::index::tests::detail;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Notify;

    struct Gate {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    /// Fixture data whose fetches can be held open or made to fail. The list
    /// gate only holds the first listing.
    struct ScriptedProvider {
        inner: FixtureProvider,
        gates: HashMap<String, Gate>,
        list_gate: std::sync::Mutex<Option<Gate>>,
        failing: Option<String>,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                inner: FixtureProvider::seeded().unwrap(),
                gates: HashMap::new(),
                list_gate: std::sync::Mutex::new(None),
                failing: None,
            }
        }
    }

    #[async_trait]
    impl DataProvider for ScriptedProvider {
        fn source_tag(&self) -> &'static str {
            "scripted"
        }

        async fn list_events(&self) -> Result<Vec<Event>> {
            let gate = self.list_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            self.inner.list_events().await
        }

        async fn event_detail(&self, id: &str) -> Result<EventDetail> {
            if let Some(gate) = self.gates.get(id) {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            if self.failing.as_deref() == Some(id) {
                return Err(ConsoleError::fetch("backend unavailable"));
            }
            self.inner.event_detail(id).await
        }

        async fn employee_directory(&self) -> Result<Vec<Employee>> {
            self.inner.employee_directory().await
        }
    }

    #[tokio::test]
    async fn refresh_builds_summary_from_every_event() {
        let session = ViewerSession::new(Arc::new(FixtureProvider::seeded().unwrap()));
        assert!(matches!(session.overview_state().await, OverviewState::Loading));

        let overview = session.refresh().await.unwrap().applied().unwrap();
        assert_eq!(overview.summary.total_assigned, 15);
        assert_eq!(overview.summary.total_completed, 4);
        assert_eq!(overview.summary.overall_percent, 27);
        assert_eq!(overview.details.len(), 4);
        assert_eq!(overview.details[0].event.id, overview.events[0].id);

        let progress = session.employee_progress("1755").await.unwrap();
        assert_eq!(progress.enrolled, 2);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.pct, 50);
    }

    #[tokio::test]
    async fn undated_event_still_counts_toward_totals() {
        let mut undated = detail("ev-nostart", &["A", "B", "C"], &[]);
        undated.event.start = None;
        let provider = FixtureProvider::new(
            Vec::new(),
            vec![detail("ev-ok", &["A"], &["A"]), undated],
        );
        let session = ViewerSession::new(Arc::new(provider));

        let overview = session.refresh().await.unwrap().applied().unwrap();
        assert_eq!(overview.events.len(), 2);
        assert_eq!(overview.summary.total_assigned, 4);
        assert_eq!(overview.summary.total_completed, 1);
        assert_eq!(overview.summary.overall_percent, 25);
        assert_eq!(overview.employee_progress("B").enrolled, 1);
    }

    #[tokio::test]
    async fn enrolled_employees_include_unknown_ids() {
        let directory = vec![Employee {
            emp_no: "A".to_string(),
            name: "Avery".to_string(),
            dept: "Safety".to_string(),
        }];
        let provider = FixtureProvider::new(
            directory,
            vec![detail("ev-1", &["B", "A"], &["A"]), detail("ev-2", &["A"], &[])],
        );
        let session = ViewerSession::new(Arc::new(provider));

        let overview = session.refresh().await.unwrap().applied().unwrap();
        let employees = overview.enrolled_employees();
        assert_eq!(employees.len(), 2);
        assert_eq!(employees[0].name, "Avery");
        assert_eq!(employees[1], Employee::placeholder("B"));
    }

    #[tokio::test]
    async fn stale_refresh_does_not_replace_newer_one() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let provider = ScriptedProvider::new();
        *provider.list_gate.lock().unwrap() = Some(Gate {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        });
        let session = ViewerSession::new(Arc::new(provider));

        let slow = {
            let session = session.clone();
            tokio::spawn(async move { session.refresh().await })
        };
        entered.notified().await;

        let fresh = session.refresh().await.unwrap().applied().unwrap();
        assert_eq!(fresh.summary.overall_percent, 27);

        release.notify_one();
        let slow = slow.await.unwrap().unwrap();
        assert!(matches!(slow, Outcome::Superseded));

        match session.overview_state().await {
            OverviewState::Ready(current) => assert!(Arc::ptr_eq(&current, &fresh)),
            other => panic!("unexpected overview state {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_detail_fails_the_whole_refresh() {
        let mut provider = ScriptedProvider::new();
        provider.failing = Some("ev-2025-10-02-1400".to_string());
        let session = ViewerSession::new(Arc::new(provider));

        let err = session.refresh().await.unwrap_err();
        assert!(matches!(err, ConsoleError::Fetch { .. }));
        assert!(matches!(
            session.overview_state().await,
            OverviewState::Failed(message) if message.contains("backend unavailable")
        ));
        assert!(session.employee_progress("6465").await.is_none());
    }

    #[tokio::test]
    async fn detail_view_joins_directory() {
        let session = ViewerSession::new(Arc::new(FixtureProvider::seeded().unwrap()));
        let pane = session
            .open_detail("ev-2025-09-10-0900")
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(pane.view.progress, 50);
        let pending: Vec<&str> = pane.view.in_progress.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(pending, vec!["Sim Min-sik", "Park So-eun"]);
    }

    #[tokio::test]
    async fn missing_event_propagates_not_found() {
        let session = ViewerSession::new(Arc::new(FixtureProvider::seeded().unwrap()));
        let err = session.open_detail("ev-gone").await.unwrap_err();
        assert!(matches!(err, ConsoleError::NotFound { .. }));
        assert!(matches!(session.detail_state().await, DetailState::Idle));
    }

    #[tokio::test]
    async fn stale_detail_does_not_replace_newer_one() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let mut provider = ScriptedProvider::new();
        provider.gates.insert(
            "ev-2025-09-10-0900".to_string(),
            Gate {
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
            },
        );
        let session = ViewerSession::new(Arc::new(provider));

        let slow = {
            let session = session.clone();
            tokio::spawn(async move { session.open_detail("ev-2025-09-10-0900").await })
        };
        entered.notified().await;

        let fast = session.open_detail("ev-2025-10-15-1000").await.unwrap();
        assert!(matches!(fast, Outcome::Applied(_)));

        release.notify_one();
        let slow = slow.await.unwrap().unwrap();
        assert!(matches!(slow, Outcome::Superseded));

        match session.detail_state().await {
            DetailState::Ready(pane) => assert_eq!(pane.detail.event.id, "ev-2025-10-15-1000"),
            other => panic!("unexpected detail state {other:?}"),
        }
    }

    #[tokio::test]
    async fn closing_drops_in_flight_detail() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let mut provider = ScriptedProvider::new();
        provider.gates.insert(
            "ev-2025-09-18-all".to_string(),
            Gate {
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
            },
        );
        let session = ViewerSession::new(Arc::new(provider));

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.open_detail("ev-2025-09-18-all").await })
        };
        entered.notified().await;
        assert!(matches!(
            session.detail_state().await,
            DetailState::Loading { event_id } if event_id == "ev-2025-09-18-all"
        ));

        session.close_detail().await;
        release.notify_one();
        assert!(matches!(
            pending.await.unwrap().unwrap(),
            Outcome::Superseded
        ));
        assert!(matches!(session.detail_state().await, DetailState::Idle));
    }
}
