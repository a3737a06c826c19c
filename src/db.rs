use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use crate::error::{ConsoleError, Result};
use crate::fixture::FixtureProvider;
use crate::models::{Employee, Event, EventDetail, EventStart, NewEvent, RosterEntry};
use crate::provider::{DataProvider, ScheduleStore};

/// Membership row kinds stored in `training_progress.memberships.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipKind {
    Enrolled,
    Completed,
}

impl MembershipKind {
    fn as_str(self) -> &'static str {
        match self {
            MembershipKind::Enrolled => "enrolled",
            MembershipKind::Completed => "completed",
        }
    }

    fn from_column(kind: &str) -> Self {
        if kind == MembershipKind::Completed.as_str() {
            MembershipKind::Completed
        } else {
            MembershipKind::Enrolled
        }
    }
}

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Loads the demo organization into the database.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let fixture = FixtureProvider::seeded()?;
    let store = PgProvider::new(pool.clone());

    let employees = fixture.employee_directory().await?;
    let entries = employees
        .into_iter()
        .map(|employee| RosterEntry {
            emp_no: employee.emp_no,
            name: employee.name,
            dept: employee.dept,
            ..RosterEntry::default()
        })
        .collect();
    store.submit_roster(entries).await?;

    for event in fixture.list_events().await? {
        let detail = fixture.event_detail(&event.id).await?;
        sqlx::query(
            r#"
            INSERT INTO training_progress.events
            (id, title, start_at, end_at, all_day, location, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&event.id)
        .bind(&event.title)
        .bind(event.start.map(|start| start.at()))
        .bind(event.end)
        .bind(event.all_day)
        .bind(&event.location)
        .bind(&event.description)
        .execute(pool)
        .await
        .with_context(|| format!("failed to seed event {}", event.id))?;

        sqlx::query("DELETE FROM training_progress.memberships WHERE event_id = $1")
            .bind(&event.id)
            .execute(pool)
            .await?;
        for emp_no in &detail.enrolled_emp_nos {
            store
                .record_membership(&event.id, emp_no, MembershipKind::Enrolled)
                .await?;
        }
        for emp_no in &detail.completed_emp_nos {
            store
                .record_membership(&event.id, emp_no, MembershipKind::Completed)
                .await?;
        }
    }

    Ok(())
}

pub struct PgProvider {
    pool: PgPool,
}

impl PgProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record_membership(
        &self,
        event_id: &str,
        emp_no: &str,
        kind: MembershipKind,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO training_progress.memberships (id, event_id, emp_no, kind)
            SELECT $1, e.id, $3, $4 FROM training_progress.events e WHERE e.id = $2
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(emp_no)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(ConsoleError::fetch)
        .and_then(|result| {
            if result.rows_affected() == 0 {
                Err(ConsoleError::not_found(event_id))
            } else {
                Ok(())
            }
        })
    }
}

/// All-day events are stored at midnight and read back as a plain date.
fn stored_start(start_at: Option<NaiveDateTime>, all_day: bool) -> Option<EventStart> {
    start_at.map(|at| {
        if all_day {
            EventStart::Date(at.date())
        } else {
            EventStart::DateTime(at)
        }
    })
}

/// Splits membership rows into enrolled and completed ids, keeping row order.
fn split_memberships<I>(rows: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = (String, MembershipKind)>,
{
    let mut enrolled = Vec::new();
    let mut completed = Vec::new();
    for (emp_no, kind) in rows {
        match kind {
            MembershipKind::Enrolled => enrolled.push(emp_no),
            MembershipKind::Completed => completed.push(emp_no),
        }
    }
    (enrolled, completed)
}

fn event_from_row(row: &PgRow) -> Event {
    let all_day: bool = row.get("all_day");
    Event {
        id: row.get("id"),
        title: row.get("title"),
        start: stored_start(row.get("start_at"), all_day),
        end: row.get("end_at"),
        all_day,
        location: row.get("location"),
        description: row.get("description"),
    }
}

#[async_trait]
impl DataProvider for PgProvider {
    fn source_tag(&self) -> &'static str {
        "postgres"
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT id, title, start_at, end_at, all_day, location, description \
             FROM training_progress.events ORDER BY start_at DESC NULLS LAST",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ConsoleError::fetch)?;

        Ok(rows.iter().map(event_from_row).collect())
    }

    async fn event_detail(&self, id: &str) -> Result<EventDetail> {
        let row = sqlx::query(
            "SELECT id, title, start_at, end_at, all_day, location, description \
             FROM training_progress.events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ConsoleError::fetch)?
        .ok_or_else(|| ConsoleError::not_found(id))?;

        let members = sqlx::query(
            "SELECT emp_no, kind FROM training_progress.memberships \
             WHERE event_id = $1 ORDER BY recorded_at, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(ConsoleError::fetch)?;

        let rows = members.iter().map(|member| {
            let emp_no: String = member.get("emp_no");
            let kind: String = member.get("kind");
            (emp_no, MembershipKind::from_column(&kind))
        });
        let (enrolled_emp_nos, completed_emp_nos) = split_memberships(rows);
        Ok(EventDetail {
            event: event_from_row(&row),
            enrolled_emp_nos,
            completed_emp_nos,
        })
    }

    async fn employee_directory(&self) -> Result<Vec<Employee>> {
        let rows = sqlx::query(
            "SELECT emp_no, name, dept FROM training_progress.employees ORDER BY emp_no",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ConsoleError::fetch)?;

        Ok(rows
            .into_iter()
            .map(|row| Employee {
                emp_no: row.get("emp_no"),
                name: row.get("name"),
                dept: row.get("dept"),
            })
            .collect())
    }
}

#[async_trait]
impl ScheduleStore for PgProvider {
    async fn create_event(&self, event: NewEvent) -> Result<Event> {
        event.validate()?;
        let capacity = event.capacity.and_then(|c| i32::try_from(c).ok());
        let instructor = event.instructor.clone();
        let created = event.into_event(format!("ev-{}", Uuid::new_v4()));

        sqlx::query(
            r#"
            INSERT INTO training_progress.events
            (id, title, start_at, end_at, all_day, location, description, instructor, capacity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&created.id)
        .bind(&created.title)
        .bind(created.start.map(|start| start.at()))
        .bind(created.end)
        .bind(created.all_day)
        .bind(&created.location)
        .bind(&created.description)
        .bind(instructor)
        .bind(capacity)
        .execute(&self.pool)
        .await
        .map_err(ConsoleError::fetch)?;

        info!(id = %created.id, "event stored");
        Ok(created)
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM training_progress.events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ConsoleError::fetch)?;
        if result.rows_affected() == 0 {
            return Err(ConsoleError::not_found(id));
        }
        Ok(())
    }

    async fn submit_roster(&self, entries: Vec<RosterEntry>) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(ConsoleError::fetch)?;
        let mut accepted = 0usize;

        for entry in &entries {
            let result = sqlx::query(
                r#"
                INSERT INTO training_progress.employees (emp_no, name, dept, phone, email)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (emp_no) DO UPDATE
                SET name = EXCLUDED.name, dept = EXCLUDED.dept,
                    phone = EXCLUDED.phone, email = EXCLUDED.email, updated_at = now()
                "#,
            )
            .bind(&entry.emp_no)
            .bind(&entry.name)
            .bind(&entry.dept)
            .bind(&entry.phone)
            .bind(&entry.email)
            .execute(&mut *tx)
            .await
            .map_err(ConsoleError::fetch)?;

            if result.rows_affected() > 0 {
                accepted += 1;
            }
        }

        tx.commit().await.map_err(ConsoleError::fetch)?;
        info!(accepted, "roster stored");
        Ok(accepted)
    }
}
