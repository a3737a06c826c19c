use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use training_progress::config::Settings;
use training_progress::db::{self, MembershipKind, PgProvider};
use training_progress::fixture::FixtureProvider;
use training_progress::http::HttpProvider;
use training_progress::models::{Employee, Event, NewEvent};
use training_progress::provider::{DataProvider, ScheduleStore};
use training_progress::session::{Overview, ViewerSession};
use training_progress::{logging, report, roster, schedule};

#[derive(Parser)]
#[command(name = "training-progress")]
#[command(about = "Safety-education schedule and completion progress console", long_about = None)]
struct Cli {
    /// Where trainings and employees are read from
    #[arg(long, value_enum, default_value_t = Source::Fixture, global = true)]
    source: Source,
    /// Debug-level diagnostics on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Fixture,
    Http,
    Postgres,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the demo organization into the database
    Seed,
    /// List scheduled trainings
    Events {
        /// Match against title or location
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Organization-wide completion summary with per-employee progress
    Summary,
    /// Completion progress of one training
    Event { id: String },
    /// Aggregate progress of one employee
    Employee { emp_no: String },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "training-report.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Validate a CSV roster and submit it in bulk
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Only validate, do not submit
        #[arg(long)]
        dry_run: bool,
    },
    /// Schedule a new training
    Schedule {
        #[arg(long)]
        title: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_clock)]
        start: Option<NaiveTime>,
        #[arg(long, value_parser = parse_clock)]
        end: Option<NaiveTime>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        instructor: Option<String>,
        #[arg(long)]
        capacity: Option<u32>,
    },
    /// Remove a scheduled training
    Remove { id: String },
    /// Record enrollments or completions (postgres only)
    Enroll {
        event: String,
        #[arg(required = true)]
        emp_nos: Vec<String>,
        /// Record completions instead of enrollments
        #[arg(long)]
        completed: bool,
    },
}

fn parse_clock(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|err| format!("expected HH:MM: {err}"))
}

enum Backend {
    Fixture(Arc<FixtureProvider>),
    Http(Arc<HttpProvider>),
    Postgres(Arc<PgProvider>),
}

impl Backend {
    async fn open(source: Source, settings: &Settings) -> anyhow::Result<Self> {
        let backend = match source {
            Source::Fixture => Backend::Fixture(Arc::new(FixtureProvider::seeded()?)),
            Source::Http => Backend::Http(Arc::new(HttpProvider::new(
                &settings.api_base,
                settings.http_timeout,
            )?)),
            Source::Postgres => {
                let pool = db::connect(settings.require_database_url()?).await?;
                Backend::Postgres(Arc::new(PgProvider::new(pool)))
            }
        };
        Ok(backend)
    }

    fn reader(&self) -> Arc<dyn DataProvider> {
        match self {
            Backend::Fixture(provider) => provider.clone(),
            Backend::Http(provider) => provider.clone(),
            Backend::Postgres(provider) => provider.clone(),
        }
    }

    fn writer(&self) -> Arc<dyn ScheduleStore> {
        match self {
            Backend::Fixture(provider) => provider.clone(),
            Backend::Http(provider) => provider.clone(),
            Backend::Postgres(provider) => provider.clone(),
        }
    }

    async fn events_in_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> anyhow::Result<Vec<Event>> {
        if let Backend::Http(provider) = self {
            return Ok(provider.list_events_between(from, to).await?);
        }
        let events = self.reader().list_events().await?;
        Ok(schedule::events_between(&events, from, to)
            .into_iter()
            .cloned()
            .collect())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::InitDb => {
            let pool = db::connect(settings.require_database_url()?).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = db::connect(settings.require_database_url()?).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Events { query, from, to } => {
            let backend = Backend::open(cli.source, &settings).await?;
            let events = backend.events_in_range(from, to).await?;
            let matched = schedule::filter_events(&events, query.as_deref().unwrap_or(""));

            if matched.is_empty() {
                println!("No trainings scheduled.");
                return Ok(());
            }
            for event in matched {
                let (date, time) = schedule::display_when(event);
                let location = event.location.as_deref().unwrap_or("-");
                println!("{date} {time:<11} {:<28} {location:<18} {}", event.title, event.id);
            }
        }
        Commands::Summary => {
            let backend = Backend::open(cli.source, &settings).await?;
            let overview = load_overview(&backend).await?;
            print_summary(&overview);

            println!();
            for employee in overview.enrolled_employees() {
                print_employee_row(&overview, &employee);
            }
        }
        Commands::Event { id } => {
            let backend = Backend::open(cli.source, &settings).await?;
            let session = ViewerSession::new(backend.reader());
            let overview = refresh(&session).await?;
            let Some(pane) = session
                .open_detail(&id)
                .await
                .with_context(|| format!("failed to load training {id}"))?
                .applied()
            else {
                bail!("training {id} was superseded while loading");
            };

            let event = &pane.detail.event;
            let (date, time) = schedule::display_when(event);
            println!("{} ({date} {time})", event.title);
            if let Some(location) = &event.location {
                println!("Location: {location}");
            }
            println!(
                "{} / {} completed ({}%)",
                pane.view.completed.len(),
                pane.view.enrolled.len(),
                pane.view.progress
            );

            println!();
            println!("In progress:");
            if pane.view.in_progress.is_empty() {
                println!("  none");
            }
            for employee in &pane.view.in_progress {
                print_employee_row(&overview, employee);
            }
            println!("Completed:");
            if pane.view.completed.is_empty() {
                println!("  none");
            }
            for employee in &pane.view.completed {
                print_employee_row(&overview, employee);
            }
        }
        Commands::Employee { emp_no } => {
            let backend = Backend::open(cli.source, &settings).await?;
            let overview = load_overview(&backend).await?;
            let employee = overview.directory.resolve(&emp_no);
            print_employee_row(&overview, &employee);
        }
        Commands::Report { out, limit } => {
            let backend = Backend::open(cli.source, &settings).await?;
            let overview = load_overview(&backend).await?;
            let report = report::build_report(&overview, Utc::now().date_naive(), limit);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Import { csv, dry_run } => {
            let import = roster::read_roster_file(&csv)?;
            for problem in &import.problems {
                println!("- {problem}");
            }
            println!(
                "{} rows read, {} problems.",
                import.entries.len(),
                import.problems.len()
            );
            if dry_run {
                return Ok(());
            }

            let entries = import.into_submission()?;
            let backend = Backend::open(cli.source, &settings).await?;
            let accepted = backend.writer().submit_roster(entries).await?;
            println!("Submitted {accepted} employees from {}.", csv.display());
        }
        Commands::Schedule {
            title,
            date,
            start,
            end,
            location,
            description,
            instructor,
            capacity,
        } => {
            let backend = Backend::open(cli.source, &settings).await?;
            let created = backend
                .writer()
                .create_event(NewEvent {
                    title,
                    date,
                    start_time: start,
                    end_time: end,
                    location,
                    description,
                    instructor,
                    capacity,
                })
                .await?;
            println!("Scheduled {} as {}.", created.title, created.id);
        }
        Commands::Remove { id } => {
            let backend = Backend::open(cli.source, &settings).await?;
            backend.writer().delete_event(&id).await?;
            println!("Removed {id}.");
        }
        Commands::Enroll {
            event,
            emp_nos,
            completed,
        } => {
            let Backend::Postgres(provider) = Backend::open(cli.source, &settings).await? else {
                bail!("enroll requires --source postgres");
            };
            let kind = if completed {
                MembershipKind::Completed
            } else {
                MembershipKind::Enrolled
            };
            for emp_no in &emp_nos {
                provider.record_membership(&event, emp_no, kind).await?;
            }
            println!("Recorded {} entries for {event}.", emp_nos.len());
        }
    }

    Ok(())
}

async fn refresh(session: &ViewerSession) -> anyhow::Result<Arc<Overview>> {
    session
        .refresh()
        .await
        .context("failed to aggregate training progress")?
        .applied()
        .context("overview was superseded while loading")
}

async fn load_overview(backend: &Backend) -> anyhow::Result<Arc<Overview>> {
    refresh(&ViewerSession::new(backend.reader())).await
}

fn print_summary(overview: &Overview) {
    let summary = &overview.summary;
    println!("Overall progress across all trainings:");
    println!(
        "- {}/{} completed",
        summary.total_completed, summary.total_assigned
    );
    println!("- Overall completion rate {}%", summary.overall_percent);
    println!("- Average per employee {}%", summary.avg_percent);
}

fn print_employee_row(overview: &Overview, employee: &Employee) {
    let progress = overview.employee_progress(&employee.emp_no);
    let name = if employee.name.is_empty() {
        "-"
    } else {
        employee.name.as_str()
    };
    println!(
        "  {:<10} {:<16} {:<20} {:>3}/{:<3} {:>3}%",
        employee.emp_no, name, employee.dept, progress.completed, progress.enrolled, progress.pct
    );
}
