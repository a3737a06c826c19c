use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{DepartmentSummary, EmployeeStanding};
use crate::percent::ratio_percent;
use crate::query::query_employee_progress;
use crate::schedule::display_when;
use crate::session::Overview;
use crate::view::build_event_progress_view;

const UNLISTED_DEPT: &str = "(unlisted)";

/// Enrolled employees ordered from least to most complete.
pub fn rank_standings(overview: &Overview) -> Vec<EmployeeStanding> {
    let mut standings: Vec<EmployeeStanding> = overview
        .index
        .iter()
        .filter(|(_, record)| record.enrolled > 0)
        .map(|(emp_no, _)| EmployeeStanding {
            employee: overview.directory.resolve(emp_no),
            progress: query_employee_progress(&overview.index, emp_no),
        })
        .collect();

    standings.sort_by(|a, b| {
        a.progress
            .pct
            .cmp(&b.progress.pct)
            .then(b.progress.enrolled.cmp(&a.progress.enrolled))
            .then(a.employee.emp_no.cmp(&b.employee.emp_no))
    });
    standings
}

pub fn summarize_by_department(overview: &Overview) -> Vec<DepartmentSummary> {
    let mut map: HashMap<String, (usize, u64, u64)> = HashMap::new();

    for (emp_no, record) in overview.index.iter() {
        let dept = overview
            .directory
            .get(emp_no)
            .map(|employee| employee.dept.as_str())
            .filter(|dept| !dept.is_empty())
            .unwrap_or(UNLISTED_DEPT);
        let entry = map.entry(dept.to_string()).or_insert((0, 0, 0));
        entry.0 += 1;
        entry.1 += u64::from(record.enrolled);
        entry.2 += u64::from(record.completed);
    }

    let mut summaries: Vec<DepartmentSummary> = map
        .into_iter()
        .map(|(dept, (employees, assigned, completed))| DepartmentSummary {
            dept,
            employees,
            assigned,
            completed,
            percent: ratio_percent(completed, assigned),
        })
        .collect();

    summaries.sort_by(|a, b| a.percent.cmp(&b.percent).then(a.dept.cmp(&b.dept)));
    summaries
}

pub fn build_report(overview: &Overview, generated_on: NaiveDate, limit: usize) -> String {
    let summary = &overview.summary;
    let mut output = String::new();

    let _ = writeln!(output, "# Safety Training Progress Report");
    let _ = writeln!(output, "Generated on {generated_on}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Organization Summary");
    let _ = writeln!(
        output,
        "- {}/{} assignments completed",
        summary.total_completed, summary.total_assigned
    );
    let _ = writeln!(output, "- Overall completion rate {}%", summary.overall_percent);
    let _ = writeln!(output, "- Average per-employee rate {}%", summary.avg_percent);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trainings");

    if overview.details.is_empty() {
        let _ = writeln!(output, "No trainings scheduled.");
    } else {
        for detail in overview.details.iter() {
            let view = build_event_progress_view(detail, &overview.directory);
            let (date, time) = display_when(&detail.event);
            let location = detail
                .event
                .location
                .as_deref()
                .map(|location| format!(" @ {location}"))
                .unwrap_or_default();
            let _ = writeln!(
                output,
                "- {} {} {}{}: {}/{} completed ({}%)",
                date,
                time,
                detail.event.title,
                location,
                view.completed.len(),
                view.enrolled.len(),
                view.progress
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Departments");

    let departments = summarize_by_department(overview);
    if departments.is_empty() {
        let _ = writeln!(output, "No enrollments recorded.");
    } else {
        for dept in departments.iter() {
            let _ = writeln!(
                output,
                "- {}: {}/{} completed ({}%) across {} employees",
                dept.dept, dept.completed, dept.assigned, dept.percent, dept.employees
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Employees Furthest Behind");

    let standings = rank_standings(overview);
    if standings.is_empty() {
        let _ = writeln!(output, "No employees enrolled.");
    } else {
        for standing in standings.iter().take(limit) {
            let name = if standing.employee.name.is_empty() {
                "-"
            } else {
                standing.employee.name.as_str()
            };
            let _ = writeln!(
                output,
                "- {} ({}) {}/{} completed ({}%)",
                name,
                standing.employee.emp_no,
                standing.progress.completed,
                standing.progress.enrolled,
                standing.progress.pct
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureProvider;
    use crate::session::ViewerSession;
    use std::sync::Arc;

    async fn seeded_overview() -> Arc<Overview> {
        let session = ViewerSession::new(Arc::new(FixtureProvider::seeded().unwrap()));
        session.refresh().await.unwrap().applied().unwrap()
    }

    #[tokio::test]
    async fn standings_start_with_least_complete() {
        let overview = seeded_overview().await;
        let standings = rank_standings(&overview);

        assert_eq!(standings.len(), 6);
        // 2024-001 is enrolled in three trainings and finished none
        assert_eq!(standings[0].employee.emp_no, "2024-001");
        assert_eq!(standings[0].progress.pct, 0);
        assert!(standings
            .windows(2)
            .all(|pair| pair[0].progress.pct <= pair[1].progress.pct));
    }

    #[tokio::test]
    async fn departments_add_up_to_the_totals() {
        let overview = seeded_overview().await;
        let departments = summarize_by_department(&overview);

        let assigned: u64 = departments.iter().map(|d| d.assigned).sum();
        let completed: u64 = departments.iter().map(|d| d.completed).sum();
        assert_eq!(assigned, overview.summary.total_assigned);
        assert_eq!(completed, overview.summary.total_completed);
        assert_eq!(departments.len(), 6);
    }

    #[tokio::test]
    async fn report_has_every_section() {
        let overview = seeded_overview().await;
        let report = build_report(&overview, NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(), 3);

        assert!(report.starts_with("# Safety Training Progress Report"));
        assert!(report.contains("- 4/15 assignments completed"));
        assert!(report.contains("- Overall completion rate 27%"));
        assert!(report.contains("Fire evacuation drill @ Exhibition Hall: 1/5 completed (20%)"));
        assert!(report.contains("## Departments"));
        let behind = report.split("## Employees Furthest Behind").nth(1).unwrap();
        assert_eq!(behind.lines().filter(|l| l.starts_with("- ")).count(), 3);
    }
}
