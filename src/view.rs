use std::collections::HashMap;

use crate::models::{Employee, EventDetail, EventProgressView};
use crate::percent::ratio_percent;

/// Employee lookup by number, built once per directory snapshot.
#[derive(Debug, Clone, Default)]
pub struct EmployeeDirectory {
    by_emp_no: HashMap<String, Employee>,
}

impl EmployeeDirectory {
    /// Later entries win when an employee number repeats.
    pub fn new(employees: impl IntoIterator<Item = Employee>) -> Self {
        let by_emp_no = employees
            .into_iter()
            .map(|employee| (employee.emp_no.clone(), employee))
            .collect();
        Self { by_emp_no }
    }

    pub fn get(&self, emp_no: &str) -> Option<&Employee> {
        self.by_emp_no.get(emp_no)
    }

    /// Resolves an id, falling back to a placeholder that keeps the raw id.
    pub fn resolve(&self, emp_no: &str) -> Employee {
        self.get(emp_no)
            .cloned()
            .unwrap_or_else(|| Employee::placeholder(emp_no))
    }

    pub fn len(&self) -> usize {
        self.by_emp_no.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_emp_no.is_empty()
    }
}

/// Splits one event's roster into completed and in-progress employees.
pub fn build_event_progress_view(
    detail: &EventDetail,
    directory: &EmployeeDirectory,
) -> EventProgressView {
    let enrolled: Vec<Employee> = detail
        .enrolled_emp_nos
        .iter()
        .map(|emp_no| directory.resolve(emp_no))
        .collect();
    let completed: Vec<Employee> = detail
        .completed_emp_nos
        .iter()
        .map(|emp_no| directory.resolve(emp_no))
        .collect();
    let in_progress = enrolled
        .iter()
        .filter(|employee| !detail.completed_emp_nos.contains(&employee.emp_no))
        .cloned()
        .collect();
    let progress = ratio_percent(completed.len() as u64, enrolled.len() as u64);

    EventProgressView {
        enrolled,
        completed,
        in_progress,
        progress,
    }
}
