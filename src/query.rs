use crate::index::EnrollmentIndex;
use crate::models::EmployeeProgress;
use crate::percent::ratio_percent;

/// Aggregate progress of one employee; unknown ids report zero assignments.
pub fn query_employee_progress(index: &EnrollmentIndex, emp_no: &str) -> EmployeeProgress {
    let record = index.get(emp_no).copied().unwrap_or_default();
    EmployeeProgress {
        enrolled: record.enrolled,
        completed: record.completed,
        pct: ratio_percent(u64::from(record.completed), u64::from(record.enrolled)),
    }
}
