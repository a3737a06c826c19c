use std::collections::HashMap;

use crate::models::{EnrollmentRecord, EnrollmentTotals, EventDetail};

/// Per-employee enrollment and completion counts across every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentIndex {
    records: HashMap<String, EnrollmentRecord>,
}

impl EnrollmentIndex {
    pub fn get(&self, emp_no: &str) -> Option<&EnrollmentRecord> {
        self.records.get(emp_no)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnrollmentRecord)> {
        self.records.iter().map(|(emp_no, record)| (emp_no.as_str(), record))
    }
}

/// Folds every detail's membership lists into one index.
///
/// Each occurrence counts, duplicates included. A completed id is counted
/// even when the same event does not list it as enrolled.
pub fn build_enrollment_index<'a, I>(details: I) -> (EnrollmentIndex, EnrollmentTotals)
where
    I: IntoIterator<Item = &'a EventDetail>,
{
    let mut records: HashMap<String, EnrollmentRecord> = HashMap::new();
    let mut totals = EnrollmentTotals::default();

    for detail in details {
        for emp_no in &detail.enrolled_emp_nos {
            records.entry(emp_no.clone()).or_default().enrolled += 1;
            totals.total_assigned += 1;
        }
        for emp_no in &detail.completed_emp_nos {
            records.entry(emp_no.clone()).or_default().completed += 1;
            totals.total_completed += 1;
        }
    }

    (EnrollmentIndex { records }, totals)
}
