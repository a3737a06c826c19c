use crate::index::EnrollmentIndex;
use crate::models::{EnrollmentTotals, GlobalSummary};
use crate::percent::{ratio_percent, round_percent};

/// Organization-wide completion figures.
///
/// `overall_percent` weighs every membership entry equally, while
/// `avg_percent` weighs every enrolled employee equally. Employees that were
/// never enrolled (completion-only ids) do not take part in the average.
pub fn build_global_summary(index: &EnrollmentIndex, totals: &EnrollmentTotals) -> GlobalSummary {
    let overall_percent = ratio_percent(totals.total_completed, totals.total_assigned);

    let mut ratio_sum = 0.0_f64;
    let mut qualifying = 0usize;
    for (_, record) in index.iter() {
        if record.enrolled == 0 {
            continue;
        }
        ratio_sum += f64::from(record.completed) / f64::from(record.enrolled);
        qualifying += 1;
    }

    let avg_percent = if qualifying == 0 {
        0
    } else {
        round_percent(ratio_sum / qualifying as f64)
    };

    GlobalSummary {
        total_assigned: totals.total_assigned,
        total_completed: totals.total_completed,
        overall_percent,
        avg_percent,
    }
}
