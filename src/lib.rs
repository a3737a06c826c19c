//! Progress tracking for workplace safety-education trainings.
//!
//! The aggregation engine (`index`, `aggregate`, `view`, `query`) is pure and
//! synchronous. Data arrives through a [`provider::DataProvider`]: in-memory
//! fixtures, the REST backend, or Postgres.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod fixture;
pub mod http;
pub mod index;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod percent;
pub mod provider;
pub mod query;
pub mod report;
pub mod roster;
pub mod schedule;
pub mod session;
pub mod view;

pub use aggregate::build_global_summary;
pub use error::{ConsoleError, Result};
pub use index::{build_enrollment_index, EnrollmentIndex};
pub use query::query_employee_progress;
pub use view::{build_event_progress_view, EmployeeDirectory};
