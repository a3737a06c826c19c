//! Employee roster import: header aliasing, required-column checks and
//! per-row validation ahead of a bulk submission.

use std::fmt;
use std::io::Read;
use std::path::Path;

use regex::Regex;

use crate::error::{ConsoleError, Result};
use crate::models::RosterEntry;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const PHONE_PATTERN: &str = r"^[0-9\-+() ]{8,}$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    EmpNo,
    Name,
    Dept,
    Phone,
    Email,
}

impl Column {
    const REQUIRED: [Column; 2] = [Column::EmpNo, Column::Name];

    fn from_header(header: &str) -> Option<Column> {
        let header = header.trim();
        let column = match header.to_ascii_lowercase().as_str() {
            "empno" | "emp_no" | "employee_no" | "사번" | "사원번호" | "번호" => Column::EmpNo,
            "name" | "성명" | "이름" => Column::Name,
            "dept" | "department" | "부서" | "부서명" => Column::Dept,
            "phone" | "연락처" | "전화번호" | "휴대폰" => Column::Phone,
            "email" | "mail" | "이메일" | "메일" => Column::Email,
            _ => return None,
        };
        Some(column)
    }

    fn label(self) -> &'static str {
        match self {
            Column::EmpNo => "empNo",
            Column::Name => "name",
            Column::Dept => "dept",
            Column::Phone => "phone",
            Column::Email => "email",
        }
    }
}

/// A problem with one spreadsheet row; rows are numbered with the header as row 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowProblem {
    pub row: u64,
    pub message: String,
}

impl fmt::Display for RowProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RosterImport {
    pub entries: Vec<RosterEntry>,
    pub problems: Vec<RowProblem>,
}

impl RosterImport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    /// Entries ready for submission; refuses while any row has a problem.
    pub fn into_submission(self) -> Result<Vec<RosterEntry>> {
        if let Some(first) = self.problems.first() {
            return Err(ConsoleError::validation(format!(
                "{} row problem(s), first: {first}",
                self.problems.len()
            )));
        }
        if self.entries.is_empty() {
            return Err(ConsoleError::validation("roster has no rows"));
        }
        Ok(self.entries)
    }
}

struct RowRules {
    email: Regex,
    phone: Regex,
}

impl RowRules {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|err| ConsoleError::validation(err.to_string()))
        };
        Ok(Self {
            email: compile(EMAIL_PATTERN)?,
            phone: compile(PHONE_PATTERN)?,
        })
    }

    fn check(&self, row: u64, entry: &RosterEntry, problems: &mut Vec<RowProblem>) {
        let mut report = |message: &str| {
            problems.push(RowProblem {
                row,
                message: message.to_string(),
            })
        };
        if entry.emp_no.is_empty() || entry.name.is_empty() {
            report("employee number and name are required");
        }
        if !entry.email.is_empty() && !self.email.is_match(&entry.email) {
            report("email is malformed");
        }
        if !entry.phone.is_empty() && !self.phone.is_match(&entry.phone) {
            report("phone number looks wrong");
        }
    }
}

pub fn read_roster_file(path: &Path) -> Result<RosterImport> {
    let file = std::fs::File::open(path).map_err(|err| {
        ConsoleError::validation(format!("cannot open {}: {err}", path.display()))
    })?;
    read_roster(file)
}

pub fn read_roster<R: Read>(input: R) -> Result<RosterImport> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|err| ConsoleError::validation(format!("unreadable header row: {err}")))?
        .clone();
    let columns: Vec<Option<Column>> = headers.iter().map(Column::from_header).collect();

    let missing: Vec<&str> = Column::REQUIRED
        .iter()
        .filter(|required| !columns.contains(&Some(**required)))
        .map(|column| column.label())
        .collect();
    if !missing.is_empty() {
        return Err(ConsoleError::validation(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    let rules = RowRules::new()?;
    let mut import = RosterImport::default();

    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|err| ConsoleError::validation(err.to_string()))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let row = record
            .position()
            .map(|position| position.line())
            .unwrap_or(index as u64 + 2);

        let mut entry = RosterEntry::default();
        for (column, value) in columns.iter().zip(record.iter()) {
            let Some(column) = column else { continue };
            let slot = match column {
                Column::EmpNo => &mut entry.emp_no,
                Column::Name => &mut entry.name,
                Column::Dept => &mut entry.dept,
                Column::Phone => &mut entry.phone,
                Column::Email => &mut entry.email,
            };
            *slot = value.trim().to_string();
        }

        rules.check(row, &entry, &mut import.problems);
        import.entries.push(entry);
    }

    Ok(import)
}
