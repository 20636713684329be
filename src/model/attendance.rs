use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub student_id: u64,
    pub date: NaiveDate,
    pub status: String,
    pub justification: String,
    pub notified_parent: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Attendance row joined with the student it belongs to; this is what every
/// attendance and report endpoint returns.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "student_id": 1,
        "date": "2024-05-01",
        "status": "Present",
        "justification": "",
        "notified_parent": false,
        "student_name": "Amal Perera",
        "std_index": "S0001",
        "section": "10A"
    })
)]
pub struct AttendanceRecord {
    pub id: u64,
    pub student_id: u64,
    pub date: NaiveDate,
    pub status: String,
    pub justification: String,
    pub notified_parent: bool,
    pub student_name: String,
    pub std_index: String,
    pub section: String,
}

/// Collapse a date or datetime input onto its calendar day. Attendance rows
/// store a plain DATE, so two marks on the same day always collide on the
/// (student_id, date) unique key.
pub fn normalize_to_day(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.date_naive());
    }
    chrono::NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn plain_dates_pass_through() {
        assert_eq!(
            normalize_to_day("2024-05-01"),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
    }

    #[test]
    fn datetimes_collapse_to_their_day() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert_eq!(normalize_to_day("2024-05-01T08:30:00+00:00"), day);
        assert_eq!(normalize_to_day("2024-05-01T23:59:59"), day);
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_to_day("2024-05-01T08:30:00+00:00").unwrap();
        let twice = normalize_to_day(&once.to_string()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert_eq!(normalize_to_day("yesterday"), None);
        assert_eq!(normalize_to_day(""), None);
    }

    #[test]
    fn status_parses_from_wire_form() {
        assert_eq!(
            AttendanceStatus::from_str("Present").unwrap(),
            AttendanceStatus::Present
        );
        assert!(AttendanceStatus::from_str("present").is_err());
        assert_eq!(AttendanceStatus::Excused.to_string(), "Excused");
    }
}
