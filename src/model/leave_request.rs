use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Parent-submitted advance notice of an absence. Student fields are
/// denormalized on purpose: the request survives even if the student record
/// is later edited or removed.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: u64,
    pub student_index: String,
    pub student_name: String,
    pub parent_phone: String,
    pub leave_date: NaiveDate,
    pub reason: String,
    pub document_path: Option<String>,
    pub status: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_lowercase() {
        assert_eq!(LeaveStatus::Pending.to_string(), "pending");
        assert_eq!(
            "accepted".parse::<LeaveStatus>().unwrap(),
            LeaveStatus::Accepted
        );
    }
}
