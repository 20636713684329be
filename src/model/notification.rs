use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Absence,
    Late,
    General,
}

impl NotificationType {
    /// Attendance alerts map Absent to `absence`; everything else that
    /// triggers a parent alert is a late mark.
    pub fn for_status(status: &str) -> Self {
        if status == "Absent" {
            NotificationType::Absence
        } else {
            NotificationType::Late
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Notification {
    pub id: u64,
    pub student_id: u64,
    pub title: String,
    pub message: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub date: NaiveDate,
    pub is_read: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_maps_to_absence_everything_else_to_late() {
        assert_eq!(
            NotificationType::for_status("Absent"),
            NotificationType::Absence
        );
        assert_eq!(NotificationType::for_status("Late"), NotificationType::Late);
        assert_eq!(
            NotificationType::for_status("Present"),
            NotificationType::Late
        );
    }
}
