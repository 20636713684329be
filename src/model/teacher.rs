use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Teacher {
    pub id: u64,
    pub name: String,
    /// Unique staff code, `TCH` followed by 3 digits.
    pub teacher_code: String,
    /// Subject taught, or the section the teacher is responsible for.
    pub subject: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_pic: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Next staff code after the highest stored one: `TCH001`, `TCH002`, ...
pub fn next_teacher_code(last: Option<&str>) -> String {
    let next = last
        .and_then(|code| code.strip_prefix("TCH"))
        .and_then(|digits| digits.parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("TCH{:03}", next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teacher_codes_increase_and_stay_padded() {
        assert_eq!(next_teacher_code(None), "TCH001");
        assert_eq!(next_teacher_code(Some("TCH001")), "TCH002");
        assert_eq!(next_teacher_code(Some("TCH099")), "TCH100");
    }
}
