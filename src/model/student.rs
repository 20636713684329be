use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Amal Perera",
        "std_index": "S0001",
        "section": "10A",
        "parent_name": "Nimal Perera",
        "parent_phone": "+94712345678",
        "email": "nimal@gmail.com",
        "profile_pic": "uploads/3f2a-photo.jpg",
        "created_at": "2024-01-01T00:00:00Z"
    })
)]
pub struct Student {
    pub id: u64,
    pub name: String,
    /// Human-readable unique index code, `S` followed by 4 digits.
    pub std_index: String,
    pub section: String,
    pub parent_name: String,
    pub parent_phone: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_pic: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Next index code after the highest stored one: `S0001`, `S0002`, ...
/// Derived from the maximum, not the row count, so codes keep increasing
/// even after deletions.
pub fn next_index_code(last: Option<&str>) -> String {
    let next = last
        .and_then(|code| code.strip_prefix('S'))
        .and_then(|digits| digits.parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("S{:04}", next)
}

/// Path parameters accept either a numeric row id or an `S####` index.
pub fn parse_row_id(param: &str) -> Option<u64> {
    param.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_index_is_s0001() {
        assert_eq!(next_index_code(None), "S0001");
    }

    #[test]
    fn index_codes_increase_and_stay_padded() {
        assert_eq!(next_index_code(Some("S0001")), "S0002");
        assert_eq!(next_index_code(Some("S0099")), "S0100");
        assert_eq!(next_index_code(Some("S9998")), "S9999");
    }

    #[test]
    fn malformed_last_index_restarts_sequence() {
        assert_eq!(next_index_code(Some("garbage")), "S0001");
    }

    #[test]
    fn row_id_parsing_distinguishes_ids_from_indexes() {
        assert_eq!(parse_row_id("42"), Some(42));
        assert_eq!(parse_row_id("S0042"), None);
    }
}
