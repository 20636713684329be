pub mod channels;

use crate::config::Config;
use crate::model::notification::NotificationType;
use crate::model::student::Student;
use channels::{send_email, send_sms, send_whatsapp, ChannelOutcome};
use chrono::NaiveDate;
use sqlx::MySqlPool;
use tracing::{error, info, warn};

/// Normalize a parent phone number into `+<country><subscriber>` form.
/// Numbers already carrying a `+` pass through; a leading local `0` is
/// replaced by the default country code; bare digits get it prepended.
pub fn normalize_phone(raw: &str, default_cc: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if cleaned.is_empty() || cleaned == "+" {
        return None;
    }

    if let Some(rest) = cleaned.strip_prefix('+') {
        return Some(format!("+{rest}"));
    }
    if let Some(rest) = cleaned.strip_prefix('0') {
        return Some(format!("{default_cc}{rest}"));
    }
    Some(format!("{default_cc}{cleaned}"))
}

/// The alert text shared by every channel.
pub fn alert_message(student: &Student, date: NaiveDate, status: &str) -> String {
    format!(
        "CMB International College - Smart Alert\n\n\
         Date: {date}\n\
         Student: {name}\n\
         Index: {index}\n\
         Class: {section}\n\
         Status: {status}\n\n\
         This is an automated notification from the school attendance system.",
        date = date,
        name = student.name,
        index = student.std_index,
        section = student.section,
        status = status,
    )
}

/// One channel getting through is enough; skipped channels never count.
pub fn any_sent(outcomes: &[ChannelOutcome]) -> bool {
    outcomes.iter().any(|o| *o == ChannelOutcome::Sent)
}

/// Fan an attendance alert out over WhatsApp, SMS and email concurrently.
/// Channel failures are logged and swallowed; if at least one channel got
/// through, a notification row is written for the parent portal and the
/// dispatch counts as a success.
pub async fn dispatch_alert(
    pool: &MySqlPool,
    config: &Config,
    student: &Student,
    date: NaiveDate,
    status: &str,
) -> bool {
    let phone = normalize_phone(&student.parent_phone, &config.default_country_code);
    if phone.is_none() {
        warn!(student = %student.name, "No valid parent phone, phone channels skipped");
    }

    let message = alert_message(student, date, status);
    let subject = format!("Attendance Alert: {} - {}", student.name, status);

    let (whatsapp, sms, email) = futures::join!(
        send_whatsapp(config, phone.as_deref(), &message),
        send_sms(config, phone.as_deref(), &message),
        send_email(config, Some(&student.email), &subject, &message),
    );

    let outcomes = [whatsapp, sms, email];
    if !any_sent(&outcomes) {
        error!(student = %student.name, ?outcomes, "All notification channels failed or were skipped");
        return false;
    }

    info!(student = %student.name, ?outcomes, "Notification dispatched");

    let kind = NotificationType::for_status(status);
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (student_id, title, message, `type`, date)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(student.id)
    .bind(format!("{status} Alert"))
    .bind(format!(
        "Your child {} was marked as {} on {}. Please contact the school if you have any questions.",
        student.name, status, date
    ))
    .bind(kind.to_string())
    .bind(date)
    .execute(pool)
    .await;

    if let Err(e) = result {
        error!(error = %e, student_id = student.id, "Failed to record notification");
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn student() -> Student {
        Student {
            id: 1,
            name: "Amal Perera".to_string(),
            std_index: "S0001".to_string(),
            section: "10A".to_string(),
            parent_name: "Nimal Perera".to_string(),
            parent_phone: "071 234 5678".to_string(),
            email: "nimal@gmail.com".to_string(),
            password_hash: String::new(),
            profile_pic: None,
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn international_numbers_pass_through() {
        assert_eq!(
            normalize_phone("+94712345678", "+94").as_deref(),
            Some("+94712345678")
        );
    }

    #[test]
    fn local_zero_prefix_becomes_country_code() {
        assert_eq!(
            normalize_phone("0712345678", "+94").as_deref(),
            Some("+94712345678")
        );
    }

    #[test]
    fn separators_are_stripped_before_prefixing() {
        assert_eq!(
            normalize_phone("071-234 5678", "+94").as_deref(),
            Some("+94712345678")
        );
        assert_eq!(
            normalize_phone("712345678", "+94").as_deref(),
            Some("+94712345678")
        );
    }

    #[test]
    fn unusable_input_yields_none() {
        assert_eq!(normalize_phone("", "+94"), None);
        assert_eq!(normalize_phone("n/a", "+94"), None);
        assert_eq!(normalize_phone("+", "+94"), None);
    }

    #[test]
    fn alert_message_carries_all_identifying_fields() {
        let msg = alert_message(
            &student(),
            chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            "Absent",
        );
        assert!(msg.contains("2024-05-01"));
        assert!(msg.contains("Amal Perera"));
        assert!(msg.contains("S0001"));
        assert!(msg.contains("10A"));
        assert!(msg.contains("Status: Absent"));
    }

    #[test]
    fn one_sent_channel_is_a_success() {
        use ChannelOutcome::*;
        assert!(any_sent(&[Failed, Skipped, Sent]));
        assert!(any_sent(&[Sent, Sent, Sent]));
        assert!(!any_sent(&[Failed, Failed, Failed]));
        assert!(!any_sent(&[Skipped, Skipped, Skipped]));
        assert!(!any_sent(&[]));
    }
}
