use once_cell::sync::Lazy;
use regex::Regex;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]").unwrap());
static INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^S\d{4}$").unwrap());
static TEACHER_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^TCH\d{3}$").unwrap());
static SECTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[A-Z]$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+\d{10,14}$").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub fn valid_name(v: &str) -> bool {
    NAME_RE.is_match(v)
}

pub fn valid_index(v: &str) -> bool {
    INDEX_RE.is_match(v)
}

pub fn valid_teacher_code(v: &str) -> bool {
    TEACHER_CODE_RE.is_match(v)
}

pub fn valid_section(v: &str) -> bool {
    SECTION_RE.is_match(v)
}

/// Expects a phone number already normalized to `+<country><subscriber>`.
pub fn valid_phone(v: &str) -> bool {
    PHONE_RE.is_match(v)
}

pub fn valid_email(v: &str) -> bool {
    EMAIL_RE.is_match(v)
}

/// Collects field errors and reports them as one joined message per request.
#[derive(Default)]
pub struct FieldErrors(Vec<String>);

impl FieldErrors {
    pub fn check(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.0.push(message.into());
        }
    }

    pub fn into_message(self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_must_start_with_a_capital() {
        assert!(valid_name("Amal Perera"));
        assert!(!valid_name("amal"));
        assert!(!valid_name(""));
    }

    #[test]
    fn index_codes_are_s_plus_four_digits() {
        assert!(valid_index("S0001"));
        assert!(valid_index("S9999"));
        assert!(!valid_index("S001"));
        assert!(!valid_index("S00010"));
        assert!(!valid_index("T0001"));
    }

    #[test]
    fn teacher_codes_are_tch_plus_three_digits() {
        assert!(valid_teacher_code("TCH001"));
        assert!(valid_teacher_code("TCH999"));
        assert!(!valid_teacher_code("TCH01"));
        assert!(!valid_teacher_code("TCH0001"));
        assert!(!valid_teacher_code("tch001"));
        assert!(!valid_teacher_code("S0001"));
    }

    #[test]
    fn sections_are_number_then_uppercase_letter() {
        assert!(valid_section("1A"));
        assert!(valid_section("10A"));
        assert!(!valid_section("A1"));
        assert!(!valid_section("10a"));
    }

    #[test]
    fn phones_are_plus_and_digits() {
        assert!(valid_phone("+94712345678"));
        assert!(!valid_phone("0712345678"));
        assert!(!valid_phone("+94 712345678"));
    }

    #[test]
    fn email_shape_is_enforced() {
        assert!(valid_email("parent@gmail.com"));
        assert!(!valid_email("parent@gmail"));
        assert!(!valid_email("parent gmail.com"));
    }

    #[test]
    fn field_errors_join_into_one_message() {
        let mut errors = FieldErrors::default();
        errors.check(false, "first");
        errors.check(true, "skipped");
        errors.check(false, "second");
        assert_eq!(errors.into_message().unwrap(), "first, second");
    }
}
