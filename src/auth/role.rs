use actix_web::{dev::Payload, error::ErrorForbidden, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

/// Caller role, taken at face value from the `x-user-role` header. There are
/// no sessions or tokens; the SPA stores the role client-side after login and
/// replays it on every call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin,
    Teacher,
    Parent,
}

impl Role {
    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            "Admin" => Some(Role::Admin),
            "Teacher" => Some(Role::Teacher),
            "Parent" => Some(Role::Parent),
            _ => None,
        }
    }
}

pub struct RoleGuard {
    pub role: Option<Role>,
}

impl FromRequest for RoleGuard {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let role = req
            .headers()
            .get("x-user-role")
            .and_then(|h| h.to_str().ok())
            .and_then(Role::from_header);

        ready(Ok(RoleGuard { role }))
    }
}

impl RoleGuard {
    /// Teachers cannot manage student or teacher accounts; everyone else,
    /// unidentified callers included, passes.
    pub fn forbid_teacher(&self, action: &str) -> actix_web::Result<()> {
        if self.role == Some(Role::Teacher) {
            return Err(ErrorForbidden(format!(
                "Forbidden: Teachers cannot {action}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles_parse_unknown_are_ignored() {
        assert_eq!(Role::from_header("Admin"), Some(Role::Admin));
        assert_eq!(Role::from_header("Parent"), Some(Role::Parent));
        assert_eq!(Role::from_header("root"), None);
    }

    #[test]
    fn only_teachers_are_blocked() {
        let teacher = RoleGuard {
            role: Some(Role::Teacher),
        };
        assert!(teacher.forbid_teacher("add students").is_err());

        let admin = RoleGuard {
            role: Some(Role::Admin),
        };
        assert!(admin.forbid_teacher("add students").is_ok());

        let anonymous = RoleGuard { role: None };
        assert!(anonymous.forbid_teacher("add students").is_ok());
    }
}
