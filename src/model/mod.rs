pub mod attendance;
pub mod leave_request;
pub mod notification;
pub mod student;
pub mod teacher;
pub mod validate;
