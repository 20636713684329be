pub mod password;
pub mod role;
