pub mod db_utils;
pub mod section_cache;
pub mod uploads;
