pub mod crash_log;
pub mod project;
pub mod timestamp;
pub mod user;
