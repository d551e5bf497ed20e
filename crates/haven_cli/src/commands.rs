pub mod checkin;
pub mod config;
pub mod simulate;
