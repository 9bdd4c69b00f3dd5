//! Domain records and read models

pub mod booking;
pub mod item;
pub mod user;
