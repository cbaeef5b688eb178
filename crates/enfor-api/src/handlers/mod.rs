//! API handlers

pub mod appointments;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod health;
pub mod properties;
pub mod uploads;
