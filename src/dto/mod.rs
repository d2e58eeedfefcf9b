use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Blind-test payloads.
pub mod blindtest;
/// Health check payloads.
pub mod health;
/// Petit-bac payloads.
pub mod petitbac;
/// Phases exposed to clients.
pub mod phase;
/// Room and membership payloads.
pub mod room;
/// Custom field validators.
pub mod validation;
/// Messages pushed to room viewers.
pub mod ws;

pub(crate) fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
