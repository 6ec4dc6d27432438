//! Shared test utilities for the KPI service.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    core::{
        activity::{self, NewActivity},
        kpi::NewKpiEntry,
    },
    entities::{activity as activity_entity, kpi_entry},
    errors::Result,
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Once;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output through the test harness so it only shows for failing tests.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    });
}

/// Midnight UTC on the given day.
///
/// # Panics
/// Panics on an impossible date; only meant for literals in tests.
#[allow(clippy::unwrap_used)]
pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// Builds an unsaved KPI entry row. The period is derived from `recorded_at`.
///
/// # Defaults
/// * `area`: "Inventory"
/// * `unit`: "%"
/// * `target`: None
/// * `input_data`: `{}`
pub fn entry_model(
    id: i64,
    indicator: &str,
    value: f64,
    meets_target: Option<bool>,
    recorded_at: DateTime<Utc>,
) -> kpi_entry::Model {
    kpi_entry::Model {
        id,
        area: "Inventory".to_string(),
        indicator: indicator.to_string(),
        value,
        unit: "%".to_string(),
        meets_target,
        target: None,
        input_data: serde_json::json!({}),
        direction: None,
        submitted_by: None,
        notes: None,
        period: recorded_at.format("%Y-%m").to_string(),
        recorded_at,
        created_at: recorded_at,
    }
}

/// Builds a KPI submission for `recorded_at` from a JSON object of inputs.
pub fn new_entry(
    area: &str,
    indicator: &str,
    input: serde_json::Value,
    recorded_at: DateTime<Utc>,
) -> NewKpiEntry {
    NewKpiEntry {
        area: area.to_string(),
        indicator: indicator.to_string(),
        input_data: input.as_object().cloned().unwrap_or_default(),
        recorded_at: Some(recorded_at),
        submitted_by: Some("tester@example.com".to_string()),
        ..Default::default()
    }
}

/// A valid activity submission with sensible defaults.
///
/// # Defaults
/// * `assignee`: "owner@example.com"
/// * `priority` / `status`: unset (Medium / To Do)
/// * `involved_areas`: empty
pub fn new_activity(name: &str, direction: &str) -> NewActivity {
    NewActivity {
        name: name.to_string(),
        assignee: "owner@example.com".to_string(),
        direction: direction.to_string(),
        ..Default::default()
    }
}

/// Creates a test activity on the given board.
pub async fn create_test_activity(
    db: &DatabaseConnection,
    name: &str,
    direction: &str,
) -> Result<activity_entity::Model> {
    activity::create_activity(db, new_activity(name, direction)).await
}
