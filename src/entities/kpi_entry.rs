//! KPI entry entity - One recorded indicator value for one reporting month.
//!
//! Each entry keeps the computed `value`, the raw `input_data` the formula read, and a
//! snapshot of the target in force when it was recorded. `(area, indicator, period)` is
//! unique; only `notes` changes after insert.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// KPI entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kpi_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Organizational area (e.g. "Logistics")
    pub area: String,
    /// Indicator name within the area
    pub indicator: String,
    /// Computed formula result
    pub value: f64,
    /// Display unit copied from the definition
    pub unit: String,
    /// Whether the value met its target; None when not auto-evaluable
    pub meets_target: Option<bool>,
    /// Target value at the time of recording
    pub target: Option<f64>,
    /// Raw named inputs used by the formula
    pub input_data: Json,
    /// Organizational unit that submitted the entry
    pub direction: Option<String>,
    /// Who submitted the entry
    pub submitted_by: Option<String>,
    /// Free-text notes, editable after creation
    pub notes: Option<String>,
    /// Reporting month as `YYYY-MM`, derived from `recorded_at`
    pub period: String,
    /// Timestamp standing for the reporting period
    pub recorded_at: DateTimeUtc,
    /// When the row was inserted
    pub created_at: DateTimeUtc,
}

/// `KpiEntry` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
