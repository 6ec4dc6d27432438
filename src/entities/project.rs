//! Project entity - Area projects listed in the monthly report.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    /// Unique identifier for the project
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning area
    pub area: String,
    /// Project name
    pub name: String,
    /// Free-form status label
    pub status: String,
    /// Remarks shown in the report
    pub notes: Option<String>,
    /// Last modification, used for ordering
    pub updated_at: DateTimeUtc,
}

/// `Project` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
