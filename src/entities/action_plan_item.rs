//! Action plan entity - Planned follow-up actions for an area.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Action plan item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "action_plan_items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning area
    pub area: String,
    /// What will be done
    pub action: String,
    /// Who is responsible
    pub owner: String,
    /// Target completion date
    pub due_date: Option<Date>,
}

/// `ActionPlanItem` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
