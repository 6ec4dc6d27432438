//! Subtask entity - A checklist item under an activity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subtask database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_subtasks")]
pub struct Model {
    /// Unique identifier for the subtask
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent activity
    pub activity_id: i64,
    /// What needs doing
    pub title: String,
    /// Whether it is checked off
    pub done: bool,
    /// When the subtask was added
    pub created_at: DateTimeUtc,
}

/// Each subtask belongs to one activity
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Parent activity
    #[sea_orm(
        belongs_to = "super::activity::Entity",
        from = "Column::ActivityId",
        to = "super::activity::Column::Id",
        on_delete = "Cascade"
    )]
    Activity,
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
