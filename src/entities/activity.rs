//! Activity entity - A card on a direction's Kanban board.
//!
//! Subtasks, documents and comments live in their own tables keyed by `activity_id`.
//! `version` is bumped on every write to the parent row so clients can detect stale edits.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    /// Unique identifier for the activity
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short title
    pub name: String,
    /// E-mail of the person responsible
    pub assignee: String,
    /// `"High"`, `"Medium"` or `"Low"`
    pub priority: String,
    /// Board column: `"To Do"`, `"In Progress"`, `"Review"` or `"Done"`
    pub status: String,
    /// Planned start
    pub start_date: Option<Date>,
    /// Planned end
    pub end_date: Option<Date>,
    /// Goal of the activity
    pub objective: Option<String>,
    /// Expected impact
    pub impact: Option<String>,
    /// Scope description
    pub scope: Option<String>,
    /// Resources required
    pub resources: Option<String>,
    /// Other areas involved, stored as a JSON array of strings
    pub involved_areas: Json,
    /// Organizational unit owning the board
    pub direction: String,
    /// Optimistic concurrency token
    pub version: i32,
    /// When the activity was created
    pub created_at: DateTimeUtc,
    /// When the activity was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Activity and its children
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One activity has many subtasks
    #[sea_orm(has_many = "super::subtask::Entity")]
    Subtasks,
    /// One activity has many attached documents
    #[sea_orm(has_many = "super::activity_document::Entity")]
    Documents,
    /// One activity has many comments
    #[sea_orm(has_many = "super::activity_comment::Entity")]
    Comments,
}

impl Related<super::subtask::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subtasks.def()
    }
}

impl Related<super::activity_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl Related<super::activity_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
