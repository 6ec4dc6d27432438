//! Activity document entity - Reference to an uploaded file.
//!
//! Only the bucket path and display name are stored; bytes live in the document bucket.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity document database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_documents")]
pub struct Model {
    /// Unique identifier for the document
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent activity
    pub activity_id: i64,
    /// Display name
    pub name: String,
    /// Path of the stored file inside the bucket
    pub file_ref: String,
    /// When the document was attached
    pub created_at: DateTimeUtc,
}

/// Each document belongs to one activity
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
