//! Area projects and action plans shown alongside the monthly report.

use crate::{
    entities::{ActionPlanItem, Project, action_plan_item, project},
    errors::{Error, FieldError, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    QueryOrder, QuerySelect, Set,
    prelude::*,
    sea_query::{NullOrdering, Order},
};
use serde::Deserialize;
use tracing::warn;

/// Projects listed per area in a report.
pub const REPORT_PROJECT_LIMIT: u64 = 50;
/// Action items listed per area in a report.
pub const REPORT_ACTION_LIMIT: u64 = 100;

/// A new project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewProject {
    /// Owning area
    pub area: String,
    /// Project name
    pub name: String,
    /// Status label, "Planned" when blank
    pub status: String,
    /// Remarks
    pub notes: Option<String>,
}

/// A new action plan item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewActionItem {
    /// Owning area
    pub area: String,
    /// What will be done
    pub action: String,
    /// Who is responsible
    pub owner: String,
    /// Target completion date
    pub due_date: Option<NaiveDate>,
}

fn require(fields: &mut Vec<FieldError>, name: &str, value: &str) {
    if value.trim().is_empty() {
        fields.push(FieldError::new(name, "is required"));
    }
}

/// Projects, most recently updated first, optionally for one area.
pub async fn list_projects(
    db: &DatabaseConnection,
    area: Option<&str>,
    limit: Option<u64>,
) -> Result<Vec<project::Model>> {
    let mut query = Project::find();
    if let Some(area) = area.filter(|a| !a.is_empty()) {
        query = query.filter(project::Column::Area.eq(area));
    }
    let mut query = query
        .order_by_desc(project::Column::UpdatedAt)
        .order_by_desc(project::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    query.all(db).await.map_err(Into::into)
}

/// Stores a project.
pub async fn create_project(db: &DatabaseConnection, new: NewProject) -> Result<project::Model> {
    let mut fields = Vec::new();
    require(&mut fields, "area", &new.area);
    require(&mut fields, "name", &new.name);
    if !fields.is_empty() {
        return Err(Error::invalid_fields("Invalid project", fields));
    }

    let status = match new.status.trim() {
        "" => "Planned".to_string(),
        s => s.to_string(),
    };
    let row = project::ActiveModel {
        area: Set(new.area.trim().to_string()),
        name: Set(new.name.trim().to_string()),
        status: Set(status),
        notes: Set(new.notes.filter(|n| !n.trim().is_empty())),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    row.insert(db).await.map_err(Into::into)
}

/// Action items, earliest due date first (undated last), optionally for one area.
pub async fn list_action_plan(
    db: &DatabaseConnection,
    area: Option<&str>,
    limit: Option<u64>,
) -> Result<Vec<action_plan_item::Model>> {
    let mut query = ActionPlanItem::find();
    if let Some(area) = area.filter(|a| !a.is_empty()) {
        query = query.filter(action_plan_item::Column::Area.eq(area));
    }
    // SQLite sorts NULL first unless told otherwise
    let mut query = query
        .order_by_with_nulls(action_plan_item::Column::DueDate, Order::Asc, NullOrdering::Last)
        .order_by_asc(action_plan_item::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    query.all(db).await.map_err(Into::into)
}

/// Stores an action item.
pub async fn create_action_item(
    db: &DatabaseConnection,
    new: NewActionItem,
) -> Result<action_plan_item::Model> {
    let mut fields = Vec::new();
    require(&mut fields, "area", &new.area);
    require(&mut fields, "action", &new.action);
    require(&mut fields, "owner", &new.owner);
    if !fields.is_empty() {
        return Err(Error::invalid_fields("Invalid action item", fields));
    }

    let row = action_plan_item::ActiveModel {
        area: Set(new.area.trim().to_string()),
        action: Set(new.action.trim().to_string()),
        owner: Set(new.owner.trim().to_string()),
        due_date: Set(new.due_date),
        ..Default::default()
    };
    row.insert(db).await.map_err(Into::into)
}

/// Projects and action items for a report. Read failures are logged and give empty lists.
pub async fn companion_lists(
    db: &DatabaseConnection,
    area: &str,
) -> (Vec<project::Model>, Vec<action_plan_item::Model>) {
    let projects = list_projects(db, Some(area), Some(REPORT_PROJECT_LIMIT))
        .await
        .unwrap_or_else(|e| {
            warn!(area, error = %e, "Skipping projects in report");
            Vec::new()
        });
    let action_plan = list_action_plan(db, Some(area), Some(REPORT_ACTION_LIMIT))
        .await
        .unwrap_or_else(|e| {
            warn!(area, error = %e, "Skipping action plan in report");
            Vec::new()
        });
    (projects, action_plan)
}
