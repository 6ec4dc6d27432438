//! Activity board business logic - Kanban cards, their checklists, files and comments.
//!
//! Cards move freely between columns. Every write to the card row bumps its `version`, and the
//! update statement only matches the version it read, so two concurrent edits cannot silently
//! overwrite each other. Subtasks, documents and comments are separate rows and never touch the
//! card's version.

use crate::{
    core::storage::DocumentBucket,
    entities::{
        Activity, ActivityComment, ActivityDocument, Subtask, activity, activity_comment,
        activity_document, subtask,
    },
    errors::{Error, FieldError, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::{info, instrument, warn};

const NAME_MIN_CHARS: usize = 3;
const NAME_MAX_CHARS: usize = 255;

/// Urgency of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    /// Needs attention first
    High,
    /// Normal urgency
    #[default]
    Medium,
    /// Can wait
    Low,
}

impl Priority {
    /// Stored label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(Error::invalid_fields(
                format!("Unknown priority '{s}'"),
                vec![FieldError::new("priority", "must be High, Medium or Low")],
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Board column of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActivityStatus {
    /// Not started
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    /// Being worked on
    #[serde(rename = "In Progress")]
    InProgress,
    /// Waiting for review
    Review,
    /// Finished
    Done,
}

impl ActivityStatus {
    /// Every column in board order.
    pub const ALL: [Self; 4] = [Self::ToDo, Self::InProgress, Self::Review, Self::Done];

    /// Stored label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Review => "Review",
            Self::Done => "Done",
        }
    }
}

impl FromStr for ActivityStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::invalid_fields(
                    format!("Unknown status '{s}'"),
                    vec![FieldError::new(
                        "status",
                        "must be To Do, In Progress, Review or Done",
                    )],
                )
            })
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A new card.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewActivity {
    /// Short title, 3 to 255 characters
    pub name: String,
    /// E-mail of the person responsible
    pub assignee: String,
    /// Priority label, Medium when absent
    pub priority: Option<String>,
    /// Status label, To Do when absent
    pub status: Option<String>,
    /// Planned start
    pub start_date: Option<NaiveDate>,
    /// Planned end, not before `start_date`
    pub end_date: Option<NaiveDate>,
    /// Goal
    pub objective: Option<String>,
    /// Expected impact
    pub impact: Option<String>,
    /// Scope
    pub scope: Option<String>,
    /// Resources required
    pub resources: Option<String>,
    /// Other areas involved
    pub involved_areas: Vec<String>,
    /// Board the card belongs to
    pub direction: String,
}

/// A partial edit of a card. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivityUpdate {
    /// New title
    pub name: Option<String>,
    /// New assignee
    pub assignee: Option<String>,
    /// New priority label
    pub priority: Option<String>,
    /// New status label
    pub status: Option<String>,
    /// New start date
    pub start_date: Option<NaiveDate>,
    /// New end date
    pub end_date: Option<NaiveDate>,
    /// Drops the start date; wins over `start_date`
    pub clear_start_date: bool,
    /// Drops the end date; wins over `end_date`
    pub clear_end_date: bool,
    /// New goal
    pub objective: Option<String>,
    /// New impact
    pub impact: Option<String>,
    /// New scope
    pub scope: Option<String>,
    /// New resources
    pub resources: Option<String>,
    /// Replacement set of involved areas
    pub involved_areas: Option<Vec<String>>,
    /// Version the client last saw; a mismatch is a conflict
    pub version: Option<i32>,
}

/// Edit of one checklist item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubtaskUpdate {
    /// New title
    pub title: Option<String>,
    /// New completion flag
    pub done: Option<bool>,
}

/// A card with all of its child rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityDetails {
    /// The card itself
    #[serde(flatten)]
    pub activity: activity::Model,
    /// Checklist, oldest first
    pub subtasks: Vec<subtask::Model>,
    /// Attached files, oldest first
    pub documents: Vec<activity_document::Model>,
    /// Comments, oldest first
    pub comments: Vec<activity_comment::Model>,
}

/// Trims, drops blanks and removes repeats, keeping the first occurrence of each area.
#[must_use]
pub fn normalize_areas(areas: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for area in areas.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
        if !normalized.iter().any(|existing| existing == area) {
            normalized.push(area.to_string());
        }
    }
    normalized
}

/// Loose e-mail shape check: `local@domain.tld` without whitespace.
#[must_use]
pub fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

struct CardFields<'a> {
    name: &'a str,
    assignee: &'a str,
    direction: &'a str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

fn validate_card(card: &CardFields<'_>) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let name_len = card.name.trim().chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
        errors.push(FieldError::new(
            "name",
            format!("must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"),
        ));
    }
    if !looks_like_email(card.assignee.trim()) {
        errors.push(FieldError::new("assignee", "must be a valid e-mail address"));
    }
    if card.direction.trim().is_empty() {
        errors.push(FieldError::new("direction", "is required"));
    }
    if let (Some(start), Some(end)) = (card.start_date, card.end_date) {
        if end < start {
            errors.push(FieldError::new("end_date", "must not be before start_date"));
        }
    }
    errors
}

fn parse_label<T: FromStr<Err = Error>>(
    raw: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    match raw.map(str::parse::<T>).transpose() {
        Ok(value) => value,
        Err(Error::Validation { fields, .. }) => {
            errors.extend(fields);
            None
        }
        Err(_) => None,
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Creates a card at version 1.
///
/// # Errors
/// Returns [`Error::Validation`] listing every invalid field.
#[instrument(skip(db, new), fields(direction = %new.direction))]
pub async fn create_activity(db: &DatabaseConnection, new: NewActivity) -> Result<activity::Model> {
    let mut errors = validate_card(&CardFields {
        name: &new.name,
        assignee: &new.assignee,
        direction: &new.direction,
        start_date: new.start_date,
        end_date: new.end_date,
    });
    let priority = parse_label::<Priority>(new.priority.as_deref(), &mut errors);
    let status = parse_label::<ActivityStatus>(new.status.as_deref(), &mut errors);
    if !errors.is_empty() {
        return Err(Error::invalid_fields("Invalid activity", errors));
    }

    let now = Utc::now();
    let card = activity::ActiveModel {
        name: Set(new.name.trim().to_string()),
        assignee: Set(new.assignee.trim().to_string()),
        priority: Set(priority.unwrap_or_default().as_str().to_string()),
        status: Set(status.unwrap_or_default().as_str().to_string()),
        start_date: Set(new.start_date),
        end_date: Set(new.end_date),
        objective: Set(blank_to_none(new.objective)),
        impact: Set(blank_to_none(new.impact)),
        scope: Set(blank_to_none(new.scope)),
        resources: Set(blank_to_none(new.resources)),
        involved_areas: Set(Json::from(normalize_areas(&new.involved_areas))),
        direction: Set(new.direction.trim().to_string()),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = card.insert(db).await?;
    info!(id = created.id, "Activity created");
    Ok(created)
}

/// Cards of one board (or every board), newest first.
pub async fn list_activities(
    db: &DatabaseConnection,
    direction: Option<&str>,
) -> Result<Vec<activity::Model>> {
    let mut query = Activity::find();
    if let Some(direction) = direction.map(str::trim).filter(|d| !d.is_empty()) {
        query = query.filter(activity::Column::Direction.eq(direction));
    }
    query
        .order_by_desc(activity::Column::CreatedAt)
        .order_by_desc(activity::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches one card.
pub async fn get_activity<C: ConnectionTrait>(db: &C, id: i64) -> Result<activity::Model> {
    Activity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Activity", id))
}

/// Fetches one card with its subtasks, documents and comments.
pub async fn get_activity_details(db: &DatabaseConnection, id: i64) -> Result<ActivityDetails> {
    let activity = get_activity(db, id).await?;
    let subtasks = activity
        .find_related(Subtask)
        .order_by_asc(subtask::Column::Id)
        .all(db)
        .await?;
    let documents = activity
        .find_related(ActivityDocument)
        .order_by_asc(activity_document::Column::Id)
        .all(db)
        .await?;
    let comments = activity
        .find_related(ActivityComment)
        .order_by_asc(activity_comment::Column::Id)
        .all(db)
        .await?;

    Ok(ActivityDetails {
        activity,
        subtasks,
        documents,
        comments,
    })
}

/// Writes `changes` to the card only if it is still at `seen_version`, bumping the version.
async fn write_card(
    db: &DatabaseConnection,
    id: i64,
    seen_version: i32,
    mut changes: activity::ActiveModel,
) -> Result<activity::Model> {
    changes.updated_at = Set(Utc::now());
    let result = Activity::update_many()
        .set(changes)
        .col_expr(
            activity::Column::Version,
            Expr::col(activity::Column::Version).add(1),
        )
        .filter(activity::Column::Id.eq(id))
        .filter(activity::Column::Version.eq(seen_version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Either deleted meanwhile or someone else wrote first
        get_activity(db, id).await?;
        return Err(stale_version(id));
    }
    get_activity(db, id).await
}

fn stale_version(id: i64) -> Error {
    Error::Conflict {
        message: format!("Activity {id} was modified by someone else; reload and try again"),
    }
}

fn check_version(current: &activity::Model, expected: Option<i32>) -> Result<()> {
    match expected {
        Some(version) if version != current.version => Err(stale_version(current.id)),
        _ => Ok(()),
    }
}

/// Applies a partial edit.
///
/// # Errors
/// * [`Error::NotFound`] if the card does not exist.
/// * [`Error::Conflict`] if `update.version` is stale or another write lands first.
/// * [`Error::Validation`] if the merged card would be invalid.
#[instrument(skip(db, update))]
pub async fn update_activity(
    db: &DatabaseConnection,
    id: i64,
    update: ActivityUpdate,
) -> Result<activity::Model> {
    let current = get_activity(db, id).await?;
    check_version(&current, update.version)?;

    let name = update.name.unwrap_or_else(|| current.name.clone());
    let assignee = update.assignee.unwrap_or_else(|| current.assignee.clone());
    let start_date = if update.clear_start_date {
        None
    } else {
        update.start_date.or(current.start_date)
    };
    let end_date = if update.clear_end_date {
        None
    } else {
        update.end_date.or(current.end_date)
    };

    let mut errors = validate_card(&CardFields {
        name: &name,
        assignee: &assignee,
        direction: &current.direction,
        start_date,
        end_date,
    });
    let priority = parse_label::<Priority>(update.priority.as_deref(), &mut errors);
    let status = parse_label::<ActivityStatus>(update.status.as_deref(), &mut errors);
    if !errors.is_empty() {
        return Err(Error::invalid_fields("Invalid activity", errors));
    }

    let mut changes = activity::ActiveModel {
        name: Set(name.trim().to_string()),
        assignee: Set(assignee.trim().to_string()),
        start_date: Set(start_date),
        end_date: Set(end_date),
        ..Default::default()
    };
    if let Some(priority) = priority {
        changes.priority = Set(priority.as_str().to_string());
    }
    if let Some(status) = status {
        changes.status = Set(status.as_str().to_string());
    }
    if update.objective.is_some() {
        changes.objective = Set(blank_to_none(update.objective));
    }
    if update.impact.is_some() {
        changes.impact = Set(blank_to_none(update.impact));
    }
    if update.scope.is_some() {
        changes.scope = Set(blank_to_none(update.scope));
    }
    if update.resources.is_some() {
        changes.resources = Set(blank_to_none(update.resources));
    }
    if let Some(areas) = update.involved_areas {
        changes.involved_areas = Set(Json::from(normalize_areas(&areas)));
    }

    let updated = write_card(db, id, current.version, changes).await?;
    info!(id, version = updated.version, "Activity updated");
    Ok(updated)
}

/// Moves a card to any column.
#[instrument(skip(db))]
pub async fn update_status(
    db: &DatabaseConnection,
    id: i64,
    status: &str,
    version: Option<i32>,
) -> Result<activity::Model> {
    let status: ActivityStatus = status.parse()?;
    let current = get_activity(db, id).await?;
    check_version(&current, version)?;

    let changes = activity::ActiveModel {
        status: Set(status.as_str().to_string()),
        ..Default::default()
    };
    let updated = write_card(db, id, current.version, changes).await?;
    info!(id, status = %status, "Activity moved");
    Ok(updated)
}

/// Deletes a card and its children in one transaction.
///
/// Returns the bucket references of the removed documents so the caller can clean up files.
#[instrument(skip(db))]
pub async fn delete_activity(db: &DatabaseConnection, id: i64) -> Result<Vec<String>> {
    let txn = db.begin().await?;

    get_activity(&txn, id).await?;
    let file_refs: Vec<String> = ActivityDocument::find()
        .filter(activity_document::Column::ActivityId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|d| d.file_ref)
        .collect();

    Subtask::delete_many()
        .filter(subtask::Column::ActivityId.eq(id))
        .exec(&txn)
        .await?;
    ActivityDocument::delete_many()
        .filter(activity_document::Column::ActivityId.eq(id))
        .exec(&txn)
        .await?;
    ActivityComment::delete_many()
        .filter(activity_comment::Column::ActivityId.eq(id))
        .exec(&txn)
        .await?;
    Activity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    info!(id, "Activity deleted");
    Ok(file_refs)
}

// Subtasks

/// Checklist of a card, oldest first.
pub async fn list_subtasks(db: &DatabaseConnection, activity_id: i64) -> Result<Vec<subtask::Model>> {
    get_activity(db, activity_id).await?;
    Subtask::find()
        .filter(subtask::Column::ActivityId.eq(activity_id))
        .order_by_asc(subtask::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_fields(
            format!("{field} cannot be empty"),
            vec![FieldError::new(field, "is required")],
        ));
    }
    Ok(trimmed.to_string())
}

/// Adds an unchecked item to a card's checklist.
pub async fn add_subtask(
    db: &DatabaseConnection,
    activity_id: i64,
    title: &str,
) -> Result<subtask::Model> {
    let title = required_text("title", title)?;
    get_activity(db, activity_id).await?;

    let item = subtask::ActiveModel {
        activity_id: Set(activity_id),
        title: Set(title),
        done: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    item.insert(db).await.map_err(Into::into)
}

async fn find_subtask(
    db: &DatabaseConnection,
    activity_id: i64,
    subtask_id: i64,
) -> Result<subtask::Model> {
    Subtask::find_by_id(subtask_id)
        .filter(subtask::Column::ActivityId.eq(activity_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Subtask", subtask_id))
}

/// Renames and/or checks off a checklist item.
pub async fn update_subtask(
    db: &DatabaseConnection,
    activity_id: i64,
    subtask_id: i64,
    update: SubtaskUpdate,
) -> Result<subtask::Model> {
    let item = find_subtask(db, activity_id, subtask_id).await?;
    let mut active: subtask::ActiveModel = item.into();
    if let Some(title) = update.title {
        active.title = Set(required_text("title", &title)?);
    }
    if let Some(done) = update.done {
        active.done = Set(done);
    }
    active.update(db).await.map_err(Into::into)
}

/// Removes a checklist item.
pub async fn delete_subtask(db: &DatabaseConnection, activity_id: i64, subtask_id: i64) -> Result<()> {
    let item = find_subtask(db, activity_id, subtask_id).await?;
    Subtask::delete_by_id(item.id).exec(db).await?;
    Ok(())
}

// Documents

/// Files attached to a card, oldest first.
pub async fn list_documents(
    db: &DatabaseConnection,
    activity_id: i64,
) -> Result<Vec<activity_document::Model>> {
    get_activity(db, activity_id).await?;
    ActivityDocument::find()
        .filter(activity_document::Column::ActivityId.eq(activity_id))
        .order_by_asc(activity_document::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores `bytes` in the bucket and records the reference on the card.
///
/// `name` is the display name; the uploaded file name is used when it is blank.
#[instrument(skip(db, bucket, bytes), fields(size = bytes.len()))]
pub async fn attach_document(
    db: &DatabaseConnection,
    bucket: &DocumentBucket,
    activity_id: i64,
    name: Option<&str>,
    file_name: &str,
    bytes: &[u8],
) -> Result<activity_document::Model> {
    if bytes.is_empty() {
        return Err(Error::invalid_fields(
            "No file uploaded",
            vec![FieldError::new("document", "is required")],
        ));
    }
    get_activity(db, activity_id).await?;

    let display_name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(file_name)
        .to_string();
    let file_ref = bucket.put(activity_id, file_name, bytes).await?;

    let row = activity_document::ActiveModel {
        activity_id: Set(activity_id),
        name: Set(display_name),
        file_ref: Set(file_ref.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    match row.insert(db).await {
        Ok(document) => {
            info!(id = document.id, "Document attached");
            Ok(document)
        }
        Err(e) => {
            if let Err(cleanup) = bucket.remove(&file_ref).await {
                warn!(file_ref, error = %cleanup, "Could not remove orphaned upload");
            }
            Err(e.into())
        }
    }
}

async fn find_document(
    db: &DatabaseConnection,
    activity_id: i64,
    document_id: i64,
) -> Result<activity_document::Model> {
    ActivityDocument::find_by_id(document_id)
        .filter(activity_document::Column::ActivityId.eq(activity_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Document", document_id))
}

/// A document row together with its stored bytes.
pub async fn download_document(
    db: &DatabaseConnection,
    bucket: &DocumentBucket,
    activity_id: i64,
    document_id: i64,
) -> Result<(activity_document::Model, Vec<u8>)> {
    let document = find_document(db, activity_id, document_id).await?;
    let bytes = bucket.get(&document.file_ref).await?;
    Ok((document, bytes))
}

/// Removes the document row, then its file. A failure removing the file is only logged.
pub async fn delete_document(
    db: &DatabaseConnection,
    bucket: &DocumentBucket,
    activity_id: i64,
    document_id: i64,
) -> Result<()> {
    let document = find_document(db, activity_id, document_id).await?;

    ActivityDocument::delete_by_id(document.id).exec(db).await?;
    if let Err(e) = bucket.remove(&document.file_ref).await {
        warn!(file_ref = %document.file_ref, error = %e, "Document row deleted but file removal failed");
    }
    Ok(())
}

// Comments

/// Comments on a card, oldest first.
pub async fn list_comments(
    db: &DatabaseConnection,
    activity_id: i64,
) -> Result<Vec<activity_comment::Model>> {
    get_activity(db, activity_id).await?;
    ActivityComment::find()
        .filter(activity_comment::Column::ActivityId.eq(activity_id))
        .order_by_asc(activity_comment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Appends a comment.
pub async fn add_comment(
    db: &DatabaseConnection,
    activity_id: i64,
    author: &str,
    text: &str,
) -> Result<activity_comment::Model> {
    let author = required_text("author", author)?;
    let text = required_text("text", text)?;
    get_activity(db, activity_id).await?;

    let comment = activity_comment::ActiveModel {
        activity_id: Set(activity_id),
        author: Set(author),
        text: Set(text),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    comment.insert(db).await.map_err(Into::into)
}
