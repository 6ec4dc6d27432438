//! KPI entry business logic - recording, listing and summarizing indicator values.
//!
//! Recording is the only place formulas run against stored data: the raw inputs are evaluated
//! through the registry, compliance is judged, the one-entry-per-period guard is applied and the
//! row is inserted. Everything else in this module is a read or a notes edit.

use crate::{
    core::{
        period::{Period, has_entry_for_period},
        registry::{
            self, KpiInput, KpiRegistry, TargetMode, check_against_previous, check_compliance,
            round_to,
        },
    },
    entities::{KpiEntry, kpi_entry},
    errors::{Error, FieldError, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Upper bound on `limit` for [`list_kpis`].
pub const MAX_LIST_LIMIT: u64 = 500;
/// Default `limit` for [`list_kpis`].
pub const DEFAULT_LIST_LIMIT: u64 = 100;
/// Default `limit` for [`kpis_by_area`].
pub const DEFAULT_AREA_LIMIT: u64 = 50;
/// Default number of points for [`kpi_trend`].
pub const DEFAULT_TREND_COUNT: u64 = 10;

/// A KPI submission: raw inputs plus where and when they apply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewKpiEntry {
    /// Organizational area
    pub area: String,
    /// Indicator name within the area
    pub indicator: String,
    /// Named numeric inputs for the formula
    #[serde(default)]
    pub input_data: KpiInput,
    /// Reporting month as `YYYY-MM`; used when `recorded_at` is absent
    #[serde(default)]
    pub period: Option<String>,
    /// Timestamp standing for the reporting period; defaults to now
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Submitting organizational unit
    #[serde(default)]
    pub direction: Option<String>,
    /// Who submitted it
    #[serde(default)]
    pub submitted_by: Option<String>,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of evaluating inputs without storing them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationPreview {
    /// Area of the evaluated definition
    pub area: String,
    /// Indicator of the evaluated definition
    pub indicator: String,
    /// Formula result, None while inputs are incomplete
    pub value: Option<f64>,
    /// Required fields still missing or non-numeric
    pub missing_fields: Vec<&'static str>,
    /// Compliance against the static target, when it can be judged without history
    pub meets_target: Option<bool>,
    /// Target of the definition
    pub target: Option<f64>,
    /// How the target is compared
    pub target_mode: TargetMode,
    /// Display unit
    pub unit: &'static str,
}

/// Filters for [`list_kpis`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KpiFilter {
    /// Restrict to one area
    pub area: Option<String>,
    /// Restrict to one submitting unit
    pub direction: Option<String>,
    /// Page size, clamped to 1..=500 (default 100)
    pub limit: Option<u64>,
    /// Rows to skip
    pub offset: Option<u64>,
}

/// Per-indicator figures inside [`AreaStatistics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorStatistics {
    /// Indicator name
    pub indicator: String,
    /// Entries in the window
    pub total_entries: usize,
    /// Mean value, rounded to 2 decimals
    pub average_value: f64,
    /// Share of judged entries that met target, None when none were judged
    pub compliance_rate: Option<f64>,
    /// Most recent value
    pub latest_value: f64,
    /// When the most recent value was recorded
    pub latest_recorded_at: DateTime<Utc>,
}

/// Summary figures for an area over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaStatistics {
    /// Area name
    pub area: String,
    /// Window start
    pub since: DateTime<Utc>,
    /// Entries in the window
    pub total_entries: usize,
    /// Distinct indicators in the window
    pub unique_indicators: usize,
    /// Share of judged entries that met target; 0 when nothing was judged
    pub compliance_rate: f64,
    /// Breakdown per indicator, most recently recorded first
    pub indicators: Vec<IndicatorStatistics>,
}

/// Direction of an indicator's recent values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Rising steps clearly dominate
    Ascending,
    /// Falling steps clearly dominate
    Descending,
    /// Neither direction dominates
    Stable,
    /// No entries at all
    NoData,
    /// A single entry
    InsufficientData,
}

/// One point of a trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Recorded value
    pub value: f64,
    /// Compliance of that entry
    pub meets_target: Option<bool>,
    /// When it was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Min, max and mean of a trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    /// Number of points
    pub total_entries: usize,
    /// Smallest value
    pub min_value: f64,
    /// Largest value
    pub max_value: f64,
    /// Mean value, rounded to 2 decimals
    pub average_value: f64,
}

/// Recent values of one indicator and their overall direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiTrend {
    /// Overall direction
    pub trend: Trend,
    /// Points in ascending time order
    pub points: Vec<TrendPoint>,
    /// Present when there are at least two points
    pub analysis: Option<TrendAnalysis>,
}

fn unknown_indicator(area: &str, indicator: &str) -> Error {
    Error::invalid_fields(
        format!("Unknown indicator '{indicator}' for area '{area}'"),
        vec![FieldError::new("indicator", "is not defined for this area")],
    )
}

/// Evaluates `input` for one definition without touching storage.
///
/// `LessThanPrevious` indicators report `meets_target: None` here because judging them
/// needs the prior month's entry.
pub fn evaluate_preview(
    registry: &KpiRegistry,
    area: &str,
    indicator: &str,
    input: &KpiInput,
) -> Result<EvaluationPreview> {
    let def = registry
        .find(area, indicator)
        .ok_or_else(|| unknown_indicator(area, indicator))?;

    let value = registry::evaluate(def, input)?;
    Ok(EvaluationPreview {
        area: def.area.to_string(),
        indicator: def.indicator.to_string(),
        value,
        missing_fields: registry::missing_fields(def, input),
        meets_target: value.and_then(|v| check_compliance(v, def)),
        target: def.target,
        target_mode: def.target_mode,
        unit: def.unit,
    })
}

fn resolve_recorded_at(new: &NewKpiEntry) -> Result<DateTime<Utc>> {
    let period = new.period.as_deref().map(str::parse::<Period>).transpose()?;
    match (new.recorded_at, period) {
        (Some(at), Some(period)) if !period.contains(at) => Err(Error::invalid_fields(
            format!("recorded_at {at} is outside period {period}"),
            vec![FieldError::new("recorded_at", "must fall within the given period")],
        )),
        (Some(at), _) => Ok(at),
        (None, Some(period)) => Ok(period.start()),
        (None, None) => Ok(Utc::now()),
    }
}

async fn entries_in_period(
    db: &DatabaseConnection,
    area: &str,
    indicator: &str,
    period: &Period,
) -> Result<Vec<kpi_entry::Model>> {
    KpiEntry::find()
        .filter(kpi_entry::Column::Area.eq(area))
        .filter(kpi_entry::Column::Indicator.eq(indicator))
        .filter(kpi_entry::Column::RecordedAt.gte(period.start()))
        .filter(kpi_entry::Column::RecordedAt.lt(period.end()))
        .order_by_desc(kpi_entry::Column::RecordedAt)
        .order_by_desc(kpi_entry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Evaluates, judges and stores one KPI entry.
///
/// # Errors
/// * [`Error::Validation`] for an unknown indicator, incomplete inputs, a zero denominator
///   or a malformed period.
/// * [`Error::DuplicateEntry`] when the indicator already has an entry for that month, whether
///   caught up front or by the unique index.
#[instrument(skip(db, registry, new), fields(area = %new.area, indicator = %new.indicator))]
pub async fn record_kpi(
    db: &DatabaseConnection,
    registry: &KpiRegistry,
    new: NewKpiEntry,
) -> Result<kpi_entry::Model> {
    let area = new.area.trim().to_string();
    let indicator = new.indicator.trim().to_string();
    if area.is_empty() || indicator.is_empty() {
        return Err(Error::invalid_fields(
            "Area and indicator are required",
            vec![
                FieldError::new("area", "is required"),
                FieldError::new("indicator", "is required"),
            ],
        ));
    }

    let def = registry
        .find(&area, &indicator)
        .ok_or_else(|| unknown_indicator(&area, &indicator))?;

    let Some(value) = registry::evaluate(def, &new.input_data)? else {
        let fields = registry::missing_fields(def, &new.input_data)
            .into_iter()
            .map(|f| FieldError::new(f, "is required and must be a number"))
            .collect();
        return Err(Error::invalid_fields(
            format!("Missing inputs for '{indicator}'"),
            fields,
        ));
    };

    let recorded_at = resolve_recorded_at(&new)?;
    let period = Period::containing(recorded_at);

    let existing = entries_in_period(db, &area, &indicator, &period).await?;
    if has_entry_for_period(&existing, &indicator, &period).is_some() {
        return Err(duplicate_entry(&area, &indicator, &period));
    }

    let meets_target = if def.target_mode == TargetMode::LessThanPrevious {
        let previous = entries_in_period(db, &area, &indicator, &period.previous()).await?;
        check_against_previous(value, previous.first().map(|e| e.value))
    } else {
        check_compliance(value, def)
    };

    let entry = kpi_entry::ActiveModel {
        area: Set(area.clone()),
        indicator: Set(indicator.clone()),
        value: Set(value),
        unit: Set(def.unit.to_string()),
        meets_target: Set(meets_target),
        target: Set(def.target),
        input_data: Set(Json::Object(new.input_data)),
        direction: Set(new.direction.filter(|d| !d.trim().is_empty())),
        submitted_by: Set(new.submitted_by.filter(|s| !s.trim().is_empty())),
        notes: Set(new.notes),
        period: Set(period.to_string()),
        recorded_at: Set(recorded_at),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let model = entry.insert(db).await.map_err(|e| {
        if Error::is_unique_violation(&e) {
            duplicate_entry(&area, &indicator, &period)
        } else {
            e.into()
        }
    })?;

    info!(id = model.id, value, period = %period, "KPI entry recorded");
    Ok(model)
}

fn duplicate_entry(area: &str, indicator: &str, period: &Period) -> Error {
    Error::DuplicateEntry {
        message: format!("'{indicator}' in {area} already has an entry for {period}"),
    }
}

/// Lists entries newest first with optional area/direction filters and paging.
pub async fn list_kpis(db: &DatabaseConnection, filter: &KpiFilter) -> Result<Vec<kpi_entry::Model>> {
    let mut query = KpiEntry::find();
    if let Some(area) = filter.area.as_deref().filter(|a| !a.is_empty()) {
        query = query.filter(kpi_entry::Column::Area.eq(area));
    }
    if let Some(direction) = filter.direction.as_deref().filter(|d| !d.is_empty()) {
        query = query.filter(kpi_entry::Column::Direction.eq(direction));
    }

    let limit = filter
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    query
        .order_by_desc(kpi_entry::Column::RecordedAt)
        .order_by_desc(kpi_entry::Column::Id)
        .limit(limit)
        .offset(filter.offset.unwrap_or(0))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Most recent entries of one area.
pub async fn kpis_by_area(
    db: &DatabaseConnection,
    area: &str,
    limit: Option<u64>,
) -> Result<Vec<kpi_entry::Model>> {
    KpiEntry::find()
        .filter(kpi_entry::Column::Area.eq(area))
        .order_by_desc(kpi_entry::Column::RecordedAt)
        .order_by_desc(kpi_entry::Column::Id)
        .limit(limit.unwrap_or(DEFAULT_AREA_LIMIT).clamp(1, MAX_LIST_LIMIT))
        .all(db)
        .await
        .map_err(Into::into)
}

/// The latest entry of every indicator in `area`, most recently recorded first.
pub async fn latest_kpis_by_area(
    db: &DatabaseConnection,
    area: &str,
) -> Result<Vec<kpi_entry::Model>> {
    let rows = KpiEntry::find()
        .filter(kpi_entry::Column::Area.eq(area))
        .order_by_desc(kpi_entry::Column::RecordedAt)
        .order_by_desc(kpi_entry::Column::Id)
        .all(db)
        .await?;

    let mut latest: Vec<kpi_entry::Model> = Vec::new();
    for row in rows {
        if !latest.iter().any(|e| e.indicator == row.indicator) {
            latest.push(row);
        }
    }
    Ok(latest)
}

/// Entries of one indicator recorded at or after `since`, oldest first.
pub async fn kpi_history(
    db: &DatabaseConnection,
    area: &str,
    indicator: &str,
    since: DateTime<Utc>,
) -> Result<Vec<kpi_entry::Model>> {
    KpiEntry::find()
        .filter(kpi_entry::Column::Area.eq(area))
        .filter(kpi_entry::Column::Indicator.eq(indicator))
        .filter(kpi_entry::Column::RecordedAt.gte(since))
        .order_by_asc(kpi_entry::Column::RecordedAt)
        .order_by_asc(kpi_entry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches one entry by id.
pub async fn get_kpi(db: &DatabaseConnection, id: i64) -> Result<kpi_entry::Model> {
    KpiEntry::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("KPI entry", id))
}

/// Replaces the notes of an entry. Notes are the only mutable column.
#[instrument(skip(db, notes))]
pub async fn update_notes(
    db: &DatabaseConnection,
    id: i64,
    notes: Option<String>,
) -> Result<kpi_entry::Model> {
    let entry = get_kpi(db, id).await?;
    let mut active: kpi_entry::ActiveModel = entry.into();
    active.notes = Set(notes.filter(|n| !n.trim().is_empty()));
    let updated = active.update(db).await?;
    debug!(id, "KPI notes updated");
    Ok(updated)
}

/// Deletes an entry.
#[instrument(skip(db))]
pub async fn delete_kpi(db: &DatabaseConnection, id: i64) -> Result<()> {
    let result = KpiEntry::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("KPI entry", id));
    }
    info!(id, "KPI entry deleted");
    Ok(())
}

fn compliance_rate(entries: &[&kpi_entry::Model]) -> Option<f64> {
    let judged: Vec<bool> = entries.iter().filter_map(|e| e.meets_target).collect();
    if judged.is_empty() {
        return None;
    }
    let met = judged.iter().filter(|m| **m).count();
    #[allow(clippy::cast_precision_loss)]
    let rate = met as f64 / judged.len() as f64 * 100.0;
    Some(round_to(rate, 2))
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> Option<f64> {
    let count = values.len();
    if count == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = values.sum::<f64>() / count as f64;
    Some(mean)
}

/// Builds area statistics from rows ordered newest first.
#[must_use]
pub fn summarize_area(
    area: &str,
    since: DateTime<Utc>,
    rows: &[kpi_entry::Model],
) -> AreaStatistics {
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&kpi_entry::Model>> = HashMap::new();
    for row in rows {
        let group = grouped.entry(row.indicator.as_str()).or_default();
        if group.is_empty() {
            order.push(row.indicator.as_str());
        }
        group.push(row);
    }

    let indicators = order
        .iter()
        .filter_map(|name| {
            let group = grouped.get(name)?;
            let latest = group.first()?;
            Some(IndicatorStatistics {
                indicator: (*name).to_string(),
                total_entries: group.len(),
                average_value: round_to(mean(group.iter().map(|e| e.value))?, 2),
                compliance_rate: compliance_rate(group),
                latest_value: latest.value,
                latest_recorded_at: latest.recorded_at,
            })
        })
        .collect();

    let all: Vec<&kpi_entry::Model> = rows.iter().collect();
    AreaStatistics {
        area: area.to_string(),
        since,
        total_entries: rows.len(),
        unique_indicators: order.len(),
        compliance_rate: compliance_rate(&all).unwrap_or(0.0),
        indicators,
    }
}

/// Totals and compliance figures for `area` over entries recorded at or after `since`.
pub async fn area_statistics(
    db: &DatabaseConnection,
    area: &str,
    since: DateTime<Utc>,
) -> Result<AreaStatistics> {
    let rows = KpiEntry::find()
        .filter(kpi_entry::Column::Area.eq(area))
        .filter(kpi_entry::Column::RecordedAt.gte(since))
        .order_by_desc(kpi_entry::Column::RecordedAt)
        .order_by_desc(kpi_entry::Column::Id)
        .all(db)
        .await?;
    Ok(summarize_area(area, since, &rows))
}

/// Classifies a series in time order.
///
/// A direction wins when its step count exceeds 1.5 times the opposite count; equal
/// neighbours count for neither.
#[must_use]
pub fn classify_trend(values: &[f64]) -> Trend {
    match values.len() {
        0 => return Trend::NoData,
        1 => return Trend::InsufficientData,
        _ => {}
    }

    let (mut rising, mut falling) = (0_u32, 0_u32);
    for pair in values.windows(2) {
        if pair[1] > pair[0] {
            rising += 1;
        } else if pair[1] < pair[0] {
            falling += 1;
        }
    }

    let (rising, falling) = (f64::from(rising), f64::from(falling));
    if rising > falling * 1.5 {
        Trend::Ascending
    } else if falling > rising * 1.5 {
        Trend::Descending
    } else {
        Trend::Stable
    }
}

/// The last `count` values of one indicator and their direction.
pub async fn kpi_trend(
    db: &DatabaseConnection,
    area: &str,
    indicator: &str,
    count: Option<u64>,
) -> Result<KpiTrend> {
    let mut rows = KpiEntry::find()
        .filter(kpi_entry::Column::Area.eq(area))
        .filter(kpi_entry::Column::Indicator.eq(indicator))
        .order_by_desc(kpi_entry::Column::RecordedAt)
        .order_by_desc(kpi_entry::Column::Id)
        .limit(count.unwrap_or(DEFAULT_TREND_COUNT).clamp(1, MAX_LIST_LIMIT))
        .all(db)
        .await?;
    rows.reverse();

    let values: Vec<f64> = rows.iter().map(|e| e.value).collect();
    let analysis = (values.len() >= 2).then(|| TrendAnalysis {
        total_entries: values.len(),
        min_value: values.iter().copied().fold(f64::INFINITY, f64::min),
        max_value: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        average_value: mean(values.iter().copied()).map_or(0.0, |m| round_to(m, 2)),
    });

    Ok(KpiTrend {
        trend: classify_trend(&values),
        points: rows
            .into_iter()
            .map(|e| TrendPoint {
                value: e.value,
                meets_target: e.meets_target,
                recorded_at: e.recorded_at,
            })
            .collect(),
        analysis,
    })
}
