//! KPI formula registry.
//!
//! A [`KpiDefinition`] is pure data: the formula is a [`Formula`] tag naming one of a
//! handful of arithmetic shapes, and the input fields it reads are declared by that tag.
//! The full catalog is built once at startup by [`KpiRegistry::standard`] and passed by
//! reference to whoever needs it.

use crate::errors::{Error, FieldError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Absolute tolerance for [`TargetMode::Equal`].
pub const EQUAL_TOLERANCE: f64 = 0.01;

/// Raw inputs submitted for one indicator, keyed by field name.
pub type KpiInput = Map<String, Value>;

/// Comparison rule used to decide whether a value meets its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetMode {
    /// value >= target
    GreaterOrEqual,
    /// value <= target
    LessOrEqual,
    /// |value - target| within [`EQUAL_TOLERANCE`]
    Equal,
    /// Lower than the previous month's value for the same indicator
    LessThanPrevious,
    /// Judged by a human, never automatically
    Custom,
}

impl fmt::Display for TargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::GreaterOrEqual => "≥",
            Self::LessOrEqual => "≤",
            Self::Equal => "=",
            Self::LessThanPrevious => "< previous",
            Self::Custom => "custom",
        };
        f.write_str(symbol)
    }
}

/// Arithmetic shape of a KPI formula. Every variant names the input fields it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Formula {
    /// `part / whole * 100`
    Percent {
        /// Numerator field
        part: &'static str,
        /// Denominator field
        whole: &'static str,
    },
    /// `numerator / denominator`
    Ratio {
        /// Numerator field
        numerator: &'static str,
        /// Denominator field
        denominator: &'static str,
    },
    /// `minuend - subtrahend`
    Difference {
        /// Left operand
        minuend: &'static str,
        /// Right operand
        subtrahend: &'static str,
    },
    /// `(current - baseline) / baseline * 100`
    PercentChange {
        /// Current-period field
        current: &'static str,
        /// Reference field, also the denominator
        baseline: &'static str,
    },
    /// `(revenue - cost) / revenue * 100`
    Margin {
        /// Revenue field, also the denominator
        revenue: &'static str,
        /// Cost field
        cost: &'static str,
    },
    /// The field itself
    Value {
        /// Input field
        field: &'static str,
    },
}

impl Formula {
    /// Input fields read by this formula, in declaration order.
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        match *self {
            Self::Percent { part, whole } => vec![part, whole],
            Self::Ratio {
                numerator,
                denominator,
            } => vec![numerator, denominator],
            Self::Difference {
                minuend,
                subtrahend,
            } => vec![minuend, subtrahend],
            Self::PercentChange { current, baseline } => vec![current, baseline],
            Self::Margin { revenue, cost } => vec![revenue, cost],
            Self::Value { field } => vec![field],
        }
    }

    /// The field that must be nonzero, if the formula divides.
    #[must_use]
    pub const fn denominator(&self) -> Option<&'static str> {
        match *self {
            Self::Percent { whole, .. } => Some(whole),
            Self::Ratio { denominator, .. } => Some(denominator),
            Self::PercentChange { baseline, .. } => Some(baseline),
            Self::Margin { revenue, .. } => Some(revenue),
            Self::Difference { .. } | Self::Value { .. } => None,
        }
    }

    fn apply(&self, get: impl Fn(&str) -> f64) -> f64 {
        match *self {
            Self::Percent { part, whole } => get(part) / get(whole) * 100.0,
            Self::Ratio {
                numerator,
                denominator,
            } => get(numerator) / get(denominator),
            Self::Difference {
                minuend,
                subtrahend,
            } => get(minuend) - get(subtrahend),
            Self::PercentChange { current, baseline } => {
                (get(current) - get(baseline)) / get(baseline) * 100.0
            }
            Self::Margin { revenue, cost } => (get(revenue) - get(cost)) / get(revenue) * 100.0,
            Self::Value { field } => get(field),
        }
    }
}

/// Static description of one indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiDefinition {
    /// Organizational area, e.g. `"Logistics"`
    pub area: &'static str,
    /// Indicator name, unique within its area
    pub indicator: &'static str,
    /// Arithmetic shape
    pub formula: Formula,
    /// Input fields the formula reads
    pub required_fields: Vec<&'static str>,
    /// Target value, absent for `LessThanPrevious` and most `Custom` indicators
    pub target: Option<f64>,
    /// How `target` is compared
    pub target_mode: TargetMode,
    /// Display unit
    pub unit: &'static str,
    /// What the indicator measures
    pub description: &'static str,
}

impl KpiDefinition {
    /// Builds a definition; required fields come from the formula tag.
    #[must_use]
    pub fn new(
        area: &'static str,
        indicator: &'static str,
        formula: Formula,
        target: Option<f64>,
        target_mode: TargetMode,
        unit: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            area,
            indicator,
            required_fields: formula.fields(),
            formula,
            target,
            target_mode,
            unit,
            description,
        }
    }
}

/// The input field names a definition reads.
#[must_use]
pub fn required_fields(def: &KpiDefinition) -> &[&'static str] {
    &def.required_fields
}

/// Names of required fields that are absent or not a finite number.
#[must_use]
pub fn missing_fields(def: &KpiDefinition, input: &KpiInput) -> Vec<&'static str> {
    def.required_fields
        .iter()
        .copied()
        .filter(|field| numeric(input, field).is_none())
        .collect()
}

fn numeric(input: &KpiInput, field: &str) -> Option<f64> {
    input
        .get(field)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

/// Rounds to `places` decimal places. Values too large to scale are returned unchanged.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Evaluates a definition's formula.
///
/// Returns `Ok(None)` when any required field is missing or non-numeric, and the
/// result rounded to 2 decimals otherwise.
///
/// # Errors
/// Returns [`Error::Validation`] when every field is present but the denominator is zero,
/// or when the result overflows to a non-finite number.
pub fn evaluate(def: &KpiDefinition, input: &KpiInput) -> Result<Option<f64>> {
    if !missing_fields(def, input).is_empty() {
        return Ok(None);
    }

    let get = |field: &str| numeric(input, field).unwrap_or_default();

    if let Some(denominator) = def.formula.denominator() {
        if get(denominator) == 0.0 {
            return Err(Error::invalid_fields(
                format!("'{}' cannot be computed with a zero denominator", def.indicator),
                vec![FieldError::new(denominator, "must be nonzero")],
            ));
        }
    }

    let value = def.formula.apply(get);
    if !value.is_finite() {
        return Err(Error::invalid_fields(
            format!("'{}' produced a value out of range", def.indicator),
            def.required_fields
                .iter()
                .map(|field| FieldError::new(*field, "gives a result too large to store"))
                .collect(),
        ));
    }
    Ok(Some(round_to(value, 2)))
}

/// Judges a value against a definition's target.
///
/// `None` means "not auto-evaluable": `LessThanPrevious`, `Custom`, or no target.
#[must_use]
pub fn check_compliance(value: f64, def: &KpiDefinition) -> Option<bool> {
    compliance_for(value, def.target, def.target_mode)
}

/// Pure form of [`check_compliance`] over `(value, target, mode)`.
#[must_use]
pub fn compliance_for(value: f64, target: Option<f64>, mode: TargetMode) -> Option<bool> {
    let target = target?;
    match mode {
        TargetMode::GreaterOrEqual => Some(value >= target),
        TargetMode::LessOrEqual => Some(value <= target),
        TargetMode::Equal => Some((value - target).abs() <= EQUAL_TOLERANCE),
        TargetMode::LessThanPrevious | TargetMode::Custom => None,
    }
}

/// Compliance for `LessThanPrevious` indicators: strictly lower than last month.
#[must_use]
pub fn check_against_previous(value: f64, previous: Option<f64>) -> Option<bool> {
    previous.map(|prev| value < prev)
}

/// The set of known indicators.
#[derive(Debug, Clone)]
pub struct KpiRegistry {
    definitions: Vec<KpiDefinition>,
}

impl KpiRegistry {
    /// Wraps an explicit list of definitions.
    #[must_use]
    pub const fn new(definitions: Vec<KpiDefinition>) -> Self {
        Self { definitions }
    }

    /// The full compiled-in catalog.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(crate::core::catalog::standard_definitions())
    }

    /// Every definition in catalog order.
    #[must_use]
    pub fn definitions(&self) -> &[KpiDefinition] {
        &self.definitions
    }

    /// Looks up one indicator.
    #[must_use]
    pub fn find(&self, area: &str, indicator: &str) -> Option<&KpiDefinition> {
        self.definitions
            .iter()
            .find(|d| d.area == area && d.indicator == indicator)
    }

    /// Definitions belonging to `area`, in catalog order.
    pub fn for_area<'a>(&'a self, area: &'a str) -> impl Iterator<Item = &'a KpiDefinition> + 'a {
        self.definitions.iter().filter(move |d| d.area == area)
    }

    /// Distinct area names in catalog order.
    #[must_use]
    pub fn areas(&self) -> Vec<&'static str> {
        let mut areas: Vec<&'static str> = Vec::new();
        for def in &self.definitions {
            if !areas.contains(&def.area) {
                areas.push(def.area);
            }
        }
        areas
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use serde_json::json;

    fn def(mode: TargetMode, target: Option<f64>) -> KpiDefinition {
        KpiDefinition::new(
            "Test",
            "Accuracy",
            Formula::Percent {
                part: "correct",
                whole: "total",
            },
            target,
            mode,
            "%",
            "test indicator",
        )
    }

    fn input(value: Value) -> KpiInput {
        value.as_object().cloned().unwrap()
    }

    /// Builds a complete numeric input for a definition, every field set to `value`.
    fn full_input(def: &KpiDefinition, value: f64) -> KpiInput {
        def.required_fields
            .iter()
            .map(|f| ((*f).to_string(), json!(value)))
            .collect()
    }

    #[test]
    fn test_evaluate_percent_rounds_to_two_places() {
        let d = def(TargetMode::GreaterOrEqual, Some(98.0));
        let result = evaluate(&d, &input(json!({"correct": 2, "total": 3}))).unwrap();
        assert_eq!(result, Some(66.67));
    }

    #[test]
    fn test_evaluate_missing_field_returns_none() {
        let d = def(TargetMode::GreaterOrEqual, Some(98.0));
        assert_eq!(evaluate(&d, &input(json!({"correct": 2}))).unwrap(), None);
        assert_eq!(
            missing_fields(&d, &input(json!({"correct": 2}))),
            vec!["total"]
        );
    }

    #[test]
    fn test_evaluate_non_numeric_field_returns_none() {
        let d = def(TargetMode::GreaterOrEqual, Some(98.0));
        let result = evaluate(&d, &input(json!({"correct": "2", "total": 3}))).unwrap();
        assert_eq!(result, None);
        let result = evaluate(&d, &input(json!({"correct": null, "total": 3}))).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_evaluate_zero_numerator_is_a_value() {
        let d = def(TargetMode::GreaterOrEqual, Some(98.0));
        let result = evaluate(&d, &input(json!({"correct": 0, "total": 10}))).unwrap();
        assert_eq!(result, Some(0.0));
    }

    #[test]
    fn test_evaluate_zero_denominator_is_rejected() {
        let d = def(TargetMode::GreaterOrEqual, Some(98.0));
        let err = evaluate(&d, &input(json!({"correct": 5, "total": 0}))).unwrap_err();
        match err {
            Error::Validation { fields, .. } => assert_eq!(fields[0].field, "total"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_round_to_keeps_huge_values_finite() {
        assert_eq!(round_to(1e307, 2), 1e307);
        assert_eq!(round_to(12.345_678, 2), 12.35);
    }

    #[test]
    fn test_evaluate_never_returns_non_finite() {
        let value = KpiDefinition::new(
            "Test",
            "Raw",
            Formula::Value { field: "v" },
            Some(1.0),
            TargetMode::GreaterOrEqual,
            "",
            "",
        );
        let result = evaluate(&value, &input(json!({"v": 1e307}))).unwrap().unwrap();
        assert!(result.is_finite());
        assert_eq!(result, 1e307);

        let d = def(TargetMode::GreaterOrEqual, Some(98.0));
        let err = evaluate(&d, &input(json!({"correct": 1e300, "total": 1e-10}))).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_every_catalog_definition_evaluates_iff_complete() {
        let registry = KpiRegistry::standard();
        for d in registry.definitions() {
            let complete = full_input(d, 4.0);
            assert!(
                evaluate(d, &complete).unwrap().is_some(),
                "{} / {} should evaluate",
                d.area,
                d.indicator
            );
            for field in &d.required_fields {
                let mut partial = complete.clone();
                partial.remove(*field);
                assert_eq!(evaluate(d, &partial).unwrap(), None);

                let mut bad = complete.clone();
                bad.insert((*field).to_string(), json!("n/a"));
                assert_eq!(evaluate(d, &bad).unwrap(), None);
            }
            assert!(d.required_fields.len() <= 4);
        }
    }

    #[test]
    fn test_catalog_indicators_are_unique_per_area() {
        let registry = KpiRegistry::standard();
        for d in registry.definitions() {
            let count = registry
                .definitions()
                .iter()
                .filter(|o| o.area == d.area && o.indicator == d.indicator)
                .count();
            assert_eq!(count, 1, "{} / {} is duplicated", d.area, d.indicator);
        }
    }

    #[test]
    fn test_check_compliance_modes() {
        assert_eq!(
            compliance_for(98.0, Some(98.0), TargetMode::GreaterOrEqual),
            Some(true)
        );
        assert_eq!(
            compliance_for(97.9, Some(98.0), TargetMode::GreaterOrEqual),
            Some(false)
        );
        assert_eq!(
            compliance_for(2.0, Some(2.0), TargetMode::LessOrEqual),
            Some(true)
        );
        assert_eq!(
            compliance_for(2.5, Some(2.0), TargetMode::LessOrEqual),
            Some(false)
        );
        assert_eq!(
            compliance_for(100.0, Some(100.0), TargetMode::Equal),
            Some(true)
        );
        assert_eq!(
            compliance_for(100.005, Some(100.0), TargetMode::Equal),
            Some(true)
        );
        assert_eq!(
            compliance_for(99.5, Some(100.0), TargetMode::Equal),
            Some(false)
        );
    }

    #[test]
    fn test_check_compliance_not_auto_evaluable() {
        for x in [-5.0, 0.0, 42.0] {
            assert_eq!(compliance_for(x, None, TargetMode::Custom), None);
            assert_eq!(compliance_for(x, Some(1.0), TargetMode::Custom), None);
            assert_eq!(compliance_for(x, None, TargetMode::LessThanPrevious), None);
        }
        assert_eq!(check_compliance(50.0, &def(TargetMode::GreaterOrEqual, None)), None);
    }

    #[test]
    fn test_check_against_previous() {
        assert_eq!(check_against_previous(10.0, Some(12.0)), Some(true));
        assert_eq!(check_against_previous(12.0, Some(12.0)), Some(false));
        assert_eq!(check_against_previous(10.0, None), None);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = KpiRegistry::standard();
        let d = registry.find("Inventory", "Inventory accuracy").unwrap();
        assert_eq!(d.target, Some(98.0));
        assert_eq!(d.target_mode, TargetMode::GreaterOrEqual);
        assert_eq!(required_fields(d), ["correct_units", "total_units"]);
        assert!(registry.find("Inventory", "Nope").is_none());
        assert!(registry.for_area("Systems").count() >= 5);
        assert_eq!(registry.areas()[0], "Inventory");
    }
}
