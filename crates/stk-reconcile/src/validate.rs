//! Edit-set validator.
//!
//! Three severities:
//! - **Critical** blocks the save (negative, fractional, above maximum,
//!   below the damaged count, exact-total mismatch).
//! - **Warning** never blocks but is surfaced (zero-out, significant change,
//!   adjustable-total mismatch, no stock anywhere).
//! - **Info** is purely informational (back in stock).
//!
//! Per option, the first critical finding wins: once an option is critical
//! none of its remaining checks run, so it carries exactly one finding.
//! Group-level checks always run over the whole set.
//!
//! The validator never mutates anything and never fails; it only reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stk_schemas::TrackingType;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Thresholds. Defaults match the storefront admin's historical rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLimits {
    pub max_quantity: i64,
    /// Per-option change is significant above this many units...
    pub option_significant_units: i64,
    /// ...or above this fraction of the original quantity.
    pub option_significant_ratio: f64,
    pub aggregate_significant_units: i64,
    pub aggregate_significant_ratio: f64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_quantity: 999_999,
            option_significant_units: 5,
            option_significant_ratio: 0.3,
            aggregate_significant_units: 10,
            aggregate_significant_ratio: 0.2,
        }
    }
}

/// How the sum of option quantities is held against the menu item's stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TotalPolicy {
    /// Menu-item-level tracking: sums must match exactly (critical).
    Exact,
    /// Option-level tracking: a mismatch is an intentional adjustment (warning).
    Adjustable,
    /// Manual tracking: no group-level total check.
    Unchecked,
}

impl TotalPolicy {
    pub fn for_tracking(tracking: TrackingType) -> Self {
        match tracking {
            TrackingType::MenuItemLevel => TotalPolicy::Exact,
            TrackingType::OptionLevel => TotalPolicy::Adjustable,
            TrackingType::Manual => TotalPolicy::Unchecked,
        }
    }
}

/// One option's proposed value against its baseline.
///
/// `proposed` is `f64` because it comes straight from user input; anything
/// non-finite or fractional is reported, not coerced.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantityCheck {
    pub option_id: String,
    pub option_name: String,
    pub original: i64,
    pub damaged: i64,
    pub proposed: f64,
}

impl QuantityCheck {
    pub fn new(
        option_id: impl Into<String>,
        option_name: impl Into<String>,
        original: i64,
        proposed: f64,
    ) -> Self {
        Self {
            option_id: option_id.into(),
            option_name: option_name.into(),
            original,
            damaged: 0,
            proposed,
        }
    }

    pub fn with_damaged(mut self, damaged: i64) -> Self {
        self.damaged = damaged;
        self
    }

    fn whole(&self) -> Option<i64> {
        whole_number(self.proposed)
    }
}

fn whole_number(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
        Some(v as i64)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    fn of(delta: i128) -> Self {
        if delta < 0 {
            Direction::Decrease
        } else {
            Direction::Increase
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Increase => "increase",
            Direction::Decrease => "decrease",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    Negative,
    ExceedsMaximum { max: i64 },
    NotWholeNumber,
    BelowDamaged { damaged: i64 },
    BecomesUnavailable,
    BackInStock,
    SignificantChange { units: i64, direction: Direction },
    TotalMismatch { expected: i64, actual: i128 },
    InventoryAdjustment {
        units: i128,
        direction: Direction,
        significant: bool,
    },
    NoStockAnywhere,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Finding {
    /// `None` for group-level findings.
    pub option_id: Option<String>,
    pub severity: Severity,
    pub kind: FindingKind,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub has_warnings: bool,
    /// Every per-option finding, keyed by option id.
    pub per_option: BTreeMap<String, Vec<Finding>>,
    pub critical: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub notices: Vec<Finding>,
}

impl ValidationReport {
    pub fn clean() -> Self {
        Self {
            is_valid: true,
            ..Self::default()
        }
    }

    pub fn critical_count(&self) -> usize {
        self.critical.len()
    }

    /// Significant changes need a reason attached to the write.
    pub fn requires_reason(&self) -> bool {
        self.warnings.iter().any(|f| {
            matches!(
                f.kind,
                FindingKind::SignificantChange { .. }
                    | FindingKind::InventoryAdjustment {
                        significant: true,
                        ..
                    }
            )
        })
    }

    pub fn findings_for(&self, option_id: &str) -> &[Finding] {
        self.per_option
            .get(option_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn push(&mut self, finding: Finding) {
        if let Some(id) = &finding.option_id {
            self.per_option
                .entry(id.clone())
                .or_default()
                .push(finding.clone());
        }
        match finding.severity {
            Severity::Critical => self.critical.push(finding),
            Severity::Warning => self.warnings.push(finding),
            Severity::Info => self.notices.push(finding),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the full edit set against `reference_total` (the menu item's
/// current aggregate stock).
pub fn validate(
    checks: &[QuantityCheck],
    reference_total: i64,
    policy: TotalPolicy,
    limits: &ValidationLimits,
) -> ValidationReport {
    let mut report = ValidationReport::clean();

    for check in checks {
        check_option(check, limits, &mut report);
    }

    check_group(checks, reference_total, policy, limits, &mut report);

    report.is_valid = report.critical.is_empty();
    report.has_warnings = !report.warnings.is_empty();
    report
}

fn option_finding(
    check: &QuantityCheck,
    severity: Severity,
    kind: FindingKind,
    message: String,
) -> Finding {
    Finding {
        option_id: Some(check.option_id.clone()),
        severity,
        kind,
        message,
    }
}

fn check_option(check: &QuantityCheck, limits: &ValidationLimits, report: &mut ValidationReport) {
    let name = &check.option_name;

    if check.proposed < 0.0 {
        report.push(option_finding(
            check,
            Severity::Critical,
            FindingKind::Negative,
            format!("{name}: quantity cannot be negative"),
        ));
        return;
    }
    if check.proposed > limits.max_quantity as f64 {
        report.push(option_finding(
            check,
            Severity::Critical,
            FindingKind::ExceedsMaximum {
                max: limits.max_quantity,
            },
            format!("{name}: quantity exceeds maximum of {}", limits.max_quantity),
        ));
        return;
    }
    let Some(proposed) = check.whole() else {
        report.push(option_finding(
            check,
            Severity::Critical,
            FindingKind::NotWholeNumber,
            format!("{name}: quantity must be a whole number"),
        ));
        return;
    };
    if proposed < check.damaged {
        report.push(option_finding(
            check,
            Severity::Critical,
            FindingKind::BelowDamaged {
                damaged: check.damaged,
            },
            format!(
                "{name}: quantity cannot be below the {} damaged unit(s)",
                check.damaged
            ),
        ));
        return;
    }

    let original = check.original;
    if proposed == 0 && original > 0 {
        report.push(option_finding(
            check,
            Severity::Warning,
            FindingKind::BecomesUnavailable,
            format!("{name}: option becomes unavailable"),
        ));
    }
    if original == 0 && proposed > 0 {
        report.push(option_finding(
            check,
            Severity::Info,
            FindingKind::BackInStock,
            format!("{name}: option becomes available again"),
        ));
    }

    let delta = proposed - original;
    let units = delta.abs();
    let relative_breach =
        original > 0 && units as f64 / original as f64 > limits.option_significant_ratio;
    if units > limits.option_significant_units || relative_breach {
        let direction = Direction::of(i128::from(delta));
        report.push(option_finding(
            check,
            Severity::Warning,
            FindingKind::SignificantChange { units, direction },
            format!(
                "{name}: significant change of {units} units ({})",
                direction.as_str()
            ),
        ));
    }
}

fn check_group(
    checks: &[QuantityCheck],
    reference_total: i64,
    policy: TotalPolicy,
    limits: &ValidationLimits,
    report: &mut ValidationReport,
) {
    if checks.is_empty() {
        return;
    }

    if checks.iter().all(|c| c.proposed == 0.0) {
        report.push(Finding {
            option_id: None,
            severity: Severity::Warning,
            kind: FindingKind::NoStockAnywhere,
            message: "At least one option should have stock".to_string(),
        });
    }

    // A sum over unparseable values means nothing; those already block.
    let whole: Option<Vec<i64>> = checks.iter().map(QuantityCheck::whole).collect();
    let Some(values) = whole else {
        return;
    };
    let actual: i128 = values.iter().map(|v| i128::from(*v)).sum();
    let expected = i128::from(reference_total);
    if actual == expected {
        return;
    }

    match policy {
        TotalPolicy::Unchecked => {}
        TotalPolicy::Exact => report.push(Finding {
            option_id: None,
            severity: Severity::Critical,
            kind: FindingKind::TotalMismatch {
                expected: reference_total,
                actual,
            },
            message: format!(
                "Option quantities must equal menu item stock exactly (expected {reference_total}, got {actual})"
            ),
        }),
        TotalPolicy::Adjustable => {
            let delta = actual - expected;
            let units = delta.abs();
            let direction = Direction::of(delta);
            let significant = units > i128::from(limits.aggregate_significant_units)
                || (expected > 0
                    && units as f64 / expected as f64 > limits.aggregate_significant_ratio);
            let mut message = format!(
                "Inventory adjustment: total stock will {} by {units} units ({reference_total} -> {actual})",
                direction.as_str()
            );
            if significant {
                message.push_str("; significant change, a reason will be logged");
            }
            report.push(Finding {
                option_id: None,
                severity: Severity::Warning,
                kind: FindingKind::InventoryAdjustment {
                    units,
                    direction,
                    significant,
                },
                message,
            });
        }
    }
}

/// Reason used when a significant change is saved without one.
///
/// Lists each option whose value moved, plus the aggregate adjustment when
/// the report carries one.
pub fn auto_reason(checks: &[QuantityCheck], report: &ValidationReport) -> String {
    let moved: Vec<String> = checks
        .iter()
        .filter_map(|c| {
            let proposed = c.whole()?;
            (proposed != c.original).then(|| {
                format!(
                    "{} {} -> {} ({:+})",
                    c.option_name,
                    c.original,
                    proposed,
                    proposed - c.original
                )
            })
        })
        .collect();

    let mut reason = if moved.is_empty() {
        "Option stock update".to_string()
    } else {
        format!("Option stock update: {}", moved.join(", "))
    };

    let adjustment = report.warnings.iter().find_map(|f| match f.kind {
        FindingKind::InventoryAdjustment {
            units, direction, ..
        } => Some((units, direction)),
        _ => None,
    });
    if let Some((units, direction)) = adjustment {
        reason.push_str(&format!("; total {} of {units}", direction.as_str()));
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ValidationLimits {
        ValidationLimits::default()
    }

    #[test]
    fn per_option_critical_checks() {
        let checks = vec![
            QuantityCheck::new("a", "A", 4, -1.0),
            QuantityCheck::new("b", "B", 4, 1_000_000.0),
            QuantityCheck::new("c", "C", 4, 2.5),
            QuantityCheck::new("d", "D", 4, f64::NAN),
            QuantityCheck::new("e", "E", 4, 1.0).with_damaged(2),
        ];
        let r = validate(&checks, 0, TotalPolicy::Unchecked, &limits());
        assert!(!r.is_valid);
        assert_eq!(r.critical_count(), 5);
        assert_eq!(r.findings_for("a")[0].kind, FindingKind::Negative);
        assert_eq!(
            r.findings_for("b")[0].kind,
            FindingKind::ExceedsMaximum { max: 999_999 }
        );
        assert_eq!(r.findings_for("c")[0].kind, FindingKind::NotWholeNumber);
        assert_eq!(r.findings_for("d")[0].kind, FindingKind::NotWholeNumber);
        assert_eq!(
            r.findings_for("e")[0].kind,
            FindingKind::BelowDamaged { damaged: 2 }
        );
    }

    #[test]
    fn first_critical_finding_is_the_only_one_for_that_option() {
        // Negative and far below the damaged count, a 54-unit swing.
        let checks = vec![QuantityCheck::new("a", "A", 50, -4.0).with_damaged(3)];
        let r = validate(&checks, 50, TotalPolicy::Unchecked, &limits());
        assert_eq!(r.findings_for("a").len(), 1);
        assert_eq!(r.findings_for("a")[0].kind, FindingKind::Negative);
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn zero_out_warns_and_is_significant() {
        let checks = vec![
            QuantityCheck::new("a", "A", 4, 0.0),
            QuantityCheck::new("b", "B", 6, 6.0),
        ];
        let r = validate(&checks, 10, TotalPolicy::Adjustable, &limits());
        assert!(r.is_valid);
        assert!(r.has_warnings);
        let kinds: Vec<&FindingKind> = r.findings_for("a").iter().map(|f| &f.kind).collect();
        assert!(kinds.contains(&&FindingKind::BecomesUnavailable));
        assert!(kinds.contains(&&FindingKind::SignificantChange {
            units: 4,
            direction: Direction::Decrease
        }));
    }

    #[test]
    fn significance_thresholds_are_strict() {
        // 5 units on 100 = 5%: neither threshold exceeded.
        let r = validate(
            &[QuantityCheck::new("a", "A", 100, 105.0)],
            105,
            TotalPolicy::Adjustable,
            &limits(),
        );
        assert!(!r.has_warnings);

        // 6 units: absolute threshold exceeded.
        let r = validate(
            &[QuantityCheck::new("a", "A", 100, 106.0)],
            106,
            TotalPolicy::Adjustable,
            &limits(),
        );
        assert!(r.requires_reason());

        // 2 units on 5 = 40%: relative threshold exceeded.
        let r = validate(
            &[QuantityCheck::new("a", "A", 5, 7.0)],
            7,
            TotalPolicy::Adjustable,
            &limits(),
        );
        assert_eq!(
            r.findings_for("a")[0].kind,
            FindingKind::SignificantChange {
                units: 2,
                direction: Direction::Increase
            }
        );
    }

    #[test]
    fn back_in_stock_is_a_notice() {
        let r = validate(
            &[QuantityCheck::new("a", "A", 0, 3.0)],
            3,
            TotalPolicy::Adjustable,
            &limits(),
        );
        assert!(r.is_valid);
        assert_eq!(r.notices.len(), 1);
        assert_eq!(r.notices[0].kind, FindingKind::BackInStock);
    }

    #[test]
    fn exact_policy_mismatch_is_critical() {
        let checks = vec![
            QuantityCheck::new("a", "A", 5, 5.0),
            QuantityCheck::new("b", "B", 5, 6.0),
        ];
        let r = validate(&checks, 10, TotalPolicy::Exact, &limits());
        assert!(!r.is_valid);
        assert_eq!(
            r.critical[0].kind,
            FindingKind::TotalMismatch {
                expected: 10,
                actual: 11
            }
        );
    }

    #[test]
    fn adjustable_policy_mismatch_is_warning_with_significance() {
        let checks = vec![
            QuantityCheck::new("a", "A", 5, 5.0),
            QuantityCheck::new("b", "B", 5, 6.0),
        ];
        let r = validate(&checks, 10, TotalPolicy::Adjustable, &limits());
        assert!(r.is_valid);
        assert!(r.has_warnings);
        assert_eq!(
            r.warnings[0].kind,
            FindingKind::InventoryAdjustment {
                units: 1,
                direction: Direction::Increase,
                significant: false
            }
        );

        // 3 of 10 = 30% > 20%.
        let checks = vec![
            QuantityCheck::new("a", "A", 5, 4.0),
            QuantityCheck::new("b", "B", 5, 3.0),
        ];
        let r = validate(&checks, 10, TotalPolicy::Adjustable, &limits());
        assert!(r.requires_reason());
    }

    #[test]
    fn unchecked_policy_ignores_totals() {
        let checks = vec![QuantityCheck::new("a", "A", 5, 5.0)];
        let r = validate(&checks, 100, TotalPolicy::Unchecked, &limits());
        assert_eq!(r, ValidationReport::clean());
    }

    #[test]
    fn all_zero_warns_once() {
        let checks = vec![
            QuantityCheck::new("a", "A", 0, 0.0),
            QuantityCheck::new("b", "B", 0, 0.0),
        ];
        let r = validate(&checks, 0, TotalPolicy::Adjustable, &limits());
        assert!(r.is_valid);
        assert_eq!(r.warnings.len(), 1);
        assert_eq!(r.warnings[0].kind, FindingKind::NoStockAnywhere);
        assert!(r.per_option.is_empty());
    }

    #[test]
    fn auto_reason_lists_moved_options() {
        let checks = vec![
            QuantityCheck::new("a", "Small", 4, 10.0),
            QuantityCheck::new("b", "Large", 6, 6.0),
        ];
        let r = validate(&checks, 10, TotalPolicy::Adjustable, &limits());
        let reason = auto_reason(&checks, &r);
        assert_eq!(
            reason,
            "Option stock update: Small 4 -> 10 (+6); total increase of 6"
        );
    }
}
