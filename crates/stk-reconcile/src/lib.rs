//! stk-reconcile
//!
//! Option-level stock reconciliation, pure half:
//! - Distributor: split an aggregate quantity across options, proportionally,
//!   with deterministic remainder allocation (`sum == target` exactly).
//! - Validator: classify a proposed edit set into critical errors, warnings
//!   and informational notices.
//! - Save gate + drift detection consumed by the controller.
//!
//! Deterministic, pure logic. No IO. No backend calls.

mod distribute;
mod drift;
mod gate;
mod validate;

pub use distribute::{distribute, DistributeError};
pub use drift::{detect_drift, plan_redistribution, RedistributionPlan, StockDrift};
pub use gate::{check_save_gate, SaveGate};
pub use validate::{
    auto_reason, validate, Direction, Finding, FindingKind, QuantityCheck, Severity, TotalPolicy,
    ValidationLimits, ValidationReport,
};
