//! Save gate.
//!
//! Every save MUST pass through [`check_save_gate`] before any backend call.
//! A report with critical findings blocks; warnings never do.

use crate::ValidationReport;

#[derive(Clone, Debug, PartialEq)]
pub enum SaveGate {
    /// No critical findings. `reason_required` is set for significant changes.
    Permitted { reason_required: bool },
    /// Critical findings present. Callers must not issue the write.
    Blocked { critical_count: usize },
}

impl SaveGate {
    pub fn is_permitted(&self) -> bool {
        matches!(self, SaveGate::Permitted { .. })
    }

    pub fn is_blocked(&self) -> bool {
        !self.is_permitted()
    }
}

pub fn check_save_gate(report: &ValidationReport) -> SaveGate {
    if report.is_valid {
        SaveGate::Permitted {
            reason_required: report.requires_reason(),
        }
    } else {
        SaveGate::Blocked {
            critical_count: report.critical_count(),
        }
    }
}
