//! Quantity edit set: per-option baseline vs pending value.
//!
//! Ephemeral. Built from the tracked group when a session opens, mutated on
//! every edit, never persisted.

use stk_reconcile::QuantityCheck;
use stk_schemas::{OptionGroupSnapshot, OptionSnapshot};

#[derive(Clone, Debug, PartialEq)]
pub struct OptionEdit {
    pub option_id: String,
    pub option_name: String,
    /// Last value confirmed by the backend.
    pub original: i64,
    pub damaged: i64,
    /// User's value. `f64` so fractional or unparsable input survives until
    /// the validator reports it.
    pub pending: f64,
    /// Raw text when the value came from [`crate::InventorySession::set_quantity_input`].
    pub input: Option<String>,
    pub changed: bool,
    /// A write carrying this option is in flight.
    pub loading: bool,
    /// Message from the last failed write, cleared on the next edit or commit.
    pub error: Option<String>,
}

impl OptionEdit {
    fn from_option(opt: &OptionSnapshot) -> Self {
        Self {
            option_id: opt.id.clone(),
            option_name: opt.name.clone(),
            original: opt.stock_quantity,
            damaged: opt.damaged_quantity,
            pending: opt.stock_quantity as f64,
            input: None,
            changed: false,
            loading: false,
            error: None,
        }
    }

    /// Pending value as a whole number, if it is one.
    pub fn pending_whole(&self) -> Option<i64> {
        let v = self.pending;
        (v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15).then_some(v as i64)
    }

    pub(crate) fn set_pending(&mut self, pending: f64, input: Option<String>) {
        self.pending = pending;
        self.input = input;
        self.error = None;
        self.recompute_changed();
    }

    pub(crate) fn recompute_changed(&mut self) {
        self.changed = self.pending_whole() != Some(self.original);
    }

    /// Move the baseline to a server-confirmed option. Untouched edits follow
    /// the server; edited ones keep their pending value.
    pub(crate) fn rebase(&mut self, opt: &OptionSnapshot) {
        let follow = !self.changed;
        self.original = opt.stock_quantity;
        self.damaged = opt.damaged_quantity;
        self.option_name = opt.name.clone();
        if follow {
            self.pending = opt.stock_quantity as f64;
            self.input = None;
        }
        self.recompute_changed();
    }

    fn check(&self) -> QuantityCheck {
        QuantityCheck::new(&self.option_id, &self.option_name, self.original, self.pending)
            .with_damaged(self.damaged)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditSet {
    edits: Vec<OptionEdit>,
}

impl EditSet {
    pub fn from_group(group: &OptionGroupSnapshot) -> Self {
        Self {
            edits: group.options.iter().map(OptionEdit::from_option).collect(),
        }
    }

    pub fn get(&self, option_id: &str) -> Option<&OptionEdit> {
        self.edits.iter().find(|e| e.option_id == option_id)
    }

    pub(crate) fn get_mut(&mut self, option_id: &str) -> Option<&mut OptionEdit> {
        self.edits.iter_mut().find(|e| e.option_id == option_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionEdit> + '_ {
        self.edits.iter()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn changed(&self) -> impl Iterator<Item = &OptionEdit> + '_ {
        self.edits.iter().filter(|e| e.changed)
    }

    pub fn has_changes(&self) -> bool {
        self.edits.iter().any(|e| e.changed)
    }

    pub fn any_loading(&self) -> bool {
        self.edits.iter().any(|e| e.loading)
    }

    /// Validator input for the whole set, in group order.
    pub fn checks(&self) -> Vec<QuantityCheck> {
        self.edits.iter().map(OptionEdit::check).collect()
    }

    /// Follow a server-confirmed group. Options the server no longer lists
    /// are dropped; new ones are appended unedited.
    pub(crate) fn rebase(&mut self, group: &OptionGroupSnapshot) {
        self.edits.retain(|e| group.option(&e.option_id).is_some());
        for opt in &group.options {
            match self.get_mut(&opt.id) {
                Some(edit) if edit.loading => {}
                Some(edit) => edit.rebase(opt),
                None => self.edits.push(OptionEdit::from_option(opt)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> OptionGroupSnapshot {
        OptionGroupSnapshot {
            id: "size".to_string(),
            name: "Size".to_string(),
            min_select: 1,
            max_select: 1,
            inventory_tracking_enabled: true,
            tracking_priority: Some(1),
            low_stock_threshold: None,
            options: vec![
                OptionSnapshot::new("small", "Small", 4),
                OptionSnapshot::new("large", "Large", 6),
            ],
        }
    }

    #[test]
    fn editing_back_to_baseline_clears_changed() {
        let mut set = EditSet::from_group(&group());
        let edit = set.get_mut("small").unwrap();
        edit.set_pending(5.0, None);
        assert!(edit.changed);
        edit.set_pending(4.0, None);
        assert!(!edit.changed);
    }

    #[test]
    fn fractional_pending_counts_as_changed() {
        let mut set = EditSet::from_group(&group());
        let edit = set.get_mut("small").unwrap();
        edit.set_pending(4.5, Some("4.5".to_string()));
        assert!(edit.changed);
        assert_eq!(edit.pending_whole(), None);
    }

    #[test]
    fn rebase_keeps_pending_edits_and_follows_untouched() {
        let mut set = EditSet::from_group(&group());
        set.get_mut("small").unwrap().set_pending(9.0, None);

        let mut server = group();
        server.options[0].stock_quantity = 5;
        server.options[1].stock_quantity = 8;
        set.rebase(&server);

        let small = set.get("small").unwrap();
        assert_eq!((small.original, small.pending, small.changed), (5, 9.0, true));
        let large = set.get("large").unwrap();
        assert_eq!((large.original, large.pending, large.changed), (8, 8.0, false));
    }
}
