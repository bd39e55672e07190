//! Reconciliation session: one per open inventory editor.
//!
//! # Invariants
//!
//! 1. **Gate before write.** Option writes are only reachable through a
//!    [`SavePlan`], and a plan only exists if both the full edit set and the
//!    group as it will stand after that write validated without critical
//!    findings.
//! 2. **Revert before request.** The plan records pre-edit snapshots before
//!    the optimistic update is applied; failure restores them exactly.
//! 3. **One write per option.** An option carried by an in-flight plan cannot
//!    be planned again until that plan is finished.
//! 4. **No redistribution after a targeted save.** The post-save refresh only
//!    reports drift. Redistribution runs on the explicit menu-level paths.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use stk_backend::InventoryBackend;
use stk_reconcile::{
    auto_reason, check_save_gate, detect_drift, plan_redistribution, validate, QuantityCheck,
    RedistributionPlan, SaveGate, StockDrift, TotalPolicy, ValidationLimits, ValidationReport,
};
use stk_schemas::{
    ConfirmedWrite, ItemSnapshot, ItemUpdate, OptionBulkWrite, OptionGroupSnapshot,
    OptionWriteResponse, QuantityMap, StockMode,
};

use crate::edit::{EditSet, OptionEdit};
use crate::event::{Phase, SaveRejected, SessionError, SessionEvent, WriteFailure};
use crate::plan::{PlannedWrite, SaveOutcome, SavePlan};

const DEFAULT_ADJUST_REASON: &str = "Menu item stock adjustment";
const DEFAULT_SYNC_REASON: &str = "Synchronize option stock with item total";

/// Result of [`InventorySession::adjust_item_stock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustOutcome {
    pub item_stock: i64,
    /// `None` when the item is not option-level tracked or already in sync.
    pub redistribution: Option<RedistributionPlan>,
}

pub struct InventorySession<B> {
    session_id: Uuid,
    backend: Arc<B>,
    limits: ValidationLimits,
    item: ItemSnapshot,
    group_id: Option<String>,
    edits: EditSet,
    report: ValidationReport,
    phase: Phase,
    /// `(plan seq, quantities written)` for every unfinished plan.
    in_flight: Vec<(u64, QuantityMap)>,
    next_seq: u64,
    events: Vec<SessionEvent>,
}

impl<B: InventoryBackend> InventorySession<B> {
    pub async fn open(
        backend: Arc<B>,
        item_id: &str,
        limits: ValidationLimits,
    ) -> Result<Self, SessionError> {
        let item = backend.get_item(item_id).await?;
        Ok(Self::from_snapshot(backend, item, limits))
    }

    pub fn from_snapshot(backend: Arc<B>, item: ItemSnapshot, limits: ValidationLimits) -> Self {
        let mut session = Self {
            session_id: Uuid::new_v4(),
            backend,
            limits,
            item: item.clone(),
            group_id: None,
            edits: EditSet::default(),
            report: ValidationReport::clean(),
            phase: Phase::Idle,
            in_flight: Vec::new(),
            next_seq: 1,
            events: Vec::new(),
        };
        session.load_item(item);
        info!(
            session_id = %session.session_id,
            item_id = %session.item.id,
            tracking = session.item.inventory_tracking_type.as_str(),
            group_id = session.group_id.as_deref().unwrap_or("-"),
            "inventory session opened"
        );
        session
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn item(&self) -> &ItemSnapshot {
        &self.item
    }

    pub fn tracked_group(&self) -> Option<&OptionGroupSnapshot> {
        let id = self.group_id.as_deref()?;
        self.item.option_groups.iter().find(|g| g.id == id)
    }

    pub fn stock_mode(&self) -> StockMode {
        self.item.stock_mode()
    }

    pub fn edits(&self) -> &EditSet {
        &self.edits
    }

    pub fn edit(&self, option_id: &str) -> Option<&OptionEdit> {
        self.edits.get(option_id)
    }

    /// Validation of the full edit set, current as of the last edit.
    pub fn validation(&self) -> &ValidationReport {
        &self.report
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Set an option's pending quantity and revalidate the whole set.
    ///
    /// Permitted while the option is saving (last write wins locally); the
    /// new value is not sent until that write resolves.
    pub fn set_quantity(
        &mut self,
        option_id: &str,
        quantity: i64,
    ) -> Result<&ValidationReport, SessionError> {
        self.apply_edit(option_id, quantity as f64, None)
    }

    /// Like [`Self::set_quantity`] for raw text input. Unparsable or
    /// fractional text is kept and reported by the validator.
    pub fn set_quantity_input(
        &mut self,
        option_id: &str,
        raw: &str,
    ) -> Result<&ValidationReport, SessionError> {
        let parsed = raw.trim().parse::<f64>().unwrap_or(f64::NAN);
        self.apply_edit(option_id, parsed, Some(raw.to_string()))
    }

    /// Reset every pending value that is not in flight to its baseline.
    pub fn discard_edits(&mut self) {
        let group = self.tracked_group().cloned();
        if let Some(group) = group {
            for opt in &group.options {
                if let Some(edit) = self.edits.get_mut(&opt.id) {
                    if !edit.loading {
                        edit.set_pending(edit.original as f64, None);
                    }
                }
            }
        }
        self.revalidate();
        self.settle_phase();
    }

    fn apply_edit(
        &mut self,
        option_id: &str,
        pending: f64,
        input: Option<String>,
    ) -> Result<&ValidationReport, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let edit = self
            .edits
            .get_mut(option_id)
            .ok_or_else(|| SessionError::UnknownOption {
                option_id: option_id.to_string(),
            })?;
        edit.set_pending(pending, input);
        debug!(
            session_id = %self.session_id,
            option_id,
            pending,
            changed = edit.changed,
            loading = edit.loading,
            "option edited"
        );

        self.revalidate();
        self.settle_phase();
        Ok(&self.report)
    }

    fn policy(&self) -> TotalPolicy {
        if self.item.enable_stock_tracking {
            TotalPolicy::for_tracking(self.item.inventory_tracking_type)
        } else {
            TotalPolicy::Unchecked
        }
    }

    fn revalidate(&mut self) {
        self.report = if self.edits.is_empty() {
            ValidationReport::clean()
        } else {
            validate(
                &self.edits.checks(),
                self.item.stock_quantity,
                self.policy(),
                &self.limits,
            )
        };
    }

    fn settle_phase(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }
        self.phase = if !self.in_flight.is_empty() {
            Phase::Saving
        } else if self.edits.has_changes() {
            Phase::Editing
        } else if matches!(self.phase, Phase::Committed | Phase::RolledBack) {
            self.phase
        } else {
            Phase::Idle
        };
    }

    // -----------------------------------------------------------------------
    // Two-phase save
    // -----------------------------------------------------------------------

    /// Plan a save of every changed option. Applies the optimistic update.
    ///
    /// One changed option plans a single-option write; more plan one bulk
    /// write carrying only the changed options. `reason` defaults to a
    /// generated description of the change.
    pub fn begin_save(&mut self, reason: Option<&str>) -> Result<SavePlan, SaveRejected> {
        let planned = self
            .ensure_saveable()
            .map(|()| self.edits.changed().map(|e| e.option_id.clone()).collect())
            .and_then(|targets| self.plan_save(targets, reason));
        self.note_rejection(planned)
    }

    /// Plan a save of a single option, leaving other edits pending.
    pub fn begin_save_option(
        &mut self,
        option_id: &str,
        reason: Option<&str>,
    ) -> Result<SavePlan, SaveRejected> {
        let planned = self
            .ensure_saveable()
            .and_then(|()| match self.edits.get(option_id) {
                None => Err(SaveRejected::UnknownOption {
                    option_id: option_id.to_string(),
                }),
                Some(edit) if edit.changed => Ok(vec![option_id.to_string()]),
                Some(_) => Ok(Vec::new()),
            })
            .and_then(|targets| self.plan_save(targets, reason));
        self.note_rejection(planned)
    }

    fn ensure_saveable(&self) -> Result<(), SaveRejected> {
        if self.is_closed() {
            return Err(SaveRejected::Closed);
        }
        if self.group_id.is_none() {
            return Err(SaveRejected::NoTrackedGroup);
        }
        Ok(())
    }

    fn note_rejection(
        &mut self,
        planned: Result<SavePlan, SaveRejected>,
    ) -> Result<SavePlan, SaveRejected> {
        if let Err(rejected) = &planned {
            warn!(
                session_id = %self.session_id,
                item_id = %self.item.id,
                %rejected,
                "save rejected"
            );
            self.events.push(SessionEvent::SaveRejected(rejected.clone()));
        }
        planned
    }

    fn plan_save(
        &mut self,
        targets: Vec<String>,
        reason: Option<&str>,
    ) -> Result<SavePlan, SaveRejected> {
        if targets.is_empty() {
            return Err(SaveRejected::NothingToSave);
        }

        let mut checks: Vec<QuantityCheck> = Vec::with_capacity(targets.len());
        let mut quantities = QuantityMap::new();
        for id in &targets {
            let edit = self
                .edits
                .get(id)
                .ok_or_else(|| SaveRejected::UnknownOption {
                    option_id: id.clone(),
                })?;
            if edit.loading {
                return Err(SaveRejected::OptionBusy {
                    option_id: id.clone(),
                });
            }
            checks.push(
                QuantityCheck::new(&edit.option_id, &edit.option_name, edit.original, edit.pending)
                    .with_damaged(edit.damaged),
            );
            if let Some(q) = edit.pending_whole() {
                quantities.insert(id.as_str(), q);
            }
        }

        if let SaveGate::Blocked { critical_count } = check_save_gate(&self.report) {
            return Err(SaveRejected::Invalid { critical_count });
        }
        if quantities.len() != targets.len() {
            return Err(SaveRejected::Invalid {
                critical_count: self.report.critical_count().max(1),
            });
        }

        // The group as it will stand once this write lands: targets at their
        // pending values, everything else at its in-flight or baseline value.
        let post_write = validate(
            &self.post_write_checks(&targets),
            self.item.stock_quantity,
            self.policy(),
            &self.limits,
        );
        let reason_required = match check_save_gate(&post_write) {
            SaveGate::Blocked { critical_count } => {
                return Err(SaveRejected::Invalid { critical_count })
            }
            SaveGate::Permitted { reason_required } => reason_required,
        };

        let reason = match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => r.to_string(),
            None => auto_reason(&checks, &post_write),
        };

        let group_id = self.group_id.clone().ok_or(SaveRejected::NoTrackedGroup)?;
        let group = self
            .item
            .option_groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or(SaveRejected::NoTrackedGroup)?;

        // Snapshot first, then apply the optimistic values.
        let mut revert = Vec::with_capacity(quantities.len());
        for (id, _) in quantities.iter() {
            let opt = group
                .option(id)
                .ok_or_else(|| SaveRejected::UnknownOption {
                    option_id: id.to_string(),
                })?;
            revert.push(opt.clone());
        }
        for (id, q) in quantities.iter() {
            if let Some(opt) = group.option_mut(id) {
                opt.stock_quantity = q;
            }
        }
        group.refresh_availability();

        for id in &targets {
            if let Some(edit) = self.edits.get_mut(id) {
                edit.loading = true;
                edit.error = None;
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.push((seq, quantities.clone()));
        self.phase = Phase::Saving;

        let single = match quantities.iter().next() {
            Some((option_id, quantity)) if quantities.len() == 1 => {
                Some((option_id.to_string(), quantity))
            }
            _ => None,
        };
        let write = match single {
            Some((option_id, quantity)) => PlannedWrite::Single {
                option_id,
                quantity,
            },
            None => PlannedWrite::Bulk { quantities },
        };

        info!(
            session_id = %self.session_id,
            item_id = %self.item.id,
            group_id = %group_id,
            seq,
            changed = revert.len(),
            bulk = matches!(write, PlannedWrite::Bulk { .. }),
            reason_required,
            "save planned"
        );

        Ok(SavePlan {
            session_id: self.session_id,
            seq,
            group_id,
            write,
            reason,
            reason_required,
            revert,
        })
    }

    /// Checks for every option of the tracked group after writing `targets`.
    /// Options outside `targets` carry no change of their own.
    fn post_write_checks(&self, targets: &[String]) -> Vec<QuantityCheck> {
        self.edits
            .iter()
            .map(|e| {
                if targets.contains(&e.option_id) {
                    QuantityCheck::new(&e.option_id, &e.option_name, e.original, e.pending)
                        .with_damaged(e.damaged)
                } else {
                    let settled = self
                        .in_flight
                        .iter()
                        .rev()
                        .find_map(|(_, q)| q.get(&e.option_id))
                        .unwrap_or(e.original);
                    QuantityCheck::new(&e.option_id, &e.option_name, settled, settled as f64)
                        .with_damaged(e.damaged)
                }
            })
            .collect()
    }

    /// Apply the result of a dispatched plan: commit on a confirmed response,
    /// roll back on anything else. Results arriving after [`Self::close`]
    /// are discarded.
    pub fn finish_save(
        &mut self,
        plan: SavePlan,
        result: Result<OptionWriteResponse, stk_backend::BackendError>,
    ) -> SaveOutcome {
        let option_ids = plan.option_ids();
        let known = self.in_flight.iter().any(|(seq, _)| *seq == plan.seq);
        if plan.session_id != self.session_id || self.is_closed() || !known {
            info!(
                session_id = %self.session_id,
                seq = plan.seq,
                "save result discarded"
            );
            self.events.push(SessionEvent::Discarded { option_ids });
            return SaveOutcome::Discarded;
        }
        self.in_flight.retain(|(seq, _)| *seq != plan.seq);
        for id in &option_ids {
            if let Some(edit) = self.edits.get_mut(id) {
                edit.loading = false;
            }
        }

        let confirmed = match result {
            Ok(resp) => resp
                .confirmed()
                .filter(|c| c.group.id == plan.group_id)
                .ok_or(WriteFailure::Unconfirmed),
            Err(e) => Err(WriteFailure::Backend(e)),
        };

        let outcome = match confirmed {
            Ok(c) => self.commit(&plan, c),
            Err(failure) => self.roll_back(&plan, failure),
        };
        self.revalidate();
        outcome
    }

    fn commit(&mut self, plan: &SavePlan, confirmed: ConfirmedWrite) -> SaveOutcome {
        let ConfirmedWrite { mut group, message } = confirmed;
        group.refresh_availability();
        self.item.replace_group(group.clone());
        // The backend keeps the aggregate equal to the tracked group total.
        if self.item.stock_mode().is_option_level() {
            self.item.stock_quantity = i64::try_from(group.total_stock()).unwrap_or(i64::MAX);
        }
        self.edits.rebase(&group);
        self.reapply_in_flight();

        let option_ids = plan.option_ids();
        info!(
            session_id = %self.session_id,
            item_id = %self.item.id,
            group_id = %plan.group_id,
            seq = plan.seq,
            %message,
            "save committed"
        );
        self.events.push(SessionEvent::Committed {
            option_ids: option_ids.clone(),
            message: message.clone(),
        });
        if self.in_flight.is_empty() {
            self.phase = Phase::Committed;
        }
        SaveOutcome::Committed {
            option_ids,
            message,
        }
    }

    fn roll_back(&mut self, plan: &SavePlan, failure: WriteFailure) -> SaveOutcome {
        if let Some(group) = self
            .item
            .option_groups
            .iter_mut()
            .find(|g| g.id == plan.group_id)
        {
            for snapshot in &plan.revert {
                if let Some(opt) = group.option_mut(&snapshot.id) {
                    *opt = snapshot.clone();
                }
            }
        }

        let error = failure.to_string();
        for snapshot in &plan.revert {
            if let Some(edit) = self.edits.get_mut(&snapshot.id) {
                edit.error = Some(error.clone());
                edit.recompute_changed();
            }
        }

        let option_ids = plan.option_ids();
        warn!(
            session_id = %self.session_id,
            item_id = %self.item.id,
            group_id = %plan.group_id,
            seq = plan.seq,
            %error,
            "save rolled back"
        );
        self.events.push(SessionEvent::RolledBack {
            option_ids: option_ids.clone(),
            error: failure.clone(),
        });
        if self.in_flight.is_empty() {
            self.phase = Phase::RolledBack;
        }
        SaveOutcome::RolledBack {
            option_ids,
            error: failure,
        }
    }

    /// Re-apply optimistic values of unfinished plans after the group was
    /// replaced by a server snapshot.
    fn reapply_in_flight(&mut self) {
        let Some(group_id) = self.group_id.as_deref() else {
            return;
        };
        let Some(group) = self
            .item
            .option_groups
            .iter_mut()
            .find(|g| g.id == group_id)
        else {
            return;
        };
        if self.in_flight.is_empty() {
            return;
        }
        for (_, quantities) in &self.in_flight {
            for (id, q) in quantities.iter() {
                if let Some(opt) = group.option_mut(id) {
                    opt.stock_quantity = q;
                }
            }
        }
        group.refresh_availability();
    }

    // -----------------------------------------------------------------------
    // Composed operations
    // -----------------------------------------------------------------------

    /// Save every changed option, then refresh the parent item.
    ///
    /// The refresh never redistributes; a resulting mismatch is only
    /// reported as [`SessionEvent::DriftDetected`].
    pub async fn save(&mut self, reason: Option<&str>) -> Result<SaveOutcome, SessionError> {
        let plan = self.begin_save(reason).map_err(SessionError::Rejected)?;
        self.run_plan(plan).await
    }

    pub async fn save_option(
        &mut self,
        option_id: &str,
        reason: Option<&str>,
    ) -> Result<SaveOutcome, SessionError> {
        let plan = self
            .begin_save_option(option_id, reason)
            .map_err(SessionError::Rejected)?;
        self.run_plan(plan).await
    }

    async fn run_plan(&mut self, plan: SavePlan) -> Result<SaveOutcome, SessionError> {
        let result = plan.dispatch(self.backend.as_ref()).await;
        let outcome = self.finish_save(plan, result);
        if outcome.is_committed() {
            if let Err(e) = self.refresh().await {
                warn!(
                    session_id = %self.session_id,
                    item_id = %self.item.id,
                    error = %e,
                    "post-save refresh failed"
                );
            }
        }
        Ok(outcome)
    }

    /// Reload the item from the backend and report aggregate drift.
    pub async fn refresh(&mut self) -> Result<StockDrift, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let item = self.backend.get_item(&self.item.id).await?;
        self.load_item(item);

        let drift = detect_drift(&self.item);
        if drift.is_mismatch() {
            info!(
                session_id = %self.session_id,
                item_id = %self.item.id,
                ?drift,
                "aggregate stock drift detected"
            );
            self.events.push(SessionEvent::DriftDetected(drift.clone()));
        }
        Ok(drift)
    }

    fn load_item(&mut self, mut item: ItemSnapshot) {
        for group in &mut item.option_groups {
            group.refresh_availability();
        }
        let tracked = item.tracked_group().cloned();
        self.item = item;

        match tracked {
            Some(group) if self.group_id.as_deref() == Some(group.id.as_str()) => {
                self.edits.rebase(&group);
            }
            Some(group) => {
                if self.group_id.is_some() {
                    warn!(
                        session_id = %self.session_id,
                        item_id = %self.item.id,
                        group_id = %group.id,
                        "tracked option group changed; edits reset"
                    );
                }
                self.edits = EditSet::from_group(&group);
                self.group_id = Some(group.id);
            }
            None => {
                self.edits = EditSet::default();
                self.group_id = None;
            }
        }
        self.reapply_in_flight();
        self.revalidate();
    }

    // -----------------------------------------------------------------------
    // Menu-level paths
    // -----------------------------------------------------------------------

    /// Set the item's aggregate stock, then (option-level tracking only)
    /// redistribute the new total across the tracked group.
    pub async fn adjust_item_stock(
        &mut self,
        new_total: i64,
        reason: Option<&str>,
    ) -> Result<AdjustOutcome, SessionError> {
        self.ensure_quiescent()?;
        if new_total < 0 {
            return Err(SessionError::InvalidTotal { total: new_total });
        }
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ADJUST_REASON);

        let update = ItemUpdate {
            stock_quantity: Some(new_total),
            reason: Some(reason.to_string()),
            ..ItemUpdate::default()
        };
        let updated = self.backend.update_item(&self.item.id, &update).await?;
        info!(
            session_id = %self.session_id,
            item_id = %self.item.id,
            from = self.item.stock_quantity,
            to = updated.stock_quantity,
            "item stock adjusted"
        );
        // Only the aggregate fields; the response may omit option groups.
        self.item.stock_quantity = updated.stock_quantity;
        self.item.damaged_quantity = updated.damaged_quantity;
        self.item.low_stock_threshold = updated.low_stock_threshold;
        self.revalidate();

        let redistribution = self.redistribute(updated.stock_quantity, reason).await?;
        Ok(AdjustOutcome {
            item_stock: self.item.stock_quantity,
            redistribution,
        })
    }

    /// Redistribute the item's current aggregate across the tracked group.
    /// `Ok(None)` when already in sync or not option-level tracked.
    pub async fn sync_options_to_item_total(
        &mut self,
        reason: Option<&str>,
    ) -> Result<Option<RedistributionPlan>, SessionError> {
        self.ensure_quiescent()?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_SYNC_REASON);
        self.redistribute(self.item.stock_quantity, reason).await
    }

    fn ensure_quiescent(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        if self.edits.has_changes() || !self.in_flight.is_empty() {
            return Err(SessionError::PendingEdits);
        }
        Ok(())
    }

    async fn redistribute(
        &mut self,
        target: i64,
        reason: &str,
    ) -> Result<Option<RedistributionPlan>, SessionError> {
        let Some(plan) = plan_redistribution(&self.item, target)? else {
            return Ok(None);
        };
        if plan.changes.is_empty() {
            return Ok(None);
        }

        // The distributor conserves the total, but per-option limits still apply.
        let checks: Vec<QuantityCheck> = self
            .edits
            .iter()
            .filter_map(|e| {
                let q = plan.allocation.get(&e.option_id)?;
                Some(
                    QuantityCheck::new(&e.option_id, &e.option_name, e.original, q as f64)
                        .with_damaged(e.damaged),
                )
            })
            .collect();
        let report = validate(&checks, target, TotalPolicy::Unchecked, &self.limits);
        if let SaveGate::Blocked { critical_count } = check_save_gate(&report) {
            let rejected = SaveRejected::Invalid { critical_count };
            self.events.push(SessionEvent::SaveRejected(rejected.clone()));
            return Err(SessionError::Rejected(rejected));
        }

        let write = OptionBulkWrite {
            quantities: plan.changes.clone(),
            reason: reason.to_string(),
        };
        let confirmed = match self
            .backend
            .update_option_quantities(&plan.group_id, &write)
            .await
        {
            Ok(resp) => resp
                .confirmed()
                .filter(|c| c.group.id == plan.group_id)
                .ok_or(WriteFailure::Unconfirmed),
            Err(e) => Err(WriteFailure::Backend(e)),
        };

        match confirmed {
            Ok(ConfirmedWrite { mut group, message }) => {
                group.refresh_availability();
                self.item.replace_group(group.clone());
                self.edits.rebase(&group);
                self.revalidate();
                info!(
                    session_id = %self.session_id,
                    item_id = %self.item.id,
                    group_id = %plan.group_id,
                    target,
                    changed = plan.changes.len(),
                    "options redistributed"
                );
                self.events.push(SessionEvent::Redistributed {
                    group_id: plan.group_id.clone(),
                    changes: plan.changes.clone(),
                    message,
                });
                Ok(Some(plan))
            }
            Err(failure) => {
                warn!(
                    session_id = %self.session_id,
                    item_id = %self.item.id,
                    group_id = %plan.group_id,
                    error = %failure,
                    "redistribution failed"
                );
                let drift = detect_drift(&self.item);
                if drift.is_mismatch() {
                    self.events.push(SessionEvent::DriftDetected(drift));
                }
                Err(SessionError::Write(failure))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Close the session. Writes already in flight run to completion, but
    /// their results are discarded by [`Self::finish_save`].
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        info!(
            session_id = %self.session_id,
            item_id = %self.item.id,
            in_flight = self.in_flight.len(),
            "inventory session closed"
        );
        self.phase = Phase::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stk_backend::MemoryBackend;
    use stk_schemas::{OptionSnapshot, TrackingType};

    fn item(tracking: TrackingType) -> ItemSnapshot {
        ItemSnapshot {
            id: "tea".to_string(),
            name: "Iced Tea".to_string(),
            stock_quantity: 10,
            damaged_quantity: 0,
            low_stock_threshold: None,
            enable_stock_tracking: true,
            inventory_tracking_type: tracking,
            option_groups: vec![OptionGroupSnapshot {
                id: "size".to_string(),
                name: "Size".to_string(),
                min_select: 1,
                max_select: 1,
                inventory_tracking_enabled: true,
                tracking_priority: Some(1),
                low_stock_threshold: Some(2),
                options: vec![
                    OptionSnapshot::new("small", "Small", 4),
                    OptionSnapshot::new("large", "Large", 6),
                ],
            }],
        }
    }

    fn session(tracking: TrackingType) -> InventorySession<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::with_items([item(tracking)]));
        InventorySession::from_snapshot(backend, item(tracking), ValidationLimits::default())
    }

    #[test]
    fn phase_follows_edits() {
        let mut s = session(TrackingType::OptionLevel);
        assert_eq!(s.phase(), Phase::Idle);
        s.set_quantity("small", 5).unwrap();
        assert_eq!(s.phase(), Phase::Editing);
        s.set_quantity("small", 4).unwrap();
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn every_edit_revalidates_the_whole_set() {
        let mut s = session(TrackingType::MenuItemLevel);
        let report = s.set_quantity("small", 5).unwrap();
        // 5 + 6 != 10 under strict tracking.
        assert!(!report.is_valid);
        let report = s.set_quantity("large", 5).unwrap();
        assert!(report.is_valid);
    }

    #[test]
    fn raw_input_is_kept_and_reported() {
        let mut s = session(TrackingType::OptionLevel);
        let report = s.set_quantity_input("small", "4.5").unwrap();
        assert!(!report.is_valid);
        let edit = s.edit("small").unwrap();
        assert_eq!(edit.input.as_deref(), Some("4.5"));
        assert!(edit.changed);

        assert!(!s.set_quantity_input("small", "lots").unwrap().is_valid);
        assert!(s.set_quantity_input("small", " 7 ").unwrap().is_valid);
        assert_eq!(s.edit("small").unwrap().pending_whole(), Some(7));
    }

    #[test]
    fn unknown_option_is_an_error() {
        let mut s = session(TrackingType::OptionLevel);
        assert_eq!(
            s.set_quantity("medium", 1).unwrap_err(),
            SessionError::UnknownOption {
                option_id: "medium".to_string()
            }
        );
    }

    #[test]
    fn begin_save_applies_optimistic_update_with_revert() {
        let mut s = session(TrackingType::OptionLevel);
        s.set_quantity("small", 0).unwrap();
        let plan = s.begin_save(None).unwrap();

        assert_eq!(
            plan.write(),
            &PlannedWrite::Single {
                option_id: "small".to_string(),
                quantity: 0
            }
        );
        let small = s.tracked_group().unwrap().option("small").unwrap();
        assert_eq!(small.stock_quantity, 0);
        assert!(small.is_out_of_stock);
        assert!(s.edit("small").unwrap().loading);
        assert_eq!(s.phase(), Phase::Saving);
    }

    #[test]
    fn discard_edits_restores_baseline() {
        let mut s = session(TrackingType::OptionLevel);
        s.set_quantity("small", 9).unwrap();
        s.set_quantity_input("large", "abc").unwrap();
        s.discard_edits();
        assert!(!s.edits().has_changes());
        assert!(s.validation().is_valid);
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn closed_session_refuses_edits_and_saves() {
        let mut s = session(TrackingType::OptionLevel);
        s.close();
        assert_eq!(s.set_quantity("small", 1).unwrap_err(), SessionError::Closed);
        assert_eq!(s.begin_save(None).unwrap_err(), SaveRejected::Closed);
    }

    #[tokio::test]
    async fn save_commits_and_refresh_keeps_saved_values() {
        let mut s = session(TrackingType::OptionLevel);
        s.set_quantity("small", 5).unwrap();

        let outcome = s.save(Some("recount")).await.unwrap();
        assert!(outcome.is_committed());
        assert_eq!(s.phase(), Phase::Committed);

        let small = s.edit("small").unwrap();
        assert_eq!(small.original, 5);
        assert!(!small.changed);
        assert_eq!(s.item().stock_quantity, 11);
        assert!(!s
            .events()
            .iter()
            .any(|e| matches!(e, SessionEvent::Redistributed { .. })));
    }
}
