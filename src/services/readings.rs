//! Monthly meter-reading capture, export and the per-branch month lock.
//!
//! A (year, month, branch) scope is open until it is exported, which writes
//! a submission lock; an admin unlock removes it again. Writes are refused
//! while the lock exists. The lock is checked before a write starts, not
//! while it runs, so a submit racing an export may still land.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{machine, reading};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{BillingPeriod, Branch, BranchFilter, MeterKind};
use crate::repositories::{MachineRepository, NewReading, ReadingRepository, SubmissionRepository};
use crate::services::export;
use crate::services::imports::{self, ImportReport, ReadingImportRow};
use crate::services::meter_usage::{monthly_usage, MeterValues};
use crate::services::reading_validation::{validate_readings, ReadingSubmission};

/// One eligible machine with its readings for the month and the month before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MachineReadings {
    pub machine: machine::Model,
    pub current: Option<reading::Model>,
    pub previous: Option<reading::Model>,
}

impl MachineReadings {
    /// At least one meter value captured this month. A note alone does not count.
    pub fn is_captured(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(reading::Model::has_meter_values)
    }

    /// This month's value for a meter the machine actually has.
    pub fn export_value(&self, kind: MeterKind) -> Option<i64> {
        if !self.machine.meter_enabled(kind) {
            return None;
        }
        self.current.as_ref().and_then(|r| r.meter(kind))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReadingsView {
    pub period: BillingPeriod,
    pub previous_period: BillingPeriod,
    pub branch: Branch,
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<Uuid>,
    pub machines: Vec<MachineReadings>,
    pub total_machines: usize,
    pub captured_count: usize,
    pub pending_count: usize,
}

/// Every branch's view for the month plus fleet-wide progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SplitReadingsView {
    pub period: BillingPeriod,
    pub branches: Vec<ReadingsView>,
    pub total_machines: usize,
    pub captured_count: usize,
    pub pending_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubmitResult {
    pub saved_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UnlockResult {
    pub message: String,
}

/// A rendered export sheet. `locked` reports whether the month lock was
/// written; the export itself never fails on account of the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReadingsExport {
    pub branch: Branch,
    pub period: BillingPeriod,
    pub filename: String,
    pub content: String,
    pub row_count: usize,
    pub locked: bool,
}

/// Service for monthly readings
#[derive(Clone)]
pub struct ReadingService {
    machines: Arc<dyn MachineRepository>,
    readings: Arc<dyn ReadingRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    event_sender: Arc<EventSender>,
    import_max_rows: usize,
}

impl ReadingService {
    pub fn new(
        machines: Arc<dyn MachineRepository>,
        readings: Arc<dyn ReadingRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        event_sender: Arc<EventSender>,
        import_max_rows: usize,
    ) -> Self {
        Self {
            machines,
            readings,
            submissions,
            event_sender,
            import_max_rows,
        }
    }

    async fn ensure_open(&self, period: BillingPeriod, branch: Branch) -> Result<(), ServiceError> {
        match self
            .submissions
            .find_by_year_month_branch(period, branch)
            .await?
        {
            Some(_) => {
                counter!("fleetmeter.readings.locked_rejections", 1);
                Err(ServiceError::SubmissionLocked {
                    year: period.year,
                    month: period.month,
                    branch,
                })
            }
            None => Ok(()),
        }
    }

    async fn previous_by_machine(
        &self,
        machine_ids: Vec<Uuid>,
        period: BillingPeriod,
    ) -> Result<HashMap<Uuid, reading::Model>, ServiceError> {
        Ok(self
            .readings
            .find_by_machines_and_period(machine_ids, period.previous())
            .await?
            .into_iter()
            .map(|r| (r.machine_id, r))
            .collect())
    }

    /// Per-machine view of one branch's month, independent of lock state.
    #[instrument(skip(self))]
    pub async fn get_readings(
        &self,
        period: BillingPeriod,
        branch: Branch,
        include_decommissioned: bool,
    ) -> Result<ReadingsView, ServiceError> {
        let machines = self
            .machines
            .find_active_by_branch(BranchFilter::Specific(branch), include_decommissioned)
            .await?;
        let machine_ids: Vec<Uuid> = machines.iter().map(|m| m.id).collect();

        let mut current: HashMap<Uuid, reading::Model> = self
            .readings
            .find_by_year_month_branch(period, branch)
            .await?
            .into_iter()
            .map(|r| (r.machine_id, r))
            .collect();
        let mut previous = self.previous_by_machine(machine_ids, period).await?;
        let lock = self
            .submissions
            .find_by_year_month_branch(period, branch)
            .await?;

        let machines: Vec<MachineReadings> = machines
            .into_iter()
            .map(|machine| MachineReadings {
                current: current.remove(&machine.id),
                previous: previous.remove(&machine.id),
                machine,
            })
            .collect();

        let total_machines = machines.len();
        let captured_count = machines.iter().filter(|m| m.is_captured()).count();

        Ok(ReadingsView {
            period,
            previous_period: period.previous(),
            branch,
            locked: lock.is_some(),
            locked_at: lock.as_ref().map(|s| s.submitted_at),
            locked_by: lock.as_ref().map(|s| s.submitted_by),
            machines,
            total_machines,
            captured_count,
            pending_count: total_machines - captured_count,
        })
    }

    /// The month for every branch, each assembled on its own.
    #[instrument(skip(self))]
    pub async fn get_readings_split(
        &self,
        period: BillingPeriod,
        include_decommissioned: bool,
    ) -> Result<SplitReadingsView, ServiceError> {
        let mut branches = Vec::with_capacity(Branch::ALL.len());
        for branch in Branch::ALL {
            branches.push(
                self.get_readings(period, branch, include_decommissioned)
                    .await?,
            );
        }

        let total_machines = branches.iter().map(|b| b.total_machines).sum();
        let captured_count = branches.iter().map(|b| b.captured_count).sum();
        let pending_count = branches.iter().map(|b| b.pending_count).sum();

        Ok(SplitReadingsView {
            period,
            branches,
            total_machines,
            captured_count,
            pending_count,
        })
    }

    /// Saves a batch of readings for one branch. Nothing is written unless
    /// every row passes validation.
    #[instrument(skip(self, submissions), fields(rows = submissions.len()))]
    pub async fn submit_readings(
        &self,
        period: BillingPeriod,
        branch: Branch,
        submissions: Vec<ReadingSubmission>,
        user_id: Uuid,
    ) -> Result<SubmitResult, ServiceError> {
        let start = std::time::Instant::now();

        if submissions.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one reading is required".to_string(),
            ));
        }
        for submission in &submissions {
            submission.validate()?;
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = submissions
            .iter()
            .find(|s| !seen.insert(s.machine_id))
        {
            return Err(ServiceError::ValidationError(format!(
                "Machine {} appears more than once in the batch",
                duplicate.machine_id
            )));
        }

        self.ensure_open(period, branch).await?;

        let machine_ids: Vec<Uuid> = submissions.iter().map(|s| s.machine_id).collect();
        let machines: HashMap<Uuid, machine::Model> = self
            .machines
            .find_by_ids(machine_ids.clone())
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        let previous = self.previous_by_machine(machine_ids, period).await?;

        validate_readings(&submissions, &machines, &previous)
            .into_result()
            .map_err(ServiceError::InvalidReadings)?;

        if let Some(foreign) = machines.values().find(|m| m.branch != branch) {
            return Err(ServiceError::Forbidden(format!(
                "Machine {} belongs to branch {}, not {}",
                foreign.serial_number, foreign.branch, branch
            )));
        }

        let rows: Vec<NewReading> = submissions
            .iter()
            .map(|submission| {
                let meters = submission.meters();
                let prior = previous.get(&submission.machine_id).map(MeterValues::from);
                let usage = monthly_usage(&meters, prior.as_ref());
                NewReading {
                    machine_id: submission.machine_id,
                    period,
                    mono: meters.mono,
                    colour: meters.colour,
                    scan: meters.scan,
                    mono_usage: usage.mono,
                    colour_usage: usage.colour,
                    scan_usage: usage.scan,
                    note: submission.trimmed_note().map(str::to_string),
                    captured_by: user_id,
                    branch,
                }
            })
            .collect();

        let saved = try_join_all(
            rows.into_iter()
                .map(|row| self.readings.upsert_by_machine_period(row)),
        )
        .await?;
        let saved_count = saved.len();

        counter!("fleetmeter.readings.saved", saved_count as u64);
        histogram!("fleetmeter.readings.submit_duration", start.elapsed().as_secs_f64());
        info!(%period, %branch, saved_count, "Readings submitted");

        self.event_sender.send_or_log(Event::ReadingsSubmitted {
            period,
            branch,
            saved_count,
            submitted_by: user_id,
        });

        Ok(SubmitResult { saved_count })
    }

    /// Removes one machine's reading for an open month.
    #[instrument(skip(self))]
    pub async fn clear_reading(
        &self,
        period: BillingPeriod,
        branch: Branch,
        machine_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.ensure_open(period, branch).await?;

        let machine = self
            .machines
            .find_by_id(machine_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Machine", machine_id))?;
        if machine.branch != branch {
            return Err(ServiceError::Forbidden(format!(
                "Machine {} belongs to branch {}",
                machine.serial_number, machine.branch
            )));
        }

        if !self
            .readings
            .delete_by_machine_period(machine_id, period)
            .await?
        {
            return Err(ServiceError::NotFound(format!(
                "No reading for machine {} in {}",
                machine.serial_number, period
            )));
        }

        info!(%period, %branch, %machine_id, "Reading cleared");
        self.event_sender.send_or_log(Event::ReadingCleared {
            period,
            branch,
            machine_id,
        });
        Ok(())
    }

    /// Best-effort lock write; a failure is logged and reported as `false`.
    async fn lock_month(&self, period: BillingPeriod, branch: Branch, user_id: Uuid) -> bool {
        match self
            .submissions
            .upsert_by_year_month_branch(period, branch, user_id)
            .await
        {
            Ok(_) => {
                info!(%period, %branch, "Month locked");
                self.event_sender.send_or_log(Event::MonthLocked {
                    period,
                    branch,
                    locked_by: user_id,
                });
                true
            }
            Err(e) => {
                warn!(%period, %branch, error = %e, "Failed to write month lock after export");
                counter!("fleetmeter.readings.lock_failures", 1);
                false
            }
        }
    }

    /// Renders the month's sheet for one branch and locks the month.
    #[instrument(skip(self))]
    pub async fn export_readings(
        &self,
        period: BillingPeriod,
        branch: Branch,
        user_id: Uuid,
    ) -> Result<ReadingsExport, ServiceError> {
        let view = self.get_readings(period, branch, false).await?;
        let content = export::render_sheet(&view)?;
        let locked = self.lock_month(period, branch, user_id).await;

        counter!("fleetmeter.readings.exports", 1);
        Ok(ReadingsExport {
            branch,
            period,
            filename: export::sheet_filename(period, branch),
            content,
            row_count: view.machines.len(),
            locked,
        })
    }

    /// One sheet per branch; every exported branch is locked.
    #[instrument(skip(self))]
    pub async fn export_readings_split(
        &self,
        period: BillingPeriod,
        user_id: Uuid,
    ) -> Result<Vec<ReadingsExport>, ServiceError> {
        let split = self.get_readings_split(period, false).await?;

        let mut sheets = Vec::with_capacity(split.branches.len());
        for view in &split.branches {
            let content = export::render_sheet(view)?;
            sheets.push(ReadingsExport {
                branch: view.branch,
                period,
                filename: export::sheet_filename(period, view.branch),
                content,
                row_count: view.machines.len(),
                locked: false,
            });
        }
        for sheet in &mut sheets {
            sheet.locked = self.lock_month(period, sheet.branch, user_id).await;
        }

        counter!("fleetmeter.readings.exports", sheets.len() as u64);
        Ok(sheets)
    }

    /// Reopens a month. Callers must restrict this to administrators.
    #[instrument(skip(self))]
    pub async fn unlock_month(
        &self,
        period: BillingPeriod,
        branch: Branch,
    ) -> Result<UnlockResult, ServiceError> {
        let removed = self
            .submissions
            .delete_by_year_month_branch(period, branch)
            .await?;

        let message = if removed {
            info!(%period, %branch, "Month unlocked");
            self.event_sender
                .send_or_log(Event::MonthUnlocked { period, branch });
            format!("Readings for {} ({}) unlocked", period, branch)
        } else {
            format!("Readings for {} ({}) were not locked", period, branch)
        };

        Ok(UnlockResult { message })
    }

    /// Bulk capture from a sheet. Rows are handled one at a time and a bad row
    /// only fails itself. Month-over-month increases are not enforced here so
    /// that corrections can be loaded; usage may come out negative.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_readings(
        &self,
        period: BillingPeriod,
        branch: Branch,
        rows: Vec<ReadingImportRow>,
        user_id: Uuid,
    ) -> Result<ImportReport, ServiceError> {
        if rows.len() > self.import_max_rows {
            return Err(ServiceError::ValidationError(format!(
                "Import has {} rows; the limit is {}",
                rows.len(),
                self.import_max_rows
            )));
        }
        self.ensure_open(period, branch).await?;

        let mut report = ImportReport::default();
        for (index, row) in rows.iter().enumerate() {
            let outcome = self.import_reading_row(period, branch, row, user_id).await;
            report.record(imports::sheet_row(index), outcome);
        }

        info!(
            %period, %branch,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "Readings imported"
        );
        counter!("fleetmeter.readings.imported", report.succeeded as u64);
        self.event_sender.send_or_log(Event::ReadingsImported {
            period,
            branch,
            succeeded: report.succeeded,
            failed: report.failed.len(),
            imported_by: user_id,
        });

        Ok(report)
    }

    async fn import_reading_row(
        &self,
        period: BillingPeriod,
        branch: Branch,
        row: &ReadingImportRow,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        let serial = row.serial_number.trim();
        if serial.is_empty() {
            return Err(ServiceError::ValidationError(
                "serial_number is required".to_string(),
            ));
        }
        let machine = self
            .machines
            .find_by_serial_number(serial)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Machine {} not found", serial)))?;
        if machine.branch != branch {
            return Err(ServiceError::Forbidden(format!(
                "Machine {} belongs to branch {}",
                serial, machine.branch
            )));
        }

        let parse = |field: &str, value: &Option<String>| {
            imports::parse_count(field, value.as_deref()).map_err(ServiceError::ValidationError)
        };
        let submission = ReadingSubmission {
            machine_id: machine.id,
            mono: parse("mono", &row.mono)?,
            colour: parse("colour", &row.colour)?,
            scan: parse("scan", &row.scan)?,
            note: row.note.clone(),
        };

        // No previous readings are passed, so only the per-row rules apply.
        let machines = HashMap::from([(machine.id, machine.clone())]);
        if let Err(violations) =
            validate_readings(std::slice::from_ref(&submission), &machines, &HashMap::new())
                .into_result()
        {
            let reasons: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return Err(ServiceError::ValidationError(reasons.join("; ")));
        }

        let prior = self
            .readings
            .find_by_machine_and_period(machine.id, period.previous())
            .await?
            .as_ref()
            .map(MeterValues::from);
        let meters = submission.meters();
        let usage = monthly_usage(&meters, prior.as_ref());

        self.readings
            .upsert_by_machine_period(NewReading {
                machine_id: machine.id,
                period,
                mono: meters.mono,
                colour: meters.colour,
                scan: meters.scan,
                mono_usage: usage.mono,
                colour_usage: usage.colour,
                scan_usage: usage.scan,
                note: submission.trimmed_note().map(str::to_string),
                captured_by: user_id,
                branch: machine.branch,
            })
            .await?;
        Ok(())
    }
}
