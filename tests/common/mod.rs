#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

use fleetmeter_api::entities::{
    customer, machine, machine_model, model_part, part_replacement, reading, submission,
};
use fleetmeter_api::errors::ServiceError;
use fleetmeter_api::events::{self, Event};
use fleetmeter_api::models::{BillingMeter, BillingPeriod, Branch, BranchFilter, PartType};
use fleetmeter_api::repositories::{
    CatalogRepository, MachineRepository, ModelPartRepository, NewReading,
    PartReplacementRepository, ReadingRepository, SubmissionRepository,
};
use fleetmeter_api::services::consumables::ConsumableService;
use fleetmeter_api::services::readings::ReadingService;

/// In-memory stand-in for every repository, shared by the services under test.
#[derive(Default)]
pub struct FleetStore {
    pub machines: Mutex<Vec<machine::Model>>,
    pub readings: Mutex<Vec<reading::Model>>,
    pub submissions: Mutex<Vec<submission::Model>>,
    pub parts: Mutex<Vec<model_part::Model>>,
    pub replacements: Mutex<Vec<part_replacement::Model>>,
    pub customers: Mutex<Vec<customer::Model>>,
    pub models: Mutex<Vec<machine_model::Model>>,
    /// Makes every lock write fail, to exercise the best-effort export path.
    pub fail_lock_writes: AtomicBool,
}

fn same_period(r: &reading::Model, period: BillingPeriod) -> bool {
    r.year == period.year && r.month == period.month
}

impl FleetStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_machine(&self, machine: machine::Model) -> machine::Model {
        self.machines.lock().unwrap().push(machine.clone());
        machine
    }

    pub fn add_reading(&self, reading: reading::Model) -> reading::Model {
        self.readings.lock().unwrap().push(reading.clone());
        reading
    }

    pub fn add_part(&self, part: model_part::Model) -> model_part::Model {
        self.parts.lock().unwrap().push(part.clone());
        part
    }

    pub fn add_replacement(&self, replacement: part_replacement::Model) -> part_replacement::Model {
        self.replacements.lock().unwrap().push(replacement.clone());
        replacement
    }

    pub fn add_customer(&self, name: &str, branch: Branch) -> customer::Model {
        let customer = customer::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            contact_email: None,
            branch,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.customers.lock().unwrap().push(customer.clone());
        customer
    }

    pub fn add_model(&self, make: &str, name: &str) -> machine_model::Model {
        let model = machine_model::Model {
            id: Uuid::new_v4(),
            make: make.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.models.lock().unwrap().push(model.clone());
        model
    }

    pub fn reading_for(&self, machine_id: Uuid, period: BillingPeriod) -> Option<reading::Model> {
        self.readings
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.machine_id == machine_id && same_period(r, period))
            .cloned()
    }

    pub fn reading_count(&self) -> usize {
        self.readings.lock().unwrap().len()
    }

    pub fn replacement_count(&self) -> usize {
        self.replacements.lock().unwrap().len()
    }

    pub fn is_locked(&self, period: BillingPeriod, branch: Branch) -> bool {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.year == period.year && s.month == period.month && s.branch == branch)
    }
}

#[async_trait]
impl MachineRepository for FleetStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<machine::Model>, ServiceError> {
        Ok(self.machines.lock().unwrap().iter().find(|m| m.id == id).cloned())
    }

    async fn find_by_serial_number(
        &self,
        serial_number: &str,
    ) -> Result<Option<machine::Model>, ServiceError> {
        let serial_number = serial_number.trim();
        Ok(self
            .machines
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.serial_number == serial_number)
            .cloned())
    }

    async fn find_active_by_branch(
        &self,
        filter: BranchFilter,
        include_decommissioned: bool,
    ) -> Result<Vec<machine::Model>, ServiceError> {
        let mut found: Vec<machine::Model> = self
            .machines
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.is_active && filter.matches(m.branch))
            .filter(|m| include_decommissioned || !m.is_decommissioned)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.serial_number.cmp(&b.serial_number));
        Ok(found)
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<machine::Model>, ServiceError> {
        Ok(self
            .machines
            .lock()
            .unwrap()
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReadingRepository for FleetStore {
    async fn find_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
    ) -> Result<Vec<reading::Model>, ServiceError> {
        Ok(self
            .readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| same_period(r, period) && r.branch == branch)
            .cloned()
            .collect())
    }

    async fn find_by_machine_and_period(
        &self,
        machine_id: Uuid,
        period: BillingPeriod,
    ) -> Result<Option<reading::Model>, ServiceError> {
        Ok(self.reading_for(machine_id, period))
    }

    async fn find_by_machines_and_period(
        &self,
        machine_ids: Vec<Uuid>,
        period: BillingPeriod,
    ) -> Result<Vec<reading::Model>, ServiceError> {
        Ok(self
            .readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| machine_ids.contains(&r.machine_id) && same_period(r, period))
            .cloned()
            .collect())
    }

    async fn find_latest_by_machine(
        &self,
        machine_id: Uuid,
    ) -> Result<Option<reading::Model>, ServiceError> {
        Ok(self
            .readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.machine_id == machine_id && r.has_meter_values())
            .max_by_key(|r| (r.year, r.month))
            .cloned())
    }

    async fn upsert_by_machine_period(
        &self,
        new: NewReading,
    ) -> Result<reading::Model, ServiceError> {
        let mut readings = self.readings.lock().unwrap();
        if let Some(existing) = readings
            .iter_mut()
            .find(|r| r.machine_id == new.machine_id && same_period(r, new.period))
        {
            existing.mono = new.mono;
            existing.colour = new.colour;
            existing.scan = new.scan;
            existing.mono_usage = new.mono_usage;
            existing.colour_usage = new.colour_usage;
            existing.scan_usage = new.scan_usage;
            existing.note = new.note;
            existing.captured_by = new.captured_by;
            existing.updated_at = Some(Utc::now());
            return Ok(existing.clone());
        }

        let created = reading::Model {
            id: Uuid::new_v4(),
            machine_id: new.machine_id,
            year: new.period.year,
            month: new.period.month,
            mono: new.mono,
            colour: new.colour,
            scan: new.scan,
            mono_usage: new.mono_usage,
            colour_usage: new.colour_usage,
            scan_usage: new.scan_usage,
            note: new.note,
            captured_by: new.captured_by,
            branch: new.branch,
            created_at: Utc::now(),
            updated_at: None,
        };
        readings.push(created.clone());
        Ok(created)
    }

    async fn delete_by_machine_period(
        &self,
        machine_id: Uuid,
        period: BillingPeriod,
    ) -> Result<bool, ServiceError> {
        let mut readings = self.readings.lock().unwrap();
        let before = readings.len();
        readings.retain(|r| !(r.machine_id == machine_id && same_period(r, period)));
        Ok(readings.len() < before)
    }
}

#[async_trait]
impl SubmissionRepository for FleetStore {
    async fn find_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
    ) -> Result<Option<submission::Model>, ServiceError> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.year == period.year && s.month == period.month && s.branch == branch)
            .cloned())
    }

    async fn upsert_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
        submitted_by: Uuid,
    ) -> Result<submission::Model, ServiceError> {
        if self.fail_lock_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::InternalError("lock store unavailable".into()));
        }
        let mut submissions = self.submissions.lock().unwrap();
        submissions
            .retain(|s| !(s.year == period.year && s.month == period.month && s.branch == branch));
        let lock = submission::Model {
            id: Uuid::new_v4(),
            year: period.year,
            month: period.month,
            branch,
            submitted_by,
            submitted_at: Utc::now(),
        };
        submissions.push(lock.clone());
        Ok(lock)
    }

    async fn delete_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
    ) -> Result<bool, ServiceError> {
        let mut submissions = self.submissions.lock().unwrap();
        let before = submissions.len();
        submissions
            .retain(|s| !(s.year == period.year && s.month == period.month && s.branch == branch));
        Ok(submissions.len() < before)
    }
}

#[async_trait]
impl ModelPartRepository for FleetStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<model_part::Model>, ServiceError> {
        Ok(self.parts.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<model_part::Model>, ServiceError> {
        Ok(self
            .parts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn find_by_model_id(
        &self,
        model_id: Uuid,
        branch: Option<Branch>,
    ) -> Result<Vec<model_part::Model>, ServiceError> {
        let mut found: Vec<model_part::Model> = self
            .parts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_active && p.model_id == model_id)
            .filter(|p| match (branch, p.branch) {
                (Some(wanted), Some(own)) => wanted == own,
                _ => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn find_by_item_code_or_name(
        &self,
        key: &str,
    ) -> Result<Vec<model_part::Model>, ServiceError> {
        let key = key.trim();
        Ok(self
            .parts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| {
                p.name.eq_ignore_ascii_case(key)
                    || p.item_code
                        .as_deref()
                        .is_some_and(|code| code.eq_ignore_ascii_case(key))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PartReplacementRepository for FleetStore {
    async fn find_latest_by_machine_and_part(
        &self,
        machine_id: Uuid,
        model_part_id: Uuid,
    ) -> Result<Option<part_replacement::Model>, ServiceError> {
        Ok(self
            .replacements
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.machine_id == machine_id && r.model_part_id == model_part_id)
            .max_by_key(|r| (r.order_date, r.created_at))
            .cloned())
    }

    async fn find_by_machine_id(
        &self,
        machine_id: Uuid,
    ) -> Result<Vec<part_replacement::Model>, ServiceError> {
        Ok(self
            .replacements
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.machine_id == machine_id)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        replacement: part_replacement::Model,
    ) -> Result<part_replacement::Model, ServiceError> {
        self.replacements.lock().unwrap().push(replacement.clone());
        Ok(replacement)
    }
}

#[async_trait]
impl CatalogRepository for FleetStore {
    async fn find_customers_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<Vec<customer::Model>, ServiceError> {
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn find_models_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<Vec<machine_model::Model>, ServiceError> {
        Ok(self
            .models
            .lock()
            .unwrap()
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }
}

pub const IMPORT_MAX_ROWS: usize = 50;

pub fn reading_service(store: &Arc<FleetStore>) -> (ReadingService, mpsc::Receiver<Event>) {
    let (sender, rx) = events::channel(64);
    let service = ReadingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(sender),
        IMPORT_MAX_ROWS,
    );
    (service, rx)
}

pub fn consumable_service(store: &Arc<FleetStore>) -> (ConsumableService, mpsc::Receiver<Event>) {
    let (sender, rx) = events::channel(64);
    let service = ConsumableService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(sender),
        IMPORT_MAX_ROWS,
    );
    (service, rx)
}

pub fn period(year: i32, month: i32) -> BillingPeriod {
    BillingPeriod::new(year, month).unwrap()
}

pub fn machine(serial: &str, branch: Branch) -> machine::Model {
    machine::Model {
        id: Uuid::new_v4(),
        serial_number: serial.to_string(),
        customer_id: None,
        model_id: None,
        mono_enabled: true,
        colour_enabled: false,
        scan_enabled: false,
        is_active: true,
        is_decommissioned: false,
        branch,
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn reading(
    machine: &machine::Model,
    period: BillingPeriod,
    mono: Option<i64>,
    colour: Option<i64>,
    scan: Option<i64>,
) -> reading::Model {
    reading::Model {
        id: Uuid::new_v4(),
        machine_id: machine.id,
        year: period.year,
        month: period.month,
        mono,
        colour,
        scan,
        mono_usage: None,
        colour_usage: None,
        scan_usage: None,
        note: None,
        captured_by: Uuid::new_v4(),
        branch: machine.branch,
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn part(
    model_id: Uuid,
    name: &str,
    item_code: &str,
    part_type: PartType,
    expected_yield: i64,
    cost_rand: Decimal,
) -> model_part::Model {
    model_part::Model {
        id: Uuid::new_v4(),
        model_id,
        branch: None,
        name: name.to_string(),
        item_code: Some(item_code.to_string()),
        part_type,
        toner_color: matches!(part_type, PartType::Toner).then(|| "black".to_string()),
        expected_yield,
        cost_rand,
        meter_type: BillingMeter::Mono,
        is_active: true,
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// A stored replacement with only the fields the summary and alerts read.
pub fn replacement(
    machine_id: Uuid,
    part: &model_part::Model,
    order_date: NaiveDate,
    current_reading: i64,
    yield_met: bool,
) -> part_replacement::Model {
    part_replacement::Model {
        id: Uuid::new_v4(),
        machine_id,
        model_part_id: part.id,
        order_date,
        prior_reading: 0,
        current_reading,
        usage: current_reading,
        remaining_toner_percent: None,
        yield_met,
        shortfall_clicks: 0,
        adjusted_shortfall_clicks: 0,
        cost_per_click: Decimal::ZERO,
        display_charge_rand: Decimal::ZERO,
        expected_yield_snapshot: part.expected_yield,
        cost_rand_snapshot: part.cost_rand,
        captured_by: Uuid::new_v4(),
        created_at: Utc::now(),
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Everything queued so far, without waiting.
pub fn drain(rx: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
