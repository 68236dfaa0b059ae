//! Consumable tracking: part-order capture with yield billing, the fleet
//! compliance summary and toner-due alerts.

use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{machine, model_part, part_replacement};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{BillingMeter, Branch, BranchFilter, ComplianceStatus, PartType};
use crate::repositories::{
    CatalogRepository, MachineRepository, ModelPartRepository, PartReplacementRepository,
    ReadingRepository,
};
use crate::services::consumable_yield::{self, YieldCalculation};
use crate::services::imports::{self, ImportReport, PartOrderImportRow};

/// A part order captured against a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordPartOrder {
    pub machine_id: Uuid,
    pub model_part_id: Uuid,
    pub order_date: NaiveDate,
    /// Meter value at replacement. Defaults to the machine's latest monthly
    /// reading on the part's billing meter.
    #[validate(range(min = 0, max = 1000000000000000))]
    pub current_reading: Option<i64>,
    /// Toner left in the returned cartridge, `0..=100`. Ignored for general parts.
    pub remaining_toner_percent: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PartOrderResult {
    pub replacement: part_replacement::Model,
    pub calculation: YieldCalculation,
}

/// Scope of the compliance summary. `model` matches a substring of the
/// model's display name, ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumableSummaryFilter {
    pub branch: BranchFilter,
    pub model: Option<String>,
    pub part_type: Option<PartType>,
    pub status: Option<ComplianceStatus>,
}

/// Latest replacement of one part on one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ConsumableSummaryRow {
    pub machine_id: Uuid,
    pub serial_number: String,
    pub branch: Branch,
    pub customer_name: Option<String>,
    pub model_name: Option<String>,
    pub model_part_id: Uuid,
    pub part_name: String,
    pub item_code: Option<String>,
    pub part_type: PartType,
    pub toner_color: Option<String>,
    pub replacement_id: Uuid,
    pub order_date: NaiveDate,
    pub prior_reading: i64,
    pub current_reading: i64,
    pub usage: i64,
    pub expected_yield: i64,
    pub status: ComplianceStatus,
    pub shortfall_clicks: i64,
    pub adjusted_shortfall_clicks: i64,
    pub remaining_toner_percent: Option<Decimal>,
    pub display_charge_rand: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ConsumableSummary {
    /// Machines in scope after the branch and model filters.
    pub machines: usize,
    pub rows: Vec<ConsumableSummaryRow>,
}

/// A part whose usage since its last replacement has reached its yield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TonerAlert {
    pub machine_id: Uuid,
    pub serial_number: String,
    pub model_name: Option<String>,
    pub model_part_id: Uuid,
    pub part_name: String,
    pub item_code: Option<String>,
    pub toner_color: Option<String>,
    pub meter_type: BillingMeter,
    pub last_order_date: NaiveDate,
    pub last_replacement_reading: i64,
    pub latest_meter_reading: i64,
    pub usage: i64,
    pub expected_yield: i64,
    pub percent_used: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CustomerTonerAlerts {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub alerts: Vec<TonerAlert>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct TonerAlertsReport {
    pub customer_alerts: Vec<CustomerTonerAlerts>,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn same_key(value: Option<&str>, key: &str) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case(key))
}

/// Service for consumable orders and yield compliance
#[derive(Clone)]
pub struct ConsumableService {
    machines: Arc<dyn MachineRepository>,
    model_parts: Arc<dyn ModelPartRepository>,
    replacements: Arc<dyn PartReplacementRepository>,
    readings: Arc<dyn ReadingRepository>,
    catalog: Arc<dyn CatalogRepository>,
    event_sender: Arc<EventSender>,
    import_max_rows: usize,
}

impl ConsumableService {
    pub fn new(
        machines: Arc<dyn MachineRepository>,
        model_parts: Arc<dyn ModelPartRepository>,
        replacements: Arc<dyn PartReplacementRepository>,
        readings: Arc<dyn ReadingRepository>,
        catalog: Arc<dyn CatalogRepository>,
        event_sender: Arc<EventSender>,
        import_max_rows: usize,
    ) -> Self {
        Self {
            machines,
            model_parts,
            replacements,
            readings,
            catalog,
            event_sender,
            import_max_rows,
        }
    }

    /// Records a part order and bills any yield shortfall against it.
    #[instrument(skip(self))]
    pub async fn record_part_order(
        &self,
        order: RecordPartOrder,
        user_id: Uuid,
    ) -> Result<PartOrderResult, ServiceError> {
        order.validate()?;

        let machine = self
            .machines
            .find_by_id(order.machine_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Machine", order.machine_id))?;
        let part = self
            .model_parts
            .find_by_id(order.model_part_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Model part", order.model_part_id))?;

        if machine.model_id != Some(part.model_id) {
            counter!("fleetmeter.consumables.model_mismatch", 1);
            return Err(ServiceError::ModelMismatch {
                machine_id: machine.id,
                machine_model_id: machine.model_id,
                part_model_id: part.model_id,
            });
        }
        if let Some(part_branch) = part.branch.filter(|b| *b != machine.branch) {
            return Err(ServiceError::ValidationError(format!(
                "Part {} is restricted to branch {}",
                part.name, part_branch
            )));
        }

        let current_reading = match order.current_reading {
            Some(reading) => reading,
            None => self
                .latest_meter_value(machine.id, part.meter_type)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "No current reading given and machine {} has no {} reading on record",
                        machine.serial_number, part.meter_type
                    ))
                })?,
        };

        let prior_reading = self
            .replacements
            .find_latest_by_machine_and_part(machine.id, part.id)
            .await?
            .map(|last| last.current_reading)
            .unwrap_or(0);

        let usage = consumable_yield::replacement_usage(current_reading, prior_reading);
        let calculation = consumable_yield::calculate(
            part.part_type,
            usage,
            part.expected_yield,
            part.cost_rand,
            order.remaining_toner_percent,
        );

        let replacement = self
            .replacements
            .create(part_replacement::Model {
                id: Uuid::new_v4(),
                machine_id: machine.id,
                model_part_id: part.id,
                order_date: order.order_date,
                prior_reading,
                current_reading,
                usage,
                remaining_toner_percent: calculation.remaining_toner_percent,
                yield_met: calculation.yield_met,
                shortfall_clicks: calculation.shortfall_clicks,
                adjusted_shortfall_clicks: calculation.adjusted_shortfall_clicks,
                cost_per_click: calculation.cost_per_click,
                display_charge_rand: calculation.display_charge_rand,
                expected_yield_snapshot: part.expected_yield,
                cost_rand_snapshot: part.cost_rand,
                captured_by: user_id,
                created_at: Utc::now(),
            })
            .await?;

        let outcome = if calculation.yield_met { "met" } else { "shortfall" };
        counter!("fleetmeter.consumables.orders_recorded", 1, "status" => outcome);
        info!(
            replacement_id = %replacement.id,
            serial_number = %machine.serial_number,
            part = %part.name,
            usage,
            yield_met = calculation.yield_met,
            "Part order recorded"
        );
        self.event_sender.send_or_log(Event::PartOrderRecorded {
            replacement_id: replacement.id,
            machine_id: machine.id,
            model_part_id: part.id,
            order_date: replacement.order_date,
            yield_met: calculation.yield_met,
        });

        Ok(PartOrderResult {
            replacement,
            calculation,
        })
    }

    async fn latest_meter_value(
        &self,
        machine_id: Uuid,
        meter: BillingMeter,
    ) -> Result<Option<i64>, ServiceError> {
        Ok(self
            .readings
            .find_latest_by_machine(machine_id)
            .await?
            .and_then(|r| meter.value_from(r.mono, r.colour)))
    }

    async fn names(
        &self,
        machines: &[machine::Model],
    ) -> Result<(HashMap<Uuid, String>, HashMap<Uuid, String>), ServiceError> {
        let mut customer_ids: Vec<Uuid> = machines.iter().filter_map(|m| m.customer_id).collect();
        customer_ids.sort();
        customer_ids.dedup();
        let mut model_ids: Vec<Uuid> = machines.iter().filter_map(|m| m.model_id).collect();
        model_ids.sort();
        model_ids.dedup();

        let customers = self
            .catalog
            .find_customers_by_ids(customer_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let models = self
            .catalog
            .find_models_by_ids(model_ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m.display_name()))
            .collect();
        Ok((customers, models))
    }

    /// Latest replacement per (machine, part) across in-service machines.
    #[instrument(skip(self))]
    pub async fn get_consumable_summary(
        &self,
        filter: ConsumableSummaryFilter,
    ) -> Result<ConsumableSummary, ServiceError> {
        let machines = self
            .machines
            .find_active_by_branch(filter.branch, false)
            .await?;
        let (customers, models) = self.names(&machines).await?;

        let model = filter.model.as_deref().map(str::trim).filter(|m| !m.is_empty());
        let machines: Vec<machine::Model> = machines
            .into_iter()
            .filter(|m| match model {
                None => true,
                Some(needle) => m
                    .model_id
                    .and_then(|id| models.get(&id))
                    .is_some_and(|name| contains_ignore_case(name, needle)),
            })
            .collect();

        let mut latest: Vec<(usize, part_replacement::Model)> = Vec::new();
        for (index, machine) in machines.iter().enumerate() {
            let mut by_part: HashMap<Uuid, part_replacement::Model> = HashMap::new();
            for replacement in self.replacements.find_by_machine_id(machine.id).await? {
                let newer = by_part.get(&replacement.model_part_id).map_or(true, |kept| {
                    (replacement.order_date, replacement.created_at)
                        > (kept.order_date, kept.created_at)
                });
                if newer {
                    by_part.insert(replacement.model_part_id, replacement);
                }
            }
            latest.extend(by_part.into_values().map(|r| (index, r)));
        }

        let mut part_ids: Vec<Uuid> = latest.iter().map(|(_, r)| r.model_part_id).collect();
        part_ids.sort();
        part_ids.dedup();
        let parts: HashMap<Uuid, model_part::Model> = self
            .model_parts
            .find_by_ids(part_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut rows: Vec<ConsumableSummaryRow> = latest
            .into_iter()
            .filter_map(|(index, replacement)| {
                let machine = &machines[index];
                let part = parts.get(&replacement.model_part_id)?;
                let status = ComplianceStatus::from_yield_met(replacement.yield_met);
                if filter.part_type.is_some_and(|t| t != part.part_type)
                    || filter.status.is_some_and(|s| s != status)
                {
                    return None;
                }
                Some(ConsumableSummaryRow {
                    machine_id: machine.id,
                    serial_number: machine.serial_number.clone(),
                    branch: machine.branch,
                    customer_name: machine.customer_id.and_then(|id| customers.get(&id).cloned()),
                    model_name: machine.model_id.and_then(|id| models.get(&id).cloned()),
                    model_part_id: part.id,
                    part_name: part.name.clone(),
                    item_code: part.item_code.clone(),
                    part_type: part.part_type,
                    toner_color: part.toner_color.clone(),
                    replacement_id: replacement.id,
                    order_date: replacement.order_date,
                    prior_reading: replacement.prior_reading,
                    current_reading: replacement.current_reading,
                    usage: replacement.usage,
                    expected_yield: replacement.expected_yield_snapshot,
                    status,
                    shortfall_clicks: replacement.shortfall_clicks,
                    adjusted_shortfall_clicks: replacement.adjusted_shortfall_clicks,
                    remaining_toner_percent: replacement.remaining_toner_percent,
                    display_charge_rand: replacement.display_charge_rand,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.serial_number
                .cmp(&b.serial_number)
                .then_with(|| a.part_name.cmp(&b.part_name))
        });

        Ok(ConsumableSummary {
            machines: machines.len(),
            rows,
        })
    }

    /// Parts due for replacement, grouped by customer. A part that has never
    /// been replaced has no baseline and is not reported.
    #[instrument(skip(self))]
    pub async fn get_toner_alerts_by_customer(
        &self,
        branch: BranchFilter,
    ) -> Result<TonerAlertsReport, ServiceError> {
        let machines: Vec<machine::Model> = self
            .machines
            .find_active_by_branch(branch, false)
            .await?
            .into_iter()
            .filter(|m| m.is_in_service() && m.customer_id.is_some() && m.model_id.is_some())
            .collect();
        let (customers, models) = self.names(&machines).await?;

        let mut grouped: HashMap<Uuid, Vec<TonerAlert>> = HashMap::new();
        for machine in &machines {
            let (Some(customer_id), Some(model_id)) = (machine.customer_id, machine.model_id) else {
                continue;
            };
            let parts = self
                .model_parts
                .find_by_model_id(model_id, Some(machine.branch))
                .await?;
            if parts.is_empty() {
                continue;
            }
            let Some(latest) = self.readings.find_latest_by_machine(machine.id).await? else {
                continue;
            };

            for part in parts {
                let Some(last) = self
                    .replacements
                    .find_latest_by_machine_and_part(machine.id, part.id)
                    .await?
                else {
                    continue;
                };
                let Some(meter_value) = part.meter_type.value_from(latest.mono, latest.colour)
                else {
                    continue;
                };

                let usage = consumable_yield::replacement_usage(meter_value, last.current_reading);
                if usage < part.expected_yield {
                    continue;
                }
                grouped.entry(customer_id).or_default().push(TonerAlert {
                    machine_id: machine.id,
                    serial_number: machine.serial_number.clone(),
                    model_name: models.get(&model_id).cloned(),
                    model_part_id: part.id,
                    part_name: part.name.clone(),
                    item_code: part.item_code.clone(),
                    toner_color: part.toner_color.clone(),
                    meter_type: part.meter_type,
                    last_order_date: last.order_date,
                    last_replacement_reading: last.current_reading,
                    latest_meter_reading: meter_value,
                    usage,
                    expected_yield: part.expected_yield,
                    percent_used: consumable_yield::percent_used(usage, part.expected_yield),
                });
            }
        }

        let mut customer_alerts: Vec<CustomerTonerAlerts> = grouped
            .into_iter()
            .map(|(customer_id, mut alerts)| {
                alerts.sort_by(|a, b| {
                    a.serial_number
                        .cmp(&b.serial_number)
                        .then_with(|| a.part_name.cmp(&b.part_name))
                });
                CustomerTonerAlerts {
                    customer_id,
                    customer_name: customers
                        .get(&customer_id)
                        .cloned()
                        .unwrap_or_else(|| customer_id.to_string()),
                    alerts,
                }
            })
            .collect();
        customer_alerts.sort_by(|a, b| a.customer_name.cmp(&b.customer_name));

        counter!(
            "fleetmeter.consumables.alerts",
            customer_alerts.iter().map(|c| c.alerts.len() as u64).sum::<u64>()
        );
        Ok(TonerAlertsReport { customer_alerts })
    }

    /// Bulk part-order capture; each row is recorded on its own and a failing
    /// row is reported without stopping the batch.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_part_orders(
        &self,
        rows: Vec<PartOrderImportRow>,
        user_id: Uuid,
    ) -> Result<ImportReport, ServiceError> {
        if rows.len() > self.import_max_rows {
            return Err(ServiceError::ValidationError(format!(
                "Import has {} rows; the limit is {}",
                rows.len(),
                self.import_max_rows
            )));
        }

        let mut report = ImportReport::default();
        for (index, row) in rows.iter().enumerate() {
            let outcome = self.import_part_order_row(row, user_id).await;
            report.record(imports::sheet_row(index), outcome);
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "Part orders imported"
        );
        self.event_sender.send_or_log(Event::PartOrdersImported {
            succeeded: report.succeeded,
            failed: report.failed.len(),
            imported_by: user_id,
        });
        Ok(report)
    }

    async fn import_part_order_row(
        &self,
        row: &PartOrderImportRow,
        user_id: Uuid,
    ) -> Result<PartOrderResult, ServiceError> {
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

        let order_date =
            imports::parse_date("order_date", &row.order_date).map_err(ServiceError::ValidationError)?;
        let current_reading = imports::parse_count("current_reading", row.current_reading.as_deref())
            .map_err(ServiceError::ValidationError)?;
        let remaining_toner_percent = imports::parse_percent(
            "remaining_toner_percent",
            row.remaining_toner_percent.as_deref(),
        )
        .map_err(ServiceError::ValidationError)?;

        let part = self.resolve_part(&machine, row).await?;

        self.record_part_order(
            RecordPartOrder {
                machine_id: machine.id,
                model_part_id: part.id,
                order_date,
                current_reading,
                remaining_toner_percent,
            },
            user_id,
        )
        .await
    }

    /// Item code before name, the machine's own model before the whole catalog.
    /// A catalog-wide hit for another model is left for the model check to reject.
    async fn resolve_part(
        &self,
        machine: &machine::Model,
        row: &PartOrderImportRow,
    ) -> Result<model_part::Model, ServiceError> {
        let keys: Vec<(&str, bool)> = [
            (row.item_code.as_deref(), true),
            (row.part_name.as_deref(), false),
        ]
        .into_iter()
        .filter_map(|(key, is_code)| {
            key.map(str::trim)
                .filter(|k| !k.is_empty())
                .map(|k| (k, is_code))
        })
        .collect();
        if keys.is_empty() {
            return Err(ServiceError::ValidationError(
                "item_code or part_name is required".to_string(),
            ));
        }

        if let Some(model_id) = machine.model_id {
            let own = self
                .model_parts
                .find_by_model_id(model_id, Some(machine.branch))
                .await?;
            for (key, is_code) in &keys {
                let found = own.iter().find(|p| {
                    if *is_code {
                        same_key(p.item_code.as_deref(), key)
                    } else {
                        same_key(Some(&p.name), key)
                    }
                });
                if let Some(part) = found {
                    return Ok(part.clone());
                }
            }
        }

        for (key, is_code) in &keys {
            let candidates = self.model_parts.find_by_item_code_or_name(key).await?;
            let found = candidates.into_iter().find(|p| {
                if *is_code {
                    same_key(p.item_code.as_deref(), key)
                } else {
                    same_key(Some(&p.name), key)
                }
            });
            if let Some(part) = found {
                return Ok(part);
            }
        }

        Err(ServiceError::NotFound(format!(
            "No part matches {}",
            keys.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(" / ")
        )))
    }
}
