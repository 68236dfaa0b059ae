mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::*;
use fleetmeter_api::entities::machine;
use fleetmeter_api::errors::ServiceError;
use fleetmeter_api::events::Event;
use fleetmeter_api::models::{Branch, BranchFilter, ComplianceStatus, PartType};
use fleetmeter_api::services::consumables::{ConsumableSummaryFilter, RecordPartOrder};

fn fitted(serial: &str, branch: Branch, model_id: Uuid) -> machine::Model {
    machine::Model {
        model_id: Some(model_id),
        ..machine(serial, branch)
    }
}

fn order(machine: &machine::Model, part_id: Uuid, current_reading: Option<i64>) -> RecordPartOrder {
    RecordPartOrder {
        machine_id: machine.id,
        model_part_id: part_id,
        order_date: date(2024, 3, 15),
        current_reading,
        remaining_toner_percent: None,
    }
}

#[tokio::test]
async fn toner_shortfall_is_prorated_by_remaining_percent() {
    let store = FleetStore::new();
    let model = store.add_model("Konica", "C300i");
    let copier = store.add_machine(fitted("SN-001", Branch::Jhb, model.id));
    let toner = store.add_part(part(model.id, "Black toner", "TN-328K", PartType::Toner, 10_000, dec!(800)));
    store.add_replacement(replacement(copier.id, &toner, date(2024, 1, 10), 4_000, true));
    let (service, mut rx) = consumable_service(&store);

    let result = service
        .record_part_order(
            RecordPartOrder {
                remaining_toner_percent: Some(dec!(50)),
                ..order(&copier, toner.id, Some(10_000))
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    let calc = &result.calculation;
    assert_eq!(calc.usage, 6_000);
    assert!(!calc.yield_met);
    assert_eq!(calc.shortfall_clicks, 4_000);
    assert_eq!(calc.deduction, dec!(2000));
    assert_eq!(calc.adjusted_shortfall_clicks, 2_000);
    assert_eq!(calc.cost_per_click, dec!(0.08));
    assert_eq!(calc.display_charge_rand, dec!(160));

    let stored = &result.replacement;
    assert_eq!(stored.prior_reading, 4_000);
    assert_eq!(stored.current_reading, 10_000);
    assert_eq!(stored.expected_yield_snapshot, 10_000);
    assert_eq!(stored.cost_rand_snapshot, dec!(800));
    assert_eq!(store.replacement_count(), 2);

    assert_matches!(
        drain(&mut rx).as_slice(),
        [Event::PartOrderRecorded { yield_met: false, .. }]
    );
}

#[tokio::test]
async fn prior_reading_comes_from_the_latest_replacement() {
    let store = FleetStore::new();
    let model = store.add_model("Konica", "C300i");
    let copier = store.add_machine(fitted("SN-001", Branch::Jhb, model.id));
    let drum = store.add_part(part(model.id, "Drum unit", "DR-313", PartType::General, 20_000, dec!(500)));
    store.add_replacement(replacement(copier.id, &drum, date(2023, 6, 1), 10_000, true));
    store.add_replacement(replacement(copier.id, &drum, date(2023, 11, 1), 31_000, true));
    let (service, _rx) = consumable_service(&store);

    let result = service
        .record_part_order(order(&copier, drum.id, Some(52_000)), Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(result.replacement.prior_reading, 31_000);
    assert_eq!(result.calculation.usage, 21_000);
    assert!(result.calculation.yield_met);
    assert_eq!(result.calculation.display_charge_rand, dec!(0));
}

#[tokio::test]
async fn first_order_counts_from_zero_and_reading_defaults_to_latest_meter() {
    let store = FleetStore::new();
    let model = store.add_model("Konica", "C300i");
    let copier = store.add_machine(fitted("SN-001", Branch::Jhb, model.id));
    store.add_reading(reading(&copier, period(2024, 1), Some(9_000), None, None));
    store.add_reading(reading(&copier, period(2024, 2), Some(15_000), None, None));
    let drum = store.add_part(part(model.id, "Drum unit", "DR-313", PartType::General, 20_000, dec!(500)));
    let (service, _rx) = consumable_service(&store);

    let result = service
        .record_part_order(order(&copier, drum.id, None), Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(result.replacement.prior_reading, 0);
    assert_eq!(result.replacement.current_reading, 15_000);
    assert_eq!(result.calculation.shortfall_clicks, 5_000);
    assert_eq!(result.calculation.display_charge_rand, dec!(125));
}

#[tokio::test]
async fn missing_reading_and_no_history_is_a_validation_error() {
    let store = FleetStore::new();
    let model = store.add_model("Konica", "C300i");
    let copier = store.add_machine(fitted("SN-001", Branch::Jhb, model.id));
    let drum = store.add_part(part(model.id, "Drum unit", "DR-313", PartType::General, 20_000, dec!(500)));
    let (service, _rx) = consumable_service(&store);

    let result = service
        .record_part_order(order(&copier, drum.id, None), Uuid::new_v4())
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
    assert_eq!(store.replacement_count(), 0);
}

#[tokio::test]
async fn part_for_another_model_is_rejected() {
    let store = FleetStore::new();
    let own_model = store.add_model("Konica", "C300i");
    let other_model = store.add_model("Ricoh", "IM C3000");
    let copier = store.add_machine(fitted("SN-001", Branch::Jhb, own_model.id));
    let foreign = store.add_part(part(other_model.id, "Black toner", "842311", PartType::Toner, 33_000, dec!(900)));
    let (service, _rx) = consumable_service(&store);

    let result = service
        .record_part_order(order(&copier, foreign.id, Some(1_000)), Uuid::new_v4())
        .await;

    assert_matches!(
        result,
        Err(ServiceError::ModelMismatch { part_model_id, .. }) if part_model_id == other_model.id
    );
    assert_eq!(store.replacement_count(), 0);
}

#[tokio::test]
async fn unknown_machine_or_part_is_not_found() {
    let store = FleetStore::new();
    let model = store.add_model("Konica", "C300i");
    let copier = store.add_machine(fitted("SN-001", Branch::Jhb, model.id));
    let drum = store.add_part(part(model.id, "Drum unit", "DR-313", PartType::General, 20_000, dec!(500)));
    let (service, _rx) = consumable_service(&store);

    let ghost_machine = RecordPartOrder {
        machine_id: Uuid::new_v4(),
        ..order(&copier, drum.id, Some(10))
    };
    assert_matches!(
        service.record_part_order(ghost_machine, Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        service
            .record_part_order(order(&copier, Uuid::new_v4(), Some(10)), Uuid::new_v4())
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn summary_keeps_only_the_latest_replacement_per_part() {
    let store = FleetStore::new();
    let model = store.add_model("Konica", "C300i");
    let customer = store.add_customer("Acme Legal", Branch::Jhb);
    let copier = store.add_machine(machine::Model {
        customer_id: Some(customer.id),
        ..fitted("SN-001", Branch::Jhb, model.id)
    });
    let toner = store.add_part(part(model.id, "Black toner", "TN-328K", PartType::Toner, 10_000, dec!(800)));
    let drum = store.add_part(part(model.id, "Drum unit", "DR-313", PartType::General, 20_000, dec!(500)));
    store.add_replacement(replacement(copier.id, &toner, date(2024, 2, 1), 12_000, true));
    let newest = store.add_replacement(replacement(copier.id, &toner, date(2024, 3, 1), 14_000, false));
    store.add_replacement(replacement(copier.id, &drum, date(2024, 1, 5), 21_000, true));
    let (service, _rx) = consumable_service(&store);

    let summary = service
        .get_consumable_summary(ConsumableSummaryFilter::default())
        .await
        .unwrap();

    assert_eq!(summary.machines, 1);
    assert_eq!(summary.rows.len(), 2);
    let toner_row = summary.rows.iter().find(|r| r.model_part_id == toner.id).unwrap();
    assert_eq!(toner_row.replacement_id, newest.id);
    assert_eq!(toner_row.status, ComplianceStatus::Shortfall);
    assert_eq!(toner_row.customer_name.as_deref(), Some("Acme Legal"));
    assert_eq!(toner_row.model_name.as_deref(), Some("Konica C300i"));

    let part_names: Vec<&str> = summary.rows.iter().map(|r| r.part_name.as_str()).collect();
    assert_eq!(part_names, vec!["Black toner", "Drum unit"]);
}

#[tokio::test]
async fn summary_filters_by_branch_model_type_and_status() {
    let store = FleetStore::new();
    let konica = store.add_model("Konica", "C300i");
    let ricoh = store.add_model("Ricoh", "IM C3000");
    let jhb = store.add_machine(fitted("SN-J1", Branch::Jhb, konica.id));
    let ct = store.add_machine(fitted("SN-C1", Branch::Ct, ricoh.id));
    let konica_toner = store.add_part(part(konica.id, "Black toner", "TN-328K", PartType::Toner, 10_000, dec!(800)));
    let konica_drum = store.add_part(part(konica.id, "Drum unit", "DR-313", PartType::General, 20_000, dec!(500)));
    let ricoh_toner = store.add_part(part(ricoh.id, "Black toner", "842311", PartType::Toner, 33_000, dec!(900)));
    store.add_replacement(replacement(jhb.id, &konica_toner, date(2024, 3, 1), 9_000, false));
    store.add_replacement(replacement(jhb.id, &konica_drum, date(2024, 3, 1), 25_000, true));
    store.add_replacement(replacement(ct.id, &ricoh_toner, date(2024, 3, 1), 40_000, true));
    let (service, _rx) = consumable_service(&store);

    let ct_only = service
        .get_consumable_summary(ConsumableSummaryFilter {
            branch: BranchFilter::Specific(Branch::Ct),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ct_only.machines, 1);
    assert!(ct_only.rows.iter().all(|r| r.branch == Branch::Ct));

    let by_model = service
        .get_consumable_summary(ConsumableSummaryFilter {
            model: Some("c300i".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_model.machines, 1);
    assert_eq!(by_model.rows.len(), 2);

    let shortfalls = service
        .get_consumable_summary(ConsumableSummaryFilter {
            status: Some(ComplianceStatus::Shortfall),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(shortfalls.rows.len(), 1);
    assert_eq!(shortfalls.rows[0].model_part_id, konica_toner.id);

    let general = service
        .get_consumable_summary(ConsumableSummaryFilter {
            part_type: Some(PartType::General),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(general.rows.len(), 1);
    assert_eq!(general.rows[0].part_name, "Drum unit");
}

#[tokio::test]
async fn toner_alerts_group_due_parts_by_customer() {
    let store = FleetStore::new();
    let model = store.add_model("Konica", "C300i");
    let zeta = store.add_customer("Zeta Motors", Branch::Jhb);
    let acme = store.add_customer("Acme Legal", Branch::Jhb);
    let due = store.add_machine(machine::Model {
        customer_id: Some(zeta.id),
        ..fitted("SN-001", Branch::Jhb, model.id)
    });
    let not_due = store.add_machine(machine::Model {
        customer_id: Some(acme.id),
        ..fitted("SN-002", Branch::Jhb, model.id)
    });
    let also_due = store.add_machine(machine::Model {
        customer_id: Some(acme.id),
        ..fitted("SN-003", Branch::Jhb, model.id)
    });
    let toner = store.add_part(part(model.id, "Black toner", "TN-328K", PartType::Toner, 10_000, dec!(800)));

    store.add_replacement(replacement(due.id, &toner, date(2024, 1, 1), 5_000, true));
    store.add_reading(reading(&due, period(2024, 3), Some(16_000), None, None));
    store.add_replacement(replacement(not_due.id, &toner, date(2024, 1, 1), 5_000, true));
    store.add_reading(reading(&not_due, period(2024, 3), Some(9_000), None, None));
    store.add_replacement(replacement(also_due.id, &toner, date(2024, 1, 1), 1_000, true));
    store.add_reading(reading(&also_due, period(2024, 3), Some(11_000), None, None));
    let (service, _rx) = consumable_service(&store);

    let report = service
        .get_toner_alerts_by_customer(BranchFilter::All)
        .await
        .unwrap();

    let customers: Vec<&str> = report
        .customer_alerts
        .iter()
        .map(|c| c.customer_name.as_str())
        .collect();
    assert_eq!(customers, vec!["Acme Legal", "Zeta Motors"]);

    let acme_alerts = &report.customer_alerts[0].alerts;
    assert_eq!(acme_alerts.len(), 1);
    assert_eq!(acme_alerts[0].serial_number, "SN-003");
    assert_eq!(acme_alerts[0].usage, 10_000);
    assert_eq!(acme_alerts[0].percent_used, 100);

    let zeta_alerts = &report.customer_alerts[1].alerts;
    assert_eq!(zeta_alerts[0].usage, 11_000);
    assert_eq!(zeta_alerts[0].percent_used, 110);
    assert_eq!(zeta_alerts[0].last_replacement_reading, 5_000);
    assert_eq!(zeta_alerts[0].latest_meter_reading, 16_000);
}

#[tokio::test]
async fn toner_alerts_skip_machines_without_a_baseline() {
    let store = FleetStore::new();
    let model = store.add_model("Konica", "C300i");
    let acme = store.add_customer("Acme Legal", Branch::Jhb);
    let never_replaced = store.add_machine(machine::Model {
        customer_id: Some(acme.id),
        ..fitted("SN-001", Branch::Jhb, model.id)
    });
    let unassigned = store.add_machine(fitted("SN-002", Branch::Jhb, model.id));
    let retired = store.add_machine(machine::Model {
        customer_id: Some(acme.id),
        is_decommissioned: true,
        ..fitted("SN-003", Branch::Jhb, model.id)
    });
    let toner = store.add_part(part(model.id, "Black toner", "TN-328K", PartType::Toner, 10_000, dec!(800)));

    store.add_reading(reading(&never_replaced, period(2024, 3), Some(50_000), None, None));
    for copier in [&unassigned, &retired] {
        store.add_replacement(replacement(copier.id, &toner, date(2024, 1, 1), 0, true));
        store.add_reading(reading(copier, period(2024, 3), Some(50_000), None, None));
    }
    let (service, _rx) = consumable_service(&store);

    let report = service
        .get_toner_alerts_by_customer(BranchFilter::Specific(Branch::Jhb))
        .await
        .unwrap();

    assert!(report.customer_alerts.is_empty());
}
