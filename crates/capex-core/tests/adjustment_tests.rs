use capex_core::adjustment::{apply_global_step, enforce_minimum_share, AdjustmentDirection};
use capex_core::sections::CostLineItem;
use capex_core::settings::AdjustmentSettings;
use capex_core::CostComponents;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn item(id: &str, c: Decimal, e: Decimal, i: Decimal, o: Decimal) -> CostLineItem {
    CostLineItem::leaf(id, format!("Item {id}"), CostComponents::new(c, e, i, o))
}

fn portfolio() -> Vec<CostLineItem> {
    vec![
        item("A1", dec!(2000), dec!(1500), dec!(750), dec!(250)),
        item("A2", dec!(250), dec!(100), dec!(50), dec!(50)),
        item("A3", dec!(25), dec!(0), dec!(0), dec!(25)),
    ]
}

fn grand_total(items: &[CostLineItem]) -> Decimal {
    items.iter().map(|i| i.total).sum()
}

// ===========================================================================
// Global step
// ===========================================================================

#[test]
fn test_cumulative_adjustment_never_exceeds_cap() {
    let settings = AdjustmentSettings::default();
    let mut items = portfolio();
    let mut trackers: Vec<Decimal> = Vec::new();
    let mut applied_rounds = 0;

    for _ in 0..settings.max_rounds {
        let out = apply_global_step(&items, &trackers, AdjustmentDirection::Increase, &settings);
        for t in &out.trackers {
            assert!(t.abs() <= settings.cap);
        }
        if !out.applied {
            break;
        }
        applied_rounds += 1;
        items = out.items;
        trackers = out.trackers;
    }

    // 0.20 / 0.0075 = 26.67 -> 27 applied steps, the last one shortened
    assert_eq!(applied_rounds, 27);
    assert_eq!(trackers, vec![dec!(0.2); 3]);
}

#[test]
fn test_step_scales_components_and_total_together() {
    let out = apply_global_step(
        &portfolio(),
        &[],
        AdjustmentDirection::Decrease,
        &AdjustmentSettings::default(),
    );
    for i in &out.items {
        assert_eq!(i.total, i.components.total());
    }
    assert_eq!(out.items[0].components.equipment, dec!(1500) * dec!(0.9925));
}

#[test]
fn test_zero_step_setting_never_applies() {
    let settings = AdjustmentSettings {
        step: Decimal::ZERO,
        ..AdjustmentSettings::default()
    };
    let out = apply_global_step(&portfolio(), &[], AdjustmentDirection::Increase, &settings);
    assert!(!out.applied);
    assert_eq!(out.items, portfolio());
}

#[test]
fn test_step_recurses_into_children() {
    let section = CostLineItem::section(
        "A1",
        "Block",
        vec![
            item("A1.1", dec!(100), dec!(0), dec!(0), dec!(0)),
            item("A1.2", dec!(300), dec!(0), dec!(0), dec!(0)),
        ],
    );
    let out = apply_global_step(
        &[section],
        &[],
        AdjustmentDirection::Increase,
        &AdjustmentSettings::default(),
    );
    let scaled = &out.items[0];
    assert_eq!(scaled.total, dec!(403));
    assert_eq!(scaled.children[1].total, dec!(302.25));
}

// ===========================================================================
// Minimum share
// ===========================================================================

#[test]
fn test_floor_renormalisation_conserves_total() {
    let mut items = portfolio();
    items.push(item("A4", dec!(1), dec!(0), dec!(0), dec!(0)));
    items.push(item("A5", Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO));
    let before = grand_total(&items);

    let out = enforce_minimum_share(&items, dec!(0.01));
    let after = grand_total(&out);
    assert!((after - before).abs() < dec!(0.0000001));
    assert_eq!(out.len(), items.len());
    // Lifted items sit at the floor before renormalisation, so just under it after.
    for i in &out {
        assert!(i.total / after > dec!(0.0098));
    }
}

#[test]
fn test_floor_keeps_ids_and_names() {
    let mut items = portfolio();
    items.push(item("A4", Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO));
    let out = enforce_minimum_share(&items, dec!(0.01));
    assert_eq!(out[3].id, "A4");
    assert_eq!(out[3].name, "Item A4");
    assert!(out[3].components.construction > Decimal::ZERO);
}

#[test]
fn test_floor_noop_on_empty_or_zero_total() {
    assert!(enforce_minimum_share(&[], dec!(0.01)).is_empty());
    let zeros = vec![item("A1", Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)];
    assert_eq!(enforce_minimum_share(&zeros, dec!(0.01)), zeros);
}
