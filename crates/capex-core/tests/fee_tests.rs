use capex_core::fees::{
    interpolated_fee, progressive_fee, solve_circular_fee, RateBracket, StandardTable,
    CIRCULAR_FEE_LIMITS,
};
use capex_core::iteration::IterationLimits;
use capex_core::MAX_MONEY;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Schedule evaluation
// ===========================================================================

#[test]
fn test_management_schedule_open_ended_top_tier() {
    // 20 + 60 + 60 + 400 + 400 + 100000 * 0.4%
    let s = StandardTable::Management.schedule();
    assert_eq!(s.evaluate(dec!(200000)), dec!(1340));
}

#[test]
fn test_progressive_is_monotone() {
    let s = StandardTable::Management.schedule();
    let mut prev = Decimal::ZERO;
    let mut v = dec!(250);
    while v < dec!(400000) {
        let fee = s.evaluate(v);
        assert!(fee >= prev, "fee decreased at {v}");
        prev = fee;
        v *= dec!(1.7);
    }
}

#[test]
fn test_interpolated_is_monotone_and_continuous_at_anchors() {
    let s = StandardTable::Supervision.schedule();
    for a in s.brackets.iter().skip(1) {
        let below = s.evaluate(a.threshold - dec!(0.01));
        let at = s.evaluate(a.threshold);
        let above = s.evaluate(a.threshold + dec!(0.01));
        assert!(below <= at && at <= above);
        assert!((above - below).abs() < dec!(0.01));
    }
}

#[test]
fn test_supervision_extrapolates_above_table() {
    let s = StandardTable::Supervision.schedule();
    // last slope = (8312.08 - 6926.72) / 200000
    let expected = dec!(8312.08) + dec!(200000) * (dec!(1385.36) / dec!(200000));
    assert_eq!(s.evaluate(dec!(1200000)), expected);
}

#[test]
fn test_design_below_first_anchor() {
    let s = StandardTable::Design.schedule();
    assert_eq!(s.evaluate(dec!(100)), dec!(4.05));
}

#[test]
fn test_free_functions_match_schedules() {
    let tiers = [
        RateBracket::new(dec!(0), dec!(0.1)),
        RateBracket::new(dec!(10), dec!(0.05)),
    ];
    assert_eq!(progressive_fee(dec!(30), &tiers), dec!(2));
    let anchors = [
        RateBracket::new(dec!(10), dec!(1)),
        RateBracket::new(dec!(20), dec!(3)),
    ];
    assert_eq!(interpolated_fee(dec!(15), &anchors), dec!(2));
    assert_eq!(interpolated_fee(dec!(30), &anchors), dec!(5));
}

#[test]
fn test_bidding_goods_and_services_tables() {
    // 100 * 9.45 per mille + 400 * 6.93 per mille
    assert_eq!(
        StandardTable::BiddingGoods.schedule().evaluate(dec!(500)),
        dec!(0.945) + dec!(2.772)
    );
    // 100 * 9.45 per mille + 400 * 5.04 per mille
    assert_eq!(
        StandardTable::BiddingServices.schedule().evaluate(dec!(500)),
        dec!(0.945) + dec!(2.016)
    );
}

// ===========================================================================
// Circular fee
// ===========================================================================

#[test]
fn test_circular_fee_reference_case() {
    let out = solve_circular_fee(
        dec!(10000),
        Decimal::ZERO,
        &StandardTable::Management.schedule(),
        CIRCULAR_FEE_LIMITS,
    );
    assert!(out.converged);
    assert!(out.iterations <= 4);
    assert!((out.fee - dec!(138.34)).abs() < dec!(0.01));
    assert!((out.base - dec!(9861.66)).abs() < dec!(0.01));
    assert_eq!(out.base + out.fee, dec!(10000));
}

#[test]
fn test_circular_fee_is_self_consistent() {
    let schedule = StandardTable::Management.schedule();
    let out = solve_circular_fee(dec!(250000), dec!(20000), &schedule, CIRCULAR_FEE_LIMITS);
    assert!(out.converged);
    assert!((schedule.evaluate(out.base) - out.fee).abs() < dec!(0.01));
}

#[test]
fn test_circular_fee_cap_hit() {
    let out = solve_circular_fee(
        dec!(10000),
        Decimal::ZERO,
        &StandardTable::Management.schedule(),
        IterationLimits::new(dec!(0.01), 1),
    );
    assert!(!out.converged);
    assert_eq!(out.iterations, 1);
    assert_eq!(out.fee, dec!(140));
}

#[test]
fn test_every_named_table_parses() {
    for table in StandardTable::ALL {
        let parsed: StandardTable = table.name().parse().unwrap();
        assert_eq!(parsed, table);
    }
}

#[test]
fn test_largest_accepted_funding_settles() {
    let out = solve_circular_fee(
        MAX_MONEY,
        Decimal::ZERO,
        &StandardTable::Management.schedule(),
        CIRCULAR_FEE_LIMITS,
    );
    assert!(out.converged);
    assert!(out.fee > Decimal::ZERO && out.fee < MAX_MONEY);
    for table in StandardTable::ALL {
        assert!(table.schedule().evaluate(MAX_MONEY) >= Decimal::ZERO);
    }
}
