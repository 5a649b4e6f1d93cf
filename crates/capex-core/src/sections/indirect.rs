use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::line_item::CostLineItem;
use crate::fees::circular::{solve_circular_fee, CircularFee};
use crate::fees::tables::StandardTable;
use crate::iteration::IterationLimits;
use crate::settings::IndirectRates;
use crate::types::Money;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    #[default]
    General,
    /// Municipal facility fees are waived.
    Agriculture,
}

/// Bases the indirect fees are charged on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndirectBases {
    /// Direct-section total (A).
    pub direct_total: Money,
    /// Construction + installation across the direct section.
    pub engineering_cost: Money,
    pub equipment_cost: Money,
    pub land_cost: Money,
    /// Total project funding, if known. Drives the management and
    /// consulting fees.
    pub total_funding: Option<Money>,
    pub project_type: ProjectType,
}

/// The 13 indirect items, plus how the management fee was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectItems {
    pub items: Vec<CostLineItem>,
    /// Present when the management fee came from the circular solver.
    pub management: Option<CircularFee>,
}

/// Supervision + survey/design feed the services bidding fee.
pub fn supervision_fee(engineering_cost: Money) -> Money {
    StandardTable::Supervision.schedule().evaluate(engineering_cost)
}

pub fn survey_design_fee(engineering_cost: Money, rates: &IndirectRates) -> Money {
    if engineering_cost <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let survey = engineering_cost * (rates.preliminary_survey + rates.construction_survey);
    let design = StandardTable::Design.schedule().evaluate(engineering_cost)
        * rates.design_complexity
        * rates.design_adjustment;
    survey + design * (Decimal::ONE + rates.as_built_drawings)
}

/// Sum of the five consulting tables.
pub fn preliminary_consulting_fee(base: Money) -> Money {
    StandardTable::CONSULTING
        .iter()
        .map(|t| t.schedule().evaluate(base))
        .sum()
}

pub fn bidding_agency_fee(
    engineering_cost: Money,
    equipment_cost: Money,
    services_base: Money,
) -> Money {
    StandardTable::BiddingWorks.schedule().evaluate(engineering_cost)
        + StandardTable::BiddingGoods.schedule().evaluate(equipment_cost)
        + StandardTable::BiddingServices.schedule().evaluate(services_base)
}

pub fn management_fee(
    bases: &IndirectBases,
    rates: &IndirectRates,
    limits: IterationLimits,
) -> (Money, Option<CircularFee>) {
    match bases.total_funding {
        Some(funding) if funding > Decimal::ZERO => {
            let solved = solve_circular_fee(
                funding,
                bases.land_cost,
                &StandardTable::Management.schedule(),
                limits,
            );
            (solved.fee, Some(solved))
        }
        _ => (bases.direct_total * rates.management_fallback, None),
    }
}

/// Build the items of the indirect section (B).
pub fn build_indirect_items(
    bases: &IndirectBases,
    rates: &IndirectRates,
    limits: IterationLimits,
) -> IndirectItems {
    let direct = bases.direct_total;
    let (management, solved) = management_fee(bases, rates, limits);

    let supervision = supervision_fee(bases.engineering_cost);
    let survey_design = survey_design_fee(bases.engineering_cost, rates);
    let bidding = bidding_agency_fee(
        bases.engineering_cost,
        bases.equipment_cost,
        supervision + survey_design,
    );
    let consulting_base = bases
        .total_funding
        .filter(|f| *f > Decimal::ZERO)
        .unwrap_or(direct);
    let consulting = preliminary_consulting_fee(consulting_base);
    let municipal = match bases.project_type {
        ProjectType::Agriculture => Decimal::ZERO,
        ProjectType::General => direct * rates.municipal_facilities,
    };

    let management_remark = if solved.is_some() {
        "Progressive schedule on total funding net of land"
    } else {
        "Flat rate on direct costs"
    };
    let municipal_remark = match bases.project_type {
        ProjectType::Agriculture => "Waived for agricultural projects",
        ProjectType::General => "Flat rate on direct costs",
    };

    let items = vec![
        CostLineItem::fee("B1", "Construction-unit management", management)
            .with_remark(management_remark),
        CostLineItem::fee("B2", "Land", bases.land_cost),
        CostLineItem::fee("B3", "Bidding agency", bidding)
            .with_remark("Works, goods and services schedules"),
        CostLineItem::fee("B4", "Construction supervision", supervision)
            .with_remark("Interpolated on engineering cost"),
        CostLineItem::fee("B5", "Preliminary consulting", consulting),
        CostLineItem::fee("B6", "Survey and design", survey_design),
        flat("B7", "Research and testing", direct, rates.research_testing),
        flat("B8", "Environmental impact report", direct, rates.environmental_report),
        flat("B9", "Site preparation and temporary works", direct, rates.site_preparation),
        flat("B10", "Construction insurance", direct, rates.insurance),
        flat("B11", "Inspection and testing", direct, rates.inspection_testing),
        CostLineItem::fee("B12", "Municipal facilities", municipal).with_remark(municipal_remark),
        flat("B13", "Other", direct, rates.other),
    ];

    IndirectItems {
        items,
        management: solved,
    }
}

fn flat(id: &str, name: &str, base: Money, rate: Decimal) -> CostLineItem {
    CostLineItem::fee(id, name, base * rate).with_remark("Flat rate on direct costs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::circular::CIRCULAR_FEE_LIMITS;
    use rust_decimal_macros::dec;

    fn bases(total_funding: Option<Money>) -> IndirectBases {
        IndirectBases {
            direct_total: dec!(10000),
            engineering_cost: dec!(8000),
            equipment_cost: dec!(2000),
            land_cost: dec!(500),
            total_funding,
            project_type: ProjectType::General,
        }
    }

    #[test]
    fn test_thirteen_items_in_order() {
        let out = build_indirect_items(&bases(None), &IndirectRates::default(), CIRCULAR_FEE_LIMITS);
        assert_eq!(out.items.len(), 13);
        assert_eq!(out.items[0].id, "B1");
        assert_eq!(out.items[12].id, "B13");
        assert_eq!(out.items[1].total, dec!(500));
    }

    #[test]
    fn test_management_fallback_without_funding() {
        let out = build_indirect_items(&bases(None), &IndirectRates::default(), CIRCULAR_FEE_LIMITS);
        assert!(out.management.is_none());
        assert_eq!(out.items[0].total, dec!(150));
    }

    #[test]
    fn test_management_circular_with_funding() {
        let out = build_indirect_items(
            &bases(Some(dec!(10500))),
            &IndirectRates::default(),
            CIRCULAR_FEE_LIMITS,
        );
        let solved = out.management.unwrap();
        assert!(solved.converged);
        assert!((out.items[0].total - dec!(138.34)).abs() < dec!(0.01));
    }

    #[test]
    fn test_flat_rates_on_direct_total() {
        let out = build_indirect_items(&bases(None), &IndirectRates::default(), CIRCULAR_FEE_LIMITS);
        assert_eq!(out.items[6].total, dec!(100));
        assert_eq!(out.items[7].total, dec!(30));
        assert_eq!(out.items[8].total, dec!(200));
        assert_eq!(out.items[9].total, dec!(50));
        assert_eq!(out.items[10].total, dec!(60));
        assert_eq!(out.items[11].total, dec!(150));
        assert_eq!(out.items[12].total, dec!(50));
    }

    #[test]
    fn test_agriculture_waives_municipal() {
        let mut b = bases(None);
        b.project_type = ProjectType::Agriculture;
        let out = build_indirect_items(&b, &IndirectRates::default(), CIRCULAR_FEE_LIMITS);
        assert_eq!(out.items[11].total, Decimal::ZERO);
    }

    #[test]
    fn test_survey_design_fee() {
        // 8000 * 1.5% + 224.64 * 1.1 * 1.08
        let fee = survey_design_fee(dec!(8000), &IndirectRates::default());
        assert_eq!(fee, dec!(120) + dec!(224.64) * dec!(1.1) * dec!(1.08));
        assert_eq!(survey_design_fee(Decimal::ZERO, &IndirectRates::default()), Decimal::ZERO);
    }

    #[test]
    fn test_bidding_sums_three_schedules() {
        let fee = bidding_agency_fee(dec!(1000), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(fee, dec!(4.1265));
        assert!(bidding_agency_fee(dec!(1000), dec!(500), dec!(100)) > fee);
    }

    #[test]
    fn test_consulting_sums_five_tables() {
        // 1.6 + 4.0 + 1.0 + 1.6 + 1.6 at the 1000 anchor
        assert_eq!(preliminary_consulting_fee(dec!(1000)), dec!(9.8));
    }
}
