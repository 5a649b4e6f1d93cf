use serde::{Deserialize, Serialize};

use super::indirect::{build_indirect_items, IndirectBases, ProjectType};
use super::line_item::{sum_components, CostLineItem};
use crate::fees::circular::CircularFee;
use crate::settings::EngineSettings;
use crate::types::{CostComponents, Money, Rate};

/// Everything needed to compose sections A through E around a fixed set of
/// direct items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionParams {
    pub land_cost: Money,
    pub total_funding: Option<Money>,
    pub project_type: ProjectType,
    pub basic_reserve_rate: Rate,
    pub price_reserve_rate: Rate,
}

/// Sections A (direct) through E (building investment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSections {
    pub direct: CostLineItem,
    pub indirect: CostLineItem,
    pub combined: CostLineItem,
    pub reserves: CostLineItem,
    pub building: CostLineItem,
    #[serde(skip)]
    pub management: Option<CircularFee>,
}

impl CostSections {
    pub fn building_investment(&self) -> Money {
        self.building.total
    }

    pub fn basic_reserve(&self) -> Money {
        self.reserves.children.first().map(|c| c.total).unwrap_or_default()
    }

    pub fn price_reserve(&self) -> Money {
        self.reserves.children.get(1).map(|c| c.total).unwrap_or_default()
    }

    /// The full tree A..G. F carries construction interest and G the total
    /// investment, both as fee rows.
    pub fn into_tree(self, construction_interest: Money, total_investment: Money) -> Vec<CostLineItem> {
        let interest = CostLineItem::fee("F", "Construction-period interest", construction_interest);
        let total = CostLineItem::leaf(
            "G",
            "Total project funding",
            self.building.components + CostComponents::other_only(construction_interest),
        )
        .with_remark("G = E + F");

        [
            self.direct,
            self.indirect,
            self.combined,
            self.reserves,
            self.building,
            interest,
            total,
        ]
        .into_iter()
        .map(|item| item.with_shares(total_investment))
        .collect()
    }
}

/// Compose sections A..E from the direct items.
pub fn compose_sections(
    direct_items: Vec<CostLineItem>,
    params: &SectionParams,
    settings: &EngineSettings,
) -> CostSections {
    let direct_components = sum_components(&direct_items);
    let direct = CostLineItem::section("A", "Direct engineering costs", direct_items);

    let bases = IndirectBases {
        direct_total: direct.total,
        engineering_cost: direct_components.engineering_cost(),
        equipment_cost: direct_components.equipment,
        land_cost: params.land_cost,
        total_funding: params.total_funding,
        project_type: params.project_type,
    };
    let indirect_items = build_indirect_items(&bases, &settings.indirect, settings.circular_fee);
    let indirect = CostLineItem::section("B", "Other engineering costs", indirect_items.items);

    let combined = CostLineItem::leaf(
        "C",
        "Direct and other engineering costs",
        direct.components + indirect.components,
    )
    .with_remark("C = A + B");

    let reserves = CostLineItem::section(
        "D",
        "Reserves",
        vec![
            CostLineItem::fee("D1", "Basic reserve", combined.total * params.basic_reserve_rate),
            CostLineItem::fee("D2", "Price reserve", combined.total * params.price_reserve_rate),
        ],
    );

    let building = CostLineItem::leaf(
        "E",
        "Building investment",
        combined.components + reserves.components,
    )
    .with_remark("E = C + D");

    log::debug!(
        "composed sections: A={} B={} E={} (funding {:?})",
        direct.total,
        indirect.total,
        building.total,
        params.total_funding
    );

    CostSections {
        direct,
        indirect,
        combined,
        reserves,
        building,
        management: indirect_items.management,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn params() -> SectionParams {
        SectionParams {
            land_cost: dec!(200),
            total_funding: None,
            project_type: ProjectType::General,
            basic_reserve_rate: dec!(0.08),
            price_reserve_rate: dec!(0.02),
        }
    }

    fn items() -> Vec<CostLineItem> {
        vec![
            CostLineItem::leaf(
                "A1",
                "Main",
                CostComponents::new(dec!(3000), dec!(1000), dec!(500), dec!(500)),
            ),
            CostLineItem::leaf(
                "A2",
                "Aux",
                CostComponents::new(dec!(400), dec!(300), dec!(200), dec!(100)),
            ),
        ]
    }

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.000001)
    }

    #[test]
    fn test_section_arithmetic() {
        let s = compose_sections(items(), &params(), &EngineSettings::default());
        assert_eq!(s.direct.total, dec!(6000));
        assert!(close(s.combined.total, s.direct.total + s.indirect.total));
        assert_eq!(s.basic_reserve(), s.combined.total * dec!(0.08));
        assert_eq!(s.price_reserve(), s.combined.total * dec!(0.02));
        assert!(close(s.building_investment(), s.combined.total + s.reserves.total));
        assert!(close(
            s.building.total,
            s.direct.total + s.indirect.total + s.reserves.total
        ));
    }

    #[test]
    fn test_components_carry_through() {
        let s = compose_sections(items(), &params(), &EngineSettings::default());
        assert_eq!(s.building.components.total(), s.building.total);
        assert_eq!(s.direct.components.construction, dec!(3400));
    }

    #[test]
    fn test_tree_has_summary_rows() {
        let s = compose_sections(items(), &params(), &EngineSettings::default());
        let building = s.building_investment();
        let tree = s.into_tree(dec!(100), building + dec!(100));
        let ids: Vec<&str> = tree.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D", "E", "F", "G"]);
        assert!(close(tree[6].total, building + dec!(100)));
        assert!(close(tree[6].share_of_total.unwrap(), Decimal::ONE));
        assert_eq!(tree[1].total, tree[1].children.iter().map(|c| c.total).sum::<Decimal>());
    }
}
