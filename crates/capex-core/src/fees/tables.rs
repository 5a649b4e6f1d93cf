use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::schedule::{FeeSchedule, RateBracket};
use crate::error::CapexError;

// ---------------------------------------------------------------------------
// Progressive tables (threshold = tier lower bound, value = marginal rate)
// ---------------------------------------------------------------------------

/// Construction-unit management fee.
pub const MANAGEMENT_FEE: [RateBracket; 6] = [
    RateBracket::new(dec!(0), dec!(0.02)),
    RateBracket::new(dec!(1000), dec!(0.015)),
    RateBracket::new(dec!(5000), dec!(0.012)),
    RateBracket::new(dec!(10000), dec!(0.01)),
    RateBracket::new(dec!(50000), dec!(0.008)),
    RateBracket::new(dec!(100000), dec!(0.004)),
];

/// Bidding agency fee for works contracts, charged on engineering cost.
pub const BIDDING_WORKS: [RateBracket; 10] = [
    RateBracket::new(dec!(0), dec!(0.0063)),
    RateBracket::new(dec!(100), dec!(0.00441)),
    RateBracket::new(dec!(500), dec!(0.003465)),
    RateBracket::new(dec!(1000), dec!(0.002205)),
    RateBracket::new(dec!(5000), dec!(0.00126)),
    RateBracket::new(dec!(10000), dec!(0.000315)),
    RateBracket::new(dec!(50000), dec!(0.000221)),
    RateBracket::new(dec!(100000), dec!(0.00005)),
    RateBracket::new(dec!(500000), dec!(0.000038)),
    RateBracket::new(dec!(1000000), dec!(0.000025)),
];

/// Bidding agency fee for goods, charged on equipment cost.
pub const BIDDING_GOODS: [RateBracket; 10] = [
    RateBracket::new(dec!(0), dec!(0.00945)),
    RateBracket::new(dec!(100), dec!(0.00693)),
    RateBracket::new(dec!(500), dec!(0.00504)),
    RateBracket::new(dec!(1000), dec!(0.00315)),
    RateBracket::new(dec!(5000), dec!(0.001575)),
    RateBracket::new(dec!(10000), dec!(0.000315)),
    RateBracket::new(dec!(50000), dec!(0.000221)),
    RateBracket::new(dec!(100000), dec!(0.00005)),
    RateBracket::new(dec!(500000), dec!(0.000038)),
    RateBracket::new(dec!(1000000), dec!(0.000025)),
];

/// Bidding agency fee for services, charged on supervision + survey/design.
pub const BIDDING_SERVICES: [RateBracket; 10] = [
    RateBracket::new(dec!(0), dec!(0.00945)),
    RateBracket::new(dec!(100), dec!(0.00504)),
    RateBracket::new(dec!(500), dec!(0.002853)),
    RateBracket::new(dec!(1000), dec!(0.001575)),
    RateBracket::new(dec!(5000), dec!(0.00063)),
    RateBracket::new(dec!(10000), dec!(0.000315)),
    RateBracket::new(dec!(50000), dec!(0.000221)),
    RateBracket::new(dec!(100000), dec!(0.00005)),
    RateBracket::new(dec!(500000), dec!(0.000038)),
    RateBracket::new(dec!(1000000), dec!(0.000025)),
];

// ---------------------------------------------------------------------------
// Interpolated tables (threshold = anchor, value = base fee)
// ---------------------------------------------------------------------------

/// Construction supervision, keyed on engineering cost.
pub const SUPERVISION: [RateBracket; 16] = [
    RateBracket::new(dec!(500), dec!(13.20)),
    RateBracket::new(dec!(1000), dec!(24.08)),
    RateBracket::new(dec!(3000), dec!(62.48)),
    RateBracket::new(dec!(5000), dec!(96.64)),
    RateBracket::new(dec!(8000), dec!(144.80)),
    RateBracket::new(dec!(10000), dec!(174.88)),
    RateBracket::new(dec!(20000), dec!(314.72)),
    RateBracket::new(dec!(40000), dec!(566.56)),
    RateBracket::new(dec!(60000), dec!(793.12)),
    RateBracket::new(dec!(80000), dec!(1004.64)),
    RateBracket::new(dec!(100000), dec!(1205.60)),
    RateBracket::new(dec!(200000), dec!(2170.00)),
    RateBracket::new(dec!(400000), dec!(3906.08)),
    RateBracket::new(dec!(600000), dec!(5468.48)),
    RateBracket::new(dec!(800000), dec!(6926.72)),
    RateBracket::new(dec!(1000000), dec!(8312.08)),
];

/// Engineering design base fee, keyed on engineering cost.
pub const DESIGN: [RateBracket; 18] = [
    RateBracket::new(dec!(200), dec!(8.10)),
    RateBracket::new(dec!(500), dec!(18.81)),
    RateBracket::new(dec!(1000), dec!(34.92)),
    RateBracket::new(dec!(3000), dec!(93.42)),
    RateBracket::new(dec!(5000), dec!(147.51)),
    RateBracket::new(dec!(8000), dec!(224.64)),
    RateBracket::new(dec!(10000), dec!(274.32)),
    RateBracket::new(dec!(20000), dec!(510.12)),
    RateBracket::new(dec!(40000), dec!(948.60)),
    RateBracket::new(dec!(60000), dec!(1363.68)),
    RateBracket::new(dec!(80000), dec!(1764.09)),
    RateBracket::new(dec!(100000), dec!(2154.06)),
    RateBracket::new(dec!(200000), dec!(4005.72)),
    RateBracket::new(dec!(400000), dec!(7449.03)),
    RateBracket::new(dec!(600000), dec!(10707.75)),
    RateBracket::new(dec!(800000), dec!(13852.26)),
    RateBracket::new(dec!(1000000), dec!(16914.42)),
    RateBracket::new(dec!(2000000), dec!(31454.01)),
];

// Consulting tables share their anchor points. The open-ended top band is
// anchored at 1,000,000.

pub const CONSULTING_PROPOSAL: [RateBracket; 8] = [
    RateBracket::new(dec!(500), dec!(1.0)),
    RateBracket::new(dec!(1000), dec!(1.6)),
    RateBracket::new(dec!(3000), dec!(3.4)),
    RateBracket::new(dec!(10000), dec!(8.0)),
    RateBracket::new(dec!(50000), dec!(20.4)),
    RateBracket::new(dec!(100000), dec!(36.8)),
    RateBracket::new(dec!(500000), dec!(62.0)),
    RateBracket::new(dec!(1000000), dec!(90.0)),
];

pub const CONSULTING_FEASIBILITY: [RateBracket; 8] = [
    RateBracket::new(dec!(500), dec!(2.4)),
    RateBracket::new(dec!(1000), dec!(4.0)),
    RateBracket::new(dec!(3000), dec!(7.2)),
    RateBracket::new(dec!(10000), dec!(16.0)),
    RateBracket::new(dec!(50000), dec!(41.2)),
    RateBracket::new(dec!(100000), dec!(74.0)),
    RateBracket::new(dec!(500000), dec!(124.0)),
    RateBracket::new(dec!(1000000), dec!(180.0)),
];

pub const CONSULTING_PROPOSAL_REVIEW: [RateBracket; 8] = [
    RateBracket::new(dec!(500), dec!(0.6)),
    RateBracket::new(dec!(1000), dec!(1.0)),
    RateBracket::new(dec!(3000), dec!(2.2)),
    RateBracket::new(dec!(10000), dec!(4.8)),
    RateBracket::new(dec!(50000), dec!(8.0)),
    RateBracket::new(dec!(100000), dec!(10.8)),
    RateBracket::new(dec!(500000), dec!(12.8)),
    RateBracket::new(dec!(1000000), dec!(14.8)),
];

pub const CONSULTING_FEASIBILITY_REVIEW: [RateBracket; 8] = [
    RateBracket::new(dec!(500), dec!(1.0)),
    RateBracket::new(dec!(1000), dec!(1.6)),
    RateBracket::new(dec!(3000), dec!(3.0)),
    RateBracket::new(dec!(10000), dec!(6.0)),
    RateBracket::new(dec!(50000), dec!(10.0)),
    RateBracket::new(dec!(100000), dec!(14.0)),
    RateBracket::new(dec!(500000), dec!(18.0)),
    RateBracket::new(dec!(1000000), dec!(24.0)),
];

/// Same scale as the feasibility review.
pub const CONSULTING_DESIGN_REVIEW: [RateBracket; 8] = CONSULTING_FEASIBILITY_REVIEW;

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// Every built-in fee table, addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StandardTable {
    Management,
    BiddingWorks,
    BiddingGoods,
    BiddingServices,
    Supervision,
    Design,
    ConsultingProposal,
    ConsultingFeasibility,
    ConsultingProposalReview,
    ConsultingFeasibilityReview,
    ConsultingDesignReview,
}

impl StandardTable {
    pub const ALL: [StandardTable; 11] = [
        StandardTable::Management,
        StandardTable::BiddingWorks,
        StandardTable::BiddingGoods,
        StandardTable::BiddingServices,
        StandardTable::Supervision,
        StandardTable::Design,
        StandardTable::ConsultingProposal,
        StandardTable::ConsultingFeasibility,
        StandardTable::ConsultingProposalReview,
        StandardTable::ConsultingFeasibilityReview,
        StandardTable::ConsultingDesignReview,
    ];

    /// The five consulting tables summed into the preliminary consulting fee.
    pub const CONSULTING: [StandardTable; 5] = [
        StandardTable::ConsultingProposal,
        StandardTable::ConsultingFeasibility,
        StandardTable::ConsultingProposalReview,
        StandardTable::ConsultingFeasibilityReview,
        StandardTable::ConsultingDesignReview,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StandardTable::Management => "management",
            StandardTable::BiddingWorks => "bidding-works",
            StandardTable::BiddingGoods => "bidding-goods",
            StandardTable::BiddingServices => "bidding-services",
            StandardTable::Supervision => "supervision",
            StandardTable::Design => "design",
            StandardTable::ConsultingProposal => "consulting-proposal",
            StandardTable::ConsultingFeasibility => "consulting-feasibility",
            StandardTable::ConsultingProposalReview => "consulting-proposal-review",
            StandardTable::ConsultingFeasibilityReview => "consulting-feasibility-review",
            StandardTable::ConsultingDesignReview => "consulting-design-review",
        }
    }

    pub fn brackets(&self) -> &'static [RateBracket] {
        match self {
            StandardTable::Management => &MANAGEMENT_FEE,
            StandardTable::BiddingWorks => &BIDDING_WORKS,
            StandardTable::BiddingGoods => &BIDDING_GOODS,
            StandardTable::BiddingServices => &BIDDING_SERVICES,
            StandardTable::Supervision => &SUPERVISION,
            StandardTable::Design => &DESIGN,
            StandardTable::ConsultingProposal => &CONSULTING_PROPOSAL,
            StandardTable::ConsultingFeasibility => &CONSULTING_FEASIBILITY,
            StandardTable::ConsultingProposalReview => &CONSULTING_PROPOSAL_REVIEW,
            StandardTable::ConsultingFeasibilityReview => &CONSULTING_FEASIBILITY_REVIEW,
            StandardTable::ConsultingDesignReview => &CONSULTING_DESIGN_REVIEW,
        }
    }

    pub fn schedule(&self) -> FeeSchedule {
        match self {
            StandardTable::Management
            | StandardTable::BiddingWorks
            | StandardTable::BiddingGoods
            | StandardTable::BiddingServices => FeeSchedule::progressive(self.brackets()),
            _ => FeeSchedule::interpolated(self.brackets()),
        }
    }
}

impl fmt::Display for StandardTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StandardTable {
    type Err = CapexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        StandardTable::ALL
            .iter()
            .copied()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| CapexError::InvalidInput {
                field: "table".into(),
                reason: format!(
                    "Unknown fee table '{s}'. Valid: {}",
                    StandardTable::ALL
                        .iter()
                        .map(|t| t.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn strictly_increasing(brackets: &[RateBracket]) -> bool {
        brackets.windows(2).all(|w| w[0].threshold < w[1].threshold)
    }

    #[test]
    fn test_all_tables_have_increasing_thresholds() {
        for table in StandardTable::ALL {
            assert!(strictly_increasing(table.brackets()), "{table}");
        }
    }

    #[test]
    fn test_management_fee_reference_points() {
        let s = StandardTable::Management.schedule();
        assert_eq!(s.evaluate(dec!(10000)), dec!(140));
        // 140 + 10000 * 1%
        assert_eq!(s.evaluate(dec!(20000)), dec!(240));
    }

    #[test]
    fn test_bidding_works_reference_point() {
        let s = StandardTable::BiddingWorks.schedule();
        assert_eq!(s.evaluate(dec!(1000)), dec!(4.1265));
    }

    #[test]
    fn test_supervision_reference_point() {
        let s = StandardTable::Supervision.schedule();
        assert_eq!(s.evaluate(dec!(2000)), dec!(43.28));
    }

    #[test]
    fn test_tables_are_monotone() {
        let samples = [
            dec!(50),
            dec!(300),
            dec!(800),
            dec!(2500),
            dec!(9000),
            dec!(45000),
            dec!(150000),
            dec!(750000),
            dec!(1500000),
        ];
        for table in StandardTable::ALL {
            let s = table.schedule();
            let mut prev = Decimal::ZERO;
            for p in samples {
                let fee = s.evaluate(p);
                assert!(fee >= prev, "{table} not monotone at {p}");
                prev = fee;
            }
        }
    }

    #[test]
    fn test_parse_table_names() {
        assert_eq!(
            "bidding_goods".parse::<StandardTable>().unwrap(),
            StandardTable::BiddingGoods
        );
        assert_eq!(
            "Supervision".parse::<StandardTable>().unwrap(),
            StandardTable::Supervision
        );
        assert!("nope".parse::<StandardTable>().is_err());
    }
}
