use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::line_item::CostLineItem;
use crate::error::CapexError;
use crate::settings::DefaultSplit;
use crate::types::{CostComponents, Money};
use crate::CapexResult;

/// A caller-supplied direct-cost line (for example from an upstream
/// breakdown generator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectItemSeed {
    pub name: String,
    #[serde(default)]
    pub construction_cost: Money,
    #[serde(default)]
    pub equipment_cost: Money,
    #[serde(default)]
    pub installation_cost: Money,
    #[serde(default)]
    pub other_cost: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

impl DirectItemSeed {
    pub fn components(&self) -> CostComponents {
        CostComponents::new(
            self.construction_cost,
            self.equipment_cost,
            self.installation_cost,
            self.other_cost,
        )
    }
}

/// Where the direct section's items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectSource {
    Seeded,
    RawCosts,
    DefaultSplit,
}

fn direct_id(index: usize) -> String {
    format!("A{}", index + 1)
}

/// Build the items of the direct section (A).
///
/// Precedence: a non-empty seeded breakdown, then the raw cost columns as a
/// single item, then the default split of `target_investment`.
pub fn build_direct_items(
    seeds: Option<&[DirectItemSeed]>,
    raw: CostComponents,
    target_investment: Option<Money>,
    split: &DefaultSplit,
) -> CapexResult<(Vec<CostLineItem>, DirectSource)> {
    if let Some(seeds) = seeds.filter(|s| !s.is_empty()) {
        let items = seeds
            .iter()
            .enumerate()
            .map(|(i, seed)| {
                let item = CostLineItem::leaf(direct_id(i), seed.name.clone(), seed.components());
                match &seed.remark {
                    Some(r) if !r.is_empty() => item.with_remark(r.clone()),
                    _ => item,
                }
            })
            .collect();
        return Ok((items, DirectSource::Seeded));
    }

    if raw.total() > Decimal::ZERO {
        let item = CostLineItem::leaf(direct_id(0), "Engineering works", raw)
            .with_remark("From raw cost inputs");
        return Ok((vec![item], DirectSource::RawCosts));
    }

    match target_investment {
        Some(target) if target > Decimal::ZERO => {
            Ok((default_split_items(target, split), DirectSource::DefaultSplit))
        }
        _ => Err(CapexError::InsufficientData(
            "No direct-cost breakdown, raw costs, or target investment supplied".into(),
        )),
    }
}

/// Heuristic breakdown: each split item receives `target * base_ratio *
/// fraction` per component.
pub fn default_split_items(target: Money, split: &DefaultSplit) -> Vec<CostLineItem> {
    let base = target * split.base_ratio;
    split
        .items
        .iter()
        .enumerate()
        .map(|(i, s)| {
            CostLineItem::leaf(direct_id(i), s.name.clone(), s.fractions.scale(base))
                .with_remark("Default split")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seed(name: &str, c: Decimal, e: Decimal) -> DirectItemSeed {
        DirectItemSeed {
            name: name.into(),
            construction_cost: c,
            equipment_cost: e,
            installation_cost: Decimal::ZERO,
            other_cost: Decimal::ZERO,
            remark: None,
        }
    }

    #[test]
    fn test_seeds_take_precedence() {
        let seeds = vec![seed("Hall", dec!(100), dec!(50)), seed("Road", dec!(30), dec!(0))];
        let raw = CostComponents::new(dec!(999), dec!(0), dec!(0), dec!(0));
        let (items, source) =
            build_direct_items(Some(&seeds), raw, None, &DefaultSplit::default()).unwrap();
        assert_eq!(source, DirectSource::Seeded);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "A1");
        assert_eq!(items[0].total, dec!(150));
        assert_eq!(items[1].total, dec!(30));
    }

    #[test]
    fn test_raw_costs_form_single_item() {
        let raw = CostComponents::new(dec!(600), dec!(200), dec!(100), dec!(100));
        let (items, source) =
            build_direct_items(Some(&[]), raw, Some(dec!(5000)), &DefaultSplit::default()).unwrap();
        assert_eq!(source, DirectSource::RawCosts);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].total, dec!(1000));
    }

    #[test]
    fn test_default_split_from_target() {
        let (items, source) = build_direct_items(
            None,
            CostComponents::default(),
            Some(dec!(10000)),
            &DefaultSplit::default(),
        )
        .unwrap();
        assert_eq!(source, DirectSource::DefaultSplit);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].total, dec!(4500));
        assert_eq!(items[0].components.construction, dec!(2000));
        assert_eq!(items[1].total, dec!(450));
        assert_eq!(items[2].total, dec!(50));
    }

    #[test]
    fn test_nothing_to_build_from() {
        let err = build_direct_items(None, CostComponents::default(), None, &DefaultSplit::default());
        assert!(matches!(err, Err(CapexError::InsufficientData(_))));
    }
}
