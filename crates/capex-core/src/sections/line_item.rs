use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CostComponents, Money, Rate};

/// A node in the cost hierarchy.
///
/// Leaves carry their own components and `total == components.total()`.
/// Sections carry the component-wise sum of their children and
/// `total == sum(child.total)`. Both are enforced by the constructors;
/// adjustments produce scaled copies instead of mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLineItem {
    pub id: String,
    pub name: String,
    pub components: CostComponents,
    pub total: Money,
    /// `total / total_investment`, filled in after the final solve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_of_total: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CostLineItem>,
}

impl CostLineItem {
    pub fn leaf(id: impl Into<String>, name: impl Into<String>, components: CostComponents) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total: components.total(),
            components,
            share_of_total: None,
            remark: None,
            children: Vec::new(),
        }
    }

    /// A single-amount fee, carried in the `other` column.
    pub fn fee(id: impl Into<String>, name: impl Into<String>, amount: Money) -> Self {
        Self::leaf(id, name, CostComponents::other_only(amount))
    }

    pub fn section(
        id: impl Into<String>,
        name: impl Into<String>,
        children: Vec<CostLineItem>,
    ) -> Self {
        let components = children.iter().map(|c| c.components).sum();
        let total = children.iter().map(|c| c.total).sum();
        Self {
            id: id.into(),
            name: name.into(),
            components,
            total,
            share_of_total: None,
            remark: None,
            children,
        }
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Copy with every component and total multiplied by `factor`.
    ///
    /// Non-positive factors return an unchanged copy.
    pub fn scaled(&self, factor: Decimal) -> Self {
        if factor <= Decimal::ZERO {
            return self.clone();
        }
        if self.is_leaf() {
            let components = self.components.scale(factor);
            Self {
                components,
                total: components.total(),
                ..self.clone()
            }
        } else {
            let children: Vec<CostLineItem> =
                self.children.iter().map(|c| c.scaled(factor)).collect();
            Self {
                components: children.iter().map(|c| c.components).sum(),
                total: children.iter().map(|c| c.total).sum(),
                children,
                ..self.clone()
            }
        }
    }

    /// Copy with `share_of_total` set on this node and every descendant.
    /// Left unset when `total_investment` is not positive.
    pub fn with_shares(mut self, total_investment: Money) -> Self {
        self.share_of_total = if total_investment > Decimal::ZERO {
            Some(self.total / total_investment)
        } else {
            None
        };
        self.children = self
            .children
            .into_iter()
            .map(|c| c.with_shares(total_investment))
            .collect();
        self
    }
}

pub fn sum_totals(items: &[CostLineItem]) -> Money {
    items.iter().map(|i| i.total).sum()
}

pub fn sum_components(items: &[CostLineItem]) -> CostComponents {
    items.iter().map(|i| i.components).sum()
}
