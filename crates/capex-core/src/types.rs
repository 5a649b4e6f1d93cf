use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Monetary amounts in the base unit (10,000 underlying currency units).
/// Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Number of underlying currency units in one base unit.
pub const BASE_UNIT: Decimal = dec!(10000);

/// Largest accepted money input, in base units.
pub const MAX_MONEY: Money = dec!(1000000000000);

/// Largest accepted reserve or interest rate.
pub const MAX_RATE: Rate = Decimal::ONE;

/// Longest accepted construction period, in years.
pub const MAX_CONSTRUCTION_YEARS: u32 = 100;

/// Convert an amount in underlying currency units back into the base unit.
pub fn from_underlying_units(units: Decimal) -> Money {
    units / BASE_UNIT
}

/// The four cost columns every line item carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostComponents {
    #[serde(default)]
    pub construction: Money,
    #[serde(default)]
    pub equipment: Money,
    #[serde(default)]
    pub installation: Money,
    #[serde(default)]
    pub other: Money,
}

impl CostComponents {
    pub fn new(construction: Money, equipment: Money, installation: Money, other: Money) -> Self {
        Self {
            construction,
            equipment,
            installation,
            other,
        }
    }

    /// A fee-only amount, carried in the `other` column.
    pub fn other_only(amount: Money) -> Self {
        Self {
            other: amount,
            ..Default::default()
        }
    }

    pub fn total(&self) -> Money {
        self.construction + self.equipment + self.installation + self.other
    }

    /// Construction + installation: the base for most engineering fee tables.
    pub fn engineering_cost(&self) -> Money {
        self.construction + self.installation
    }

    pub fn scale(&self, factor: Decimal) -> Self {
        Self {
            construction: self.construction * factor,
            equipment: self.equipment * factor,
            installation: self.installation * factor,
            other: self.other * factor,
        }
    }
}

impl std::ops::Add for CostComponents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            construction: self.construction + rhs.construction,
            equipment: self.equipment + rhs.equipment,
            installation: self.installation + rhs.installation,
            other: self.other + rhs.other,
        }
    }
}

impl std::iter::Sum for CostComponents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, c| acc + c)
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
