use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CapexError;
use crate::iteration::{IterationLimits, MAX_ITERATION_CAP};
use crate::types::{CostComponents, Rate};
use crate::CapexResult;

/// Upper bound on indirect-fee rates and design coefficients.
const MAX_COEFFICIENT: Decimal = dec!(10);

const CIRCULAR_FEE_DEFAULT: IterationLimits = IterationLimits::new(dec!(0.01), 10);
const FUNDING_DEFAULT: IterationLimits = IterationLimits::new(dec!(0.01), 10);
const CONVERGENCE_DEFAULT: IterationLimits = IterationLimits::new(dec!(0.0001), 100);

// ---------------------------------------------------------------------------
// Partial iteration limits
// ---------------------------------------------------------------------------

/// `IterationLimits` as written in a settings document; absent fields fall
/// back to the limits of the solver being configured.
#[derive(Deserialize)]
struct LimitsOverride {
    #[serde(default)]
    tolerance: Option<Decimal>,
    #[serde(default)]
    max_iterations: Option<u32>,
}

impl LimitsOverride {
    fn over(self, base: IterationLimits) -> IterationLimits {
        IterationLimits::new(
            self.tolerance.unwrap_or(base.tolerance),
            self.max_iterations.unwrap_or(base.max_iterations),
        )
    }
}

fn circular_fee_limits<'de, D: Deserializer<'de>>(d: D) -> Result<IterationLimits, D::Error> {
    LimitsOverride::deserialize(d).map(|o| o.over(CIRCULAR_FEE_DEFAULT))
}

fn funding_limits<'de, D: Deserializer<'de>>(d: D) -> Result<IterationLimits, D::Error> {
    LimitsOverride::deserialize(d).map(|o| o.over(FUNDING_DEFAULT))
}

fn convergence_limits<'de, D: Deserializer<'de>>(d: D) -> Result<IterationLimits, D::Error> {
    LimitsOverride::deserialize(d).map(|o| o.over(CONVERGENCE_DEFAULT))
}

// ---------------------------------------------------------------------------
// Engine-wide tunables
// ---------------------------------------------------------------------------

/// Every knob of the estimation engine. All fields default, so a partial
/// JSON/YAML document only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Management fee inside its own base.
    #[serde(deserialize_with = "circular_fee_limits")]
    pub circular_fee: IterationLimits,
    /// Sections recomposed against the previous total funding.
    #[serde(deserialize_with = "funding_limits")]
    pub funding: IterationLimits,
    /// Loan against total investment.
    #[serde(deserialize_with = "convergence_limits")]
    pub convergence: IterationLimits,
    /// Share of total investment financed by debt when no loan is fixed.
    pub loan_ratio: Rate,
    pub adjustment: AdjustmentSettings,
    pub default_split: DefaultSplit,
    pub indirect: IndirectRates,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            circular_fee: CIRCULAR_FEE_DEFAULT,
            funding: FUNDING_DEFAULT,
            convergence: CONVERGENCE_DEFAULT,
            loan_ratio: dec!(0.7),
            adjustment: AdjustmentSettings::default(),
            default_split: DefaultSplit::default(),
            indirect: IndirectRates::default(),
        }
    }
}

fn out_of_range(field: &str, reason: String) -> CapexError {
    CapexError::InvalidInput {
        field: field.into(),
        reason,
    }
}

fn check_range(field: &str, value: Decimal, max: Decimal) -> CapexResult<()> {
    if value < Decimal::ZERO || value > max {
        return Err(out_of_range(field, format!("Must be in [0, {max}]")));
    }
    Ok(())
}

fn check_cap(field: &str, cap: u32) -> CapexResult<()> {
    if cap > MAX_ITERATION_CAP {
        return Err(out_of_range(
            field,
            format!("Must not exceed {MAX_ITERATION_CAP}"),
        ));
    }
    Ok(())
}

impl EngineSettings {
    /// Reject settings under which a solve could run unbounded or overflow.
    pub fn validate(&self) -> CapexResult<()> {
        check_cap("settings.circular_fee.max_iterations", self.circular_fee.max_iterations)?;
        check_cap("settings.funding.max_iterations", self.funding.max_iterations)?;
        check_cap("settings.convergence.max_iterations", self.convergence.max_iterations)?;

        if self.loan_ratio < Decimal::ZERO || self.loan_ratio >= Decimal::ONE {
            return Err(out_of_range(
                "settings.loan_ratio",
                "Loan ratio must be in [0, 1)".into(),
            ));
        }

        self.adjustment.validate()?;

        check_range(
            "settings.default_split.base_ratio",
            self.default_split.base_ratio,
            Decimal::ONE,
        )?;
        for (i, item) in self.default_split.items.iter().enumerate() {
            let f = item.fractions;
            for value in [f.construction, f.equipment, f.installation, f.other] {
                check_range(
                    &format!("settings.default_split.items[{i}]"),
                    value,
                    Decimal::ONE,
                )?;
            }
        }

        let r = &self.indirect;
        for (field, value) in [
            ("management_fallback", r.management_fallback),
            ("preliminary_survey", r.preliminary_survey),
            ("construction_survey", r.construction_survey),
            ("design_complexity", r.design_complexity),
            ("design_adjustment", r.design_adjustment),
            ("as_built_drawings", r.as_built_drawings),
            ("research_testing", r.research_testing),
            ("environmental_report", r.environmental_report),
            ("site_preparation", r.site_preparation),
            ("insurance", r.insurance),
            ("inspection_testing", r.inspection_testing),
            ("municipal_facilities", r.municipal_facilities),
            ("other", r.other),
        ] {
            check_range(&format!("settings.indirect.{field}"), value, MAX_COEFFICIENT)?;
        }
        Ok(())
    }
}

/// Limits of the proportional adjustment engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentSettings {
    /// Relative change applied per global step.
    pub step: Rate,
    /// Bound on the cumulative adjustment of any one item, both directions.
    pub cap: Rate,
    /// Minimum share of the grand total each item must keep.
    pub min_share: Rate,
    /// Stop once `|total - target| / target` is within this.
    pub gap_threshold: Rate,
    pub max_rounds: u32,
}

impl AdjustmentSettings {
    pub fn validate(&self) -> CapexResult<()> {
        check_range("settings.adjustment.step", self.step, Decimal::ONE)?;
        check_range("settings.adjustment.cap", self.cap, Decimal::ONE)?;
        if self.min_share < Decimal::ZERO || self.min_share >= Decimal::ONE {
            return Err(out_of_range(
                "settings.adjustment.min_share",
                "Minimum share must be in [0, 1)".into(),
            ));
        }
        check_range("settings.adjustment.gap_threshold", self.gap_threshold, Decimal::ONE)?;
        check_cap("settings.adjustment.max_rounds", self.max_rounds)
    }
}

impl Default for AdjustmentSettings {
    fn default() -> Self {
        Self {
            step: dec!(0.0075),
            cap: dec!(0.20),
            min_share: dec!(0.01),
            gap_threshold: dec!(0.015),
            max_rounds: 50,
        }
    }
}

/// One item of the default direct-cost breakdown, as fractions of
/// `target * base_ratio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitItem {
    pub name: String,
    pub fractions: CostComponents,
}

/// Heuristic direct-cost breakdown used when neither seeded items nor raw
/// costs are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSplit {
    /// Portion of the target investment assigned to the direct section.
    pub base_ratio: Rate,
    pub items: Vec<SplitItem>,
}

impl Default for DefaultSplit {
    fn default() -> Self {
        Self {
            base_ratio: dec!(0.5),
            items: vec![
                SplitItem {
                    name: "Primary works".into(),
                    fractions: CostComponents::new(dec!(0.4), dec!(0.3), dec!(0.15), dec!(0.05)),
                },
                SplitItem {
                    name: "Auxiliary works".into(),
                    fractions: CostComponents::new(dec!(0.05), dec!(0.02), dec!(0.01), dec!(0.01)),
                },
                SplitItem {
                    name: "Other works".into(),
                    fractions: CostComponents::new(dec!(0.005), dec!(0), dec!(0), dec!(0.005)),
                },
            ],
        }
    }
}

/// Rates and coefficients of the indirect-cost section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndirectRates {
    /// Management fee on the direct total when no funding figure exists.
    pub management_fallback: Rate,
    pub preliminary_survey: Rate,
    pub construction_survey: Rate,
    pub design_complexity: Rate,
    pub design_adjustment: Rate,
    pub as_built_drawings: Rate,
    pub research_testing: Rate,
    pub environmental_report: Rate,
    pub site_preparation: Rate,
    pub insurance: Rate,
    pub inspection_testing: Rate,
    pub municipal_facilities: Rate,
    pub other: Rate,
}

impl Default for IndirectRates {
    fn default() -> Self {
        Self {
            management_fallback: dec!(0.015),
            preliminary_survey: dec!(0.003),
            construction_survey: dec!(0.012),
            design_complexity: dec!(1.0),
            design_adjustment: dec!(1.1),
            as_built_drawings: dec!(0.08),
            research_testing: dec!(0.01),
            environmental_report: dec!(0.003),
            site_preparation: dec!(0.02),
            insurance: dec!(0.005),
            inspection_testing: dec!(0.006),
            municipal_facilities: dec!(0.015),
            other: dec!(0.005),
        }
    }
}
