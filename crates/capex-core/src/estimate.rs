use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::adjustment::{apply_global_step, enforce_minimum_share, AdjustmentDirection};
use crate::error::CapexError;
use crate::financing::amortizer::{build_loan_schedule, round_loan_amount, LoanSchedule};
use crate::financing::convergence::{
    contracts, converge_investment, interest_factor, ConvergedInvestment, LoanBasis,
};
use crate::iteration::solve_fixed_point;
use crate::sections::composer::{compose_sections, CostSections, SectionParams};
use crate::sections::direct::{build_direct_items, DirectItemSeed, DirectSource};
use crate::sections::indirect::ProjectType;
use crate::sections::line_item::{sum_totals, CostLineItem};
use crate::settings::EngineSettings;
use crate::types::*;
use crate::CapexResult;

/// First funding guess relative to the direct-section total.
const INITIAL_FUNDING_MULTIPLE: Decimal = dec!(1.5);

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

fn default_basic_reserve_rate() -> Rate {
    dec!(0.08)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateInput {
    #[serde(default)]
    pub construction_cost: Money,
    #[serde(default)]
    pub equipment_cost: Money,
    #[serde(default)]
    pub installation_cost: Money,
    #[serde(default)]
    pub other_cost: Money,
    #[serde(default)]
    pub land_cost: Money,
    #[serde(default = "default_basic_reserve_rate")]
    pub basic_reserve_rate: Rate,
    /// Price escalation reserve on C
    #[serde(default)]
    pub price_reserve_rate: Rate,
    pub construction_years: u32,
    pub loan_rate: Rate,
    /// Fixed loan principal; otherwise the loan is `loan_ratio` of the total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_loan_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_items: Option<Vec<DirectItemSeed>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_funding: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_investment: Option<Money>,
    #[serde(default)]
    pub project_type: ProjectType,
    #[serde(default)]
    pub options: EstimateOptions,
    #[serde(default)]
    pub settings: EngineSettings,
}

impl EstimateInput {
    pub fn raw_costs(&self) -> CostComponents {
        CostComponents::new(
            self.construction_cost,
            self.equipment_cost,
            self.installation_cost,
            self.other_cost,
        )
    }

    fn loan_basis(&self) -> LoanBasis {
        match self.custom_loan_amount {
            Some(amount) => LoanBasis::Fixed(amount),
            None => LoanBasis::Ratio(self.settings.loan_ratio),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateOptions {
    /// Return the A..G line-item tree.
    pub include_breakdown: bool,
    pub include_schedule: bool,
    /// Nudge the direct items toward `target_investment` when one is given.
    pub adjust_to_target: bool,
    /// Fail with `ConvergenceFailure` instead of warning.
    pub strict_convergence: bool,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            include_breakdown: true,
            include_schedule: true,
            adjust_to_target: true,
            strict_convergence: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResult {
    pub construction_cost: Money,
    pub equipment_cost: Money,
    pub installation_cost: Money,
    pub other_cost: Money,
    pub land_cost: Money,
    pub basic_reserve: Money,
    pub price_reserve: Money,
    /// Before interest (E)
    pub building_investment: Money,
    pub construction_interest: Money,
    pub total_investment: Money,
    pub loan_amount: Money,
    /// Rounds of the loan/interest solve.
    pub iterations: u32,
    /// Rounds of the outer funding solve (zero for the flat estimate).
    pub funding_rounds: u32,
    pub gap_rate: Rate,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAdjustment {
    pub id: String,
    pub name: String,
    /// Net relative change applied by global steps.
    pub cumulative: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentSummary {
    pub target_investment: Money,
    pub rounds: u32,
    /// `(total - target) / target` after the last round.
    pub target_gap: Rate,
    pub within_threshold: bool,
    pub items: Vec<ItemAdjustment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateOutput {
    pub estimate: EstimateResult,
    pub direct_source: DirectSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<CostLineItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_schedule: Option<LoanSchedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<AdjustmentSummary>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, reason: String) -> CapexError {
    CapexError::InvalidInput {
        field: field.into(),
        reason,
    }
}

fn money_in_range(field: &str, value: Money) -> CapexResult<()> {
    if value < Decimal::ZERO || value > MAX_MONEY {
        return Err(invalid(field, format!("Must be in [0, {MAX_MONEY}]")));
    }
    Ok(())
}

fn rate_in_range(field: &str, value: Rate) -> CapexResult<()> {
    if value < Decimal::ZERO || value > MAX_RATE {
        return Err(invalid(field, format!("Must be in [0, {MAX_RATE}]")));
    }
    Ok(())
}

fn validate_common(input: &EstimateInput) -> CapexResult<()> {
    money_in_range("construction_cost", input.construction_cost)?;
    money_in_range("equipment_cost", input.equipment_cost)?;
    money_in_range("installation_cost", input.installation_cost)?;
    money_in_range("other_cost", input.other_cost)?;
    money_in_range("land_cost", input.land_cost)?;
    rate_in_range("basic_reserve_rate", input.basic_reserve_rate)?;
    rate_in_range("price_reserve_rate", input.price_reserve_rate)?;
    rate_in_range("loan_rate", input.loan_rate)?;
    if input.construction_years > MAX_CONSTRUCTION_YEARS {
        return Err(invalid(
            "construction_years",
            format!("Construction period cannot exceed {MAX_CONSTRUCTION_YEARS} years"),
        ));
    }
    if let Some(loan) = input.custom_loan_amount {
        money_in_range("custom_loan_amount", loan)?;
    }
    input.settings.validate()?;

    if let LoanBasis::Ratio(ratio) = input.loan_basis() {
        let factor = interest_factor(input.loan_rate, input.construction_years);
        if !contracts(ratio, factor) {
            return Err(invalid(
                "settings.loan_ratio",
                format!(
                    "Loan ratio {ratio} times interest factor {factor} must be below 1 for a finite total"
                ),
            ));
        }
    }
    Ok(())
}

fn validate_input(input: &EstimateInput) -> CapexResult<()> {
    validate_common(input)?;
    if let Some(funding) = input.total_funding {
        money_in_range("total_funding", funding)?;
    }
    if let Some(target) = input.target_investment {
        if target <= Decimal::ZERO || target > MAX_MONEY {
            return Err(invalid(
                "target_investment",
                format!("Target investment must be in (0, {MAX_MONEY}]"),
            ));
        }
    }
    for (i, seed) in input.direct_items.iter().flatten().enumerate() {
        let c = seed.components();
        for value in [c.construction, c.equipment, c.installation, c.other] {
            money_in_range(&format!("direct_items[{i}]"), value)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Solve
// ---------------------------------------------------------------------------

/// Sections and financing composed against one funding figure.
#[derive(Debug, Clone)]
struct Snapshot {
    sections: CostSections,
    investment: ConvergedInvestment,
}

#[derive(Debug, Clone)]
struct FundingRound {
    /// Funding figure the next composition uses.
    funding: Money,
    snapshot: Option<Snapshot>,
}

#[derive(Debug, Clone)]
struct Solved {
    snapshot: Snapshot,
    rounds: u32,
    converged: bool,
    last_delta: Decimal,
}

fn compose_at(items: &[CostLineItem], funding: Money, input: &EstimateInput) -> Snapshot {
    let params = SectionParams {
        land_cost: input.land_cost,
        total_funding: Some(funding),
        project_type: input.project_type,
        basic_reserve_rate: input.basic_reserve_rate,
        price_reserve_rate: input.price_reserve_rate,
    };
    let sections = compose_sections(items.to_vec(), &params, &input.settings);
    let investment = converge_investment(
        sections.building_investment(),
        input.loan_basis(),
        input.loan_rate,
        input.construction_years,
        input.settings.convergence,
    );
    Snapshot {
        sections,
        investment,
    }
}

/// Recompose until the total funding the management fee was charged on
/// matches the total it produces.
fn solve_funding(items: &[CostLineItem], initial_funding: Money, input: &EstimateInput) -> Solved {
    let start = FundingRound {
        funding: initial_funding,
        snapshot: None,
    };
    let solved = solve_fixed_point(
        start,
        input.settings.funding,
        |round| {
            let snapshot = compose_at(items, round.funding, input);
            FundingRound {
                funding: snapshot.investment.total_investment,
                snapshot: Some(snapshot),
            }
        },
        |next, current| (next.funding - current.funding).abs(),
    );

    let FundingRound { funding, snapshot } = solved.value;
    Solved {
        snapshot: snapshot.unwrap_or_else(|| compose_at(items, funding, input)),
        rounds: solved.iterations,
        converged: solved.converged,
        last_delta: solved.last_delta,
    }
}

fn initial_funding(input: &EstimateInput, items: &[CostLineItem]) -> Money {
    match input.total_funding {
        Some(f) if f > Decimal::ZERO => f,
        _ => sum_totals(items) * INITIAL_FUNDING_MULTIPLE,
    }
}

/// Convergence bookkeeping across the three nested solves.
fn check_convergence(
    solved: &Solved,
    strict: bool,
    warnings: &mut Vec<String>,
) -> CapexResult<bool> {
    let snapshot = &solved.snapshot;
    let mut failures: Vec<(&str, u32, Decimal)> = Vec::new();

    if let Some(fee) = snapshot.sections.management {
        if !fee.converged {
            failures.push(("management_fee", fee.iterations, fee.last_delta));
        }
    }
    if !snapshot.investment.converged {
        failures.push((
            "loan_convergence",
            snapshot.investment.iterations,
            snapshot.investment.last_delta,
        ));
    }
    if !solved.converged {
        failures.push(("total_funding", solved.rounds, solved.last_delta));
    }

    if let Some(&(function, iterations, last_delta)) = failures.first() {
        if strict {
            return Err(CapexError::ConvergenceFailure {
                function: function.into(),
                iterations,
                last_delta,
            });
        }
    }
    for (function, iterations, last_delta) in &failures {
        let msg = format!(
            "{function} did not converge after {iterations} iterations (last delta {last_delta}); best-effort value returned"
        );
        log::warn!("{msg}");
        warnings.push(msg);
    }
    Ok(failures.is_empty())
}

fn summarise(
    sections: &CostSections,
    investment: &ConvergedInvestment,
    land_cost: Money,
    funding_rounds: u32,
    converged: bool,
) -> EstimateResult {
    let direct = sections.direct.components;
    EstimateResult {
        construction_cost: direct.construction,
        equipment_cost: direct.equipment,
        installation_cost: direct.installation,
        other_cost: direct.other,
        land_cost,
        basic_reserve: sections.basic_reserve(),
        price_reserve: sections.price_reserve(),
        building_investment: investment.building_investment,
        construction_interest: investment.construction_interest,
        total_investment: investment.total_investment,
        loan_amount: investment.loan_amount,
        iterations: investment.iterations,
        funding_rounds,
        gap_rate: investment.gap_rate,
        converged,
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Full sectioned estimate.
///
/// Builds the direct items, resolves the management fee and the
/// funding/loan interplay, optionally steers the direct items toward
/// `target_investment`, and derives the drawdown schedule.
pub fn estimate_investment(input: &EstimateInput) -> CapexResult<ComputationOutput<EstimateOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;
    if input.construction_years == 0 {
        warnings.push("Zero construction years: interest accrues over half a year".into());
    }

    let settings = &input.settings;
    let (mut items, direct_source) = build_direct_items(
        input.direct_items.as_deref(),
        input.raw_costs(),
        input.target_investment,
        &settings.default_split,
    )?;

    let adjust_target = input
        .target_investment
        .filter(|_| input.options.adjust_to_target);
    if adjust_target.is_some() {
        items = enforce_minimum_share(&items, settings.adjustment.min_share);
    }

    let mut solved = solve_funding(&items, initial_funding(input, &items), input);

    // Target-driven refinement
    let adjustment = match adjust_target {
        None => None,
        Some(target) => {
            let mut trackers = vec![Decimal::ZERO; items.len()];
            let mut rounds = 0u32;
            let mut gap = (solved.snapshot.investment.total_investment - target) / target;

            while rounds < settings.adjustment.max_rounds
                && gap.abs() > settings.adjustment.gap_threshold
            {
                let Some(direction) = AdjustmentDirection::from_gap(gap) else {
                    break;
                };
                let step = apply_global_step(&items, &trackers, direction, &settings.adjustment);
                if !step.applied {
                    log::debug!("adjustment exhausted after {rounds} rounds (gap {gap})");
                    break;
                }
                items = enforce_minimum_share(&step.items, settings.adjustment.min_share);
                trackers = step.trackers;

                let previous_total = solved.snapshot.investment.total_investment;
                solved = solve_funding(&items, previous_total, input);
                gap = (solved.snapshot.investment.total_investment - target) / target;
                rounds += 1;
            }

            let within_threshold = gap.abs() <= settings.adjustment.gap_threshold;
            if !within_threshold {
                warnings.push(format!(
                    "Total investment is {:.2}% away from target after {rounds} adjustment rounds",
                    gap * dec!(100)
                ));
            }

            Some(AdjustmentSummary {
                target_investment: target,
                rounds,
                target_gap: gap,
                within_threshold,
                items: items
                    .iter()
                    .zip(trackers.iter())
                    .map(|(item, cumulative)| ItemAdjustment {
                        id: item.id.clone(),
                        name: item.name.clone(),
                        cumulative: *cumulative,
                    })
                    .collect(),
            })
        }
    };

    let converged = check_convergence(&solved, input.options.strict_convergence, &mut warnings)?;
    let Snapshot {
        sections,
        investment,
    } = solved.snapshot;

    let estimate = summarise(&sections, &investment, input.land_cost, solved.rounds, converged);

    let loan_schedule = input.options.include_schedule.then(|| {
        let loan_total = input
            .custom_loan_amount
            .unwrap_or_else(|| round_loan_amount(investment.loan_amount));
        build_loan_schedule(loan_total, input.loan_rate, input.construction_years)
    });

    let tree = input.options.include_breakdown.then(|| {
        sections.into_tree(investment.construction_interest, investment.total_investment)
    });

    let output = EstimateOutput {
        estimate,
        direct_source,
        sections: tree,
        loan_schedule,
        adjustment,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Sectioned capital investment estimate with circular fee and loan convergence",
        &serde_json::json!({
            "direct_source": direct_source,
            "construction_years": input.construction_years,
            "loan_rate": input.loan_rate.to_string(),
            "loan_basis": input.loan_basis(),
            "basic_reserve_rate": input.basic_reserve_rate.to_string(),
            "price_reserve_rate": input.price_reserve_rate.to_string(),
            "total_funding": input.total_funding.map(|f| f.to_string()),
            "target_investment": input.target_investment.map(|t| t.to_string()),
            "project_type": input.project_type,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Quick estimate without a section tree.
///
/// Building investment is the raw costs plus land, grossed up by both reserve
/// rates, then run through the loan/interest solve.
pub fn estimate_flat(input: &EstimateInput) -> CapexResult<ComputationOutput<EstimateResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_common(input)?;

    let raw = input.raw_costs();
    let base = raw.total() + input.land_cost;
    if base <= Decimal::ZERO {
        warnings.push("All cost inputs are zero".into());
    }
    let basic_reserve = base * input.basic_reserve_rate;
    let price_reserve = base * input.price_reserve_rate;
    let building = base + basic_reserve + price_reserve;

    let investment = converge_investment(
        building,
        input.loan_basis(),
        input.loan_rate,
        input.construction_years,
        input.settings.convergence,
    );
    if !investment.converged {
        if input.options.strict_convergence {
            return Err(CapexError::ConvergenceFailure {
                function: "loan_convergence".into(),
                iterations: investment.iterations,
                last_delta: investment.last_delta,
            });
        }
        let msg = format!(
            "loan_convergence did not converge after {} iterations (last delta {}); best-effort value returned",
            investment.iterations, investment.last_delta
        );
        log::warn!("{msg}");
        warnings.push(msg);
    }

    let result = EstimateResult {
        construction_cost: raw.construction,
        equipment_cost: raw.equipment,
        installation_cost: raw.installation,
        other_cost: raw.other,
        land_cost: input.land_cost,
        basic_reserve,
        price_reserve,
        building_investment: investment.building_investment,
        construction_interest: investment.construction_interest,
        total_investment: investment.total_investment,
        loan_amount: investment.loan_amount,
        iterations: investment.iterations,
        funding_rounds: 0,
        gap_rate: investment.gap_rate,
        converged: investment.converged,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Flat capital investment estimate with loan convergence",
        &serde_json::json!({
            "construction_years": input.construction_years,
            "loan_rate": input.loan_rate.to_string(),
            "loan_basis": input.loan_basis(),
            "basic_reserve_rate": input.basic_reserve_rate.to_string(),
            "price_reserve_rate": input.price_reserve_rate.to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iteration::IterationLimits;

    fn base_input() -> EstimateInput {
        EstimateInput {
            construction_cost: dec!(6000),
            equipment_cost: dec!(2000),
            installation_cost: dec!(1000),
            other_cost: dec!(1000),
            land_cost: dec!(500),
            basic_reserve_rate: dec!(0.08),
            price_reserve_rate: Decimal::ZERO,
            construction_years: 3,
            loan_rate: dec!(0.049),
            custom_loan_amount: None,
            direct_items: None,
            total_funding: None,
            target_investment: None,
            project_type: ProjectType::General,
            options: EstimateOptions::default(),
            settings: EngineSettings::default(),
        }
    }

    #[test]
    fn test_estimate_converges() {
        let out = estimate_investment(&base_input()).unwrap();
        let r = &out.result.estimate;
        assert!(r.converged);
        assert!(out.warnings.is_empty());
        assert!(r.total_investment > r.building_investment);
        assert_eq!(r.construction_cost, dec!(6000));
        assert_eq!(out.result.direct_source, DirectSource::RawCosts);
    }

    #[test]
    fn test_fixed_zero_loan() {
        let mut input = base_input();
        input.custom_loan_amount = Some(Decimal::ZERO);
        let out = estimate_investment(&input).unwrap();
        let r = &out.result.estimate;
        assert_eq!(r.total_investment, r.building_investment);
        assert_eq!(r.gap_rate, Decimal::ZERO);
        assert_eq!(r.construction_interest, Decimal::ZERO);
    }

    #[test]
    fn test_rejects_negative_cost() {
        let mut input = base_input();
        input.equipment_cost = dec!(-1);
        match estimate_investment(&input) {
            Err(CapexError::InvalidInput { field, .. }) => assert_eq!(field, "equipment_cost"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_loan_ratio_of_one() {
        let mut input = base_input();
        input.settings.loan_ratio = Decimal::ONE;
        assert!(matches!(
            estimate_investment(&input),
            Err(CapexError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_strict_mode_surfaces_non_convergence() {
        let mut input = base_input();
        input.settings.convergence = IterationLimits::new(dec!(0.0001), 1);
        input.options.strict_convergence = true;
        assert!(matches!(
            estimate_investment(&input),
            Err(CapexError::ConvergenceFailure { .. })
        ));

        input.options.strict_convergence = false;
        let out = estimate_investment(&input).unwrap();
        assert!(!out.result.estimate.converged);
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_flat_estimate() {
        let out = estimate_flat(&base_input()).unwrap();
        let r = &out.result;
        // (10000 + 500) * 1.08
        assert_eq!(r.building_investment, dec!(11340));
        assert_eq!(r.basic_reserve, dec!(840));
        assert!(r.converged);
        let expected = dec!(11340) / (Decimal::ONE - dec!(0.0686));
        assert!((r.total_investment - expected).abs() < dec!(0.001));
    }
}
