pub mod amortizer;
pub mod convergence;

pub use amortizer::{
    accrue_interest, build_loan_schedule, distribute_front_loaded, loan_schedule,
    round_loan_amount, LoanSchedule, LoanScheduleInput, LoanYearRecord,
};
pub use convergence::{
    contracts, converge_investment, gap_rate, interest_factor, ConvergedInvestment, LoanBasis,
    CONVERGENCE_LIMITS,
};
