pub mod circular;
pub mod schedule;
pub mod tables;

pub use circular::{solve_circular_fee, CircularFee, CIRCULAR_FEE_LIMITS};
pub use schedule::{interpolated_fee, progressive_fee, FeeSchedule, RateBracket, ScheduleKind};
pub use tables::StandardTable;
