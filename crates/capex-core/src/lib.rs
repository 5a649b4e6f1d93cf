pub mod error;
pub mod iteration;
pub mod settings;
pub mod types;

#[cfg(feature = "fees")]
pub mod fees;

#[cfg(feature = "sections")]
pub mod sections;

#[cfg(feature = "financing")]
pub mod financing;

#[cfg(feature = "adjustment")]
pub mod adjustment;

#[cfg(feature = "estimate")]
pub mod estimate;

pub use error::CapexError;
pub use types::*;

/// Standard result type for all capex operations
pub type CapexResult<T> = Result<T, CapexError>;
