pub mod adjustment;
pub mod estimate;
pub mod fees;
pub mod financing;
