pub mod composer;
pub mod direct;
pub mod indirect;
pub mod line_item;

pub use composer::{compose_sections, CostSections, SectionParams};
pub use direct::{build_direct_items, default_split_items, DirectItemSeed, DirectSource};
pub use indirect::{build_indirect_items, IndirectBases, IndirectItems, ProjectType};
pub use line_item::CostLineItem;
