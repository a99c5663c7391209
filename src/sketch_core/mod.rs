pub mod registry;
pub mod visibility;
