pub mod folder;
pub mod glob;
