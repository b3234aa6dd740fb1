//! 数据模型层

pub mod patch;

pub use patch::{apply_replacements, replacements_for, splice, Replacement};
