//! Implement `Display` for types such as `Option<T>`.

mod display_option;

pub(crate) use display_option::DisplayOption;
pub(crate) use display_option::DisplayOptionExt;
