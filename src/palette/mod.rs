pub mod mapping;
#[allow(clippy::module_inception)]
pub mod palette;
