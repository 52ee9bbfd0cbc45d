pub mod convert;
pub mod filters;
pub mod render;
