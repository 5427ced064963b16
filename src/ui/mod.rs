pub mod components;
pub mod formatters;
