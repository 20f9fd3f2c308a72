// Modular tools
pub mod fetch;
pub mod sink;
