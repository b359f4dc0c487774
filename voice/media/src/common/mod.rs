//! Items shared across media modules

pub mod constants;
