// Crate-level scenario tests
pub mod integration;
