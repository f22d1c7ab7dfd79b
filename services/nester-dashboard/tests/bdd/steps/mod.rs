//! BDD step definitions for the nester dashboard

pub mod filter_steps;
pub mod polling_steps;
