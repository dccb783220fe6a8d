//! Core implementation: policy evaluation, auditing and configuration

pub mod audit;
pub mod config;
pub mod iam;
