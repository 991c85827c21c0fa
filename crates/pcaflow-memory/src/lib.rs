//! pcaflow memory: an in-process stand-in for the remote PKI provider and
//! tag registry.
//!
//! This crate provides:
//! - [`InMemoryPca`], implementing both `pcaflow-core` provider traits
//! - Simulation knobs ([`SimulationConfig`]) for activation delays,
//!   transient create failures and issuance latency
//! - A call log ([`Call`], [`Operation`]) and one-shot failure injection

mod call;
mod provider;
mod simulation;

pub use call::{Call, Operation};
pub use provider::InMemoryPca;
pub use simulation::SimulationConfig;
