//! Capabilities the orchestrator depends on.
//!
//! The orchestrator never talks to a node or an explorer directly. It drives a
//! [`ContractFactory`] for transactions and a [`VerificationService`] for source
//! verification, so both can be replaced by test doubles.

mod factory;
mod verification;

pub use factory::ContractFactory;
pub use verification::VerificationService;
