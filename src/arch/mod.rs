//! # Architecture Abstraction Layer
//!
//! The execution context the scheduler saves and restores. Currently
//! implements an RV32 register-file model; task bodies see only the
//! [`rv32::Cpu`] they are handed for one slice.

pub mod rv32;
