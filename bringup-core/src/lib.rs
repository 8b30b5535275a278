#![no_std]

// Shared bring-up logic for the billboard controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding
// the Rust standard library and exposing abstractions the other crates can
// adopt. Sequencing, decision, and dispatch logic all live here; hardware
// access happens behind the traits each module defines.

pub mod bringup;
pub mod heartbeat;
pub mod irq;
pub mod power;
pub mod stack;
pub mod status;
