//! SoilWarden firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod hotspot;
pub mod sampling;
pub mod scheduler;

pub mod pins;

// Adapter and driver modules compile on every target; the actual
// peripheral implementations are guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
pub mod sensors;
