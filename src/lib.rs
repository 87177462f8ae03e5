//! This crate provides an interface for communicating with and controlling the Riden RD60xx series of
//! programmable power supplies.
//!
//! It supports `no-std` environments by use of the `no-std` feature flag.
//!
//! PSU models with known scaling:
//! * RD6006
//! * RD6012
//! * RD6018
//! * RD6024
//!
//! Other models reporting through the same register map are driven with RD6006 scaling, and a warning is logged.
//!
//! It uses Modbus RTU under the hood, and is suitable for interfacing with the RD PSUs over their USB serial port
//! or the TTL header, but not Wi-Fi.
//!
//! The serial port used for PSU comms should be configured like so:
//! * Default baud rate: 115200
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! With the `serialport` feature, [`config::ConnectionConfig::open`] does this for you and
//! [`serial::discover`] finds a connected PSU by its USB ids.

#![cfg_attr(all(feature = "no-std", not(test)), no_std)]

#[cfg(all(feature = "no-std", feature = "serialport"))]
compile_error!("The `serialport` feature needs std, it cannot be combined with `no-std`.");

pub mod config;
pub mod error;
pub mod preset;
pub mod psu;
pub mod register;
pub mod report;
pub mod retry;
pub mod rtu;
pub mod scaling;
pub mod transport;
pub mod types;

#[cfg(feature = "serialport")]
pub mod serial;

#[cfg(test)]
mod mock_serial;
#[cfg(test)]
mod mock_transport;
