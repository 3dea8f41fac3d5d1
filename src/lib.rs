//! Driver for the SPI0 master on Broadcom BCM283x / BCM2711 chips.
//!
//! The controller is driven either synchronously, polling the FIFO
//! flags with interrupts disabled, or from its interrupt line, where
//! [Spi0::on_interrupt()] moves one FIFO's worth of data per
//! interrupt for an armed [LogicalDevice]. Both paths share the same
//! byte pump, [spi::pump::pump()].
//!
//! Register access goes through the [RegisterBus] trait. On hardware
//! this is [Mmio]; in tests it is the simulated bank in `sim`.

#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "sim"))]
extern crate alloc;

mod log;

pub mod bus;
pub use bus::{Mmio, RegisterBus};

pub mod platform;

pub mod registers;
pub use registers::Register;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub mod spi;
pub use spi::{
    ChipSelect, ControllerConfig, DeviceConfig, DeviceState, Error, LogicalDevice, Notify, Spi0,
    SpiOps,
};
