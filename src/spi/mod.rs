//! Interfaces for SPI0.

mod config;
pub use config::*;

mod controller;
pub use controller::*;

mod device;
pub use device::*;

mod hal02;
mod hal1;

pub mod irq;
pub mod pump;

/// An error produced by the SPI0 driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E = core::convert::Infallible> {
    /// Chip select out of range, or buffers that can't hold the
    /// requested count. Nothing was written to the controller.
    InvalidArgument,
    /// The controller is in DMA mode, which this driver does not do.
    Unsupported,
    /// The interrupt line could not be attached or detached.
    IrqAttach(E),
    /// A FIFO or done flag never came up within the configured
    /// [Timeout]. Transfer active has been cleared.
    HardwareTimeout,
}

impl<E> From<pump::Stall> for Error<E> {
    fn from(_: pump::Stall) -> Self {
        Self::HardwareTimeout
    }
}

/// The operations an SPI controller offers to the subsystem that
/// owns its devices.
pub trait SpiOps<'buf, N> {
    /// Error produced by these operations.
    type Error;

    /// Point the controller at `device` on the given chip select.
    fn select(
        &mut self,
        device: &mut LogicalDevice<'buf, N>,
        chip_select: u8,
    ) -> Result<(), Self::Error>;

    /// Transfer `count` bytes, or arm an interrupt-driven transfer of
    /// `-count` bytes when `count` is negative.
    fn transfer(
        &mut self,
        device: &mut LogicalDevice<'buf, N>,
        tx: Option<&'buf [u8]>,
        rx: Option<&'buf mut [u8]>,
        count: isize,
    ) -> Result<usize, Self::Error>;
}
