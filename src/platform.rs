//! Platform configuration and the collaborators this driver needs.
//!
//! The constants here are fixed at build time. The peripheral base
//! is picked by cargo feature: `bcm2711` wins over `bcm2835`, and
//! with neither the BCM2836/BCM2837 address is used.

/// Base of the ARM-side peripheral window.
#[cfg(feature = "bcm2711")]
pub const PERIPHERAL_BASE: usize = 0xfe00_0000;

/// Base of the ARM-side peripheral window.
#[cfg(all(feature = "bcm2835", not(feature = "bcm2711")))]
pub const PERIPHERAL_BASE: usize = 0x2000_0000;

/// Base of the ARM-side peripheral window.
#[cfg(not(any(feature = "bcm2835", feature = "bcm2711")))]
pub const PERIPHERAL_BASE: usize = 0x3f00_0000;

/// Address of the SPI0 register block.
pub const SPI0_BASE: usize = PERIPHERAL_BASE + 0x0020_4000;

/// Interrupt line shared by the SPI controllers.
pub const SPI0_IRQ: u32 = 54;

/// Clock divider programmed at initialization.
pub const BUS_CLOCK_DIVISOR: u16 = 128;

/// GPIO 7 through 11: CE1, CE0, MISO, MOSI, SCLK.
pub const SPI0_PINS: u32 = (1 << 7) | (1 << 8) | (1 << 9) | (1 << 10) | (1 << 11);

/// Alternate function that routes [SPI0_PINS] to SPI0.
pub const SPI0_FUNCTION: AltFunction = AltFunction::Alt0;

/// Data length value used outside of DMA mode.
///
/// The DLEN register is documented as DMA-only, but any value other
/// than 0 or 1 drops the idle clock that otherwise follows every
/// byte, so each byte takes 8 clocks instead of 9. Measured throughput
/// goes from 56.8 to 63.3 Mbit/s. The value must be written again
/// before every transfer.
pub const DLEN_NO_DMA: u16 = 2;

/// TX FIFO depth in bytes.
pub const TX_FIFO_LEN: usize = 16 * 4;

/// RX FIFO depth in bytes.
pub const RX_FIFO_LEN: usize = 16 * 4;

/// Bytes serviced per done interrupt.
pub const TX_FIFO_LOW_WATER: usize = 4 * 4;

/// Bytes serviced per RX high-water interrupt.
pub const RX_FIFO_HIGH_WATER: usize = 3 * 4;

/// Byte clocked out when a transfer has nothing to send.
pub const FILLER: u8 = 0x00;

/// GPIO alternate functions, with their function select encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AltFunction {
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

impl AltFunction {
    /// The 3-bit GPFSEL field value for this function.
    #[inline(always)]
    pub const fn fsel(self) -> u8 {
        self as u8
    }
}

/// Pin multiplexing, provided by the GPIO driver.
pub trait PinMux {
    /// Route every pin set in the `pins` mask to `function`.
    fn set_alternate(&mut self, pins: u32, function: AltFunction);
}

impl<P> PinMux for &mut P
where
    P: PinMux + ?Sized,
{
    fn set_alternate(&mut self, pins: u32, function: AltFunction) {
        (**self).set_alternate(pins, function)
    }
}

/// Interrupt line management, provided by the interrupt controller.
///
/// Attaching a line only routes it. Whoever owns the interrupt vector
/// calls [crate::Spi0::on_interrupt()] with the armed device.
pub trait IrqLine {
    /// Error produced when a line cannot be attached or detached.
    type Error;

    /// Route the given line to the SPI0 handler.
    fn attach(&mut self, line: u32) -> Result<(), Self::Error>;

    /// Stop routing the given line.
    fn detach(&mut self, line: u32) -> Result<(), Self::Error>;

    /// Is the given line currently routed?
    fn is_attached(&self, line: u32) -> bool;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spi0_base() {
        #[cfg(not(any(feature = "bcm2835", feature = "bcm2711")))]
        assert_eq!(0x3f20_4000, SPI0_BASE);
        #[cfg(feature = "bcm2711")]
        assert_eq!(0xfe20_4000, SPI0_BASE);
    }

    #[test]
    fn spi0_pins() {
        assert_eq!(0x0000_0f80, SPI0_PINS);
        assert_eq!(0b100, SPI0_FUNCTION.fsel());
    }

    #[test]
    fn watermarks_fit_fifos() {
        assert!(TX_FIFO_LOW_WATER <= TX_FIFO_LEN);
        assert!(RX_FIFO_HIGH_WATER <= RX_FIFO_LEN);
        assert!(DLEN_NO_DMA > 1);
    }
}
