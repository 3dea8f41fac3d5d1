use crate::platform;

pub use embedded_hal_1::spi::{Mode, Phase, Polarity, MODE_0, MODE_1, MODE_2, MODE_3};

/// Get the [Mode] for a conventional SPI mode number, 0 to 3.
pub const fn mode_from_number(number: u8) -> Option<Mode> {
    match number {
        0 => Some(MODE_0),
        1 => Some(MODE_1),
        2 => Some(MODE_2),
        3 => Some(MODE_3),
        _ => None,
    }
}

/// One of the four chip select lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipSelect {
    #[default]
    Cs0 = 0,
    Cs1 = 1,
    Cs2 = 2,
    Cs3 = 3,
}

impl ChipSelect {
    /// Get the chip select with the given index, if there is one.
    pub const fn new(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Cs0),
            1 => Some(Self::Cs1),
            2 => Some(Self::Cs2),
            3 => Some(Self::Cs3),
            _ => None,
        }
    }

    /// The index of this chip select, as written to the CS field.
    #[inline(always)]
    pub const fn index(self) -> u8 {
        self as u8
    }
}

/// Per-device bus settings, applied by [crate::Spi0::select()].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Clock polarity and phase.
    pub mode: Mode,
    /// Clock divider override. `None` keeps the current divider.
    pub divider: Option<u16>,
    /// Interrupt when a transfer is done.
    pub irq_on_done: bool,
    /// Interrupt when the RX FIFO reaches high water.
    pub irq_on_receive: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceConfig {
    /// Mode 0, no divider override, polled.
    pub const fn new() -> Self {
        Self {
            mode: MODE_0,
            divider: None,
            irq_on_done: false,
            irq_on_receive: false,
        }
    }

    /// Set the clock mode.
    pub const fn mode(self, mode: Mode) -> Self {
        Self { mode, ..self }
    }

    /// Override the clock divider whenever this device is selected.
    ///
    /// Zero means no override.
    pub const fn divider(self, divider: u16) -> Self {
        let divider = if divider == 0 { None } else { Some(divider) };
        Self { divider, ..self }
    }

    /// Request an interrupt when a transfer is done.
    pub const fn irq_on_done(self, irq_on_done: bool) -> Self {
        Self {
            irq_on_done,
            ..self
        }
    }

    /// Request an interrupt when the RX FIFO reaches high water.
    pub const fn irq_on_receive(self, irq_on_receive: bool) -> Self {
        Self {
            irq_on_receive,
            ..self
        }
    }

    /// Does this device use either interrupt source?
    #[inline(always)]
    pub const fn wants_irq(&self) -> bool {
        self.irq_on_done || self.irq_on_receive
    }
}

/// How long the pump may spin on a hardware flag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    /// Spin forever. A slave that never responds hangs the caller,
    /// with interrupts disabled on the polled path.
    #[default]
    Never,
    /// Give up with [crate::Error::HardwareTimeout] after this many
    /// status reads on a single flag.
    Polls(u32),
}

/// Which callback the RX high-water interrupt fires.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxNotify {
    /// Fire [crate::Notify::on_send_complete()] on received data.
    ///
    /// This is what existing users of this controller expect, even
    /// though it looks like the wrong callback.
    #[default]
    SendComplete,
    /// Fire [crate::Notify::on_data_received()] on received data.
    DataReceived,
}

/// How many bytes each interrupt moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Watermarks {
    /// Bytes per done interrupt.
    pub tx_low: usize,
    /// Bytes per RX high-water interrupt.
    pub rx_high: usize,
}

impl Default for Watermarks {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Watermarks {
    /// One word-FIFO threshold each, matching the hardware levels.
    pub const DEFAULT: Self = Self {
        tx_low: platform::TX_FIFO_LOW_WATER,
        rx_high: platform::RX_FIFO_HIGH_WATER,
    };

    /// Set the bytes moved per done interrupt.
    pub const fn tx_low(self, tx_low: usize) -> Self {
        Self { tx_low, ..self }
    }

    /// Set the bytes moved per RX high-water interrupt.
    pub const fn rx_high(self, rx_high: usize) -> Self {
        Self { rx_high, ..self }
    }
}

/// Controller-wide settings, fixed when the controller is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    /// Clock divider programmed at initialization.
    pub divider: u16,
    /// Interrupt line to attach for interrupt-driven devices.
    pub irq_line: u32,
    /// Busy-wait bound.
    pub timeout: Timeout,
    /// Bytes moved per interrupt.
    pub watermarks: Watermarks,
    /// Callback for the RX high-water interrupt.
    pub rx_notify: RxNotify,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerConfig {
    /// The platform defaults, with no busy-wait bound.
    pub const fn new() -> Self {
        Self {
            divider: platform::BUS_CLOCK_DIVISOR,
            irq_line: platform::SPI0_IRQ,
            timeout: Timeout::Never,
            watermarks: Watermarks::DEFAULT,
            rx_notify: RxNotify::SendComplete,
        }
    }

    /// Set the clock divider.
    pub const fn divider(self, divider: u16) -> Self {
        Self { divider, ..self }
    }

    /// Set the interrupt line.
    pub const fn irq_line(self, irq_line: u32) -> Self {
        Self { irq_line, ..self }
    }

    /// Set the busy-wait bound.
    pub const fn timeout(self, timeout: Timeout) -> Self {
        Self { timeout, ..self }
    }

    /// Set the bytes moved per interrupt.
    pub const fn watermarks(self, watermarks: Watermarks) -> Self {
        Self { watermarks, ..self }
    }

    /// Set the callback for the RX high-water interrupt.
    pub const fn rx_notify(self, rx_notify: RxNotify) -> Self {
        Self { rx_notify, ..self }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chip_select_range() {
        assert_eq!(Some(ChipSelect::Cs0), ChipSelect::new(0));
        assert_eq!(Some(ChipSelect::Cs3), ChipSelect::new(3));
        assert_eq!(None, ChipSelect::new(4));
        assert_eq!(None, ChipSelect::new(0xff));
        assert_eq!(2, ChipSelect::Cs2.index());
    }

    #[test]
    fn mode_numbers() {
        assert_eq!(Some(MODE_1), mode_from_number(1));
        assert_eq!(Polarity::IdleHigh, mode_from_number(2).unwrap().polarity);
        assert_eq!(
            Phase::CaptureOnFirstTransition,
            mode_from_number(2).unwrap().phase
        );
        assert_eq!(None, mode_from_number(4));
    }

    #[test]
    fn zero_divider_is_no_override() {
        assert_eq!(None, DeviceConfig::new().divider(0).divider);
        assert_eq!(Some(32), DeviceConfig::new().divider(32).divider);
    }

    #[test]
    fn wants_irq() {
        assert!(!DeviceConfig::new().wants_irq());
        assert!(DeviceConfig::new().irq_on_done(true).wants_irq());
        assert!(DeviceConfig::new().irq_on_receive(true).wants_irq());
    }

    #[test]
    fn controller_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(platform::BUS_CLOCK_DIVISOR, config.divider);
        assert_eq!(Timeout::Never, config.timeout);
        assert_eq!(RxNotify::SendComplete, config.rx_notify);
        assert_eq!(16, config.watermarks.tx_low);
        assert_eq!(12, config.watermarks.rx_high);
    }
}
