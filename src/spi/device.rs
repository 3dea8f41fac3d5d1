use crate::bus::RegisterBus;

use super::pump::{self, Stall, TransferRequest};
use super::{ChipSelect, DeviceConfig, Timeout};

/// Completion callbacks for interrupt-driven transfers.
///
/// These run in interrupt context. They must not block, and must not
/// try to use the controller that is calling them.
pub trait Notify {
    /// All bytes of an armed transfer have been sent.
    fn on_send_complete(&mut self);

    /// Bytes have been received on an RX high-water interrupt.
    fn on_data_received(&mut self);
}

impl Notify for () {
    fn on_send_complete(&mut self) {}
    fn on_data_received(&mut self) {}
}

impl<N> Notify for &mut N
where
    N: Notify + ?Sized,
{
    fn on_send_complete(&mut self) {
        (**self).on_send_complete()
    }

    fn on_data_received(&mut self) {
        (**self).on_data_received()
    }
}

/// Where an interrupt-driven transfer stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Nothing armed.
    Idle,
    /// Armed, with bytes left for the interrupt handler.
    Armed { remaining: usize },
}

/// The in-flight part of an armed transfer.
#[derive(Debug, Default)]
pub(crate) struct TransferContext<'buf> {
    tx: Option<&'buf [u8]>,
    rx: Option<&'buf mut [u8]>,
    remaining: usize,
    // bytes already moved, the offset into both buffers
    moved: usize,
}

impl<'buf> TransferContext<'buf> {
    pub(crate) fn arm(
        &mut self,
        tx: Option<&'buf [u8]>,
        rx: Option<&'buf mut [u8]>,
        count: usize,
    ) {
        *self = Self {
            tx,
            rx,
            remaining: count,
            moved: 0,
        };
    }

    /// Pump up to `chunk` bytes, continuing where the last chunk stopped.
    pub(crate) fn pump_chunk<B>(
        &mut self,
        bus: &mut B,
        timeout: Timeout,
        chunk: usize,
    ) -> Result<TransferRequest, Stall>
    where
        B: RegisterBus,
    {
        let offset = self.moved;
        let tx = self.tx.and_then(|buf| buf.get(offset..));
        let rx = self.rx.as_deref_mut().and_then(|buf| buf.get_mut(offset..));
        pump::pump_request(bus, timeout, tx, rx, TransferRequest::new(chunk, chunk))
    }

    pub(crate) fn advance(&mut self, moved: usize, remaining: usize) {
        self.moved += moved;
        self.remaining = remaining;
    }

    pub(crate) fn abort(&mut self) {
        self.remaining = 0;
    }

    fn release(&mut self) -> (Option<&'buf [u8]>, Option<&'buf mut [u8]>) {
        let this = core::mem::take(self);
        (this.tx, this.rx)
    }
}

/// A device on the SPI0 bus.
///
/// Holds the device's bus settings, the chip select it was last
/// selected on, and the state of any armed interrupt-driven transfer.
/// The buffers of an armed transfer stay borrowed for `'buf`.
#[derive(Debug)]
pub struct LogicalDevice<'buf, N = ()> {
    pub(crate) chip_select: ChipSelect,
    config: DeviceConfig,
    pub(crate) context: TransferContext<'buf>,
    pub(crate) notify: N,
}

#[cfg(feature = "defmt")]
impl<'buf, N> defmt::Format for LogicalDevice<'buf, N> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "LogicalDevice({}, {}, {})",
            self.chip_select,
            self.config,
            self.state()
        );
    }
}

impl<'buf> LogicalDevice<'buf> {
    /// Create a device without completion callbacks.
    pub fn new(config: DeviceConfig) -> Self {
        Self::with_notify(config, ())
    }
}

impl<'buf, N> LogicalDevice<'buf, N> {
    /// Create a device with the given completion callbacks.
    pub fn with_notify(config: DeviceConfig, notify: N) -> Self {
        Self {
            chip_select: ChipSelect::Cs0,
            config,
            context: TransferContext::default(),
            notify,
        }
    }

    /// The bus settings for this device.
    #[inline(always)]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Change the bus settings. They apply on the next select.
    #[inline(always)]
    pub fn set_config(&mut self, config: DeviceConfig) {
        self.config = config;
    }

    /// The chip select this device was last selected on.
    #[inline(always)]
    pub fn chip_select(&self) -> ChipSelect {
        self.chip_select
    }

    /// Bytes left in an armed transfer.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.context.remaining
    }

    /// Where an interrupt-driven transfer stands.
    pub fn state(&self) -> DeviceState {
        match self.context.remaining {
            0 => DeviceState::Idle,
            remaining => DeviceState::Armed { remaining },
        }
    }

    /// The completion callbacks.
    #[inline(always)]
    pub fn notify(&self) -> &N {
        &self.notify
    }

    /// The completion callbacks, mutably.
    #[inline(always)]
    pub fn notify_mut(&mut self) -> &mut N {
        &mut self.notify
    }

    /// Drop any armed transfer and hand its buffers back.
    ///
    /// The controller is left as it is. If transfer active is still
    /// set, the next select or transfer takes over from here.
    pub fn release(&mut self) -> (Option<&'buf [u8]>, Option<&'buf mut [u8]>) {
        self.context.release()
    }

    /// Recover the completion callbacks.
    pub fn free(self) -> N {
        self.notify
    }
}
