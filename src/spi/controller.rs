use crate::bus::RegisterBus;
use crate::log::{debug, error, trace};
use crate::platform::{self, IrqLine, PinMux};
use crate::registers::{Clk, Cs, Dlen, CLEAR_BOTH};

use super::irq::{self, Action, Event, IrqReturn};
use super::pump::{self, TransferRequest};
use super::{
    ChipSelect, ControllerConfig, Error, LogicalDevice, Notify, Phase, Polarity, SpiOps,
};

/// Size of the stack buffer used to split in-place transfers.
const BOUNCE_LEN: usize = 16;

/// The SPI0 master controller.
///
/// Owns the register bank and the interrupt line, and drives
/// transfers for any number of [LogicalDevice]s, one at a time.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Spi0<B, I> {
    bus: B,
    irq: I,
    config: ControllerConfig,
}

impl<B, I> Spi0<B, I>
where
    B: RegisterBus,
    I: IrqLine,
{
    /// Route the SPI0 pins, and put the controller in a quiet state.
    ///
    /// Afterwards chip select 0 is selected in mode 0, transfer
    /// active is clear, both FIFOs are empty, and the clock divider
    /// comes from `config`.
    pub fn new(mut bus: B, irq: I, mut pins: impl PinMux, config: ControllerConfig) -> Self {
        pins.set_alternate(platform::SPI0_PINS, platform::SPI0_FUNCTION);

        bus.write(Cs::new().with_clear(CLEAR_BOTH));
        bus.write(Clk::new().with_cdiv(config.divider));
        bus.write(Dlen::new().with_len(platform::DLEN_NO_DMA));

        debug!("spi0: up, divider {=u16}", config.divider);

        Self { bus, irq, config }
    }

    /// Recover the register bank and interrupt line.
    ///
    /// The controller is left as it is.
    pub fn free(self) -> (B, I) {
        (self.bus, self.irq)
    }

    /// The controller settings.
    #[inline(always)]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Read the control and status register.
    #[inline(always)]
    pub fn status(&mut self) -> Cs {
        self.bus.read()
    }

    /// The register bank.
    #[inline(always)]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The register bank, mutably.
    ///
    /// Anything written here is visible to the next transfer.
    #[inline(always)]
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// The interrupt line.
    #[inline(always)]
    pub fn irq(&self) -> &I {
        &self.irq
    }

    /// Point the controller at `device` on chip select `chip_select`.
    ///
    /// Attaches or detaches the interrupt line as the device needs,
    /// then applies its interrupt enables, clock mode and divider. An
    /// out of range chip select or a failed attach leaves the
    /// registers untouched.
    pub fn select<N>(
        &mut self,
        device: &mut LogicalDevice<'_, N>,
        chip_select: u8,
    ) -> Result<(), Error<I::Error>> {
        let Some(chip_select) = ChipSelect::new(chip_select) else {
            error!("spi0: no chip select {=u8}", chip_select);
            return Err(Error::InvalidArgument);
        };

        let config = *device.config();
        let line = self.config.irq_line;

        if config.wants_irq() {
            if !self.bus.read::<Cs>().interrupts_enabled() {
                self.irq.attach(line).map_err(|e| {
                    error!("spi0: could not attach irq {=u32}", line);
                    Error::IrqAttach(e)
                })?;
            }
        } else if self.irq.is_attached(line) {
            self.irq.detach(line).map_err(|e| {
                error!("spi0: could not detach irq {=u32}", line);
                Error::IrqAttach(e)
            })?;
        }

        self.bus.modify(|cs: Cs| {
            cs.with_intd(config.irq_on_done)
                .with_intr(config.irq_on_receive)
                .with_cpha(config.mode.phase == Phase::CaptureOnSecondTransition)
                .with_cpol(config.mode.polarity == Polarity::IdleHigh)
                .with_cs(chip_select.index())
        });

        if let Some(divider) = config.divider {
            self.bus.write(Clk::new().with_cdiv(divider));
        }

        device.chip_select = chip_select;
        Ok(())
    }

    /// Transfer bytes for `device`.
    ///
    /// What happens depends on `count` and on the controller mode:
    ///
    /// * in DMA mode, nothing: this fails with [Error::Unsupported].
    /// * a negative `count` [arms][Spi0::arm()] an interrupt-driven
    ///   transfer of `-count` bytes and returns 0 right away. This
    ///   needs an interrupt source enabled by [Spi0::select()].
    /// * with an interrupt source enabled, one bounded chunk is pumped
    ///   with transfer active already set, and transfer active is
    ///   cleared afterwards. This is how an interrupt handler of its
    ///   own moves data.
    /// * otherwise, `count` bytes are moved [polled][Spi0::transfer_polled()].
    ///
    /// Returns the bytes moved.
    pub fn transfer<'buf, N>(
        &mut self,
        device: &mut LogicalDevice<'buf, N>,
        tx: Option<&'buf [u8]>,
        rx: Option<&'buf mut [u8]>,
        count: isize,
    ) -> Result<usize, Error<I::Error>> {
        let status = self.check_dma()?;

        if count < 0 {
            self.arm(device, tx, rx, count.unsigned_abs())?;
            Ok(0)
        } else if status.interrupts_enabled() {
            self.transfer_chunk(device, tx, rx, count as usize)
        } else {
            self.transfer_polled(tx, rx, count as usize)
        }
    }

    /// Move up to `count` bytes with interrupts disabled.
    ///
    /// Both FIFOs are cleared and transfer active is held for the
    /// whole transfer. Counts are clipped to the buffers given. Filler
    /// bytes are sent without `tx`, or after its end if `rx` is longer.
    pub fn transfer_polled(
        &mut self,
        tx: Option<&[u8]>,
        rx: Option<&mut [u8]>,
        count: usize,
    ) -> Result<usize, Error<I::Error>> {
        self.check_dma()?;

        let timeout = self.config.timeout;
        let bus = &mut self.bus;
        let result = critical_section::with(|_cs| {
            bus.modify(|cs: Cs| cs.with_clear(CLEAR_BOTH).with_ta(true));
            let result = pump::pump(bus, timeout, tx, rx, TransferRequest::new(count, count));
            bus.modify(|cs: Cs| cs.with_ta(false));
            result
        });

        result.map_err(|stall| {
            error!("spi0: polled transfer of {=usize} bytes stalled", count);
            stall.into()
        })
    }

    /// Arm an interrupt-driven transfer of `count` bytes.
    ///
    /// The buffers are held by `device` until the transfer completes
    /// or is [released][LogicalDevice::release()]. Both FIFOs are
    /// cleared and transfer active is set, which raises the first
    /// done interrupt.
    pub fn arm<'buf, N>(
        &mut self,
        device: &mut LogicalDevice<'buf, N>,
        tx: Option<&'buf [u8]>,
        rx: Option<&'buf mut [u8]>,
        count: usize,
    ) -> Result<(), Error<I::Error>> {
        let status = self.check_dma()?;

        if !status.interrupts_enabled() {
            error!("spi0: cannot arm without an interrupt source");
            return Err(Error::InvalidArgument);
        }

        let too_short = |len: usize| len < count;
        if count == 0
            || (tx.is_none() && rx.is_none())
            || tx.is_some_and(|buf| too_short(buf.len()))
            || rx.as_deref().is_some_and(|buf| too_short(buf.len()))
        {
            error!("spi0: bad buffers for {=usize} byte transfer", count);
            return Err(Error::InvalidArgument);
        }

        device.context.arm(tx, rx, count);

        self.bus.write(Dlen::new().with_len(platform::DLEN_NO_DMA));
        self.bus
            .modify(|cs: Cs| cs.with_clear(CLEAR_BOTH).with_ta(true));

        trace!("spi0: armed {=usize} bytes", count);
        Ok(())
    }

    /// Service the SPI0 interrupt for the armed `device`.
    ///
    /// Sends the next chunk if the last one is done, then empties the
    /// RX FIFO if it reached high water. Callbacks on `device` fire
    /// from here.
    pub fn on_interrupt<N>(&mut self, device: &mut LogicalDevice<'_, N>) -> IrqReturn
    where
        N: Notify,
    {
        let watermarks = self.config.watermarks;

        let status = self.bus.read::<Cs>();
        if let Some(action) = irq::send_action(device.state(), status, watermarks) {
            self.service(device, action);
        }

        let status = self.bus.read::<Cs>();
        if let Some(action) = irq::receive_action(device.state(), status, watermarks) {
            self.service(device, action);
        }

        IrqReturn::Handled
    }

    fn service<N>(&mut self, device: &mut LogicalDevice<'_, N>, action: Action)
    where
        N: Notify,
    {
        let remaining = device.remaining();
        let progress = match device
            .context
            .pump_chunk(&mut self.bus, self.config.timeout, action.chunk())
        {
            Ok(progress) => progress,
            Err(_) => {
                device.context.abort();
                self.bus.modify(|cs: Cs| cs.with_ta(false));
                error!("spi0: interrupt transfer stalled, {=usize} bytes dropped", remaining);
                return;
            }
        };

        let effects = irq::settle(action, remaining, progress, self.config.rx_notify);
        device.context.advance(progress.transferred(), effects.remaining);

        if effects.deassert {
            self.bus.modify(|cs: Cs| cs.with_ta(false));
            trace!("spi0: armed transfer finished");
        }

        for event in effects.events() {
            match event {
                Event::SendComplete => device.notify.on_send_complete(),
                Event::DataReceived => device.notify.on_data_received(),
            }
        }
    }

    // one chunk from inside someone else's interrupt handler, with
    // transfer active already set
    fn transfer_chunk<N>(
        &mut self,
        device: &mut LogicalDevice<'_, N>,
        tx: Option<&[u8]>,
        rx: Option<&mut [u8]>,
        count: usize,
    ) -> Result<usize, Error<I::Error>> {
        let watermarks = self.config.watermarks;
        let tx_count = count.min(watermarks.tx_low);
        let rx_count = tx_count.min(watermarks.rx_high);

        let result = pump::pump(
            &mut self.bus,
            self.config.timeout,
            tx,
            rx,
            TransferRequest::new(tx_count, rx_count),
        );
        self.bus.modify(|cs: Cs| cs.with_ta(false));

        let moved = result?;
        // these were the caller's buffers, so the armed offset stays put
        let remaining = device.remaining().saturating_sub(moved);
        device.context.advance(0, remaining);
        Ok(moved)
    }

    fn check_dma(&mut self) -> Result<Cs, Error<I::Error>> {
        let status = self.bus.read::<Cs>();
        if status.dmaen() {
            error!("spi0: DMA mode is not supported");
            Err(Error::Unsupported)
        } else {
            Ok(status)
        }
    }

    /// Read bytes on the selected chip select, sending filler.
    pub fn read(&mut self, words: &mut [u8]) -> Result<(), Error<I::Error>> {
        let count = words.len();
        self.transfer_polled(None, Some(words), count)?;
        Ok(())
    }

    /// Write bytes on the selected chip select, discarding what comes back.
    pub fn write(&mut self, words: &[u8]) -> Result<(), Error<I::Error>> {
        self.transfer_polled(Some(words), None, words.len())?;
        Ok(())
    }

    /// Write and read at the same time.
    ///
    /// If `read` is longer than `write`, filler is sent after the
    /// end of `write`. If it is shorter, the extra bytes received are
    /// discarded.
    pub fn transfer_buffers(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Error<I::Error>> {
        let count = read.len().max(write.len());
        self.transfer_polled(Some(write), Some(read), count)?;
        Ok(())
    }

    /// Write `words`, replacing them with the bytes read.
    pub fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Error<I::Error>> {
        let mut bounce = [0u8; BOUNCE_LEN];
        for chunk in words.chunks_mut(BOUNCE_LEN) {
            let len = chunk.len();
            let out = &mut bounce[..len];
            out.copy_from_slice(chunk);
            self.transfer_polled(Some(&*out), Some(chunk), len)?;
        }
        Ok(())
    }
}

impl<'buf, B, I, N> SpiOps<'buf, N> for Spi0<B, I>
where
    B: RegisterBus,
    I: IrqLine,
{
    type Error = Error<I::Error>;

    #[inline(always)]
    fn select(
        &mut self,
        device: &mut LogicalDevice<'buf, N>,
        chip_select: u8,
    ) -> Result<(), Self::Error> {
        Spi0::select(self, device, chip_select)
    }

    #[inline(always)]
    fn transfer(
        &mut self,
        device: &mut LogicalDevice<'buf, N>,
        tx: Option<&'buf [u8]>,
        rx: Option<&'buf mut [u8]>,
        count: isize,
    ) -> Result<usize, Self::Error> {
        Spi0::transfer(self, device, tx, rx, count)
    }
}
