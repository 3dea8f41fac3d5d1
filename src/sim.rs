//! A simulated SPI0 register bank and collaborators, for tests.
//!
//! [SimBus] models the FIFOs and status flags well enough to drive the
//! pump and the interrupt handler deterministically: the TX FIFO
//! always has room unless stalled, sent bytes are logged and either
//! looped back or dropped, and the RX FIFO can be preloaded with what
//! the slave answers.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::bus::RegisterBus;
use crate::platform::{self, AltFunction, IrqLine, PinMux};
use crate::registers::{Clk, Cs, Dc, Dlen, Ltoh, Register, CLEAR_RX, CLEAR_TX, FIFO_OFFSET};

/// What happens to bytes written to the TX FIFO.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Echo {
    /// MISO tied to MOSI: each sent byte is received back.
    #[default]
    Loopback,
    /// The slave answers only with what was [preloaded][SimBus::preload].
    Discard,
}

/// A simulated SPI0 register bank.
#[derive(Debug, Clone)]
pub struct SimBus {
    cs: Cs,
    clk: Clk,
    dlen: Dlen,
    ltoh: Ltoh,
    dc: Dc,

    echo: Echo,
    tx_log: Vec<u8>,
    rx: VecDeque<u8>,

    // status reads left before DONE comes up
    busy: u32,
    tx_stalled: bool,
    rx_high_water: usize,

    fifo_reads: usize,
    dlen_writes: usize,
    tx_clears: usize,
    rx_clears: usize,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    /// A bank in its reset state, looping bytes back.
    pub fn new() -> Self {
        Self {
            cs: Cs::from_bits(0x0004_1000).control(),
            clk: Clk::new(),
            dlen: Dlen::new(),
            ltoh: Ltoh::new(),
            dc: Dc::new(),

            echo: Echo::Loopback,
            tx_log: Vec::new(),
            rx: VecDeque::new(),

            busy: 0,
            tx_stalled: false,
            rx_high_water: platform::RX_FIFO_LEN * 3 / 4,

            fifo_reads: 0,
            dlen_writes: 0,
            tx_clears: 0,
            rx_clears: 0,
        }
    }

    /// Set what happens to sent bytes.
    pub fn with_echo(self, echo: Echo) -> Self {
        Self { echo, ..self }
    }

    /// Queue bytes in the RX FIFO, as if the slave had sent them.
    pub fn preload(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Every byte written to the TX FIFO so far.
    pub fn tx_log(&self) -> &[u8] {
        &self.tx_log
    }

    /// Forget the TX log.
    pub fn clear_tx_log(&mut self) {
        self.tx_log.clear();
    }

    /// Number of RX FIFO reads so far.
    pub fn fifo_reads(&self) -> usize {
        self.fifo_reads
    }

    /// Bytes waiting in the RX FIFO.
    pub fn rx_len(&self) -> usize {
        self.rx.len()
    }

    /// Keep DONE low for this many more status reads.
    pub fn set_busy(&mut self, reads: u32) {
        self.busy = reads;
    }

    /// Hold TXD low, as if the TX FIFO never drained.
    pub fn stall_tx(&mut self, stalled: bool) {
        self.tx_stalled = stalled;
    }

    /// RX FIFO level at which RXR comes up while transfer active.
    pub fn set_rx_high_water(&mut self, level: usize) {
        self.rx_high_water = level;
    }

    /// Number of writes to DLEN so far.
    pub fn dlen_writes(&self) -> usize {
        self.dlen_writes
    }

    /// Number of TX and RX FIFO clear commands so far.
    pub fn clears(&self) -> (usize, usize) {
        (self.tx_clears, self.rx_clears)
    }

    /// The written fields of CS, without touching any status.
    pub fn control(&self) -> Cs {
        self.cs
    }

    /// Change the written fields of CS behind the driver's back.
    pub fn set_control(&mut self, f: impl FnOnce(Cs) -> Cs) {
        self.cs = f(self.cs).control();
    }

    /// What a CS read would show right now, without counting as a read.
    pub fn status(&self) -> Cs {
        let ta = self.cs.ta();
        self.cs
            .with_done(ta && self.busy == 0)
            .with_txd(!self.tx_stalled)
            .with_rxd(!self.rx.is_empty())
            .with_rxr(ta && self.rx.len() >= self.rx_high_water)
            .with_rxf(self.rx.len() >= platform::RX_FIFO_LEN)
    }

    fn write_cs(&mut self, value: Cs) {
        if value.clear() & CLEAR_TX != 0 {
            self.tx_clears += 1;
        }
        if value.clear() & CLEAR_RX != 0 {
            self.rx.clear();
            self.rx_clears += 1;
        }
        self.cs = value.control();
    }
}

impl RegisterBus for SimBus {
    fn read_raw(&mut self, offset: usize) -> u32 {
        match offset {
            o if o == Cs::OFFSET => {
                let status = self.status();
                self.busy = self.busy.saturating_sub(1);
                status.into_bits()
            }
            FIFO_OFFSET => {
                self.fifo_reads += 1;
                self.rx.pop_front().unwrap_or(0) as u32
            }
            o if o == Clk::OFFSET => self.clk.into_bits(),
            o if o == Dlen::OFFSET => self.dlen.into_bits(),
            o if o == Ltoh::OFFSET => self.ltoh.into_bits(),
            o if o == Dc::OFFSET => self.dc.into_bits(),
            _ => 0,
        }
    }

    fn write_raw(&mut self, offset: usize, value: u32) {
        match offset {
            o if o == Cs::OFFSET => self.write_cs(Cs::from_bits(value)),
            FIFO_OFFSET => {
                let byte = value as u8;
                self.tx_log.push(byte);
                if self.echo == Echo::Loopback {
                    self.rx.push_back(byte);
                }
            }
            o if o == Clk::OFFSET => self.clk = Clk::from_bits(value),
            o if o == Dlen::OFFSET => {
                self.dlen = Dlen::from_bits(value);
                self.dlen_writes += 1;
            }
            o if o == Ltoh::OFFSET => self.ltoh = Ltoh::from_bits(value),
            o if o == Dc::OFFSET => self.dc = Dc::from_bits(value),
            _ => {}
        }
    }
}

/// Attaching failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimIrqError;

/// A simulated interrupt controller with a single routable line.
#[derive(Debug, Default, Clone)]
pub struct SimIrq {
    attached: Option<u32>,
    fail_attach: bool,
    attaches: usize,
    detaches: usize,
}

impl SimIrq {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following attach fail.
    pub fn fail_attach(&mut self, fail: bool) {
        self.fail_attach = fail;
    }

    /// The line currently routed, if any.
    pub fn attached(&self) -> Option<u32> {
        self.attached
    }

    /// Successful attaches so far.
    pub fn attaches(&self) -> usize {
        self.attaches
    }

    /// Detaches so far.
    pub fn detaches(&self) -> usize {
        self.detaches
    }
}

impl IrqLine for SimIrq {
    type Error = SimIrqError;

    fn attach(&mut self, line: u32) -> Result<(), Self::Error> {
        if self.fail_attach {
            return Err(SimIrqError);
        }
        self.attached = Some(line);
        self.attaches += 1;
        Ok(())
    }

    fn detach(&mut self, line: u32) -> Result<(), Self::Error> {
        if self.attached == Some(line) {
            self.attached = None;
        }
        self.detaches += 1;
        Ok(())
    }

    fn is_attached(&self, line: u32) -> bool {
        self.attached == Some(line)
    }
}

/// A simulated GPIO block that records alternate function requests.
#[derive(Debug, Default, Clone)]
pub struct SimPins {
    calls: Vec<(u32, AltFunction)>,
}

impl SimPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(pins, function)` request so far.
    pub fn calls(&self) -> &[(u32, AltFunction)] {
        &self.calls
    }
}

impl PinMux for SimPins {
    fn set_alternate(&mut self, pins: u32, function: AltFunction) {
        self.calls.push((pins, function));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registers::CLEAR_BOTH;

    #[test]
    fn done_needs_transfer_active() {
        let mut bus = SimBus::new();
        assert!(!bus.read::<Cs>().done());
        bus.modify(|cs: Cs| cs.with_ta(true));
        assert!(bus.read::<Cs>().done());
    }

    #[test]
    fn busy_counts_down() {
        let mut bus = SimBus::new();
        bus.write(Cs::new().with_ta(true));
        bus.set_busy(2);
        assert!(!bus.read::<Cs>().done());
        assert!(!bus.read::<Cs>().done());
        assert!(bus.read::<Cs>().done());
    }

    #[test]
    fn loopback_and_clear() {
        let mut bus = SimBus::new();
        bus.write_fifo(0x42);
        assert!(bus.read::<Cs>().rxd());
        bus.write(Cs::new().with_clear(CLEAR_BOTH));
        assert!(!bus.read::<Cs>().rxd());
        assert_eq!((1, 1), bus.clears());
        assert_eq!(&[0x42], bus.tx_log());
        // the clear command never reads back
        assert_eq!(0, bus.read::<Cs>().clear());
    }

    #[test]
    fn high_water_needs_transfer_active() {
        let mut bus = SimBus::new().with_echo(Echo::Discard);
        bus.set_rx_high_water(2);
        bus.preload(&[1, 2]);
        assert!(!bus.read::<Cs>().rxr());
        bus.modify(|cs: Cs| cs.with_ta(true));
        assert!(bus.read::<Cs>().rxr());
        assert_eq!(1, bus.read_fifo());
        assert!(!bus.read::<Cs>().rxr());
    }

    #[test]
    fn irq_attach_failure() {
        let mut irq = SimIrq::new();
        irq.fail_attach(true);
        assert_eq!(Err(SimIrqError), irq.attach(54));
        assert!(!irq.is_attached(54));
        irq.fail_attach(false);
        assert_eq!(Ok(()), irq.attach(54));
        assert!(irq.is_attached(54));
        assert_eq!(Ok(()), irq.detach(54));
        assert_eq!(None, irq.attached());
    }
}
