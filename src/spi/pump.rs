//! The byte pump shared by polled and interrupt-driven transfers.
//!
//! Nothing here takes a lock. Polled callers run [pump()] inside a
//! critical section; the interrupt handler is already in one.

use crate::bus::RegisterBus;
use crate::platform;
use crate::registers::{Cs, Dlen};

use super::Timeout;

/// A busy-wait gave up before the hardware raised its flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stall;

/// Byte counts for one run of the pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferRequest {
    /// Bytes to send.
    pub tx_count: usize,
    /// Bytes to receive.
    pub rx_count: usize,
    /// Bytes sent so far.
    pub tx_sent: usize,
    /// Bytes received so far.
    pub rx_received: usize,
}

impl TransferRequest {
    /// A request that has not moved anything yet.
    pub const fn new(tx_count: usize, rx_count: usize) -> Self {
        Self {
            tx_count,
            rx_count,
            tx_sent: 0,
            rx_received: 0,
        }
    }

    /// Are there bytes left to send?
    #[inline(always)]
    pub const fn tx_pending(&self) -> bool {
        self.tx_sent < self.tx_count
    }

    /// Are there bytes left to receive?
    #[inline(always)]
    pub const fn rx_pending(&self) -> bool {
        self.rx_received < self.rx_count
    }

    /// The larger of bytes sent and bytes received.
    #[inline(always)]
    pub fn transferred(&self) -> usize {
        self.tx_sent.max(self.rx_received)
    }
}

/// Spin until `ready` holds for the status register.
pub fn wait_until<B>(bus: &mut B, timeout: Timeout, ready: impl Fn(Cs) -> bool) -> Result<(), Stall>
where
    B: RegisterBus,
{
    let mut polls: u32 = 0;
    loop {
        if ready(bus.read::<Cs>()) {
            return Ok(());
        }

        if let Timeout::Polls(limit) = timeout {
            polls += 1;
            if polls >= limit {
                return Err(Stall);
            }
        }

        core::hint::spin_loop();
    }
}

/// Move bytes through the FIFOs until the request is satisfied.
///
/// Bytes come from `tx`. Without it, or once it runs out while reads
/// are still pending, [platform::FILLER] is sent so the clock keeps
/// running. Received bytes land in `rx`. Counts are clipped to the
/// buffers given. Leftover RX bytes are discarded, and this returns
/// only after the done flag is up, so the last bit has left the shift
/// register.
///
/// Transfer active must already be set. Returns the larger of bytes
/// sent and bytes received.
pub fn pump<B>(
    bus: &mut B,
    timeout: Timeout,
    tx: Option<&[u8]>,
    rx: Option<&mut [u8]>,
    request: TransferRequest,
) -> Result<usize, Stall>
where
    B: RegisterBus,
{
    pump_request(bus, timeout, tx, rx, request).map(|req| req.transferred())
}

/// [pump()], returning the final counts instead of a total.
pub fn pump_request<B>(
    bus: &mut B,
    timeout: Timeout,
    tx: Option<&[u8]>,
    mut rx: Option<&mut [u8]>,
    request: TransferRequest,
) -> Result<TransferRequest, Stall>
where
    B: RegisterBus,
{
    // don't log or do anything else slow in here: the FIFOs must be
    // kept fed or the byte stream is corrupted

    // this gets reset by the hardware, set it every time
    bus.write(Dlen::new().with_len(platform::DLEN_NO_DMA));

    let mut req = TransferRequest {
        tx_count: tx.map_or(request.tx_count, |buf| request.tx_count.min(buf.len())),
        rx_count: rx
            .as_deref()
            .map_or(request.rx_count, |buf| request.rx_count.min(buf.len())),
        ..request
    };

    while (req.tx_pending() && tx.is_some()) || (req.rx_pending() && rx.is_some()) {
        if req.tx_pending() {
            match tx {
                Some(buf) => {
                    wait_until(bus, timeout, |cs| cs.txd())?;
                    bus.write_fifo(buf[req.tx_sent] as u32);
                }
                // one filler per read, so no need to wait for space
                None => bus.write_fifo(platform::FILLER as u32),
            }
            req.tx_sent += 1;
        } else if rx.is_some() && req.rx_pending() && req.tx_sent <= req.rx_received {
            // tx ran out first, every read still needs a byte clocked out
            bus.write_fifo(platform::FILLER as u32);
            req.tx_sent += 1;
        }

        match rx.as_deref_mut() {
            Some(buf) if req.rx_pending() => {
                wait_until(bus, timeout, |cs| cs.rxd())?;
                buf[req.rx_received] = bus.read_fifo() as u8;
                req.rx_received += 1;
            }
            // nobody wants these, but a full RX FIFO stops the clock
            _ => {
                if bus.read::<Cs>().rxd() {
                    bus.read_fifo();
                }
            }
        }
    }

    // drop anything left over so it doesn't show up in the next transfer
    while bus.read::<Cs>().rxd() {
        bus.read_fifo();
    }

    // wait for the shift register to empty before anyone touches CS
    wait_until(bus, timeout, |cs| cs.done())?;

    Ok(req)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{Echo, SimBus};

    use quickcheck_macros::quickcheck;

    const TIMEOUT: Timeout = Timeout::Polls(1000);

    fn active(echo: Echo) -> SimBus {
        let mut bus = SimBus::new().with_echo(echo);
        bus.write(Cs::new().with_ta(true));
        bus
    }

    #[quickcheck]
    fn moves_the_larger_count(tx_count: u8, rx_count: u8) -> bool {
        let (tx_count, rx_count) = (tx_count as usize, rx_count as usize);
        let tx: Vec<u8> = (0..tx_count).map(|i| i as u8).collect();
        let mut rx = vec![0; rx_count];

        // the slave answers independently of what it is sent
        let mut bus = active(Echo::Discard);
        bus.preload(&vec![0xa5; rx_count]);

        let moved = pump(
            &mut bus,
            TIMEOUT,
            Some(&tx),
            Some(&mut rx),
            TransferRequest::new(tx_count, rx_count),
        );

        // short tx is padded with filler so every read is clocked
        let mut sent = tx.clone();
        sent.resize(tx_count.max(rx_count), platform::FILLER);

        moved == Ok(tx_count.max(rx_count))
            && bus.tx_log() == &sent[..]
            && bus.fifo_reads() == rx_count
            && rx.iter().all(|&b| b == 0xa5)
    }

    #[test]
    fn loopback_round_trip() {
        let tx: Vec<u8> = (1..=0x40).collect();
        let mut rx = vec![0; tx.len()];
        let mut bus = active(Echo::Loopback);

        let moved = pump(
            &mut bus,
            TIMEOUT,
            Some(&tx),
            Some(&mut rx),
            TransferRequest::new(tx.len(), tx.len()),
        );

        assert_eq!(Ok(0x40), moved);
        assert_eq!(tx, rx);
    }

    #[test]
    fn filler_without_tx_buffer() {
        let mut rx = [0u8; 5];
        let mut bus = active(Echo::Discard);
        bus.preload(&[0x11, 0x22, 0x33, 0x44, 0x55]);

        let moved = pump(
            &mut bus,
            TIMEOUT,
            None,
            Some(&mut rx),
            TransferRequest::new(5, 5),
        );

        assert_eq!(Ok(5), moved);
        assert_eq!(&[0u8; 5], bus.tx_log());
        assert_eq!([0x11, 0x22, 0x33, 0x44, 0x55], rx);
    }

    #[test]
    fn write_only_discards_echo() {
        let tx = [0xde, 0xad, 0xbe, 0xef];
        let mut bus = active(Echo::Loopback);

        let moved = pump(&mut bus, TIMEOUT, Some(&tx), None, TransferRequest::new(4, 4));

        assert_eq!(Ok(4), moved);
        assert_eq!(&tx, bus.tx_log());
        assert_eq!(4, bus.fifo_reads());
        assert!(!bus.read::<Cs>().rxd());
    }

    #[test]
    fn nothing_to_move() {
        let mut bus = active(Echo::Loopback);
        let moved = pump(&mut bus, TIMEOUT, None, None, TransferRequest::new(8, 8));
        assert_eq!(Ok(0), moved);
        assert!(bus.tx_log().is_empty());
    }

    #[test]
    fn drains_stale_rx() {
        let tx = [1, 2];
        let mut rx = [0u8; 2];
        let mut bus = active(Echo::Loopback);
        bus.preload(&[0xee; 3]);

        pump(
            &mut bus,
            TIMEOUT,
            Some(&tx),
            Some(&mut rx),
            TransferRequest::new(2, 2),
        )
        .unwrap();

        // stale bytes come out first, the rest is thrown away
        assert_eq!([0xee, 0xee], rx);
        assert_eq!(0, bus.rx_len());
    }

    #[test]
    fn counts_clip_to_buffers() {
        let tx = [1, 2, 3];
        let mut rx = [0u8; 2];
        let mut bus = active(Echo::Loopback);

        let moved = pump(
            &mut bus,
            TIMEOUT,
            Some(&tx),
            Some(&mut rx),
            TransferRequest::new(10, 10),
        );

        assert_eq!(Ok(3), moved);
        assert_eq!([1, 2], rx);
    }

    #[test]
    fn short_tx_is_padded() {
        let tx = [1, 2, 3];
        let mut rx = [0xffu8; 5];
        let mut bus = active(Echo::Loopback);

        let req = pump_request(
            &mut bus,
            TIMEOUT,
            Some(&tx),
            Some(&mut rx),
            TransferRequest::new(5, 5),
        );

        let req = req.unwrap();
        assert_eq!(3, req.tx_count);
        assert_eq!(5, req.tx_sent);
        assert_eq!(5, req.rx_received);
        assert_eq!(&[1, 2, 3, 0, 0], bus.tx_log());
        assert_eq!([1, 2, 3, 0, 0], rx);
    }

    #[test]
    fn reports_bytes_received() {
        let tx = [1, 2, 3, 4];
        let mut bus = active(Echo::Loopback);

        let req = pump_request(&mut bus, TIMEOUT, Some(&tx), None, TransferRequest::new(4, 4));

        // echoed bytes were thrown away, not received
        assert_eq!(Ok(4), req.map(|r| r.tx_sent));
        assert_eq!(Ok(0), req.map(|r| r.rx_received));
        assert_eq!(Ok(4), req.map(|r| r.transferred()));
    }

    #[test]
    fn reasserts_data_length() {
        let mut bus = active(Echo::Loopback);
        bus.write(Dlen::new());

        pump(&mut bus, TIMEOUT, Some(&[7]), None, TransferRequest::new(1, 0)).unwrap();

        assert_eq!(platform::DLEN_NO_DMA, bus.read::<Dlen>().len());
    }

    #[test]
    fn stalls_on_silent_slave() {
        let mut rx = [0u8; 1];
        let mut bus = active(Echo::Discard);

        let moved = pump(
            &mut bus,
            Timeout::Polls(10),
            None,
            Some(&mut rx),
            TransferRequest::new(1, 1),
        );

        assert_eq!(Err(Stall), moved);
    }

    #[test]
    fn stalls_on_busy_shift_register() {
        let mut bus = active(Echo::Loopback);
        bus.set_busy(u32::MAX);

        let moved = pump(&mut bus, Timeout::Polls(10), Some(&[1]), None, TransferRequest::new(1, 0));

        assert_eq!(Err(Stall), moved);
    }

    #[test]
    fn waits_out_a_busy_shift_register() {
        let mut bus = active(Echo::Loopback);
        bus.set_busy(5);

        let moved = pump(&mut bus, Timeout::Polls(10), Some(&[1]), None, TransferRequest::new(1, 0));

        assert_eq!(Ok(1), moved);
    }
}
