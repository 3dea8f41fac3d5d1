//! Decisions made by the SPI0 interrupt handler.
//!
//! These are plain functions of the device state and the status
//! register, so they can be checked without any hardware. The
//! controller carries them out in [crate::Spi0::on_interrupt()].

use crate::registers::Cs;

use super::pump::TransferRequest;
use super::{DeviceState, RxNotify, Watermarks};

/// What an interrupt handler reports back to the interrupt controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqReturn {
    /// The interrupt was for us. Reading the status flags while
    /// pumping is what acknowledges it in hardware.
    Handled,
    /// The interrupt was not for us.
    NotHandled,
}

/// Work for the handler to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Send (and receive) the next chunk of an armed transfer.
    Send { chunk: usize },
    /// Empty a high-water RX FIFO.
    Receive { chunk: usize },
}

impl Action {
    /// Bytes to pump for this action.
    #[inline(always)]
    pub const fn chunk(&self) -> usize {
        match *self {
            Self::Send { chunk } | Self::Receive { chunk } => chunk,
        }
    }
}

/// A completion callback to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// [crate::Notify::on_send_complete()].
    SendComplete,
    /// [crate::Notify::on_data_received()].
    DataReceived,
}

impl From<RxNotify> for Event {
    fn from(value: RxNotify) -> Self {
        match value {
            RxNotify::SendComplete => Self::SendComplete,
            RxNotify::DataReceived => Self::DataReceived,
        }
    }
}

/// What follows from a pumped action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Effects {
    /// Bytes left in the armed transfer.
    pub remaining: usize,
    /// Clear transfer active, releasing chip select.
    pub deassert: bool,
    /// Callback for bytes received on RX high water.
    pub received: Option<Event>,
    /// The armed transfer is finished.
    pub complete: bool,
}

impl Effects {
    /// Callbacks to fire, in order, after transfer active is dealt with.
    pub fn events(&self) -> impl Iterator<Item = Event> {
        self.received
            .into_iter()
            .chain(self.complete.then_some(Event::SendComplete))
    }
}

/// The done case: the last chunk is out and there is more to send.
pub fn send_action(state: DeviceState, status: Cs, watermarks: Watermarks) -> Option<Action> {
    match state {
        DeviceState::Armed { remaining } if status.done() && status.ta() => Some(Action::Send {
            chunk: remaining.min(watermarks.tx_low),
        }),
        _ => None,
    }
}

/// The RX high-water case.
pub fn receive_action(state: DeviceState, status: Cs, watermarks: Watermarks) -> Option<Action> {
    match state {
        DeviceState::Armed { remaining } if status.rxr() => Some(Action::Receive {
            chunk: remaining.min(watermarks.rx_high),
        }),
        _ => None,
    }
}

/// Work out the new state after `progress` was pumped for `action`.
///
/// A finished transfer always reports [Event::SendComplete], once.
/// The receive case also reports `rx_notify` if anything was actually
/// received.
pub fn settle(
    action: Action,
    remaining: usize,
    progress: TransferRequest,
    rx_notify: RxNotify,
) -> Effects {
    let remaining = remaining.saturating_sub(progress.transferred());
    let complete = remaining == 0;

    let received = match action {
        Action::Send { .. } => None,
        Action::Receive { .. } => (progress.rx_received > 0).then_some(rx_notify.into()),
    }
    // the legacy receive callback is already the completion one
    .filter(|&event| !(complete && event == Event::SendComplete));

    Effects {
        remaining,
        deassert: complete,
        received,
        complete,
    }
}
