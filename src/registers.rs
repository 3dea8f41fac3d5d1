//! Interfaces for the SPI0 register block.

use bitfield_struct::bitfield;

/// A trait describing a register generically.
pub trait Register: Copy + From<u32> + Into<u32> {
    /// Byte offset of this register from the start of the block.
    const OFFSET: usize;
}

/// Byte offset of the TX and RX FIFO port.
///
/// Writes push to the TX FIFO, reads pop from the RX FIFO. This is
/// data, not a register with fields, so it has no [Register] type.
pub const FIFO_OFFSET: usize = 0x04;

/// Value for [Cs::clear] that clears the TX FIFO.
pub const CLEAR_TX: u8 = 0b01;

/// Value for [Cs::clear] that clears the RX FIFO.
pub const CLEAR_RX: u8 = 0b10;

/// Value for [Cs::clear] that clears both FIFOs.
pub const CLEAR_BOTH: u8 = CLEAR_TX | CLEAR_RX;

/// 0x00 Master control and status.
///
/// The flags from [Cs::done] to [Cs::rxf] are read-only in hardware,
/// and [Cs::clear] always reads back as zero.
#[cfg_attr(not(feature = "defmt"), bitfield(u32))]
#[cfg_attr(feature = "defmt", bitfield(u32, defmt = true))]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cs {
    /// Chip select line to assert during a transfer.
    #[bits(2)]
    pub cs: u8,
    /// Clock phase. Set to sample on the second clock transition.
    pub cpha: bool,
    /// Clock polarity. Set for a clock that idles high.
    pub cpol: bool,
    /// FIFO clear command, see [CLEAR_TX] and [CLEAR_RX].
    #[bits(2)]
    pub clear: u8,
    /// Chip select polarity. Set for active-high chip selects.
    pub cspol: bool,
    /// Transfer active. Chip select is asserted while this is set.
    pub ta: bool,
    /// DMA enable.
    pub dmaen: bool,
    /// Interrupt on done.
    pub intd: bool,
    /// Interrupt on RX FIFO high water.
    pub intr: bool,
    /// Automatically de-assert chip select at the end of a DMA transfer.
    pub adcs: bool,
    /// Read enable, for bidirectional mode.
    pub ren: bool,
    /// LoSSI enable.
    pub len: bool,
    /// Unused, LoSSI mono mode.
    pub lmono: bool,
    /// Unused, LoSSI TE enable.
    pub te_en: bool,
    /// Transfer done.
    pub done: bool,
    /// RX FIFO contains data.
    pub rxd: bool,
    /// TX FIFO can accept data.
    pub txd: bool,
    /// RX FIFO needs reading, it is at least 3/4 full.
    pub rxr: bool,
    /// RX FIFO full.
    pub rxf: bool,
    /// Chip select 0 polarity.
    pub cspol0: bool,
    /// Chip select 1 polarity.
    pub cspol1: bool,
    /// Chip select 2 polarity.
    pub cspol2: bool,
    /// DMA in LoSSI mode.
    pub dma_len: bool,
    /// Long data words in LoSSI mode.
    pub len_long: bool,
    #[bits(6)]
    __: u8,
}

impl Register for Cs {
    const OFFSET: usize = 0x00;
}

impl Cs {
    /// This value with only the fields that hold written state.
    ///
    /// Status flags and the clear command are masked off.
    pub const fn control(self) -> Self {
        self.with_clear(0)
            .with_done(false)
            .with_rxd(false)
            .with_txd(false)
            .with_rxr(false)
            .with_rxf(false)
    }

    /// Is either interrupt source enabled?
    pub const fn interrupts_enabled(&self) -> bool {
        self.intd() || self.intr()
    }
}

/// 0x08 Master clock divider.
#[cfg_attr(not(feature = "defmt"), bitfield(u32))]
#[cfg_attr(feature = "defmt", bitfield(u32, defmt = true))]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Clk {
    /// Clock divider, SCLK = core clock / cdiv.
    ///
    /// Zero means 65536. Odd values are rounded down.
    pub cdiv: u16,
    __: u16,
}

impl Register for Clk {
    const OFFSET: usize = 0x08;
}

/// 0x0C Master data length.
///
/// Documented as the DMA byte count, but also shortens the gap
/// between bytes in polled and interrupt mode when set to anything
/// other than 0 or 1. See [crate::platform::DLEN_NO_DMA].
#[cfg_attr(not(feature = "defmt"), bitfield(u32))]
#[cfg_attr(feature = "defmt", bitfield(u32, defmt = true))]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dlen {
    /// Data length.
    pub len: u16,
    __: u16,
}

impl Register for Dlen {
    const OFFSET: usize = 0x0c;
}

/// 0x10 LoSSI mode output hold delay.
#[cfg_attr(not(feature = "defmt"), bitfield(u32))]
#[cfg_attr(feature = "defmt", bitfield(u32, defmt = true))]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ltoh {
    /// Output hold delay in APB clocks. Zero means one clock.
    #[bits(4)]
    pub toh: u8,
    #[bits(28)]
    __: u32,
}

impl Register for Ltoh {
    const OFFSET: usize = 0x10;
}

/// 0x14 DMA DREQ controls.
#[cfg_attr(not(feature = "defmt"), bitfield(u32))]
#[cfg_attr(feature = "defmt", bitfield(u32, defmt = true))]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dc {
    /// TX FIFO level that raises the TX DREQ.
    pub tdreq: u8,
    /// TX FIFO level that raises the TX panic signal.
    pub tpanic: u8,
    /// RX FIFO level that raises the RX DREQ.
    pub rdreq: u8,
    /// RX FIFO level that raises the RX panic signal.
    pub rpanic: u8,
}

impl Register for Dc {
    const OFFSET: usize = 0x14;
}
