//! Raw access to the SPI0 register block.

use core::sync::atomic::{AtomicBool, Ordering};

use vcell::VolatileCell;

use crate::platform;
use crate::registers::{Register, FIFO_OFFSET};

/// Single-register access to an SPI0 register block.
///
/// Every call is exactly one bus operation and nothing is cached, so
/// status flags are always fresh. [Mmio] talks to hardware, the
/// simulated bank in `sim` stands in for it in tests.
pub trait RegisterBus {
    /// Read the raw register at a byte offset.
    fn read_raw(&mut self, offset: usize) -> u32;

    /// Write the raw register at a byte offset.
    fn write_raw(&mut self, offset: usize, value: u32);

    /// Read a register.
    #[inline(always)]
    fn read<R>(&mut self) -> R
    where
        R: Register,
    {
        self.read_raw(R::OFFSET).into()
    }

    /// Write a register.
    #[inline(always)]
    fn write<R>(&mut self, value: R)
    where
        R: Register,
    {
        self.write_raw(R::OFFSET, value.into())
    }

    /// Modify a register.
    #[inline(always)]
    fn modify<R>(&mut self, f: impl FnOnce(R) -> R)
    where
        R: Register,
    {
        let value = self.read();
        self.write(f(value))
    }

    /// Pop a word from the RX FIFO.
    #[inline(always)]
    fn read_fifo(&mut self) -> u32 {
        self.read_raw(FIFO_OFFSET)
    }

    /// Push a word to the TX FIFO.
    #[inline(always)]
    fn write_fifo(&mut self, value: u32) {
        self.write_raw(FIFO_OFFSET, value)
    }
}

impl<B> RegisterBus for &mut B
where
    B: RegisterBus + ?Sized,
{
    #[inline(always)]
    fn read_raw(&mut self, offset: usize) -> u32 {
        (**self).read_raw(offset)
    }

    #[inline(always)]
    fn write_raw(&mut self, offset: usize, value: u32) {
        (**self).write_raw(offset, value)
    }
}

/// Layout of the SPI0 register block in memory.
#[repr(C)]
pub struct RegisterBlock {
    // cs, fifo, clk, dlen, ltoh, dc
    regs: [VolatileCell<u32>; 6],
}

/// Memory-mapped SPI0 registers.
pub struct Mmio {
    block: &'static RegisterBlock,
}

// safety: a handle is exclusive (take-once flag, or the `steal`
// contract), so moving it to another context never aliases the block
unsafe impl Send for Mmio {}

static TAKEN: AtomicBool = AtomicBool::new(false);

impl Mmio {
    /// Take the SPI0 registers at [platform::SPI0_BASE].
    ///
    /// This succeeds only once, until the handle is [released][Mmio::release].
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            None
        } else {
            // safety: the taken flag makes us the only handle
            Some(unsafe { Self::steal(platform::SPI0_BASE) })
        }
    }

    /// Create a handle to a register block at the given address.
    ///
    /// # Safety
    /// `base` must be the mapped address of an SPI0 register block,
    /// and nothing else may access that block while this handle exists.
    #[inline(always)]
    pub unsafe fn steal(base: usize) -> Self {
        Self {
            block: &*(base as *const RegisterBlock),
        }
    }

    /// Give the registers back, so [Mmio::take()] can succeed again.
    pub fn release(self) {
        TAKEN.store(false, Ordering::Release);
    }

    /// The address of the register block.
    #[inline(always)]
    pub fn base(&self) -> usize {
        self.block as *const RegisterBlock as usize
    }
}

impl core::fmt::Debug for Mmio {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_tuple("Mmio")
            .field(&format_args!("{:#x}", self.base()))
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Mmio {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Mmio({=usize:#x})", self.base());
    }
}

impl RegisterBus for Mmio {
    #[inline(always)]
    fn read_raw(&mut self, offset: usize) -> u32 {
        self.block.regs[offset >> 2].get()
    }

    #[inline(always)]
    fn write_raw(&mut self, offset: usize, value: u32) {
        self.block.regs[offset >> 2].set(value)
    }
}
