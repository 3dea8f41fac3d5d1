use core::fmt::Debug;

use embedded_hal_1::spi as hal1;

use crate::bus::RegisterBus;
use crate::platform::IrqLine;

use super::{Error, Spi0};

impl<E> hal1::Error for Error<E>
where
    E: Debug,
{
    fn kind(&self) -> hal1::ErrorKind {
        match self {
            Error::InvalidArgument => hal1::ErrorKind::ChipSelectFault,
            _ => hal1::ErrorKind::Other,
        }
    }
}

impl<B, I> hal1::ErrorType for Spi0<B, I>
where
    B: RegisterBus,
    I: IrqLine,
    I::Error: Debug,
{
    type Error = Error<I::Error>;
}

/// Transfers run polled on whichever chip select was last selected.
impl<B, I> hal1::SpiBus<u8> for Spi0<B, I>
where
    B: RegisterBus,
    I: IrqLine,
    I::Error: Debug,
{
    #[inline(always)]
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        Spi0::read(self, words)
    }

    #[inline(always)]
    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        Spi0::write(self, words)
    }

    #[inline(always)]
    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        Spi0::transfer_buffers(self, read, write)
    }

    #[inline(always)]
    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        Spi0::transfer_in_place(self, words)
    }

    #[inline(always)]
    fn flush(&mut self) -> Result<(), Self::Error> {
        // every transfer waits for done before returning
        Ok(())
    }
}
