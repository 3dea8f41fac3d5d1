use embedded_hal_02::blocking::spi as hal02blocking;

use crate::bus::RegisterBus;
use crate::platform::IrqLine;

use super::{Error, Spi0};

// WriteIter batches this many bytes per polled transfer
const BATCH_LEN: usize = 16;

impl<B, I> hal02blocking::Transactional<u8> for Spi0<B, I>
where
    B: RegisterBus,
    I: IrqLine,
{
    type Error = Error<I::Error>;

    fn exec(&mut self, operations: &mut [hal02blocking::Operation<u8>]) -> Result<(), Self::Error> {
        use hal02blocking::Operation;

        for op in operations.iter_mut() {
            match op {
                Operation::Write(buf) => {
                    Spi0::write(self, buf)?;
                }
                Operation::Transfer(buf) => {
                    Spi0::transfer_in_place(self, buf)?;
                }
            }
        }

        Ok(())
    }
}

impl<B, I> hal02blocking::Transfer<u8> for Spi0<B, I>
where
    B: RegisterBus,
    I: IrqLine,
{
    type Error = Error<I::Error>;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        Spi0::transfer_in_place(self, words)?;
        Ok(words)
    }
}

impl<B, I> hal02blocking::Write<u8> for Spi0<B, I>
where
    B: RegisterBus,
    I: IrqLine,
{
    type Error = Error<I::Error>;

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        Spi0::write(self, words)
    }
}

impl<B, I> hal02blocking::WriteIter<u8> for Spi0<B, I>
where
    B: RegisterBus,
    I: IrqLine,
{
    type Error = Error<I::Error>;

    fn write_iter<WI>(&mut self, words: WI) -> Result<(), Self::Error>
    where
        WI: IntoIterator<Item = u8>,
    {
        let mut batch = [0u8; BATCH_LEN];
        let mut len = 0;
        for word in words {
            batch[len] = word;
            len += 1;
            if len == BATCH_LEN {
                Spi0::write(self, &batch)?;
                len = 0;
            }
        }

        if len > 0 {
            Spi0::write(self, &batch[..len])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{Echo, SimBus, SimIrq, SimPins};
    use crate::spi::{ControllerConfig, Timeout};

    use embedded_hal_02::blocking::spi::{Operation, Transactional, Transfer, Write, WriteIter};

    fn spi() -> Spi0<SimBus, SimIrq> {
        let config = ControllerConfig::new().timeout(Timeout::Polls(100));
        Spi0::new(
            SimBus::new().with_echo(Echo::Loopback),
            SimIrq::new(),
            SimPins::new(),
            config,
        )
    }

    #[test]
    fn transfer_returns_words() {
        let mut spi = spi();
        let mut words = [1, 2, 3, 4];
        let read = Transfer::transfer(&mut spi, &mut words).unwrap();
        assert_eq!(&[1, 2, 3, 4], read);
    }

    #[test]
    fn write_then_iter() {
        let mut spi = spi();
        Write::write(&mut spi, &[0xaa, 0xbb]).unwrap();
        spi.write_iter(0..40u8).unwrap();

        let log = spi.bus().tx_log();
        assert_eq!(42, log.len());
        assert_eq!(&[0xaa, 0xbb, 0, 1], &log[..4]);
        assert_eq!(39, log[41]);
        assert_eq!(0, spi.bus().rx_len());
    }

    #[test]
    fn transactional() {
        let mut spi = spi();
        let mut buf = [5u8, 6];
        spi.exec(&mut [Operation::Write(&[1]), Operation::Transfer(&mut buf)])
            .unwrap();
        assert_eq!([5, 6], buf);
        assert_eq!(&[1, 5, 6], spi.bus().tx_log());
    }

    #[test]
    fn transactional_spans_bounce_chunks() {
        let mut spi = spi();
        let header = [0x03, 0x00, 0x10];
        let mut data: [u8; 40] = core::array::from_fn(|i| 0x80 + i as u8);
        let expected = data;

        spi.exec(&mut [
            Operation::Write(&header),
            Operation::Transfer(&mut data),
            Operation::Write(&[0xff]),
        ])
        .unwrap();

        assert_eq!(expected, data);
        let log = spi.bus().tx_log();
        assert_eq!(44, log.len());
        assert_eq!(&header, &log[..3]);
        assert_eq!(&expected[..], &log[3..43]);
        assert_eq!(0xff, log[43]);
        assert_eq!(0, spi.bus().rx_len());
    }
}
