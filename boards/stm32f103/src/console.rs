//! USART1 console as non-blocking `embedded_io` streams

use embassy_stm32::mode::Blocking;
use embassy_stm32::pac;
use embassy_stm32::usart::{self, Uart, UartRx, UartTx};
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};

#[derive(Debug, defmt::Format)]
pub struct ConsoleError(usart::Error);

impl embedded_io::Error for ConsoleError {
    fn kind(&self) -> ErrorKind {
        match self.0 {
            usart::Error::Framing | usart::Error::Noise | usart::Error::Parity => ErrorKind::InvalidData,
            _ => ErrorKind::Other,
        }
    }
}

/// Serial console on USART1
///
/// `read_ready` peeks the receive flag so the time-set dialogue can poll
/// without blocking.
pub struct Console {
    tx: UartTx<'static, Blocking>,
    rx: UartRx<'static, Blocking>,
}

impl Console {
    pub fn new(uart: Uart<'static, Blocking>) -> Self {
        let (tx, rx) = uart.split();
        Self { tx, rx }
    }

    /// Write a line without caring whether it arrives
    pub fn print(&mut self, text: &str) {
        if self.tx.blocking_write(text.as_bytes()).is_err() {
            defmt::warn!("Console write failed");
        }
    }
}

impl ErrorType for Console {
    type Error = ConsoleError;
}

impl ReadReady for Console {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(pac::USART1.sr().read().rxne())
    }
}

impl Read for Console {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match buf.first_mut() {
            Some(byte) => {
                self.rx
                    .blocking_read(core::slice::from_mut(byte))
                    .map_err(ConsoleError)?;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.blocking_write(buf).map_err(ConsoleError)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.tx.blocking_flush().map_err(ConsoleError)
    }
}
