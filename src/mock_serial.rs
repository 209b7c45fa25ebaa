//! We use this mocking module in unit tests to emulate a serial link.

/// Scriptable serial double: records what was written, plays back queued
/// response bytes, and can be told to fail.
pub struct MockSerial {
    written: Vec<u8>,
    pending: Vec<u8>,
    cursor: usize,
    fail_reads: bool,
    fail_writes: bool,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// No more queued data; a real port would block until its timeout.
    WouldBlock,
    /// Simulated hard link failure.
    Broken,
}

impl core::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MockSerialError::WouldBlock => write!(f, "no more queued data"),
            MockSerialError::Broken => write!(f, "simulated hard link failure"),
        }
    }
}

impl core::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::WouldBlock => embedded_io::ErrorKind::TimedOut,
            MockSerialError::Broken => embedded_io::ErrorKind::BrokenPipe,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(MockSerialError::Broken);
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MockSerialError::Broken);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.fail_reads {
            return Err(MockSerialError::Broken);
        }
        if self.cursor >= self.pending.len() {
            return Err(MockSerialError::WouldBlock);
        }
        let available = &self.pending[self.cursor..];
        let count = buf.len().min(available.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.cursor += count;
        Ok(count)
    }
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            pending: Vec::new(),
            cursor: 0,
            fail_reads: false,
            fail_writes: false,
        }
    }

    /// Queue bytes that subsequent `read` calls will return.
    pub fn queue_response(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    /// Everything written to the link so far.
    pub fn written_data(&self) -> &[u8] {
        &self.written
    }

    pub fn clear_written_data(&mut self) {
        self.written.clear();
    }

    /// Make every read fail with a hard link error.
    pub fn set_read_error(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Make every write fail with a hard link error.
    pub fn set_write_error(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Write};

    #[test]
    fn records_writes_in_order() {
        let mut mock = MockSerial::new();
        mock.write(b"*IDN?").unwrap();
        mock.write(b"\r\n").unwrap();
        assert_eq!(mock.written_data(), b"*IDN?\r\n");
    }

    #[test]
    fn plays_back_queued_data_then_blocks() {
        let mut mock = MockSerial::new();
        mock.queue_response(b"ok");

        let mut buf = [0u8; 8];
        assert_eq!(mock.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ok");
        assert!(matches!(
            mock.read(&mut buf),
            Err(MockSerialError::WouldBlock)
        ));
    }

    #[test]
    fn partial_reads_advance_the_cursor() {
        let mut mock = MockSerial::new();
        mock.queue_response(b"abcdef");

        let mut buf = [0u8; 4];
        assert_eq!(mock.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(mock.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
    }

    #[test]
    fn injected_failures_surface_as_broken_link() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(matches!(mock.write(b"x"), Err(MockSerialError::Broken)));
        assert!(mock.written_data().is_empty());

        mock.set_write_error(false);
        mock.set_read_error(true);
        mock.queue_response(b"data");
        let mut buf = [0u8; 4];
        assert!(matches!(mock.read(&mut buf), Err(MockSerialError::Broken)));
    }
}
