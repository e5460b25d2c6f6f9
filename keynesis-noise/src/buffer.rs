/// cursor over an incoming message
pub struct BufRead<'a> {
    bytes: &'a [u8],
}

/// cursor over the caller's output buffer
pub struct BufWrite<'a> {
    bytes: &'a mut [u8],
    position: usize,
}

impl<'a> BufRead<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn slice(&self, len: usize) -> &'a [u8] {
        &self.bytes[..len]
    }

    pub fn advance(&mut self, len: usize) {
        self.bytes = &self.bytes[len..];
    }
}

impl AsRef<[u8]> for BufRead<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl<'a> BufWrite<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// number of bytes written so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn write(&mut self, data: &[u8]) {
        debug_assert!(self.remaining() >= data.len());

        let end = self.position + data.len();
        self.bytes[self.position..end].copy_from_slice(data);
        self.position = end;
    }

    /// give access to the next `len` bytes of the buffer, the caller
    /// is expected to fill them up
    pub fn reserve(&mut self, len: usize) -> &mut [u8] {
        debug_assert!(self.remaining() >= len);

        let start = self.position;
        self.position += len;
        &mut self.bytes[start..self.position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_advances() {
        let mut input = BufRead::new(&[1, 2, 3, 4, 5]);
        assert_eq!(input.slice(2), &[1, 2]);
        input.advance(2);
        assert_eq!(input.slice(2), &[3, 4]);
        input.advance(2);
        assert_eq!(input.as_ref(), &[5]);
    }

    #[test]
    fn write_advances() {
        let mut bytes = [0; 5];
        let mut output = BufWrite::new(&mut bytes);
        output.write(&[1, 2]);
        output.reserve(2).copy_from_slice(&[3, 4]);
        assert_eq!(output.position(), 4);
        assert_eq!(output.remaining(), 1);
        assert_eq!(bytes, [1, 2, 3, 4, 0]);
    }
}
