//! A growable byte buffer with a doubling reservation policy.
//!
//! Codec backends hand back compressed/decompressed bytes incrementally; this avoids reallocating
//! on every small append the way a naive `Vec::push` loop would.

/// A `Vec<u8>`-backed buffer that grows by at least doubling on each reservation.
#[derive(Debug, Default, Clone)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Ensures at least `additional` more bytes can be pushed without reallocating, growing the
    /// backing allocation to `max(current_capacity * 2, current_len + additional)` when it must
    /// grow at all.
    pub fn reserve(&mut self, additional: usize) {
        let needed = self.data.len() + additional;
        if needed <= self.data.capacity() {
            return;
        }
        let doubled = self.data.capacity() * 2;
        let target = doubled.max(needed);
        let extra = target - self.data.len();
        self.data.reserve(extra);
    }

    /// Grows the buffer to exactly `len` bytes, zero-filling any new bytes.
    pub fn resize(&mut self, len: usize) {
        if len > self.data.len() {
            self.reserve(len - self.data.len());
        }
        self.data.resize(len, 0);
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::Buffer;

    #[test]
    fn reserve_doubles_capacity() {
        let mut buf = Buffer::with_capacity(4);
        buf.extend_from_slice(&[0, 1, 2, 3]);
        let cap_before = buf.capacity();
        buf.reserve(1);
        assert!(buf.capacity() >= cap_before * 2);
    }

    #[test]
    fn reserve_respects_large_request_over_doubling() {
        let mut buf = Buffer::with_capacity(4);
        buf.reserve(1000);
        assert!(buf.capacity() >= 1000);
    }

    #[test]
    fn resize_zero_fills() {
        let mut buf = Buffer::new();
        buf.resize(3);
        assert_eq!(buf.as_slice(), &[0, 0, 0]);
    }
}
