//! Growable append-only byte buffer used by the packer.
//!
//! Every typed encoder writes through a `Writer` instead of pushing onto a
//! bare `Vec<u8>` directly, so the growth strategy and the two-buffer append
//! used by `Class`/`Singleton`/`Instance` scratch buffers live in one place.

#[derive(Clone, Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Writer {
            buf: Vec::with_capacity(cap),
        }
    }

    fn reserve(&mut self, additional: usize) {
        let needed = self.buf.len() + additional;
        if self.buf.capacity() < needed {
            let mut new_cap = self.buf.capacity().max(1);
            while new_cap < needed {
                new_cap *= 2;
            }
            self.buf.reserve(new_cap - self.buf.len());
        }
    }

    pub fn push_byte(&mut self, b: u8) {
        self.reserve(1);
        self.buf.push(b);
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    /// Append the contents of another writer, e.g. a scratch buffer used to
    /// build a `Class`/`Singleton`/`Instance` payload before its length is
    /// known.
    pub fn append(&mut self, other: &Writer) {
        self.push_bytes(&other.buf);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_past_initial_capacity() {
        let mut w = Writer::new();
        for i in 0..1000u32 {
            w.push_bytes(&i.to_le_bytes());
        }
        assert_eq!(w.len(), 4000);
    }

    #[test]
    fn append_concatenates() {
        let mut a = Writer::new();
        a.push_bytes(&[1, 2, 3]);
        let mut b = Writer::new();
        b.push_bytes(&[4, 5]);
        a.append(&b);
        assert_eq!(a.into_vec(), vec![1, 2, 3, 4, 5]);
    }
}
