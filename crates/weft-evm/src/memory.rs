//! Frame-local linear memory

use weft_primitives::U256;

/// Word-aligned byte buffer that only grows during a frame
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

/// Round a byte size up to whole 32-byte words
pub fn to_word_size(size: u64) -> u64 {
    size.div_ceil(32)
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Current size in bytes, always a multiple of 32
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been allocated yet
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current size in words
    pub fn words(&self) -> u64 {
        (self.data.len() / 32) as u64
    }

    /// Grow to at least `size` bytes rounded up to a word. Never shrinks.
    pub fn resize(&mut self, size: usize) {
        let aligned = size.div_ceil(32) * 32;
        if aligned > self.data.len() {
            self.data.resize(aligned, 0);
        }
    }

    /// Write `data` at `offset`, growing as needed
    pub fn set(&mut self, offset: usize, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.resize(offset + data.len());
        self.data[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Write a big-endian word at `offset`
    pub fn set_word(&mut self, offset: usize, value: U256) {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        self.set(offset, &bytes);
    }

    /// Write a single byte at `offset`
    pub fn set_byte(&mut self, offset: usize, value: u8) {
        self.resize(offset + 1);
        self.data[offset] = value;
    }

    /// Copy of `len` bytes at `offset`, growing as needed
    pub fn get(&mut self, offset: usize, len: usize) -> Vec<u8> {
        if len == 0 {
            return Vec::new();
        }
        self.resize(offset + len);
        self.data[offset..offset + len].to_vec()
    }

    /// Big-endian word at `offset`
    pub fn get_word(&mut self, offset: usize) -> U256 {
        U256::from_big_endian(&self.get(offset, 32))
    }

    /// Whole buffer
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
