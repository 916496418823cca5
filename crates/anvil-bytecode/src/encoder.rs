//! Binary writer for the class container.

/// Little-endian byte writer with patch support.
#[derive(Debug, Default)]
pub struct ByteWriter {
    pub buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Length-prefixed UTF-8 string.
    pub fn emit_str(&mut self, value: &str) {
        self.emit_u32(value.len() as u32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    pub fn emit_opt_str(&mut self, value: Option<&str>) {
        match value {
            Some(s) => {
                self.emit_u8(1);
                self.emit_str(s);
            }
            None => self.emit_u8(0),
        }
    }

    /// Overwrite a previously reserved u32 at `offset`.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
