use crate::class_file_error::{ClassFileError, Result};
use cesu8::from_java_cesu8;

/// Big-endian cursor over class file bytes and method bytecode.
pub struct ByteBuffer<'a> {
    buffer: &'a [u8],
    pub position: usize,
}

impl<'a> ByteBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteBuffer {
            buffer: data,
            position: 0,
        }
    }

    fn advance(&mut self, size: usize) -> Result<&'a [u8]> {
        if self.position + size > self.buffer.len() {
            Err(ClassFileError::UnexpectedEndOfData)
        } else {
            let slice = &self.buffer[self.position..self.position + size];
            self.position += size;
            Ok(slice)
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.advance(N)?);
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_array::<1>().map(u8::from_be_bytes)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_array::<1>().map(i8::from_be_bytes)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_array::<2>().map(i16::from_be_bytes)
    }

    pub fn read_2_u16(&mut self) -> Result<(u16, u16)> {
        let first = self.read_u16()?;
        let second = self.read_u16()?;
        Ok((first, second))
    }

    pub fn read_u8_u16(&mut self) -> Result<(u8, u16)> {
        let first = self.read_u8()?;
        let second = self.read_u16()?;
        Ok((first, second))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array::<2>().map(u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array::<4>().map(u32::from_be_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array::<4>().map(i32::from_be_bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_array::<8>().map(i64::from_be_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array::<4>().map(f32::from_be_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_array::<8>().map(f64::from_be_bytes)
    }

    pub fn read_utf8(&mut self, len: usize) -> Result<String> {
        self.advance(len)
            .and_then(|bytes| {
                from_java_cesu8(bytes).map_err(|_| ClassFileError::InvalidCesu8String)
            })
            .map(|cow_string| cow_string.into_owned())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.advance(len)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn has_more_data(&self) -> bool {
        self.position < self.buffer.len()
    }

    pub fn jump_to(&mut self, position: usize) -> Result<()> {
        if position > self.buffer.len() {
            return Err(ClassFileError::UnexpectedEndOfData);
        }
        self.position = position;
        Ok(())
    }

    /// Skips to the next multiple of four, counted from the start of the buffer.
    pub fn align_to_4(&mut self) -> Result<()> {
        let padding = (4 - self.position % 4) % 4;
        self.advance(padding).map(|_| ())
    }
}
