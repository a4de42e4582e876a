/*
    MartyPC
    https://github.com/dbalsom/martypc

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    ---------------------------------------------------------------------------

    vram.rs

    Video memory accessor used by the raster engine.

*/

//! The raster engine never touches video memory directly; it goes through the [VideoMemory]
//! trait so the surrounding video card can supply its own aperture. Every address passed in is
//! masked into the configured wrap range before use.

/// Byte returned for reads that cannot be serviced.
pub const OPEN_BUS: u8 = 0xFF;

pub trait VideoMemory {
    /// The mask applied to every address before access.
    fn wrap_mask(&self) -> usize;

    fn read_u8(&self, address: usize) -> u8;
    fn write_u8(&mut self, address: usize, data: u8);

    fn read_u16(&self, address: usize) -> u16 {
        u16::from_le_bytes([self.read_u8(address), self.read_u8(address.wrapping_add(1))])
    }

    fn write_u16(&mut self, address: usize, data: u16) {
        let [lo, hi] = data.to_le_bytes();
        self.write_u8(address, lo);
        self.write_u8(address.wrapping_add(1), hi);
    }

    fn read_u32(&self, address: usize) -> u32 {
        let lo = self.read_u16(address) as u32;
        let hi = self.read_u16(address.wrapping_add(2)) as u32;
        lo | (hi << 16)
    }

    fn write_u32(&mut self, address: usize, data: u32) {
        self.write_u16(address, data as u16);
        self.write_u16(address.wrapping_add(2), (data >> 16) as u16);
    }

    /// Read a pixel of 1, 2 or 4 bytes.
    fn read_pixel(&self, address: usize, bytes: usize) -> u32 {
        match bytes {
            1 => self.read_u8(address) as u32,
            2 => self.read_u16(address) as u32,
            _ => self.read_u32(address),
        }
    }

    /// Write a pixel of 1, 2 or 4 bytes.
    fn write_pixel(&mut self, address: usize, bytes: usize, data: u32) {
        match bytes {
            1 => self.write_u8(address, data as u8),
            2 => self.write_u16(address, data as u16),
            _ => self.write_u32(address, data),
        }
    }
}

/// A plain linear video memory buffer. The size is always a power of two so that the wrap mask
/// covers it exactly.
pub struct Vram {
    data: Box<[u8]>,
    wrap_mask: usize,
}

impl Vram {
    pub fn new(size: usize) -> Self {
        let size = size.max(1).next_power_of_two();
        Self {
            data: vec![0; size].into_boxed_slice(),
            wrap_mask: size - 1,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Restrict addressing to a smaller window. The mask can never exceed the buffer size.
    pub fn set_wrap_mask(&mut self, mask: usize) {
        self.wrap_mask = mask & (self.data.len() - 1);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl VideoMemory for Vram {
    fn wrap_mask(&self) -> usize {
        self.wrap_mask
    }

    #[inline]
    fn read_u8(&self, address: usize) -> u8 {
        self.data.get(address & self.wrap_mask).copied().unwrap_or(OPEN_BUS)
    }

    #[inline]
    fn write_u8(&mut self, address: usize, data: u8) {
        if let Some(byte) = self.data.get_mut(address & self.wrap_mask) {
            *byte = data;
        }
    }
}
