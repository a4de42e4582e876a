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

    bus.rs

    Bus-facing device traits.

*/

//! Traits through which a system bus reaches the accelerator. Wide accesses default to
//! sequences of byte accesses; devices that can do better override them.

/// Byte read from an unconnected I/O address.
pub const NO_IO_BYTE: u8 = 0xFF;

pub trait IoDevice {
    /// Read a byte from the specified port. The default implementation returns NO_IO_BYTE.
    fn read_u8(&mut self, _port: u16) -> u8 {
        NO_IO_BYTE
    }

    /// Write a byte to the specified port. The default implementation does nothing.
    fn write_u8(&mut self, _port: u16, _data: u8) {}

    fn read_u16(&mut self, port: u16) -> u16 {
        let lo = self.read_u8(port);
        let hi = self.read_u8(port.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn write_u16(&mut self, port: u16, data: u16) {
        let [lo, hi] = data.to_le_bytes();
        self.write_u8(port, lo);
        self.write_u8(port.wrapping_add(1), hi);
    }

    /// Return a list of ports the device should service, comprised of a vector of tuples of
    /// (port description, port number).
    fn port_list(&self) -> Vec<(String, u16)>;
}

pub trait MemoryMappedDevice {
    fn mmio_read_u8(&mut self, offset: u32) -> u8;
    fn mmio_write_u8(&mut self, offset: u32, data: u8);

    fn mmio_read_u16(&mut self, offset: u32) -> u16 {
        u16::from_le_bytes([self.mmio_read_u8(offset), self.mmio_read_u8(offset.wrapping_add(1))])
    }

    fn mmio_write_u16(&mut self, offset: u32, data: u16) {
        let [lo, hi] = data.to_le_bytes();
        self.mmio_write_u8(offset, lo);
        self.mmio_write_u8(offset.wrapping_add(1), hi);
    }

    fn mmio_read_u32(&mut self, offset: u32) -> u32 {
        let lo = self.mmio_read_u16(offset) as u32;
        let hi = self.mmio_read_u16(offset.wrapping_add(2)) as u32;
        lo | (hi << 16)
    }

    fn mmio_write_u32(&mut self, offset: u32, data: u32) {
        self.mmio_write_u16(offset, data as u16);
        self.mmio_write_u16(offset.wrapping_add(2), (data >> 16) as u16);
    }
}
