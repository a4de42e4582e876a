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

    lib.rs

    Crate root for the 2D graphics accelerator core.

*/

//! marty_accel emulates the 2D drawing engine of the S3 86C911/Trio64 family of display
//! adapters, along with an ET4000/W32p-style variant that adds a three-operand ROP unit and
//! programmable pattern and source wrap.
//!
//! The controlling CPU talks to an [AcceleratorDevice] through port or MMIO accesses. Register
//! writes that affect drawing are forwarded through a bounded [queue::CommandQueue] to a
//! dedicated worker thread, which owns the [engine::RasterEngine] and the video memory it draws
//! into.

pub mod bus;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod mixer;
pub mod queue;
pub mod quirks;
pub mod registers;
pub mod vram;

pub use config::{AcceleratorConfig, Geometry, PixelDepth};
pub use device::{AcceleratorDevice, DeviceSnapshot};
pub use error::AccelError;
pub use quirks::{ChipQuirks, ChipType};
pub use vram::{VideoMemory, Vram};
