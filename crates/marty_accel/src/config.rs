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

    config.rs

    Accelerator configuration.

*/

//! Configuration of an accelerator instance, loadable from TOML:
//!
//! ```toml
//! chip = "s3_trio64"
//! vram_size = 1048576
//! depth = "bpp16"
//! pitch = 1024
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    error::AccelError,
    quirks::{ByteOrder, ChipQuirks, ChipType},
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelDepth {
    #[default]
    Bpp8,
    Bpp16,
    Bpp32,
}

impl PixelDepth {
    pub fn bytes(&self) -> usize {
        match self {
            PixelDepth::Bpp8 => 1,
            PixelDepth::Bpp16 => 2,
            PixelDepth::Bpp32 => 4,
        }
    }

    /// Mask of the bits that make up one pixel.
    pub fn mask(&self) -> u32 {
        match self {
            PixelDepth::Bpp8 => 0xFF,
            PixelDepth::Bpp16 => 0xFFFF,
            PixelDepth::Bpp32 => 0xFFFF_FFFF,
        }
    }
}

/// Layout of the drawing surface within video memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Scanline length, in pixels.
    pub pitch: u32,
    pub depth: PixelDepth,
    /// Byte offset of pixel (0,0).
    pub base:  u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            pitch: 1024,
            depth: PixelDepth::Bpp8,
            base:  0,
        }
    }
}

impl Geometry {
    /// Byte address of a pixel. Negative coordinates produce negative offsets, which the video
    /// memory wrap mask folds back into range.
    #[inline]
    pub fn address(&self, x: i32, y: i32) -> usize {
        let offset = (y as i64 * self.pitch as i64 + x as i64) * self.depth.bytes() as i64;
        (self.base as i64 + offset) as u64 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceleratorConfig {
    pub chip: ChipType,
    pub vram_size: usize,
    /// Command queue capacity. Defaults to the chip's FIFO depth.
    pub queue_depth: Option<usize>,
    pub depth: PixelDepth,
    pub pitch: u32,
    pub base: u32,
    /// Overrides the chip's native pixel transfer byte order.
    pub transfer_byte_order: Option<ByteOrder>,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            chip: ChipType::Trio64,
            vram_size: 0x10_0000,
            queue_depth: None,
            depth: PixelDepth::Bpp8,
            pitch: 1024,
            base: 0,
            transfer_byte_order: None,
        }
    }
}

impl AcceleratorConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, AccelError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let toml_str = std::fs::read_to_string(path)
            .with_context(|| format!("Couldn't read accelerator config {}", path.display()))?;
        let config = Self::from_toml_str(&toml_str)
            .with_context(|| format!("Couldn't parse accelerator config {}", path.display()))?;
        Ok(config)
    }

    pub fn quirks(&self) -> ChipQuirks {
        let mut quirks = ChipQuirks::new(self.chip);
        if let Some(order) = self.transfer_byte_order {
            quirks.transfer_order = order;
        }
        quirks
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            pitch: self.pitch,
            depth: self.depth,
            base:  self.base,
        }
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth.unwrap_or_else(|| self.quirks().fifo_depth).max(1)
    }
}
