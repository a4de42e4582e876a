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

    quirks.rs

    Chip capability descriptors.

*/

//! A single raster engine serves every supported chip. What differs between chips is captured
//! in a [ChipQuirks] descriptor: which primitives exist, how wide pixel transfers may be, the
//! pattern tile, the mix unit and the pixel transfer byte order.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::{
    mixer::MixUnit,
    registers::{BusWidth, PrimitiveKind, WrapDescriptor},
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum ChipType {
    #[serde(rename = "s3_86c911")]
    #[strum(serialize = "S3 86C911")]
    S3_86C911,
    #[default]
    #[serde(rename = "s3_trio64")]
    #[strum(serialize = "S3 Trio64")]
    Trio64,
    #[serde(rename = "et4000_w32p")]
    #[strum(serialize = "ET4000/W32p")]
    Et4000W32p,
}

/// Order in which the bytes of a 16-bit pixel transfer chunk are consumed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    LowByteFirst,
    HighByteFirst,
}

impl ByteOrder {
    /// The command register's byte swap bit inverts the chip's native order.
    pub fn swapped(self, swap: bool) -> ByteOrder {
        match (self, swap) {
            (order, false) => order,
            (ByteOrder::LowByteFirst, true) => ByteOrder::HighByteFirst,
            (ByteOrder::HighByteFirst, true) => ByteOrder::LowByteFirst,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChipQuirks {
    pub chip: ChipType,
    /// Polygon fill (primitive 3) exists.
    pub polygon: bool,
    /// Widest pixel transfer the bus interface accepts, in bytes.
    pub max_transfer_bytes: usize,
    /// Transfer width selected by bus width code 3.
    pub chip_defined_bytes: usize,
    /// Fixed pattern tile used by pattern fill when wrap isn't programmable.
    pub pattern_tile: WrapDescriptor,
    /// Pattern and source wrap come from multifunction registers 7 and 8.
    pub programmable_wrap: bool,
    pub mix_unit: MixUnit,
    pub transfer_order: ByteOrder,
    /// Depth of the hardware command FIFO.
    pub fifo_depth: usize,
}

impl ChipQuirks {
    pub fn new(chip: ChipType) -> Self {
        match chip {
            ChipType::S3_86C911 => ChipQuirks {
                chip,
                polygon: false,
                max_transfer_bytes: 2,
                chip_defined_bytes: 2,
                pattern_tile: WrapDescriptor::tile(8, 8),
                programmable_wrap: false,
                mix_unit: MixUnit::Mix16,
                transfer_order: ByteOrder::LowByteFirst,
                fifo_depth: 8,
            },
            ChipType::Trio64 => ChipQuirks {
                chip,
                polygon: true,
                max_transfer_bytes: 4,
                chip_defined_bytes: 4,
                pattern_tile: WrapDescriptor::tile(8, 8),
                programmable_wrap: false,
                mix_unit: MixUnit::Mix16,
                transfer_order: ByteOrder::LowByteFirst,
                fifo_depth: 8,
            },
            ChipType::Et4000W32p => ChipQuirks {
                chip,
                polygon: false,
                max_transfer_bytes: 4,
                chip_defined_bytes: 1,
                pattern_tile: WrapDescriptor::tile(8, 8),
                programmable_wrap: true,
                mix_unit: MixUnit::Rop3,
                transfer_order: ByteOrder::HighByteFirst,
                fifo_depth: 16,
            },
        }
    }

    pub fn supports(&self, kind: PrimitiveKind) -> bool {
        match kind {
            PrimitiveKind::Polygon => self.polygon,
            _ => true,
        }
    }

    /// Resolve the command register's bus width field to a transfer size in bytes.
    pub fn transfer_bytes(&self, width: BusWidth) -> usize {
        match width {
            BusWidth::Bits8 => 1,
            BusWidth::Bits16 => 2usize.min(self.max_transfer_bytes),
            BusWidth::Bits32 => 4usize.min(self.max_transfer_bytes),
            BusWidth::ChipDefined => self.chip_defined_bytes,
        }
    }
}
