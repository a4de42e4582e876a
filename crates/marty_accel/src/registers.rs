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

    registers.rs

    Accelerator register identifiers, bitfields and address decode.

*/

//! The drawing engine's registers follow the 8514/A-derived layout used by S3: each register
//! sits at a fixed I/O port in the xxE8h group, and the same table is reused for memory-mapped
//! access. Addresses are decoded once, at the dispatch boundary, into a [RegisterTarget].

use fxhash::FxHashMap;
use modular_bitfield::prelude::*;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::quirks::ChipQuirks;

pub const MF_MIN_AXIS_PCNT: usize = 0x0;
pub const MF_SCISSORS_T: usize = 0x1;
pub const MF_SCISSORS_L: usize = 0x2;
pub const MF_SCISSORS_B: usize = 0x3;
pub const MF_SCISSORS_R: usize = 0x4;
pub const MF_PAT_ORIGIN_X: usize = 0x5;
pub const MF_PAT_ORIGIN_Y: usize = 0x6;
pub const MF_PAT_WRAP: usize = 0x7;
pub const MF_SRC_WRAP: usize = 0x8;
pub const MF_PIX_CNTL: usize = 0xA;
pub const MF_FG_ROP3: usize = 0xB;
pub const MF_BG_ROP3: usize = 0xC;
pub const MF_MULT_MISC: usize = 0xE;
pub const MF_READ_SEL: usize = 0xF;

/// Memory-mapped offsets below this address are pixel transfer writes.
pub const MMIO_REGISTER_BASE: u32 = 0x8000;

pub const GP_STAT_READ_DATA: u16 = 0x0100;
pub const GP_STAT_BUSY: u16 = 0x0200;
pub const GP_STAT_FIFO_EMPTY: u16 = 0x0400;

/// Subsystem control bits 14-15 value that resets the drawing engine.
pub const SUBSYS_RESET: u16 = 0b10;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RegisterId {
    SubsystemControl,
    AdvFuncControl,
    CurY,
    CurX,
    DestYAxStp,
    DestXDiaStp,
    ErrTerm,
    MajAxisPcnt,
    Command,
    ShortStroke,
    BkgdColor,
    FrgdColor,
    WrtMask,
    RdMask,
    ColorCmp,
    BkgdMix,
    FrgdMix,
    MultiFunc,
    PixTrans,
    CurY2,
    CurX2,
    DestYAxStp2,
    DestXDiaStp2,
}

impl RegisterId {
    pub fn base_port(&self) -> u16 {
        match self {
            RegisterId::SubsystemControl => 0x42E8,
            RegisterId::AdvFuncControl => 0x4AE8,
            RegisterId::CurY => 0x82E8,
            RegisterId::CurX => 0x86E8,
            RegisterId::DestYAxStp => 0x8AE8,
            RegisterId::DestXDiaStp => 0x8EE8,
            RegisterId::ErrTerm => 0x92E8,
            RegisterId::MajAxisPcnt => 0x96E8,
            RegisterId::Command => 0x9AE8,
            RegisterId::ShortStroke => 0x9EE8,
            RegisterId::BkgdColor => 0xA2E8,
            RegisterId::FrgdColor => 0xA6E8,
            RegisterId::WrtMask => 0xAAE8,
            RegisterId::RdMask => 0xAEE8,
            RegisterId::ColorCmp => 0xB2E8,
            RegisterId::BkgdMix => 0xB6E8,
            RegisterId::FrgdMix => 0xBAE8,
            RegisterId::MultiFunc => 0xBEE8,
            RegisterId::PixTrans => 0xE2E8,
            RegisterId::CurY2 => 0x82EA,
            RegisterId::CurX2 => 0x86EA,
            RegisterId::DestYAxStp2 => 0x8AEA,
            RegisterId::DestXDiaStp2 => 0x8EEA,
        }
    }

    /// Number of byte lanes the register occupies.
    pub fn lanes(&self) -> u8 {
        match self {
            RegisterId::BkgdColor
            | RegisterId::FrgdColor
            | RegisterId::WrtMask
            | RegisterId::RdMask
            | RegisterId::ColorCmp
            | RegisterId::PixTrans => 4,
            _ => 2,
        }
    }

    /// Registers serviced immediately by the register file rather than through the queue.
    pub fn is_fast_path(&self) -> bool {
        matches!(self, RegisterId::SubsystemControl | RegisterId::AdvFuncControl)
    }

    pub fn is_polygon_edge(&self) -> bool {
        matches!(
            self,
            RegisterId::CurY2 | RegisterId::CurX2 | RegisterId::DestYAxStp2 | RegisterId::DestXDiaStp2
        )
    }
}

/// A decoded register address: the register and the byte lane within it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterTarget {
    pub reg:  RegisterId,
    pub lane: u8,
}

impl RegisterTarget {
    pub fn new(reg: RegisterId, lane: u8) -> Self {
        Self { reg, lane }
    }
}

/// Port and MMIO address decode table, built once for a given chip.
pub struct RegisterMap {
    ports: FxHashMap<u16, RegisterTarget>,
}

impl RegisterMap {
    pub fn new(quirks: &ChipQuirks) -> Self {
        let mut ports = FxHashMap::default();
        for reg in RegisterId::iter() {
            if reg.is_polygon_edge() && !quirks.polygon {
                continue;
            }
            for lane in 0..reg.lanes() {
                ports.insert(reg.base_port() + lane as u16, RegisterTarget::new(reg, lane));
            }
        }
        Self { ports }
    }

    pub fn decode_port(&self, port: u16) -> Option<RegisterTarget> {
        self.ports.get(&port).copied()
    }

    pub fn decode_mmio(&self, offset: u32) -> Option<RegisterTarget> {
        if offset < MMIO_REGISTER_BASE {
            Some(RegisterTarget::new(RegisterId::PixTrans, (offset & 0x03) as u8))
        }
        else {
            self.decode_port((offset & 0xFFFF) as u16)
        }
    }

    pub fn port_list(&self) -> Vec<(String, u16)> {
        let mut list: Vec<(String, u16)> = self
            .ports
            .iter()
            .map(|(port, target)| (format!("{} [{}]", target.reg, target.lane), *port))
            .collect();
        list.sort_by_key(|(_, port)| *port);
        list
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, BitfieldSpecifier)]
pub enum BusWidth {
    Bits8,
    Bits16,
    Bits32,
    ChipDefined,
}

#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct CommandRegister {
    pub cpu_write: bool,
    pub across_plane: bool,
    pub last_pixel_off: bool,
    pub radial: bool,
    pub draw: bool,
    pub inc_x: bool,
    pub y_major: bool,
    pub inc_y: bool,
    pub pcdata: bool,
    #[bits = 2]
    pub bus_width: BusWidth,
    pub pattern_variant: bool,
    pub byte_swap: bool,
    pub command: B3,
}

impl CommandRegister {
    pub fn from_u16(value: u16) -> Self {
        CommandRegister::from_bytes(value.to_le_bytes())
    }

    /// Radial line direction, in multiples of 45 degrees, from bits 5-7.
    pub fn radial_direction(&self) -> u8 {
        (self.inc_x() as u8) | ((self.y_major() as u8) << 1) | ((self.inc_y() as u8) << 2)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    Line,
    Rectangle,
    Polygon,
    BitBlt,
    PatternFill,
}

impl PrimitiveKind {
    /// Decode the command field. Nop, reserved codes and primitives the chip lacks yield None.
    pub fn decode(code: u8, quirks: &ChipQuirks) -> Option<PrimitiveKind> {
        let kind = match code {
            1 => PrimitiveKind::Line,
            2 => PrimitiveKind::Rectangle,
            3 => PrimitiveKind::Polygon,
            6 => PrimitiveKind::BitBlt,
            7 => PrimitiveKind::PatternFill,
            _ => return None,
        };
        quirks.supports(kind).then_some(kind)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, BitfieldSpecifier)]
pub enum MixSource {
    Background,
    Foreground,
    CpuData,
    DisplayMemory,
}

#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct MixRegister {
    pub mix: B4,
    #[skip]
    unused: B1,
    #[bits = 2]
    pub source: MixSource,
    #[skip]
    unused2: B1,
}

impl MixRegister {
    pub fn from_u16(value: u16) -> Self {
        MixRegister::from_bytes([value as u8])
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, BitfieldSpecifier)]
pub enum MixSelect {
    Foreground,
    ForegroundAlt,
    CpuData,
    DisplayMemory,
}

#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct PixelControl {
    #[skip]
    unused: B6,
    #[bits = 2]
    pub mix_select: MixSelect,
}

impl PixelControl {
    pub fn from_u16(value: u16) -> Self {
        PixelControl::from_bytes([value as u8])
    }
}

/// Tile bounds for pattern and source wrap addressing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapDescriptor {
    pub x_mask: i32,
    pub height: i32,
}

impl WrapDescriptor {
    /// A tile `width` pixels wide (a power of two) and `height` rows tall.
    pub const fn tile(width: i32, height: i32) -> Self {
        Self {
            x_mask: width - 1,
            height,
        }
    }

    /// Decode a wrap register: bits 0-2 log2 width, bits 4-6 log2 height, bit 7 disables wrap.
    pub fn from_register(value: u16) -> Option<Self> {
        if value & 0x80 != 0 {
            return None;
        }
        Some(WrapDescriptor::tile(1 << (value & 0x07), 1 << ((value >> 4) & 0x07)))
    }

    pub fn width(&self) -> i32 {
        self.x_mask + 1
    }

    /// Fold a coordinate pair into the tile.
    #[inline]
    pub fn wrap(&self, x: i32, y: i32) -> (i32, i32) {
        (x & self.x_mask, y.rem_euclid(self.height.max(1)))
    }
}

/// Sign-extend the low `bits` bits of `value`.
#[inline]
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Coordinates are 12 bits plus sign.
#[inline]
pub fn coord(value: u16) -> i32 {
    sign_extend(value as u32, 13)
}

/// Step and error terms are 13 bits plus sign.
#[inline]
pub fn step(value: u16) -> i32 {
    sign_extend(value as u32, 14)
}
