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

    mixer.rs

    Raster operation unit: mix functions, masks, color compare and clipping.

*/

//! The mixer combines a destination pixel with a source pixel (and on ROP3-capable chips, a
//! pattern pixel) to produce the value written back to video memory. All functions here are
//! pure and operate on up to 32 bits at a time, so one call handles a whole pixel at any depth.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, FromRepr};

/// The sixteen logical mix functions selectable in the background and foreground mix registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumIter, FromRepr)]
#[repr(u8)]
pub enum Mix {
    NotDst = 0x0,
    Zero = 0x1,
    One = 0x2,
    Dst = 0x3,
    NotSrc = 0x4,
    SrcXorDst = 0x5,
    NotSrcXorDst = 0x6,
    Src = 0x7,
    SrcNandDst = 0x8,
    NotSrcOrDst = 0x9,
    SrcOrNotDst = 0xA,
    SrcOrDst = 0xB,
    SrcAndDst = 0xC,
    SrcAndNotDst = 0xD,
    NotSrcAndDst = 0xE,
    SrcNorDst = 0xF,
}

impl Mix {
    /// Decode the low four bits of a mix register.
    pub fn from_bits(bits: u8) -> Mix {
        // All 16 values are covered, so this can't fail.
        Mix::from_repr(bits & 0x0F).unwrap_or(Mix::Src)
    }

    #[inline]
    pub fn apply(self, dst: u32, src: u32) -> u32 {
        match self {
            Mix::NotDst => !dst,
            Mix::Zero => 0,
            Mix::One => !0,
            Mix::Dst => dst,
            Mix::NotSrc => !src,
            Mix::SrcXorDst => src ^ dst,
            Mix::NotSrcXorDst => !(src ^ dst),
            Mix::Src => src,
            Mix::SrcNandDst => !(src & dst),
            Mix::NotSrcOrDst => !src | dst,
            Mix::SrcOrNotDst => src | !dst,
            Mix::SrcOrDst => src | dst,
            Mix::SrcAndDst => src & dst,
            Mix::SrcAndNotDst => src & !dst,
            Mix::NotSrcAndDst => !src & dst,
            Mix::SrcNorDst => !(src | dst),
        }
    }

    /// The equivalent three-operand ROP code. The pattern operand is a don't-care.
    pub fn to_rop3(self) -> u8 {
        self.apply(ROP3_DST as u32, ROP3_SRC as u32) as u8
    }
}

/// ROP3 operand signatures. Evaluating a boolean function over these yields its ROP3 code.
pub const ROP3_DST: u8 = 0xAA;
pub const ROP3_SRC: u8 = 0xCC;
pub const ROP3_PAT: u8 = 0xF0;

/// Which combination unit a chip carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MixUnit {
    /// Sixteen two-operand mixes selected by the mix registers.
    Mix16,
    /// 256 three-operand raster operations selected by the ROP3 multifunction registers.
    Rop3,
}

/// Combine destination, source and pattern with one of the sixteen mixes. The pattern operand
/// takes no part in any of the sixteen functions.
#[inline]
pub fn mix(mode: Mix, dst: u32, src: u32, _pat: u32) -> u32 {
    mode.apply(dst, src)
}

/// Combine destination, source and pattern with an 8-bit raster operation code. Bit
/// `(p << 2) | (s << 1) | d` of the code gives the output for that input combination.
pub fn rop3(rop: u8, dst: u32, src: u32, pat: u32) -> u32 {
    let mut out = 0;
    for term in 0..8 {
        if rop & (1 << term) == 0 {
            continue;
        }
        let d = if term & 0x01 != 0 { dst } else { !dst };
        let s = if term & 0x02 != 0 { src } else { !src };
        let p = if term & 0x04 != 0 { pat } else { !pat };
        out |= d & s & p;
    }
    out
}

/// Bits set in `mask` come from the mix result, the rest keep the original destination.
#[inline]
pub fn apply_write_mask(result: u32, dst: u32, mask: u32) -> u32 {
    (result & mask) | (dst & !mask)
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareMode {
    #[default]
    Disabled,
    SkipIfEqual,
    SkipIfNotEqual,
}

impl CompareMode {
    /// Decode bits 7-8 of the miscellaneous multifunction register.
    pub fn from_misc(misc: u16) -> CompareMode {
        match (misc >> 7) & 0x03 {
            0b10 => CompareMode::SkipIfEqual,
            0b11 => CompareMode::SkipIfNotEqual,
            _ => CompareMode::Disabled,
        }
    }

    /// Returns true if a pixel with the given source color must not be written. Only the bits
    /// enabled in `rd_mask` take part in the comparison.
    #[inline]
    pub fn skips(self, src: u32, compare: u32, rd_mask: u32) -> bool {
        let equal = (src & rd_mask) == (compare & rd_mask);
        match self {
            CompareMode::Disabled => false,
            CompareMode::SkipIfEqual => equal,
            CompareMode::SkipIfNotEqual => !equal,
        }
    }
}

/// Inclusive destination clip rectangle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipRect {
    pub left:   i32,
    pub top:    i32,
    pub right:  i32,
    pub bottom: i32,
}

impl ClipRect {
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}
