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

    engine::state.rs

    Register state of the drawing engine.

*/

use serde::{Deserialize, Serialize};

use crate::{
    mixer::{ClipRect, CompareMode},
    registers::*,
};

/// One edge of a polygon, in 12.20 fixed point. Edges persist between polygon commands so that
/// a shape can be filled as a chain of trapezoids, reloading only the edge that changed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonEdge {
    pub x:     i64,
    pub y:     i32,
    pub end_y: i32,
    pub slope: i64,
    /// Start or end was reprogrammed since the slope was last computed.
    pub dirty: bool,
}

impl PolygonEdge {
    pub const FRAC_BITS: u32 = 20;

    pub fn load_x(&mut self, x: i32) {
        self.x = (x as i64) << Self::FRAC_BITS;
        self.dirty = true;
    }

    pub fn load_y(&mut self, y: i32) {
        self.y = y;
        self.dirty = true;
    }

    /// Recompute the slope toward (end_x, end_y) if the edge was reprogrammed.
    pub fn setup(&mut self, end_x: i32, end_y: i32) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.end_y = end_y;
        let rows = end_y - self.y;
        self.slope = if rows > 0 {
            (((end_x as i64) << Self::FRAC_BITS) - self.x) / rows as i64
        }
        else {
            0
        };
    }

    pub fn active(&self) -> bool {
        self.y < self.end_y
    }

    pub fn column(&self) -> i32 {
        (self.x >> Self::FRAC_BITS) as i32
    }

    pub fn advance(&mut self) {
        self.x += self.slope;
        self.y += 1;
    }
}

/// The programmer-visible register set, plus polygon edge state. This is exactly what is
/// captured by a snapshot; primitives in flight keep their cursors elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AcceleratorState {
    pub cur_x: u16,
    pub cur_y: u16,
    pub desty_axstp: u16,
    pub destx_distp: u16,
    pub err_term: u16,
    pub maj_axis_pcnt: u16,
    pub cmd: u16,
    pub short_stroke: u16,
    pub bkgd_color: u32,
    pub frgd_color: u32,
    pub wrt_mask: u32,
    pub rd_mask: u32,
    pub color_cmp: u32,
    pub bkgd_mix: u16,
    pub frgd_mix: u16,
    pub multifunc_latch: u16,
    pub multifunc: [u16; 16],
    pub cur_x2: u16,
    pub cur_y2: u16,
    pub desty_axstp2: u16,
    pub destx_distp2: u16,
    pub edges: [PolygonEdge; 2],
}

fn set_lane16(reg: &mut u16, lane: usize, byte: u8) {
    if lane > 1 {
        return;
    }
    let shift = lane * 8;
    *reg = (*reg & !(0xFF << shift)) | ((byte as u16) << shift);
}

fn set_lane32(reg: &mut u32, lane: usize, byte: u8) {
    if lane > 3 {
        return;
    }
    let shift = lane * 8;
    *reg = (*reg & !(0xFF << shift)) | ((byte as u32) << shift);
}

impl AcceleratorState {
    fn reg16_mut(&mut self, reg: RegisterId) -> Option<&mut u16> {
        match reg {
            RegisterId::CurY => Some(&mut self.cur_y),
            RegisterId::CurX => Some(&mut self.cur_x),
            RegisterId::DestYAxStp => Some(&mut self.desty_axstp),
            RegisterId::DestXDiaStp => Some(&mut self.destx_distp),
            RegisterId::ErrTerm => Some(&mut self.err_term),
            RegisterId::MajAxisPcnt => Some(&mut self.maj_axis_pcnt),
            RegisterId::Command => Some(&mut self.cmd),
            RegisterId::ShortStroke => Some(&mut self.short_stroke),
            RegisterId::BkgdMix => Some(&mut self.bkgd_mix),
            RegisterId::FrgdMix => Some(&mut self.frgd_mix),
            RegisterId::MultiFunc => Some(&mut self.multifunc_latch),
            RegisterId::CurY2 => Some(&mut self.cur_y2),
            RegisterId::CurX2 => Some(&mut self.cur_x2),
            RegisterId::DestYAxStp2 => Some(&mut self.desty_axstp2),
            RegisterId::DestXDiaStp2 => Some(&mut self.destx_distp2),
            _ => None,
        }
    }

    fn reg32_mut(&mut self, reg: RegisterId) -> Option<&mut u32> {
        match reg {
            RegisterId::BkgdColor => Some(&mut self.bkgd_color),
            RegisterId::FrgdColor => Some(&mut self.frgd_color),
            RegisterId::WrtMask => Some(&mut self.wrt_mask),
            RegisterId::RdMask => Some(&mut self.rd_mask),
            RegisterId::ColorCmp => Some(&mut self.color_cmp),
            _ => None,
        }
    }

    /// Store one byte lane of a register.
    pub fn set_lane(&mut self, reg: RegisterId, lane: usize, byte: u8) {
        if let Some(r) = self.reg16_mut(reg) {
            set_lane16(r, lane, byte);
        }
        else if let Some(r) = self.reg32_mut(reg) {
            set_lane32(r, lane, byte);
        }
    }

    /// Register value as seen by a read.
    pub fn register(&self, reg: RegisterId) -> u32 {
        match reg {
            RegisterId::CurY => self.cur_y as u32,
            RegisterId::CurX => self.cur_x as u32,
            RegisterId::DestYAxStp => self.desty_axstp as u32,
            RegisterId::DestXDiaStp => self.destx_distp as u32,
            RegisterId::ErrTerm => self.err_term as u32,
            RegisterId::MajAxisPcnt => self.maj_axis_pcnt as u32,
            RegisterId::Command => self.cmd as u32,
            RegisterId::ShortStroke => self.short_stroke as u32,
            RegisterId::BkgdColor => self.bkgd_color,
            RegisterId::FrgdColor => self.frgd_color,
            RegisterId::WrtMask => self.wrt_mask,
            RegisterId::RdMask => self.rd_mask,
            RegisterId::ColorCmp => self.color_cmp,
            RegisterId::BkgdMix => self.bkgd_mix as u32,
            RegisterId::FrgdMix => self.frgd_mix as u32,
            RegisterId::MultiFunc => {
                let index = (self.multifunc[MF_READ_SEL] & 0x0F) as usize;
                ((index as u32) << 12) | self.multifunc[index] as u32
            }
            RegisterId::CurY2 => self.cur_y2 as u32,
            RegisterId::CurX2 => self.cur_x2 as u32,
            RegisterId::DestYAxStp2 => self.desty_axstp2 as u32,
            RegisterId::DestXDiaStp2 => self.destx_distp2 as u32,
            RegisterId::SubsystemControl | RegisterId::AdvFuncControl | RegisterId::PixTrans => 0,
        }
    }

    /// Commit the multifunction latch to the register selected by its index field.
    pub fn commit_multifunc(&mut self) {
        let index = (self.multifunc_latch >> 12) as usize;
        self.multifunc[index] = self.multifunc_latch & 0x0FFF;
    }

    pub fn command(&self) -> CommandRegister {
        CommandRegister::from_u16(self.cmd)
    }

    pub fn fg_mix(&self) -> MixRegister {
        MixRegister::from_u16(self.frgd_mix)
    }

    pub fn bg_mix(&self) -> MixRegister {
        MixRegister::from_u16(self.bkgd_mix)
    }

    pub fn pix_cntl(&self) -> PixelControl {
        PixelControl::from_u16(self.multifunc[MF_PIX_CNTL])
    }

    pub fn compare_mode(&self) -> CompareMode {
        CompareMode::from_misc(self.multifunc[MF_MULT_MISC])
    }

    pub fn clip(&self) -> ClipRect {
        ClipRect {
            left:   (self.multifunc[MF_SCISSORS_L] & 0x0FFF) as i32,
            top:    (self.multifunc[MF_SCISSORS_T] & 0x0FFF) as i32,
            right:  (self.multifunc[MF_SCISSORS_R] & 0x0FFF) as i32,
            bottom: (self.multifunc[MF_SCISSORS_B] & 0x0FFF) as i32,
        }
    }

    /// Pixels per row minus one.
    pub fn maj_axis_count(&self) -> i32 {
        (self.maj_axis_pcnt & 0x0FFF) as i32
    }

    /// Rows minus one.
    pub fn min_axis_count(&self) -> i32 {
        (self.multifunc[MF_MIN_AXIS_PCNT] & 0x0FFF) as i32
    }

    pub fn pattern_origin(&self) -> (i32, i32) {
        (
            (self.multifunc[MF_PAT_ORIGIN_X] & 0x0FFF) as i32,
            (self.multifunc[MF_PAT_ORIGIN_Y] & 0x0FFF) as i32,
        )
    }

    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.cur_x = (x as u16) & 0x1FFF;
        self.cur_y = (y as u16) & 0x1FFF;
    }

    pub fn set_dest(&mut self, x: i32, y: i32) {
        self.destx_distp = (x as u16) & 0x1FFF;
        self.desty_axstp = (y as u16) & 0x1FFF;
    }
}
