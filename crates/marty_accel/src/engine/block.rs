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

    engine::block.rs

    Rectangle fill, BitBlt and pattern fill.

*/

//! The three block primitives share one row-major stepping loop. They differ only in where the
//! source pixel comes from:
//!
//! - Rectangle fill: the source cursor is the destination cursor.
//! - BitBlt: an independent source cursor moves in lockstep with the destination, optionally
//!   folded into a source wrap tile.
//! - Pattern fill: the source is a tile at the current position, indexed by the destination
//!   coordinates so the pattern stays aligned to the screen.

use super::{state::AcceleratorState, PixelSite, Progress, RasterEngine};
use crate::{
    mixer::apply_write_mask,
    registers::{coord, WrapDescriptor},
    vram::VideoMemory,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Rectangle,
    BitBlt,
    PatternFill,
}

#[derive(Clone, Debug)]
pub(crate) struct BlockOp {
    kind: BlockKind,
    width: i32,
    rows_left: i32,
    col: i32,
    src_x: i32,
    src_y: i32,
    dst_x: i32,
    dst_y: i32,
    src_row_x: i32,
    dst_row_x: i32,
    step_x: i32,
    step_y: i32,
    /// Wrap tile and its top left corner.
    tile: Option<(WrapDescriptor, i32, i32)>,
    fast: bool,
}

impl BlockOp {
    pub fn new(kind: BlockKind, state: &AcceleratorState, wrap: Option<WrapDescriptor>, fast: bool) -> Self {
        let cmd = state.command();
        let (cx, cy) = (coord(state.cur_x), coord(state.cur_y));
        let (dx, dy) = match kind {
            BlockKind::Rectangle => (cx, cy),
            _ => (coord(state.destx_distp), coord(state.desty_axstp)),
        };
        Self {
            kind,
            width: state.maj_axis_count() + 1,
            rows_left: state.min_axis_count() + 1,
            col: 0,
            src_x: cx,
            src_y: cy,
            dst_x: dx,
            dst_y: dy,
            src_row_x: cx,
            dst_row_x: dx,
            step_x: if cmd.inc_x() { 1 } else { -1 },
            step_y: if cmd.inc_y() { 1 } else { -1 },
            tile: wrap.map(|w| (w, cx, cy)),
            fast,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            BlockKind::Rectangle => "rectangle fill",
            BlockKind::BitBlt => "bitblt",
            BlockKind::PatternFill => "pattern fill",
        }
    }

    fn site(&self) -> PixelSite {
        let (src_x, src_y) = match (self.kind, self.tile) {
            (BlockKind::PatternFill, Some((wrap, base_x, base_y))) => {
                let (tx, ty) = wrap.wrap(self.dst_x, self.dst_y);
                (base_x + tx, base_y + ty)
            }
            (_, Some((wrap, base_x, base_y))) => {
                let (tx, ty) = wrap.wrap(self.src_x - base_x, self.src_y - base_y);
                (base_x + tx, base_y + ty)
            }
            (_, None) => (self.src_x, self.src_y),
        };
        PixelSite {
            dst_x: self.dst_x,
            dst_y: self.dst_y,
            src_x,
            src_y,
        }
    }

    /// Move to the next pixel. Returns (row finished, last row finished).
    fn advance(&mut self) -> (bool, bool) {
        self.col += 1;
        self.src_x += self.step_x;
        self.dst_x += self.step_x;
        if self.col < self.width {
            return (false, false);
        }
        self.col = 0;
        self.rows_left -= 1;
        self.src_x = self.src_row_x;
        self.dst_x = self.dst_row_x;
        self.src_y += self.step_y;
        self.dst_y += self.step_y;
        (true, self.rows_left == 0)
    }

    pub fn step<M: VideoMemory>(&mut self, engine: &mut RasterEngine<M>) -> Progress {
        if self.fast {
            return self.copy(engine);
        }
        loop {
            if !engine.can_continue() {
                return Progress::Stalled;
            }
            let token = engine.take_token();
            engine.plot(self.site(), token);

            let (row_done, finished) = self.advance();
            if row_done {
                engine.end_of_row();
            }
            if finished {
                return Progress::Done;
            }
        }
    }

    /// Straight copy for a free-running BitBlt whose foreground mix is source replaces
    /// destination. Produces exactly what the general path would.
    fn copy<M: VideoMemory>(&mut self, engine: &mut RasterEngine<M>) -> Progress {
        let clip = engine.state.clip();
        let depth_mask = engine.geometry.depth.mask();
        let write_mask = engine.state.wrt_mask & depth_mask;
        engine.stats.fast_blits += 1;

        loop {
            let site = self.site();
            if clip.contains(site.dst_x, site.dst_y) {
                let src = engine.read_pixel(site.src_x, site.src_y) & depth_mask;
                let out = if write_mask == depth_mask {
                    src
                }
                else {
                    apply_write_mask(src, engine.read_pixel(site.dst_x, site.dst_y), write_mask) & depth_mask
                };
                engine.write_pixel(site.dst_x, site.dst_y, out);
                engine.stats.pixels_written += 1;
            }
            else {
                engine.stats.pixels_clipped += 1;
            }

            if let (_, true) = self.advance() {
                return Progress::Done;
            }
        }
    }

    /// Cursors are left at the start of the row following the last one drawn.
    pub fn write_back(&self, state: &mut AcceleratorState) {
        state.set_cursor(self.src_x, self.src_y);
        if self.kind != BlockKind::Rectangle {
            state.set_dest(self.dst_x, self.dst_y);
        }
    }
}
