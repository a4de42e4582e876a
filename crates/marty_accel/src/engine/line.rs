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

    engine::line.rs

    Bresenham, radial and short-stroke line drawing.

*/

use super::{state::AcceleratorState, PixelSite, Progress, RasterEngine};
use crate::{
    registers::{coord, step},
    vram::VideoMemory,
};

/// Radial line steps, indexed by direction in multiples of 45 degrees counterclockwise from +X.
/// Screen Y grows downward.
const RADIAL_STEPS: [(i32, i32); 8] = [(1, 0), (1, -1), (0, -1), (-1, -1), (-1, 0), (-1, 1), (0, 1), (1, 1)];

#[derive(Clone, Debug)]
pub(crate) struct LineOp {
    x: i32,
    y: i32,
    err: i32,
    /// Steps left after the current pixel.
    remaining: i32,
    maj_count: i32,
    axial_step: i32,
    diagonal_step: i32,
    step_x: i32,
    step_y: i32,
    y_major: bool,
    radial: bool,
    last_pixel_off: bool,
}

impl LineOp {
    pub fn new(state: &AcceleratorState) -> Self {
        let cmd = state.command();
        let (step_x, step_y) = if cmd.radial() {
            RADIAL_STEPS[cmd.radial_direction() as usize]
        }
        else {
            (
                if cmd.inc_x() { 1 } else { -1 },
                if cmd.inc_y() { 1 } else { -1 },
            )
        };
        let (x, y) = (coord(state.cur_x), coord(state.cur_y));
        Self {
            x,
            y,
            err: step(state.err_term),
            remaining: state.maj_axis_count(),
            maj_count: state.maj_axis_count(),
            axial_step: step(state.desty_axstp),
            diagonal_step: step(state.destx_distp),
            step_x,
            step_y,
            y_major: cmd.y_major(),
            radial: cmd.radial(),
            last_pixel_off: cmd.last_pixel_off(),
        }
    }

    /// A short-stroke vector: bits 0-3 length, bits 5-7 radial direction.
    pub fn short_stroke(state: &AcceleratorState, stroke: u8, last_pixel_off: bool) -> Self {
        let (step_x, step_y) = RADIAL_STEPS[(stroke >> 5) as usize];
        let length = (stroke & 0x0F) as i32;
        Self {
            x: coord(state.cur_x),
            y: coord(state.cur_y),
            err: 0,
            remaining: length,
            maj_count: length,
            axial_step: 0,
            diagonal_step: 0,
            step_x,
            step_y,
            y_major: false,
            radial: true,
            last_pixel_off,
        }
    }

    pub fn step<M: VideoMemory>(&mut self, engine: &mut RasterEngine<M>) -> Progress {
        loop {
            if !engine.can_continue() {
                return Progress::Stalled;
            }
            let token = engine.take_token();
            if !(self.last_pixel_off && self.remaining == 0) {
                engine.plot(PixelSite::at(self.x, self.y), token);
            }
            if self.remaining == 0 {
                return Progress::Done;
            }
            self.remaining -= 1;
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.radial {
            self.x += self.step_x;
            self.y += self.step_y;
            return;
        }

        // The minor axis steps whenever the error term has reached the major axis count.
        let minor = self.err >= self.maj_count;
        if minor {
            self.err += self.diagonal_step;
        }
        else {
            self.err += self.axial_step;
        }

        if self.y_major {
            self.y += self.step_y;
            if minor {
                self.x += self.step_x;
            }
        }
        else {
            self.x += self.step_x;
            if minor {
                self.y += self.step_y;
            }
        }
    }

    /// The cursor is left on the final pixel.
    pub fn write_back(&self, state: &mut AcceleratorState) {
        state.set_cursor(self.x, self.y);
        if !self.radial {
            state.err_term = (self.err as u16) & 0x3FFF;
        }
    }
}
