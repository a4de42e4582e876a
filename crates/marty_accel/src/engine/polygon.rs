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

    engine::polygon.rs

    Polygon scan fill between two independently stepped edges.

*/

//! Each polygon command fills the trapezoid between edge 1 (programmed through CurX/CurY and
//! DestX/DestY) and edge 2 (the *2 registers). Rows are filled from edge 1 toward edge 2
//! inclusive until either edge reaches its end row. Edge state survives the command, so the
//! next command can continue one edge and restart the other.

use super::{state::AcceleratorState, PixelSite, Progress, RasterEngine};
use crate::{
    registers::{coord, WrapDescriptor},
    vram::VideoMemory,
};

#[derive(Copy, Clone, Debug)]
struct Span {
    y: i32,
    x: i32,
    end_x: i32,
    step: i32,
}

#[derive(Clone, Debug)]
pub(crate) struct PolygonOp {
    span: Option<Span>,
    /// Pattern tile and origin for the pattern variant.
    pattern: Option<(WrapDescriptor, i32, i32)>,
}

impl PolygonOp {
    pub fn new(state: &mut AcceleratorState, pattern_wrap: WrapDescriptor) -> Self {
        let end1 = (coord(state.destx_distp), coord(state.desty_axstp));
        let end2 = (coord(state.destx_distp2), coord(state.desty_axstp2));
        state.edges[0].setup(end1.0, end1.1);
        state.edges[1].setup(end2.0, end2.1);

        let pattern = if state.command().pattern_variant() {
            let (origin_x, origin_y) = state.pattern_origin();
            Some((pattern_wrap, origin_x, origin_y))
        }
        else {
            None
        };
        Self { span: None, pattern }
    }

    fn site(&self, x: i32, y: i32) -> PixelSite {
        match self.pattern {
            Some((wrap, origin_x, origin_y)) => {
                let (tx, ty) = wrap.wrap(x, y);
                PixelSite {
                    dst_x: x,
                    dst_y: y,
                    src_x: origin_x + tx,
                    src_y: origin_y + ty,
                }
            }
            None => PixelSite::at(x, y),
        }
    }

    pub fn step<M: VideoMemory>(&mut self, engine: &mut RasterEngine<M>) -> Progress {
        loop {
            let mut span = match self.span {
                Some(span) => span,
                None => {
                    let [left, right] = engine.state.edges;
                    if !(left.active() && right.active()) {
                        return Progress::Done;
                    }
                    let (x, end_x) = (left.column(), right.column());
                    Span {
                        y: left.y,
                        x,
                        end_x,
                        step: if end_x >= x { 1 } else { -1 },
                    }
                }
            };

            if !engine.can_continue() {
                self.span = Some(span);
                return Progress::Stalled;
            }
            let token = engine.take_token();
            engine.plot(self.site(span.x, span.y), token);

            if span.x == span.end_x {
                engine.end_of_row();
                engine.state.edges[0].advance();
                engine.state.edges[1].advance();
                self.span = None;
            }
            else {
                span.x += span.step;
                self.span = Some(span);
            }
        }
    }

    /// The cursor follows edge 1.
    pub fn write_back(&self, state: &mut AcceleratorState) {
        let edge = state.edges[0];
        state.set_cursor(edge.column(), edge.y);
    }
}
