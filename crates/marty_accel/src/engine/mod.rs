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

    engine::mod.rs

    The raster engine: a resumable interpreter for drawing primitives.

*/

//! The raster engine owns the accelerator's register state and video memory, and executes
//! drawing primitives through the mixer.
//!
//! A primitive is triggered by a write to the high byte of the command register. Primitives that
//! involve no CPU data run to completion immediately. Primitives fed by (or read back to) the
//! CPU are held as a resumable [Primitive] value: the engine runs as many pixels as the current
//! transfer chunk covers, then parks in [Phase::AwaitingData] or [Phase::AwaitingRead] until
//! the next pixel transfer access. The primitive carries its own cursors, so the result never
//! depends on how the CPU split its transfers.

mod block;
mod line;
mod polygon;
pub mod state;
pub mod transfer;

use strum_macros::Display;

use crate::{
    config::Geometry,
    mixer::{apply_write_mask, mix, rop3, CompareMode, Mix, MixUnit},
    queue::{AccessKind, QueueEntry, ReadRequest, Width},
    quirks::{ByteOrder, ChipQuirks},
    registers::*,
    vram::VideoMemory,
};

use block::{BlockKind, BlockOp};
use line::LineOp;
use polygon::PolygonOp;
use transfer::*;

pub use state::{AcceleratorState, PolygonEdge};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum Phase {
    Idle,
    Executing,
    AwaitingData,
    AwaitingRead,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Progress {
    Done,
    Stalled,
}

/// Destination and source coordinates of one pixel operation.
#[derive(Copy, Clone, Debug)]
pub(crate) struct PixelSite {
    pub dst_x: i32,
    pub dst_y: i32,
    pub src_x: i32,
    pub src_y: i32,
}

impl PixelSite {
    /// A site whose source is the destination itself.
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            dst_x: x,
            dst_y: y,
            src_x: x,
            src_y: y,
        }
    }
}

pub(crate) enum Primitive {
    Line(LineOp),
    Block(BlockOp),
    Polygon(PolygonOp),
}

impl Primitive {
    fn step<M: VideoMemory>(&mut self, engine: &mut RasterEngine<M>) -> Progress {
        match self {
            Primitive::Line(op) => op.step(engine),
            Primitive::Block(op) => op.step(engine),
            Primitive::Polygon(op) => op.step(engine),
        }
    }

    fn write_back(&self, state: &mut AcceleratorState) {
        match self {
            Primitive::Line(op) => op.write_back(state),
            Primitive::Block(op) => op.write_back(state),
            Primitive::Polygon(op) => op.write_back(state),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Primitive::Line(_) => "line",
            Primitive::Block(op) => op.name(),
            Primitive::Polygon(_) => "polygon",
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct EngineStats {
    pub entries: u64,
    pub started: u64,
    pub completed: u64,
    pub aborted: u64,
    pub short_strokes: u64,
    pub fast_blits: u64,
    pub pixels_written: u64,
    pub pixels_compared_out: u64,
    pub pixels_clipped: u64,
    pub transfer_bytes: u64,
    pub transfer_bytes_dropped: u64,
}

pub struct RasterEngine<M: VideoMemory> {
    mem: M,
    quirks: ChipQuirks,
    geometry: Geometry,
    state: AcceleratorState,
    phase: Phase,
    primitive: Option<Primitive>,
    feed: FeedMode,
    chunk_bytes: usize,
    transfer_order: ByteOrder,
    draw: bool,
    staging: ChunkBuffer,
    tokens: TokenQueue,
    readback: ReadbackBuffer,
    stats: EngineStats,
}

impl<M: VideoMemory> RasterEngine<M> {
    pub fn new(mem: M, quirks: ChipQuirks, geometry: Geometry) -> Self {
        Self {
            mem,
            quirks,
            geometry,
            state: AcceleratorState::default(),
            phase: Phase::Idle,
            primitive: None,
            feed: FeedMode::Free,
            chunk_bytes: 1,
            transfer_order: quirks.transfer_order,
            draw: false,
            staging: ChunkBuffer::new(),
            tokens: TokenQueue::new(),
            readback: ReadbackBuffer::new(),
            stats: EngineStats::default(),
        }
    }

    pub fn mem(&self) -> &M {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    pub fn state(&self) -> &AcceleratorState {
        &self.state
    }

    pub fn quirks(&self) -> &ChipQuirks {
        &self.quirks
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// A primitive has been triggered and has not yet finished.
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Readback data is buffered or can be produced on demand.
    pub fn data_available(&self) -> bool {
        !self.readback.is_empty() || self.phase == Phase::AwaitingRead
    }

    pub fn configure(&mut self, geometry: Geometry) {
        log::debug!("surface geometry changed: {:?}", geometry);
        self.geometry = geometry;
    }

    /// Zero all registers and drop any primitive in flight. Video memory is untouched.
    pub fn reset(&mut self) {
        if self.primitive.is_some() {
            log::debug!("reset discarded in-flight primitive");
        }
        self.clear_transient();
        self.state = AcceleratorState::default();
    }

    pub fn snapshot(&self) -> AcceleratorState {
        self.state.clone()
    }

    /// Restore saved register state. The engine is left idle.
    pub fn restore(&mut self, state: AcceleratorState) {
        self.clear_transient();
        self.state = state;
    }

    fn clear_transient(&mut self) {
        self.primitive = None;
        self.phase = Phase::Idle;
        self.feed = FeedMode::Free;
        self.staging.clear();
        self.tokens.clear();
        self.readback.clear();
    }

    /// Apply one queue entry.
    pub fn apply(&mut self, entry: QueueEntry) {
        self.stats.entries = self.stats.entries.wrapping_add(1);
        log::trace!(
            "apply {} lane {} <- {:08X} ({:?} {:?})",
            entry.target.reg,
            entry.target.lane,
            entry.value,
            entry.kind,
            entry.width
        );

        let reg = entry.target.reg;
        if reg == RegisterId::PixTrans {
            for byte in entry.bytes() {
                self.feed_byte(byte);
            }
            return;
        }

        let lanes = reg.lanes() as usize;
        let (first_lane, value, count) = match entry.kind {
            AccessKind::Port => (entry.target.lane as usize, entry.value, entry.width.bytes()),
            AccessKind::Register => (0, entry.value & entry.width.mask(), lanes),
        };

        let mut touched = 0u8;
        for i in 0..count {
            let lane = first_lane + i;
            if lane >= lanes {
                log::trace!("write past end of {} ignored", reg);
                break;
            }
            self.state.set_lane(reg, lane, (value >> (i * 8)) as u8);
            touched |= 1 << lane;
        }
        self.commit(reg, touched);
    }

    /// Side effects of a register write, once all of its bytes have landed.
    fn commit(&mut self, reg: RegisterId, touched: u8) {
        let high_byte = touched & 0x02 != 0;
        match reg {
            RegisterId::CurX => self.state.edges[0].load_x(coord(self.state.cur_x)),
            RegisterId::CurY => self.state.edges[0].load_y(coord(self.state.cur_y)),
            RegisterId::DestXDiaStp | RegisterId::DestYAxStp => self.state.edges[0].dirty = true,
            RegisterId::CurX2 => self.state.edges[1].load_x(coord(self.state.cur_x2)),
            RegisterId::CurY2 => self.state.edges[1].load_y(coord(self.state.cur_y2)),
            RegisterId::DestXDiaStp2 | RegisterId::DestYAxStp2 => self.state.edges[1].dirty = true,
            RegisterId::MultiFunc if high_byte => self.state.commit_multifunc(),
            RegisterId::Command if high_byte => self.trigger(),
            RegisterId::ShortStroke if high_byte => self.short_stroke(),
            _ => {}
        }
    }

    pub fn read(&mut self, request: ReadRequest) -> Option<u32> {
        match request {
            ReadRequest::Register(target, width) => {
                Some((self.state.register(target.reg) >> (target.lane as u32 * 8)) & width.mask())
            }
            ReadRequest::PixelData(width) => self.read_pixel_data(width),
        }
    }

    /// Pull `width` bytes of readback data. Returns None if there is nothing to read at all;
    /// a read that runs past the end of the primitive is zero filled.
    fn read_pixel_data(&mut self, width: Width) -> Option<u32> {
        if !self.data_available() {
            return None;
        }
        let mut value = 0u32;
        for i in 0..width.bytes() {
            if self.readback.is_empty() && self.phase == Phase::AwaitingRead {
                self.run();
            }
            let byte = self.readback.pop_front().unwrap_or(0);
            value |= (byte as u32) << (i * 8);
        }
        Some(value)
    }

    fn trigger(&mut self) {
        self.abort_in_flight();

        let cmd = self.state.command();
        let Some(kind) = PrimitiveKind::decode(cmd.command(), &self.quirks)
        else {
            log::trace!("command {:04X}: no operation", self.state.cmd);
            return;
        };

        self.feed = FeedMode::select(&cmd, &self.state.fg_mix(), &self.state.bg_mix(), &self.state.pix_cntl());
        let bus_bytes = self.quirks.transfer_bytes(cmd.bus_width());
        self.chunk_bytes = self.feed.chunk_bytes(bus_bytes, self.geometry.depth.bytes());
        self.transfer_order = self.quirks.transfer_order.swapped(cmd.byte_swap());
        self.draw = cmd.draw();

        let primitive = match kind {
            PrimitiveKind::Line => Primitive::Line(LineOp::new(&self.state)),
            PrimitiveKind::Rectangle => {
                Primitive::Block(BlockOp::new(BlockKind::Rectangle, &self.state, None, false))
            }
            PrimitiveKind::BitBlt => {
                let fast = self.fast_path_eligible();
                Primitive::Block(BlockOp::new(BlockKind::BitBlt, &self.state, self.source_wrap(), fast))
            }
            PrimitiveKind::PatternFill => Primitive::Block(BlockOp::new(
                BlockKind::PatternFill,
                &self.state,
                Some(self.pattern_wrap()),
                false,
            )),
            PrimitiveKind::Polygon => {
                let wrap = self.pattern_wrap();
                Primitive::Polygon(PolygonOp::new(&mut self.state, wrap))
            }
        };

        log::debug!(
            "starting {} ({:?}, {} byte chunks)",
            primitive.name(),
            self.feed,
            self.chunk_bytes
        );
        self.stats.started += 1;
        self.primitive = Some(primitive);
        self.run();
    }

    fn short_stroke(&mut self) {
        self.abort_in_flight();

        let cmd = self.state.command();
        let [lo, hi] = self.state.short_stroke.to_le_bytes();
        let strokes = if cmd.byte_swap() { [lo, hi] } else { [hi, lo] };

        self.feed = FeedMode::Free;
        for stroke in strokes {
            self.draw = stroke & 0x10 != 0;
            let mut op = LineOp::short_stroke(&self.state, stroke, cmd.last_pixel_off());
            // Free running, so this always completes.
            op.step(self);
            op.write_back(&mut self.state);
        }
        self.stats.short_strokes += 2;
    }

    fn abort_in_flight(&mut self) {
        if let Some(primitive) = self.primitive.take() {
            log::debug!("{} aborted by new command in phase {}", primitive.name(), self.phase);
            self.stats.aborted += 1;
        }
        self.clear_transient();
    }

    fn fast_path_eligible(&self) -> bool {
        let fg = self.state.fg_mix();
        self.feed == FeedMode::Free
            && self.draw
            && self.quirks.mix_unit == MixUnit::Mix16
            && fg.source() == MixSource::DisplayMemory
            && Mix::from_bits(fg.mix()) == Mix::Src
            && matches!(
                self.state.pix_cntl().mix_select(),
                MixSelect::Foreground | MixSelect::ForegroundAlt
            )
            && self.state.compare_mode() == CompareMode::Disabled
    }

    /// Run the current primitive until it completes or runs out of CPU data.
    fn run(&mut self) {
        let Some(mut primitive) = self.primitive.take()
        else {
            return;
        };

        self.phase = Phase::Executing;
        match primitive.step(self) {
            Progress::Done => {
                primitive.write_back(&mut self.state);
                if self.feed == FeedMode::Readback {
                    self.pad_readback();
                }
                self.tokens.clear();
                self.phase = Phase::Idle;
                self.stats.completed += 1;
                log::debug!("{} complete", primitive.name());
            }
            Progress::Stalled => {
                log::trace!("{} waiting on pixel transfer", primitive.name());
                self.phase = if self.feed == FeedMode::Readback {
                    Phase::AwaitingRead
                }
                else {
                    Phase::AwaitingData
                };
                self.primitive = Some(primitive);
            }
        }
    }

    fn feed_byte(&mut self, byte: u8) {
        self.stats.transfer_bytes += 1;
        if self.phase != Phase::AwaitingData {
            self.stats.transfer_bytes_dropped += 1;
            log::warn!("pixel transfer byte {:02X} with no primitive awaiting data", byte);
            return;
        }

        if self.staging.push_back(byte).is_err() {
            log::warn!("pixel transfer staging overflow");
        }
        if self.staging.len() >= self.chunk_bytes {
            let mut chunk = [0u8; MAX_CHUNK];
            let mut len = 0;
            while let Some(b) = self.staging.pop_front() {
                chunk[len] = b;
                len += 1;
            }
            decode_chunk(
                self.feed,
                &chunk[..len],
                self.transfer_order,
                self.geometry.depth.bytes(),
                &mut self.tokens,
            );
            self.run();
        }
    }

    /// Whether the running primitive may process another pixel.
    pub(crate) fn can_continue(&self) -> bool {
        match self.feed {
            FeedMode::Free => true,
            FeedMode::CpuColor | FeedMode::CpuMono => !self.tokens.is_empty(),
            FeedMode::Readback => self.readback.is_empty(),
        }
    }

    pub(crate) fn take_token(&mut self) -> Option<Token> {
        if self.feed.is_cpu_source() {
            self.tokens.pop_front()
        }
        else {
            None
        }
    }

    /// Rows of a block primitive start on a fresh transfer chunk. Leftover CPU data is row
    /// padding, and a partial readback chunk is zero filled.
    pub(crate) fn end_of_row(&mut self) {
        match self.feed {
            FeedMode::CpuColor | FeedMode::CpuMono => self.tokens.clear(),
            FeedMode::Readback => self.pad_readback(),
            FeedMode::Free => {}
        }
    }

    fn pad_readback(&mut self) {
        if self.staging.is_empty() {
            return;
        }
        while self.staging.len() < self.chunk_bytes {
            if self.staging.push_back(0).is_err() {
                break;
            }
        }
        flush_readback(&mut self.staging, self.transfer_order, &mut self.readback);
    }

    fn stage_readback(&mut self, value: u32) {
        for i in 0..self.geometry.depth.bytes() {
            if self.staging.push_back((value >> (i * 8)) as u8).is_err() {
                log::warn!("readback staging overflow");
            }
        }
        if self.staging.len() >= self.chunk_bytes {
            flush_readback(&mut self.staging, self.transfer_order, &mut self.readback);
        }
    }

    #[inline]
    pub(crate) fn read_pixel(&self, x: i32, y: i32) -> u32 {
        self.mem.read_pixel(self.geometry.address(x, y), self.geometry.depth.bytes())
    }

    #[inline]
    pub(crate) fn write_pixel(&mut self, x: i32, y: i32, data: u32) {
        let address = self.geometry.address(x, y);
        self.mem.write_pixel(address, self.geometry.depth.bytes(), data);
    }

    /// Pattern tile used by pattern fill, polygon pattern fill and the ROP3 pattern operand.
    pub(crate) fn pattern_wrap(&self) -> WrapDescriptor {
        if self.quirks.programmable_wrap {
            WrapDescriptor::from_register(self.state.multifunc[MF_PAT_WRAP]).unwrap_or(self.quirks.pattern_tile)
        }
        else {
            self.quirks.pattern_tile
        }
    }

    /// Optional BitBlt source wrap.
    pub(crate) fn source_wrap(&self) -> Option<WrapDescriptor> {
        if self.quirks.programmable_wrap {
            WrapDescriptor::from_register(self.state.multifunc[MF_SRC_WRAP])
        }
        else {
            None
        }
    }

    /// ROP3 pattern operand for a destination pixel, phase aligned to the destination.
    fn pattern_pixel(&self, x: i32, y: i32) -> u32 {
        let (origin_x, origin_y) = self.state.pattern_origin();
        let (tx, ty) = self.pattern_wrap().wrap(x, y);
        self.read_pixel(origin_x + tx, origin_y + ty)
    }

    /// Run one pixel through the mixer.
    pub(crate) fn plot(&mut self, site: PixelSite, token: Option<Token>) {
        let depth_mask = self.geometry.depth.mask();
        let rd_mask = self.state.rd_mask & depth_mask;

        let use_fg = match token {
            Some(Token::Mono(bit)) => bit,
            Some(Token::Color(_)) => true,
            None => match self.state.pix_cntl().mix_select() {
                MixSelect::DisplayMemory => (self.read_pixel(site.src_x, site.src_y) & rd_mask) == rd_mask,
                _ => true,
            },
        };

        let mix_reg = if use_fg {
            self.state.fg_mix()
        }
        else {
            self.state.bg_mix()
        };
        let src = match mix_reg.source() {
            MixSource::Background => self.state.bkgd_color,
            MixSource::Foreground => self.state.frgd_color,
            MixSource::CpuData => match token {
                Some(Token::Color(color)) => color,
                _ => 0,
            },
            MixSource::DisplayMemory => self.read_pixel(site.src_x, site.src_y),
        } & depth_mask;

        let readback = self.feed == FeedMode::Readback;

        if self.state.compare_mode().skips(src, self.state.color_cmp, rd_mask) {
            self.stats.pixels_compared_out += 1;
            if readback {
                let dst = self.read_pixel(site.dst_x, site.dst_y);
                self.stage_readback(dst);
            }
            return;
        }

        if !readback && !self.state.clip().contains(site.dst_x, site.dst_y) {
            self.stats.pixels_clipped += 1;
            return;
        }

        let dst = self.read_pixel(site.dst_x, site.dst_y);
        let result = match self.quirks.mix_unit {
            MixUnit::Mix16 => mix(Mix::from_bits(mix_reg.mix()), dst, src, 0),
            MixUnit::Rop3 => {
                let index = if use_fg { MF_FG_ROP3 } else { MF_BG_ROP3 };
                let pat = self.pattern_pixel(site.dst_x, site.dst_y);
                rop3(self.state.multifunc[index] as u8, dst, src, pat)
            }
        };
        let out = apply_write_mask(result, dst, self.state.wrt_mask) & depth_mask;

        if readback {
            self.stage_readback(out);
        }
        else if self.draw {
            self.write_pixel(site.dst_x, site.dst_y, out);
            self.stats.pixels_written += 1;
        }
    }

    #[rustfmt::skip]
    pub fn get_state(&self) -> Vec<(String, String)> {
        let s = &self.state;
        let clip = s.clip();
        vec![
            ("Phase".to_string(), format!("{}", self.phase)),
            ("Primitive".to_string(), self.primitive.as_ref().map_or("none", |p| p.name()).to_string()),
            ("Feed".to_string(), format!("{:?}", self.feed)),
            ("Command".to_string(), format!("{:04X}", s.cmd)),
            ("Cursor".to_string(), format!("({}, {})", coord(s.cur_x), coord(s.cur_y))),
            ("Dest/Step".to_string(), format!("({}, {})", step(s.destx_distp), step(s.desty_axstp))),
            ("Error Term".to_string(), format!("{}", step(s.err_term))),
            ("Major Count".to_string(), format!("{}", s.maj_axis_count())),
            ("Minor Count".to_string(), format!("{}", s.min_axis_count())),
            ("Fg Color".to_string(), format!("{:08X}", s.frgd_color)),
            ("Bg Color".to_string(), format!("{:08X}", s.bkgd_color)),
            ("Fg Mix".to_string(), format!("{:02X}", s.frgd_mix)),
            ("Bg Mix".to_string(), format!("{:02X}", s.bkgd_mix)),
            ("Write Mask".to_string(), format!("{:08X}", s.wrt_mask)),
            ("Read Mask".to_string(), format!("{:08X}", s.rd_mask)),
            ("Compare".to_string(), format!("{:?} {:08X}", s.compare_mode(), s.color_cmp)),
            ("Clip".to_string(), format!("({}, {}) - ({}, {})", clip.left, clip.top, clip.right, clip.bottom)),
            ("Pixels Written".to_string(), format!("{}", self.stats.pixels_written)),
            ("Primitives".to_string(), format!("{} / {} / {}", self.stats.started, self.stats.completed, self.stats.aborted)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{config::PixelDepth, mixer::ROP3_SRC, quirks::ChipType, vram::Vram};

    const SIZE: i32 = 64;

    fn engine_for(chip: ChipType, depth: PixelDepth) -> RasterEngine<Vram> {
        let geometry = Geometry {
            pitch: SIZE as u32,
            depth,
            base: 0,
        };
        let vram = Vram::new((SIZE * SIZE) as usize * depth.bytes());
        let mut engine = RasterEngine::new(vram, ChipQuirks::new(chip), geometry);
        setup(&mut engine);
        engine
    }

    fn setup<M: VideoMemory>(engine: &mut RasterEngine<M>) {
        for mf in [0x1000, 0x2000, 0x3000 | (SIZE as u32 - 1), 0x4000 | (SIZE as u32 - 1)] {
            write(engine, RegisterId::MultiFunc, mf);
        }
        write(engine, RegisterId::WrtMask, 0xFFFF_FFFF);
        write(engine, RegisterId::RdMask, 0xFFFF_FFFF);
    }

    fn write<M: VideoMemory>(engine: &mut RasterEngine<M>, reg: RegisterId, value: u32) {
        engine.apply(QueueEntry::register(reg, value));
    }

    fn pixtrans<M: VideoMemory>(engine: &mut RasterEngine<M>, bytes: &[u8]) {
        for byte in bytes {
            engine.apply(QueueEntry::port(
                RegisterTarget::new(RegisterId::PixTrans, 0),
                *byte as u32,
                Width::Byte,
            ));
        }
    }

    fn pixel(engine: &RasterEngine<Vram>, x: i32, y: i32) -> u32 {
        engine.read_pixel(x, y)
    }

    fn lit(engine: &RasterEngine<Vram>) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for y in 0..SIZE {
            for x in 0..SIZE {
                if pixel(engine, x, y) != 0 {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// Program a Bresenham line from the current cursor by (dx, dy).
    fn line(engine: &mut RasterEngine<Vram>, x: i32, y: i32, dx: i32, dy: i32) {
        let (maj, min) = (dx.abs().max(dy.abs()), dx.abs().min(dy.abs()));
        let mut cmd = 0x2010;
        if dx >= 0 {
            cmd |= 0x20;
        }
        if dy.abs() > dx.abs() {
            cmd |= 0x40;
        }
        if dy >= 0 {
            cmd |= 0x80;
        }
        write(engine, RegisterId::CurX, x as u32);
        write(engine, RegisterId::CurY, y as u32);
        write(engine, RegisterId::MajAxisPcnt, maj as u32);
        write(engine, RegisterId::DestYAxStp, ((2 * min) as u32) & 0x3FFF);
        write(engine, RegisterId::DestXDiaStp, ((2 * min - 2 * maj) as u32) & 0x3FFF);
        write(engine, RegisterId::ErrTerm, ((2 * min) as u32) & 0x3FFF);
        write(engine, RegisterId::Command, cmd);
    }

    #[test]
    fn test_lines_all_octants() {
        let deltas = [
            (10, 3),
            (3, 10),
            (-3, 10),
            (-10, 3),
            (-10, -3),
            (-3, -10),
            (3, -10),
            (10, -3),
            (7, 7),
            (-9, 0),
            (0, 6),
        ];
        for (dx, dy) in deltas {
            let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
            write(&mut engine, RegisterId::FrgdColor, 0x01);
            write(&mut engine, RegisterId::FrgdMix, 0x27);
            line(&mut engine, 32, 32, dx, dy);

            let pixels = lit(&engine);
            let maj = dx.abs().max(dy.abs());
            assert_eq!(pixels.len() as i32, maj + 1, "pixel count for ({}, {})", dx, dy);
            assert!(pixels.contains(&(32, 32)));
            assert!(pixels.contains(&(32 + dx, 32 + dy)), "endpoint for ({}, {})", dx, dy);

            // One pixel per major axis position, minor axis moving by at most one.
            let y_major = dy.abs() > dx.abs();
            let mut along: Vec<(i32, i32)> = pixels
                .iter()
                .map(|(x, y)| if y_major { (*y, *x) } else { (*x, *y) })
                .collect();
            along.sort();
            for pair in along.windows(2) {
                assert_eq!(pair[1].0 - pair[0].0, 1, "gap in ({}, {})", dx, dy);
                assert!((pair[1].1 - pair[0].1).abs() <= 1, "jump in ({}, {})", dx, dy);
            }

            let state = engine.state();
            assert_eq!((coord(state.cur_x), coord(state.cur_y)), (32 + dx, 32 + dy));
            assert_eq!(engine.phase(), Phase::Idle);
        }
    }

    #[test]
    fn test_radial_line_last_pixel_off() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        write(&mut engine, RegisterId::FrgdColor, 0x01);
        write(&mut engine, RegisterId::FrgdMix, 0x27);
        write(&mut engine, RegisterId::CurX, 20);
        write(&mut engine, RegisterId::CurY, 20);
        write(&mut engine, RegisterId::MajAxisPcnt, 4);
        // Radial, direction 3 (up and to the left), last pixel off.
        write(&mut engine, RegisterId::Command, 0x2000 | 0x60 | 0x10 | 0x08 | 0x04);

        let pixels = lit(&engine);
        assert_eq!(pixels, vec![(17, 17), (18, 18), (19, 19), (20, 20)]);
        assert_eq!((coord(engine.state().cur_x), coord(engine.state().cur_y)), (16, 16));
    }

    #[test]
    fn test_zero_counts_draw_one_pixel() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        write(&mut engine, RegisterId::FrgdColor, 0x01);
        write(&mut engine, RegisterId::FrgdMix, 0x27);
        write(&mut engine, RegisterId::CurX, 5);
        write(&mut engine, RegisterId::CurY, 6);
        write(&mut engine, RegisterId::MajAxisPcnt, 0);
        write(&mut engine, RegisterId::Command, 0x40B0);
        assert_eq!(lit(&engine), vec![(5, 6)]);

        write(&mut engine, RegisterId::CurX, 9);
        write(&mut engine, RegisterId::CurY, 9);
        write(&mut engine, RegisterId::Command, 0x20B0);
        assert_eq!(lit(&engine), vec![(5, 6), (9, 9)]);
    }

    #[test]
    fn test_clip_rectangle() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        write(&mut engine, RegisterId::MultiFunc, 0x1000 | 4);
        write(&mut engine, RegisterId::MultiFunc, 0x2000 | 4);
        write(&mut engine, RegisterId::MultiFunc, 0x3000 | 7);
        write(&mut engine, RegisterId::MultiFunc, 0x4000 | 7);
        write(&mut engine, RegisterId::FrgdColor, 0x01);
        write(&mut engine, RegisterId::FrgdMix, 0x27);
        write(&mut engine, RegisterId::CurX, 2);
        write(&mut engine, RegisterId::CurY, 2);
        write(&mut engine, RegisterId::MajAxisPcnt, 9);
        write(&mut engine, RegisterId::MultiFunc, 9);
        write(&mut engine, RegisterId::Command, 0x40B0);

        let pixels = lit(&engine);
        assert_eq!(pixels.len(), 16);
        assert!(pixels.iter().all(|(x, y)| (4..=7).contains(x) && (4..=7).contains(y)));
        assert_eq!(engine.stats().pixels_clipped, 100 - 16);
    }

    fn set_clip<M: VideoMemory>(engine: &mut RasterEngine<M>, left: u32, top: u32, right: u32, bottom: u32) {
        write(engine, RegisterId::MultiFunc, 0x1000 | top);
        write(engine, RegisterId::MultiFunc, 0x2000 | left);
        write(engine, RegisterId::MultiFunc, 0x3000 | bottom);
        write(engine, RegisterId::MultiFunc, 0x4000 | right);
    }

    #[test]
    fn test_rectangle_all_directions() {
        let mut footprint = Vec::new();
        for y in 10..=11 {
            for x in 10..=13 {
                footprint.push((x, y));
            }
        }
        // (direction bits, starting corner)
        for (dir, x, y) in [(0xA0, 10, 10), (0x80, 13, 10), (0x20, 10, 11), (0x00, 13, 11)] {
            let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
            write(&mut engine, RegisterId::FrgdColor, 0x01);
            write(&mut engine, RegisterId::FrgdMix, 0x27);
            write(&mut engine, RegisterId::CurX, x);
            write(&mut engine, RegisterId::CurY, y);
            write(&mut engine, RegisterId::MajAxisPcnt, 3);
            write(&mut engine, RegisterId::MultiFunc, 1);
            write(&mut engine, RegisterId::Command, 0x4010 | dir);
            assert_eq!(lit(&engine), footprint, "direction bits {:#04X}", dir);
        }
    }

    #[test]
    fn test_overlapping_blit_right_to_left() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        for x in 0..8 {
            engine.mem_mut().as_mut_slice()[x] = x as u8 + 1;
        }
        write(&mut engine, RegisterId::FrgdMix, 0x67);
        write(&mut engine, RegisterId::CurX, 7);
        write(&mut engine, RegisterId::CurY, 0);
        write(&mut engine, RegisterId::DestXDiaStp, 9);
        write(&mut engine, RegisterId::DestYAxStp, 0);
        write(&mut engine, RegisterId::MajAxisPcnt, 7);
        write(&mut engine, RegisterId::MultiFunc, 0);
        // Decreasing X so the overlapping source is read before it is overwritten.
        write(&mut engine, RegisterId::Command, 0xC090);

        assert_eq!(&engine.mem().as_slice()[0..10], &[1, 2, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(engine.mem().as_slice()[10], 0);
    }

    #[test]
    fn test_clip_line() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        set_clip(&mut engine, 10, 10, 20, 20);
        write(&mut engine, RegisterId::FrgdColor, 0x01);
        write(&mut engine, RegisterId::FrgdMix, 0x27);
        line(&mut engine, 5, 5, 30, 12);
        line(&mut engine, 15, 0, 0, 40);
        line(&mut engine, 30, 0, -20, 20);

        let pixels = lit(&engine);
        assert!(pixels.iter().all(|(x, y)| (10..=20).contains(x) && (10..=20).contains(y)));
        for y in 10..=20 {
            assert!(pixels.contains(&(15, y)), "vertical line row {}", y);
        }
        assert!(!pixels.contains(&(15, 9)));
        assert!(engine.stats().pixels_clipped > 0);
    }

    #[test]
    fn test_clip_pattern_fill() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        for y in 0..8 {
            for x in 0..8 {
                engine.mem_mut().as_mut_slice()[(y * SIZE + x) as usize] = (y * 8 + x + 1) as u8;
            }
        }
        set_clip(&mut engine, 20, 20, 30, 30);
        write(&mut engine, RegisterId::FrgdMix, 0x67);
        write(&mut engine, RegisterId::CurX, 0);
        write(&mut engine, RegisterId::CurY, 0);
        write(&mut engine, RegisterId::DestXDiaStp, 16);
        write(&mut engine, RegisterId::DestYAxStp, 16);
        write(&mut engine, RegisterId::MajAxisPcnt, 19);
        write(&mut engine, RegisterId::MultiFunc, 19);
        write(&mut engine, RegisterId::Command, 0xE0B0);

        // The tile itself sits outside the clip and is only read.
        let drawn: Vec<(i32, i32)> = lit(&engine).into_iter().filter(|(x, y)| *x >= 8 || *y >= 8).collect();
        assert_eq!(drawn.len(), 11 * 11);
        assert!(drawn.iter().all(|(x, y)| (20..=30).contains(x) && (20..=30).contains(y)));
        assert_eq!(pixel(&engine, 20, 20), ((20 & 7) * 8 + (20 & 7) + 1) as u32);
        assert_eq!(engine.stats().pixels_clipped, 400 - 121);
    }

    #[test]
    fn test_clip_polygon() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        set_clip(&mut engine, 10, 5, 20, 15);
        write(&mut engine, RegisterId::FrgdColor, 0x01);
        write(&mut engine, RegisterId::FrgdMix, 0x27);
        write(&mut engine, RegisterId::CurX, 4);
        write(&mut engine, RegisterId::CurY, 0);
        write(&mut engine, RegisterId::DestXDiaStp, 4);
        write(&mut engine, RegisterId::DestYAxStp, 20);
        write(&mut engine, RegisterId::CurX2, 30);
        write(&mut engine, RegisterId::CurY2, 0);
        write(&mut engine, RegisterId::DestXDiaStp2, 30);
        write(&mut engine, RegisterId::DestYAxStp2, 20);
        write(&mut engine, RegisterId::Command, 0x6010);

        let pixels = lit(&engine);
        assert_eq!(pixels.len(), 11 * 11);
        assert!(pixels.iter().all(|(x, y)| (10..=20).contains(x) && (5..=15).contains(y)));
        assert!(engine.stats().pixels_clipped > 0);
    }

    #[test]
    fn test_clip_cpu_fed_rectangle() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        set_clip(&mut engine, 5, 3, 8, 63);
        write(&mut engine, RegisterId::FrgdMix, 0x47);
        write(&mut engine, RegisterId::CurX, 2);
        write(&mut engine, RegisterId::CurY, 2);
        write(&mut engine, RegisterId::MajAxisPcnt, 9);
        write(&mut engine, RegisterId::MultiFunc, 2);
        write(&mut engine, RegisterId::Command, 0x41B1);

        let data: Vec<u8> = (1..=30).collect();
        pixtrans(&mut engine, &data[..7]);
        assert_eq!(engine.phase(), Phase::AwaitingData);
        assert!(lit(&engine).is_empty());

        pixtrans(&mut engine, &data[7..16]);
        assert_eq!(engine.phase(), Phase::AwaitingData);
        pixtrans(&mut engine, &data[16..]);
        assert_eq!(engine.phase(), Phase::Idle);

        let pixels = lit(&engine);
        assert_eq!(pixels.len(), 4 * 2);
        assert!(pixels.iter().all(|(x, y)| (5..=8).contains(x) && (3..=4).contains(y)));
        for (x, y) in pixels {
            let index = (y - 2) * 10 + (x - 2);
            assert_eq!(pixel(&engine, x, y), data[index as usize] as u32, "pixel ({}, {})", x, y);
        }
        assert_eq!(engine.stats().pixels_clipped, 30 - 8);
    }

    #[test]
    fn test_reserved_command_is_ignored() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        write(&mut engine, RegisterId::FrgdColor, 0x01);
        write(&mut engine, RegisterId::FrgdMix, 0x27);
        write(&mut engine, RegisterId::MajAxisPcnt, 3);
        for code in [0u32, 4, 5] {
            write(&mut engine, RegisterId::Command, (code << 13) | 0xB0);
        }
        assert!(lit(&engine).is_empty());
        assert_eq!(engine.stats().started, 0);
        assert!(!engine.is_busy());
    }

    #[test]
    fn test_new_command_aborts_transfer() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        write(&mut engine, RegisterId::FrgdMix, 0x47);
        write(&mut engine, RegisterId::CurX, 0);
        write(&mut engine, RegisterId::CurY, 0);
        write(&mut engine, RegisterId::MajAxisPcnt, 3);
        write(&mut engine, RegisterId::Command, 0x41B1);
        pixtrans(&mut engine, &[0x0A, 0x0B]);
        assert_eq!(engine.phase(), Phase::AwaitingData);

        // Free running rectangle elsewhere.
        write(&mut engine, RegisterId::FrgdMix, 0x27);
        write(&mut engine, RegisterId::FrgdColor, 0x0C);
        write(&mut engine, RegisterId::CurY, 10);
        write(&mut engine, RegisterId::Command, 0x40B0);
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.stats().aborted, 1);

        pixtrans(&mut engine, &[0x0D, 0x0E]);
        assert_eq!(engine.stats().transfer_bytes_dropped, 2);
        assert_eq!(pixel(&engine, 0, 0), 0x0A);
        assert_eq!(pixel(&engine, 2, 0), 0x00);
        assert_eq!(pixel(&engine, 3, 10), 0x0C);
    }

    /// BitBlt of a noisy 16x12 block onto a partially clipped destination.
    fn noisy_blit(engine: &mut RasterEngine<Vram>) {
        for (i, byte) in engine.mem_mut().as_mut_slice().iter_mut().enumerate() {
            *byte = (i as u32).wrapping_mul(2_654_435_761).rotate_right(13) as u8;
        }
        write(engine, RegisterId::MultiFunc, 0x4000 | 40);
        write(engine, RegisterId::WrtMask, 0x3C);
        write(engine, RegisterId::FrgdMix, 0x67);
        write(engine, RegisterId::CurX, 3);
        write(engine, RegisterId::CurY, 4);
        write(engine, RegisterId::DestXDiaStp, 30);
        write(engine, RegisterId::DestYAxStp, 8);
        write(engine, RegisterId::MajAxisPcnt, 15);
        write(engine, RegisterId::MultiFunc, 11);
        write(engine, RegisterId::Command, 0xC0B0);
    }

    #[test]
    fn test_fast_blit_matches_general_path() {
        let mut fast = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        noisy_blit(&mut fast);
        assert_eq!(fast.stats().fast_blits, 1);

        let mut general = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        // Select the mix from display memory with an empty read mask: always foreground.
        write(&mut general, RegisterId::RdMask, 0);
        write(&mut general, RegisterId::MultiFunc, 0xA0C0);
        noisy_blit(&mut general);
        assert_eq!(general.stats().fast_blits, 0);

        assert!(fast.mem().as_slice() == general.mem().as_slice());
        assert_eq!(fast.stats().pixels_clipped, general.stats().pixels_clipped);
        assert_eq!(fast.state().cur_y, general.state().cur_y);
        assert_eq!(fast.state().desty_axstp, general.state().desty_axstp);
    }

    #[test]
    fn test_blit_cursor_write_back() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        noisy_blit(&mut engine);
        let state = engine.state();
        assert_eq!((coord(state.cur_x), coord(state.cur_y)), (3, 16));
        assert_eq!((coord(state.destx_distp), coord(state.desty_axstp)), (30, 20));
    }

    struct RecordingVram {
        inner: Vram,
        reads: RefCell<Vec<usize>>,
    }

    impl VideoMemory for RecordingVram {
        fn wrap_mask(&self) -> usize {
            self.inner.wrap_mask()
        }

        fn read_u8(&self, address: usize) -> u8 {
            self.reads.borrow_mut().push(address);
            self.inner.read_u8(address)
        }

        fn write_u8(&mut self, address: usize, data: u8) {
            self.inner.write_u8(address, data);
        }
    }

    #[test]
    fn test_pattern_fill_stays_in_tile() {
        let mut vram = Vram::new((SIZE * SIZE) as usize);
        for y in 0..8 {
            for x in 0..8 {
                vram.as_mut_slice()[(y * SIZE + x) as usize] = (y * 8 + x + 1) as u8;
            }
        }
        let geometry = Geometry {
            pitch: SIZE as u32,
            depth: PixelDepth::Bpp8,
            base: 0,
        };
        let mem = RecordingVram {
            inner: vram,
            reads: RefCell::new(Vec::new()),
        };
        let mut engine = RasterEngine::new(mem, ChipQuirks::new(ChipType::Trio64), geometry);
        setup(&mut engine);
        write(&mut engine, RegisterId::FrgdMix, 0x67);
        write(&mut engine, RegisterId::CurX, 0);
        write(&mut engine, RegisterId::CurY, 0);
        write(&mut engine, RegisterId::DestXDiaStp, 21);
        write(&mut engine, RegisterId::DestYAxStp, 30);
        write(&mut engine, RegisterId::MajAxisPcnt, 19);
        write(&mut engine, RegisterId::MultiFunc, 13);
        engine.mem().reads.borrow_mut().clear();
        write(&mut engine, RegisterId::Command, 0xE0B0);

        let in_rect = |x: i32, y: i32| (21..41).contains(&x) && (30..44).contains(&y);
        for address in engine.mem().reads.borrow().iter() {
            let (x, y) = ((*address as i32) % SIZE, (*address as i32) / SIZE);
            assert!((x < 8 && y < 8) || in_rect(x, y), "read outside tile at ({}, {})", x, y);
        }
        for y in 30..44 {
            for x in 21..41 {
                let expected = ((y & 7) * 8 + (x & 7) + 1) as u32;
                assert_eq!(engine.read_pixel(x, y), expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_16bpp_fill_and_transfer() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp16);
        write(&mut engine, RegisterId::FrgdColor, 0xFFFF_1234);
        write(&mut engine, RegisterId::FrgdMix, 0x27);
        write(&mut engine, RegisterId::CurX, 1);
        write(&mut engine, RegisterId::CurY, 1);
        write(&mut engine, RegisterId::MajAxisPcnt, 1);
        write(&mut engine, RegisterId::Command, 0x40B0);
        assert_eq!(pixel(&engine, 1, 1), 0x1234);
        assert_eq!(pixel(&engine, 2, 1), 0x1234);
        assert_eq!(&engine.mem().as_slice()[(SIZE as usize + 1) * 2..(SIZE as usize + 1) * 2 + 2], &[0x34, 0x12]);

        // Byte-wide transfers still deliver whole pixels.
        write(&mut engine, RegisterId::FrgdMix, 0x47);
        write(&mut engine, RegisterId::CurY, 3);
        write(&mut engine, RegisterId::Command, 0x41B1);
        pixtrans(&mut engine, &[0xCD, 0xAB, 0x01, 0xEF]);
        assert_eq!(pixel(&engine, 1, 3), 0xABCD);
        assert_eq!(pixel(&engine, 2, 3), 0xEF01);
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn test_transfer_byte_order() {
        for (swap, expected) in [(0, [0x22, 0x11]), (0x1000, [0x11, 0x22])] {
            let mut engine = engine_for(ChipType::Et4000W32p, PixelDepth::Bpp8);
            write(&mut engine, RegisterId::MultiFunc, 0xB000 | ROP3_SRC as u32);
            write(&mut engine, RegisterId::FrgdMix, 0x47);
            write(&mut engine, RegisterId::MajAxisPcnt, 1);
            write(&mut engine, RegisterId::Command, 0x43B1 | swap);
            pixtrans(&mut engine, &[0x11, 0x22]);
            assert_eq!([pixel(&engine, 0, 0), pixel(&engine, 1, 0)], expected.map(|b| b as u32));
        }
    }

    #[test]
    fn test_rop3_pattern_operand() {
        let mut engine = engine_for(ChipType::Et4000W32p, PixelDepth::Bpp8);
        // 4x2 pattern at (40, 0).
        for y in 0..2 {
            for x in 0..4 {
                engine.mem_mut().as_mut_slice()[(y * SIZE + 40 + x) as usize] = (0x10 * (y + 1) + x) as u8;
            }
        }
        write(&mut engine, RegisterId::MultiFunc, 0x5000 | 40);
        write(&mut engine, RegisterId::MultiFunc, 0x6000);
        write(&mut engine, RegisterId::MultiFunc, 0x7012);
        // Pattern XOR destination.
        write(&mut engine, RegisterId::MultiFunc, 0xB05A);
        write(&mut engine, RegisterId::FrgdMix, 0x27);
        for y in 8..12 {
            for x in 8..16 {
                engine.mem_mut().as_mut_slice()[(y * SIZE + x) as usize] = 0xFF;
            }
        }
        write(&mut engine, RegisterId::CurX, 8);
        write(&mut engine, RegisterId::CurY, 8);
        write(&mut engine, RegisterId::MajAxisPcnt, 7);
        write(&mut engine, RegisterId::MultiFunc, 3);
        write(&mut engine, RegisterId::Command, 0x40B0);

        for y in 8..12 {
            for x in 8..16 {
                let pat = (0x10 * ((y % 2) + 1) + (x & 3)) as u32;
                assert_eq!(pixel(&engine, x, y), pat ^ 0xFF, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_blit_source_wrap() {
        let mut engine = engine_for(ChipType::Et4000W32p, PixelDepth::Bpp8);
        let tile = [[1u8, 2], [3, 4]];
        for (y, row) in tile.iter().enumerate() {
            for (x, value) in row.iter().enumerate() {
                engine.mem_mut().as_mut_slice()[y * SIZE as usize + 10 + x] = *value;
            }
        }
        write(&mut engine, RegisterId::MultiFunc, 0x8011);
        write(&mut engine, RegisterId::MultiFunc, 0xB000 | ROP3_SRC as u32);
        write(&mut engine, RegisterId::FrgdMix, 0x67);
        write(&mut engine, RegisterId::CurX, 10);
        write(&mut engine, RegisterId::CurY, 0);
        write(&mut engine, RegisterId::DestXDiaStp, 20);
        write(&mut engine, RegisterId::DestYAxStp, 20);
        write(&mut engine, RegisterId::MajAxisPcnt, 5);
        write(&mut engine, RegisterId::MultiFunc, 3);
        write(&mut engine, RegisterId::Command, 0xC0B0);

        for row in 0..4 {
            for col in 0..6 {
                let expected = tile[(row % 2) as usize][(col % 2) as usize] as u32;
                assert_eq!(pixel(&engine, 20 + col, 20 + row), expected);
            }
        }
    }

    #[test]
    fn test_readback_is_unclipped() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        write(&mut engine, RegisterId::MultiFunc, 0x2000 | 10);
        engine.mem_mut().as_mut_slice()[3] = 0x33;
        write(&mut engine, RegisterId::FrgdMix, 0x03);
        write(&mut engine, RegisterId::MajAxisPcnt, 3);
        write(&mut engine, RegisterId::Command, 0x41B0);
        assert_eq!(engine.phase(), Phase::AwaitingRead);

        let first = engine.read(ReadRequest::PixelData(Width::Dword));
        assert_eq!(first, Some(0x3300_0000));
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.read(ReadRequest::PixelData(Width::Word)), None);
    }

    #[test]
    fn test_snapshot_restore_idles_engine() {
        let mut engine = engine_for(ChipType::Trio64, PixelDepth::Bpp8);
        write(&mut engine, RegisterId::FrgdMix, 0x47);
        write(&mut engine, RegisterId::MajAxisPcnt, 3);
        let snapshot = engine.snapshot();
        write(&mut engine, RegisterId::Command, 0x41B1);
        assert!(engine.is_busy());

        engine.restore(snapshot.clone());
        assert!(!engine.is_busy());
        assert_eq!(engine.state(), &snapshot);
        assert!(!engine.get_state().is_empty());
    }
}
