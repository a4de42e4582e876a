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

    engine::transfer.rs

    Pixel transfer decoding between the CPU and a running primitive.

*/

//! Pixel transfer bytes are collected in a staging buffer until a whole chunk has arrived.
//! The chunk size depends only on the command register and pixel depth, never on how the CPU
//! split its writes, so a dword write and four byte writes decode to the same tokens.

use arraydeque::ArrayDeque;

use crate::{
    quirks::ByteOrder,
    registers::{CommandRegister, MixRegister, MixSelect, MixSource, PixelControl},
};

/// Largest pixel transfer chunk, in bytes.
pub const MAX_CHUNK: usize = 4;

/// One unit of CPU-supplied data, consumed by one destination pixel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Monochrome expansion: selects the foreground (true) or background mix.
    Mono(bool),
    /// A full color pixel.
    Color(u32),
}

pub type TokenQueue = ArrayDeque<Token, { MAX_CHUNK * 8 }>;
pub type ChunkBuffer = ArrayDeque<u8, MAX_CHUNK>;
pub type ReadbackBuffer = ArrayDeque<u8, { MAX_CHUNK * 2 }>;

/// How a primitive exchanges data with the CPU.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FeedMode {
    /// No CPU involvement; runs to completion as soon as it is triggered.
    Free,
    /// CPU supplies color pixels.
    CpuColor,
    /// CPU supplies one bit per pixel selecting the mix.
    CpuMono,
    /// CPU reads the mixed destination pixels.
    Readback,
}

impl FeedMode {
    pub fn select(cmd: &CommandRegister, fg: &MixRegister, bg: &MixRegister, pix_cntl: &PixelControl) -> FeedMode {
        if !cmd.pcdata() {
            return FeedMode::Free;
        }
        if !cmd.cpu_write() {
            return FeedMode::Readback;
        }
        if pix_cntl.mix_select() == MixSelect::CpuData {
            return FeedMode::CpuMono;
        }
        if fg.source() == MixSource::CpuData || bg.source() == MixSource::CpuData {
            return FeedMode::CpuColor;
        }
        log::debug!("CPU data flagged but no mix consumes it, running free");
        FeedMode::Free
    }

    pub fn is_cpu_source(&self) -> bool {
        matches!(self, FeedMode::CpuColor | FeedMode::CpuMono)
    }

    /// Bytes per transfer chunk. Monochrome data packs one pixel per bit, so its chunk is
    /// simply the bus width; color chunks always hold at least one whole pixel.
    pub fn chunk_bytes(&self, bus_bytes: usize, pixel_bytes: usize) -> usize {
        match self {
            FeedMode::CpuMono => bus_bytes.min(MAX_CHUNK),
            _ => bus_bytes.max(pixel_bytes).min(MAX_CHUNK),
        }
    }
}

/// Put the bytes of a chunk into consumption order.
fn ordered(chunk: &[u8], order: ByteOrder) -> ([u8; MAX_CHUNK], usize) {
    let mut bytes = [0u8; MAX_CHUNK];
    let len = chunk.len().min(MAX_CHUNK);
    bytes[..len].copy_from_slice(&chunk[..len]);
    if order == ByteOrder::HighByteFirst {
        for pair in bytes[..len].chunks_exact_mut(2) {
            pair.swap(0, 1);
        }
    }
    (bytes, len)
}

/// Decode a completed chunk into tokens. Monochrome data is consumed most significant bit
/// first; color pixels are little-endian.
pub fn decode_chunk(mode: FeedMode, chunk: &[u8], order: ByteOrder, pixel_bytes: usize, tokens: &mut TokenQueue) {
    let (bytes, len) = ordered(chunk, order);
    match mode {
        FeedMode::CpuMono => {
            for byte in &bytes[..len] {
                for bit in (0..8).rev() {
                    push_token(tokens, Token::Mono(byte & (1 << bit) != 0));
                }
            }
        }
        FeedMode::CpuColor => {
            for pixel in bytes[..len].chunks_exact(pixel_bytes) {
                let color = pixel
                    .iter()
                    .enumerate()
                    .fold(0u32, |acc, (i, b)| acc | ((*b as u32) << (i * 8)));
                push_token(tokens, Token::Color(color));
            }
        }
        FeedMode::Free | FeedMode::Readback => {}
    }
}

fn push_token(tokens: &mut TokenQueue, token: Token) {
    if tokens.push_back(token).is_err() {
        log::warn!("pixel transfer token queue overflow, dropping {:?}", token);
    }
}

/// Move a completed readback chunk, in CPU order, into the readback buffer.
pub fn flush_readback(staging: &mut ChunkBuffer, order: ByteOrder, readback: &mut ReadbackBuffer) {
    let mut chunk = [0u8; MAX_CHUNK];
    let mut count = 0;
    while let Some(byte) = staging.pop_front() {
        chunk[count] = byte;
        count += 1;
    }
    let (bytes, len) = ordered(&chunk[..count], order);
    for byte in &bytes[..len] {
        if readback.push_back(*byte).is_err() {
            log::warn!("readback buffer overflow");
        }
    }
}
