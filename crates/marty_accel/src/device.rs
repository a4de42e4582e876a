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

    device.rs

    Register file front end for the 2D accelerator.

*/

//! [AcceleratorDevice] is the face the accelerator shows to the system bus. Port and MMIO
//! addresses are decoded once into a [RegisterTarget]. The subsystem control and advanced
//! function control registers are serviced in place; every other register write is forwarded
//! to the command queue. Status reads are answered immediately from state published by the
//! worker, while register and pixel transfer reads are ordered behind pending writes.

use crate::{
    bus::{IoDevice, MemoryMappedDevice, NO_IO_BYTE},
    config::{AcceleratorConfig, Geometry},
    engine::{AcceleratorState, EngineStats, RasterEngine},
    error::AccelError,
    queue::{caller_misuse, AccessKind, CommandQueue, QueueEntry, ReadRequest, Width},
    quirks::ChipQuirks,
    registers::*,
    vram::{VideoMemory, Vram},
};

use serde::{Deserialize, Serialize};

/// Saved device state: the queued register file plus the registers serviced in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub subsys_cntl: u16,
    pub adv_func_cntl: u16,
    pub state: AcceleratorState,
}

pub struct AcceleratorDevice<M: VideoMemory + Send + 'static = Vram> {
    quirks: ChipQuirks,
    map: RegisterMap,
    queue: CommandQueue<M>,
    subsys_cntl: u16,
    adv_func_cntl: u16,
}

impl AcceleratorDevice<Vram> {
    pub fn from_config(config: &AcceleratorConfig) -> Result<Self, AccelError> {
        log::debug!("creating {} accelerator: {:?}", config.chip, config);
        Self::new(
            Vram::new(config.vram_size),
            config.quirks(),
            config.geometry(),
            config.queue_depth(),
        )
    }
}

impl<M: VideoMemory + Send + 'static> AcceleratorDevice<M> {
    pub fn new(mem: M, quirks: ChipQuirks, geometry: Geometry, queue_depth: usize) -> Result<Self, AccelError> {
        let engine = RasterEngine::new(mem, quirks, geometry);
        Ok(Self {
            quirks,
            map: RegisterMap::new(&quirks),
            queue: CommandQueue::new(engine, queue_depth)?,
            subsys_cntl: 0,
            adv_func_cntl: 0,
        })
    }

    pub fn quirks(&self) -> &ChipQuirks {
        &self.quirks
    }

    pub fn queue(&self) -> &CommandQueue<M> {
        &self.queue
    }

    pub fn port_write(&mut self, port: u16, value: u32, width: Width) {
        match self.map.decode_port(port) {
            Some(target) => self.write(target, value, width, AccessKind::Port),
            None => log::trace!("write to unmapped accelerator port {:04X}", port),
        }
    }

    pub fn port_read(&mut self, port: u16, width: Width) -> u32 {
        match self.map.decode_port(port) {
            Some(target) => self.read(target, width),
            None => width.mask(),
        }
    }

    pub fn mmio_write(&mut self, offset: u32, value: u32, width: Width) {
        match self.map.decode_mmio(offset) {
            Some(target) => self.write(target, value, width, AccessKind::Port),
            None => log::trace!("write to unmapped accelerator MMIO offset {:05X}", offset),
        }
    }

    pub fn mmio_read(&mut self, offset: u32, width: Width) -> u32 {
        match self.map.decode_mmio(offset) {
            Some(target) => self.read(target, width),
            None => width.mask(),
        }
    }

    /// Replace the value of a whole register, bypassing byte-lane decode.
    pub fn write_register(&mut self, reg: RegisterId, value: u32) {
        if reg.is_fast_path() {
            let width = Width::Word;
            self.write_fast_path(RegisterTarget::new(reg, 0), value, width);
            return;
        }
        self.queue.enqueue(QueueEntry::register(reg, value));
    }

    fn write(&mut self, target: RegisterTarget, value: u32, width: Width, kind: AccessKind) {
        if target.reg.is_fast_path() {
            self.write_fast_path(target, value, width);
            return;
        }
        self.queue.enqueue(QueueEntry {
            target,
            value: value & width.mask(),
            kind,
            width,
        });
    }

    fn write_fast_path(&mut self, target: RegisterTarget, value: u32, width: Width) {
        let reg = match target.reg {
            RegisterId::SubsystemControl => &mut self.subsys_cntl,
            RegisterId::AdvFuncControl => &mut self.adv_func_cntl,
            _ => return,
        };

        let mut touched_high = false;
        for i in 0..width.bytes() {
            let lane = target.lane as usize + i;
            if lane > 1 {
                break;
            }
            let shift = lane * 8;
            *reg = (*reg & !(0xFF << shift)) | ((((value >> (i * 8)) & 0xFF) as u16) << shift);
            touched_high |= lane == 1;
        }

        if target.reg == RegisterId::SubsystemControl && touched_high && (self.subsys_cntl >> 14) == SUBSYS_RESET {
            log::debug!("subsystem control reset");
            self.queue.reset();
        }
    }

    fn read(&mut self, target: RegisterTarget, width: Width) -> u32 {
        let lane_of = |value: u16| ((value as u32) >> (target.lane as u32 * 8)) & width.mask();
        match target.reg {
            RegisterId::SubsystemControl => lane_of(self.subsystem_status()),
            RegisterId::AdvFuncControl => lane_of(self.adv_func_cntl),
            RegisterId::Command => lane_of(self.status()),
            RegisterId::PixTrans => match self.queue.read(ReadRequest::PixelData(width)) {
                Some(value) => value,
                None => {
                    caller_misuse("pixel transfer read with no readback data");
                    width.mask()
                }
            },
            _ => self
                .queue
                .read(ReadRequest::Register(target, width))
                .unwrap_or(width.mask()),
        }
    }

    /// Graphics processor status. Bits 0-7 are a FIFO occupancy thermometer filling from bit 7
    /// (bit 0 set means full), then read data available, busy and FIFO empty.
    pub fn status(&self) -> u16 {
        let shared = self.queue.shared();
        let capacity = self.queue.capacity();
        let pending = shared.pending().min(capacity);

        let mut status = 0u16;
        for bit in 0..8 {
            if pending * 8 >= capacity * (8 - bit) {
                status |= 1 << bit;
            }
        }
        if shared.data_available() {
            status |= GP_STAT_READ_DATA;
        }
        if self.queue.is_busy() {
            status |= GP_STAT_BUSY;
        }
        if pending == 0 {
            status |= GP_STAT_FIFO_EMPTY;
        }
        status
    }

    /// Interrupt enables in bits 8-11. No interrupts are ever raised, so status bits 0-3 read 0.
    pub fn subsystem_status(&self) -> u16 {
        self.subsys_cntl & 0x0F00
    }

    pub fn wait_idle(&self) {
        self.queue.wait_idle();
    }

    /// Full device reset: drop queued work and zero all registers.
    pub fn reset(&mut self) {
        self.subsys_cntl = 0;
        self.adv_func_cntl = 0;
        self.queue.reset();
    }

    pub fn set_geometry(&self, geometry: Geometry) {
        self.queue.configure(geometry);
    }

    /// Capture register state once everything queued so far has been applied.
    pub fn snapshot(&self) -> Option<DeviceSnapshot> {
        let state = self.queue.inspect(|engine| engine.snapshot())?;
        Some(DeviceSnapshot {
            subsys_cntl: self.subsys_cntl,
            adv_func_cntl: self.adv_func_cntl,
            state,
        })
    }

    /// Restore saved state. Reset bits in the saved subsystem control value are not acted on.
    pub fn restore(&mut self, snapshot: DeviceSnapshot) {
        self.subsys_cntl = snapshot.subsys_cntl;
        self.adv_func_cntl = snapshot.adv_func_cntl;
        let state = snapshot.state;
        self.queue.inspect(move |engine| engine.restore(state));
    }

    pub fn stats(&self) -> Option<EngineStats> {
        self.queue.inspect(|engine| *engine.stats())
    }

    pub fn get_state(&self) -> Vec<(String, String)> {
        self.queue.inspect(|engine| engine.get_state()).unwrap_or_default()
    }

    /// Run a closure against the engine, ordered after all queued writes.
    pub fn with_engine<R, F>(&self, f: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut RasterEngine<M>) -> R + Send + 'static,
    {
        self.queue.inspect(f)
    }

    /// Direct access to video memory, ordered after all queued writes.
    pub fn with_vram<R, F>(&self, f: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut M) -> R + Send + 'static,
    {
        self.queue.inspect(move |engine| f(engine.mem_mut()))
    }
}

impl<M: VideoMemory + Send + 'static> IoDevice for AcceleratorDevice<M> {
    fn read_u8(&mut self, port: u16) -> u8 {
        match self.map.decode_port(port) {
            Some(target) => self.read(target, Width::Byte) as u8,
            None => NO_IO_BYTE,
        }
    }

    fn write_u8(&mut self, port: u16, data: u8) {
        self.port_write(port, data as u32, Width::Byte);
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        self.port_read(port, Width::Word) as u16
    }

    fn write_u16(&mut self, port: u16, data: u16) {
        self.port_write(port, data as u32, Width::Word);
    }

    fn port_list(&self) -> Vec<(String, u16)> {
        self.map.port_list()
    }
}

impl<M: VideoMemory + Send + 'static> MemoryMappedDevice for AcceleratorDevice<M> {
    fn mmio_read_u8(&mut self, offset: u32) -> u8 {
        self.mmio_read(offset, Width::Byte) as u8
    }

    fn mmio_write_u8(&mut self, offset: u32, data: u8) {
        self.mmio_write(offset, data as u32, Width::Byte);
    }

    fn mmio_read_u16(&mut self, offset: u32) -> u16 {
        self.mmio_read(offset, Width::Word) as u16
    }

    fn mmio_write_u16(&mut self, offset: u32, data: u16) {
        self.mmio_write(offset, data as u32, Width::Word);
    }

    fn mmio_read_u32(&mut self, offset: u32) -> u32 {
        self.mmio_read(offset, Width::Dword)
    }

    fn mmio_write_u32(&mut self, offset: u32, data: u32) {
        self.mmio_write(offset, data, Width::Dword);
    }
}
