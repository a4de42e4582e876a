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

    queue.rs

    Command queue between the register file and the raster engine worker.

*/

//! Register writes that affect drawing are queued as [QueueEntry] values on a bounded crossbeam
//! channel and applied, strictly in submission order, by a dedicated worker thread that owns
//! the [RasterEngine]. Enqueueing blocks while the channel is full. The worker parks in
//! `recv()` while the queue is empty.
//!
//! Control messages share the same channel so that they are ordered with respect to register
//! writes: a read or an idle wait always observes every write submitted before it.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::{
    config::Geometry,
    engine::RasterEngine,
    error::AccelError,
    registers::{RegisterId, RegisterTarget},
    vram::VideoMemory,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
    Dword,
}

impl Width {
    pub fn bytes(&self) -> usize {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
            Width::Dword => 4,
        }
    }

    pub fn mask(&self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Word => 0xFFFF,
            Width::Dword => 0xFFFF_FFFF,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// Replace the whole register.
    Register,
    /// Byte-lane write starting at the target lane, as an I/O port or MMIO write would.
    Port,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueueEntry {
    pub target: RegisterTarget,
    pub value:  u32,
    pub kind:   AccessKind,
    pub width:  Width,
}

impl QueueEntry {
    pub fn port(target: RegisterTarget, value: u32, width: Width) -> Self {
        Self {
            target,
            value: value & width.mask(),
            kind: AccessKind::Port,
            width,
        }
    }

    /// A full-width write to a register.
    pub fn register(reg: RegisterId, value: u32) -> Self {
        let width = if reg.lanes() == 4 { Width::Dword } else { Width::Word };
        Self {
            target: RegisterTarget::new(reg, 0),
            value: value & width.mask(),
            kind: AccessKind::Register,
            width,
        }
    }

    /// The bytes of the value in lane order.
    pub fn bytes(&self) -> impl Iterator<Item = u8> {
        let value = self.value;
        (0..self.width.bytes()).map(move |i| (value >> (i * 8)) as u8)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReadRequest {
    Register(RegisterTarget, Width),
    PixelData(Width),
}

pub type InspectFn<M> = Box<dyn FnOnce(&mut RasterEngine<M>) + Send>;

pub enum QueueMessage<M: VideoMemory> {
    Entry(QueueEntry),
    Configure(Geometry),
    Read(ReadRequest, Sender<Option<u32>>),
    Sync(Sender<()>),
    Inspect(InspectFn<M>),
    Reset,
    Shutdown,
}

/// State published by the worker for the status register.
#[derive(Default)]
pub struct QueueShared {
    pending: AtomicUsize,
    engine_busy: AtomicBool,
    data_available: AtomicBool,
}

impl QueueShared {
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn engine_busy(&self) -> bool {
        self.engine_busy.load(Ordering::Acquire)
    }

    pub fn data_available(&self) -> bool {
        self.data_available.load(Ordering::Acquire)
    }
}

/// Report host-side misuse of the queue. Fatal in debug builds.
pub(crate) fn caller_misuse(msg: &str) {
    log::error!("{}", msg);
    if cfg!(debug_assertions) {
        panic!("{}", msg);
    }
}

pub struct CommandQueue<M: VideoMemory + Send + 'static> {
    sender:   Option<Sender<QueueMessage<M>>>,
    receiver: Receiver<QueueMessage<M>>,
    worker:   Option<JoinHandle<()>>,
    shared:   Arc<QueueShared>,
    capacity: usize,
}

impl<M: VideoMemory + Send + 'static> CommandQueue<M> {
    /// Spawn a worker thread that owns `engine`.
    pub fn new(engine: RasterEngine<M>, capacity: usize) -> Result<Self, AccelError> {
        let capacity = capacity.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let shared = Arc::new(QueueShared::default());

        let worker_rx = receiver.clone();
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("marty_accel".to_string())
            .spawn(move || drain(worker_rx, engine, worker_shared))
            .map_err(AccelError::WorkerSpawn)?;

        Ok(Self {
            sender: Some(sender),
            receiver,
            worker: Some(worker),
            shared,
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn shared(&self) -> &QueueShared {
        &self.shared
    }

    /// Entries submitted but not yet fully applied.
    pub fn pending(&self) -> usize {
        self.shared.pending()
    }

    /// Queue entries are pending or a primitive is in flight.
    pub fn is_busy(&self) -> bool {
        self.shared.pending() > 0 || self.shared.engine_busy()
    }

    /// Send a message to the worker, blocking while the queue is full.
    pub fn post(&self, msg: QueueMessage<M>) {
        let Some(sender) = &self.sender
        else {
            caller_misuse("accelerator queue used after shutdown");
            return;
        };

        let counted = matches!(msg, QueueMessage::Entry(_));
        if counted {
            self.shared.pending.fetch_add(1, Ordering::AcqRel);
        }
        if sender.send(msg).is_err() {
            if counted {
                self.shared.pending.fetch_sub(1, Ordering::AcqRel);
            }
            log::error!("accelerator worker has exited, message dropped");
        }
    }

    pub fn enqueue(&self, entry: QueueEntry) {
        self.post(QueueMessage::Entry(entry));
    }

    /// Enqueue without blocking.
    pub fn try_enqueue(&self, entry: QueueEntry) -> Result<(), AccelError> {
        let sender = self.sender.as_ref().ok_or(AccelError::QueueClosed)?;
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        match sender.try_send(QueueMessage::Entry(entry)) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.shared.pending.fetch_sub(1, Ordering::AcqRel);
                match e {
                    TrySendError::Full(_) => Err(AccelError::QueueFull),
                    TrySendError::Disconnected(_) => Err(AccelError::QueueClosed),
                }
            }
        }
    }

    /// Block until every message submitted so far has been applied.
    pub fn wait_idle(&self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.post(QueueMessage::Sync(tx));
        // A dropped sync (reset or worker exit) also means nothing is left to wait for.
        let _ = rx.recv();
    }

    /// Perform an ordered read. None if there was nothing to read.
    pub fn read(&self, request: ReadRequest) -> Option<u32> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.post(QueueMessage::Read(request, tx));
        rx.recv().ok().flatten()
    }

    /// Run a closure against the engine on the worker, after all previously queued messages.
    pub fn inspect<R, F>(&self, f: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut RasterEngine<M>) -> R + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.post(QueueMessage::Inspect(Box::new(move |engine| {
            let _ = tx.send(f(engine));
        })));
        rx.recv().ok()
    }

    pub fn configure(&self, geometry: Geometry) {
        self.post(QueueMessage::Configure(geometry));
    }

    /// Discard queued register entries and reset the engine. Other messages
    /// (geometry changes, reads, syncs) are kept in order ahead of the reset.
    pub fn reset(&self) {
        let mut discarded = 0;
        let mut kept = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            match msg {
                QueueMessage::Entry(_) => {
                    self.shared.pending.fetch_sub(1, Ordering::AcqRel);
                    discarded += 1;
                }
                other => kept.push(other),
            }
        }
        log::debug!(
            "accelerator reset, {} queued entries discarded, {} messages kept",
            discarded,
            kept.len()
        );
        for msg in kept {
            self.post(msg);
        }
        self.post(QueueMessage::Reset);
    }

    pub fn shutdown(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(QueueMessage::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("accelerator worker panicked");
            }
        }
    }
}

impl<M: VideoMemory + Send + 'static> Drop for CommandQueue<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop: apply messages in order until shutdown.
pub fn drain<M: VideoMemory>(receiver: Receiver<QueueMessage<M>>, mut engine: RasterEngine<M>, shared: Arc<QueueShared>) {
    log::debug!("accelerator worker started");
    while let Ok(msg) = receiver.recv() {
        let counted = matches!(msg, QueueMessage::Entry(_));
        match msg {
            QueueMessage::Entry(entry) => engine.apply(entry),
            QueueMessage::Configure(geometry) => engine.configure(geometry),
            QueueMessage::Read(request, reply) => {
                let _ = reply.send(engine.read(request));
            }
            QueueMessage::Sync(reply) => {
                let _ = reply.send(());
            }
            QueueMessage::Inspect(f) => f(&mut engine),
            QueueMessage::Reset => engine.reset(),
            QueueMessage::Shutdown => break,
        }

        shared.engine_busy.store(engine.is_busy(), Ordering::Release);
        shared.data_available.store(engine.data_available(), Ordering::Release);
        if counted {
            shared.pending.fetch_sub(1, Ordering::AcqRel);
        }
    }
    log::debug!("accelerator worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PixelDepth,
        quirks::{ChipQuirks, ChipType},
        vram::Vram,
    };
    use std::time::Duration;

    fn queue(capacity: usize) -> CommandQueue<Vram> {
        let engine = RasterEngine::new(Vram::new(0x1000), ChipQuirks::new(ChipType::Trio64), Geometry::default());
        CommandQueue::new(engine, capacity).unwrap()
    }

    /// Park the worker inside an inspect closure until the returned sender fires.
    fn block_worker(q: &CommandQueue<Vram>) -> Sender<()> {
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(1);
        let (entered_tx, entered_rx) = crossbeam_channel::bounded::<()>(1);
        q.post(QueueMessage::Inspect(Box::new(move |_: &mut RasterEngine<Vram>| {
            let _ = entered_tx.send(());
            let _ = gate_rx.recv();
        })));
        entered_rx.recv().unwrap();
        gate_tx
    }

    #[test]
    fn test_fifo_order() {
        let q = queue(4);
        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..64u32 {
            q.enqueue(QueueEntry::register(RegisterId::ErrTerm, i));
            let tx = tx.clone();
            q.post(QueueMessage::Inspect(Box::new(move |engine| {
                tx.send(engine.state().err_term).unwrap();
            })));
        }
        q.wait_idle();
        let seen: Vec<u16> = rx.try_iter().collect();
        assert_eq!(seen, (0..64).collect::<Vec<u16>>());
        assert_eq!(q.pending(), 0);
    }

    #[test]
    fn test_backpressure() {
        let q = Arc::new(queue(2));
        let gate = block_worker(&q);

        q.enqueue(QueueEntry::register(RegisterId::ErrTerm, 1));
        q.enqueue(QueueEntry::register(RegisterId::ErrTerm, 2));
        assert!(matches!(
            q.try_enqueue(QueueEntry::register(RegisterId::ErrTerm, 3)),
            Err(AccelError::QueueFull)
        ));

        let done = Arc::new(AtomicBool::new(false));
        let producer = {
            let q = q.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                q.enqueue(QueueEntry::register(RegisterId::ErrTerm, 3));
                done.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst), "enqueue into a full queue must block");

        gate.send(()).unwrap();
        producer.join().unwrap();
        assert!(done.load(Ordering::SeqCst));

        q.wait_idle();
        assert_eq!(q.inspect(|engine| engine.state().err_term), Some(3));
    }

    #[test]
    fn test_reset_discards_queued_entries() {
        let q = queue(8);
        q.enqueue(QueueEntry::register(RegisterId::FrgdColor, 0x12));
        q.wait_idle();

        let gate = block_worker(&q);
        for i in 0..4 {
            q.enqueue(QueueEntry::register(RegisterId::BkgdColor, i + 1));
        }
        assert_eq!(q.pending(), 4);
        q.reset();
        assert_eq!(q.pending(), 0);
        gate.send(()).unwrap();

        q.wait_idle();
        let (fg, bg) = q.inspect(|engine| (engine.state().frgd_color, engine.state().bkgd_color)).unwrap();
        assert_eq!(fg, 0);
        assert_eq!(bg, 0);
        assert!(!q.is_busy());
    }

    #[test]
    fn test_reset_keeps_configure() {
        let q = queue(8);
        let geometry = Geometry {
            pitch: 640,
            depth: PixelDepth::Bpp16,
            base:  0,
        };

        let gate = block_worker(&q);
        q.enqueue(QueueEntry::register(RegisterId::FrgdColor, 0x34));
        q.configure(geometry);
        q.reset();
        assert_eq!(q.pending(), 0);
        gate.send(()).unwrap();

        q.wait_idle();
        let (seen, fg) = q.inspect(|engine| (engine.geometry(), engine.state().frgd_color)).unwrap();
        assert_eq!(seen, geometry);
        assert_eq!(fg, 0);
    }

    #[test]
    fn test_ordered_register_read() {
        let q = queue(8);
        q.enqueue(QueueEntry::port(RegisterTarget::new(RegisterId::FrgdColor, 1), 0xAB, Width::Byte));
        let value = q.read(ReadRequest::Register(RegisterTarget::new(RegisterId::FrgdColor, 0), Width::Word));
        assert_eq!(value, Some(0xAB00));
    }

    #[test]
    fn test_try_enqueue_after_shutdown() {
        let mut q = queue(2);
        q.shutdown();
        assert!(matches!(
            q.try_enqueue(QueueEntry::register(RegisterId::ErrTerm, 0)),
            Err(AccelError::QueueClosed)
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "after shutdown")]
    fn test_enqueue_after_shutdown_panics() {
        let mut q = queue(2);
        q.shutdown();
        q.enqueue(QueueEntry::register(RegisterId::ErrTerm, 0));
    }
}
