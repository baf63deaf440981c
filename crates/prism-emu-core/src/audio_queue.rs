use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Single-producer / single-consumer ring buffer of stereo i16 frames.
///
/// Intended for the emulator thread (producer) feeding an audio callback
/// thread (consumer) without locks. The queue is *lossy* when full: the
/// oldest frame is discarded to make room, so the consumer always hears the
/// most recent audio after an overrun.
///
/// Each slot packs one stereo frame into a single `AtomicU32`, which keeps
/// the overwrite path free of torn reads without any unsafe code.
#[derive(Clone)]
pub struct AudioProducer {
    inner: Arc<Inner>,
}

#[derive(Clone)]
pub struct AudioConsumer {
    inner: Arc<Inner>,
}

struct Inner {
    // One extra slot so head==tail is unambiguously empty.
    buf: Box<[AtomicU32]>,
    cap: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
}

impl Inner {
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            (self.cap - tail) + head
        }
    }

    fn capacity_frames(&self) -> usize {
        self.cap - 1
    }

    #[inline]
    fn next_index(&self, idx: usize) -> usize {
        let next = idx + 1;
        if next == self.cap { 0 } else { next }
    }
}

#[inline]
fn pack(left: i16, right: i16) -> u32 {
    (left as u16 as u32) | ((right as u16 as u32) << 16)
}

#[inline]
fn unpack(frame: u32) -> (i16, i16) {
    (frame as u16 as i16, (frame >> 16) as u16 as i16)
}

pub fn audio_queue(capacity_frames: usize) -> (AudioProducer, AudioConsumer) {
    let cap = capacity_frames.saturating_add(1).max(2);
    let mut buf = Vec::with_capacity(cap);
    buf.resize_with(cap, || AtomicU32::new(0));

    let inner = Arc::new(Inner {
        buf: buf.into_boxed_slice(),
        cap,
        head: AtomicUsize::new(0),
        tail: AtomicUsize::new(0),
    });

    (
        AudioProducer {
            inner: Arc::clone(&inner),
        },
        AudioConsumer { inner },
    )
}

impl AudioProducer {
    /// Push a stereo frame, dropping the oldest queued frame if full.
    /// Returns false if a frame had to be dropped.
    pub fn push_stereo(&self, left: i16, right: i16) -> bool {
        let mut lossless = true;
        loop {
            let head = self.inner.head.load(Ordering::Relaxed);
            let next = self.inner.next_index(head);
            let tail = self.inner.tail.load(Ordering::Acquire);
            if next == tail {
                // Full: retire the oldest frame. The CAS may lose to the
                // consumer popping concurrently; either way a slot opens up.
                let _ = self.inner.tail.compare_exchange(
                    tail,
                    self.inner.next_index(tail),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                );
                lossless = false;
                continue;
            }
            self.inner.buf[head].store(pack(left, right), Ordering::Relaxed);
            self.inner.head.store(next, Ordering::Release);
            return lossless;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity_frames(&self) -> usize {
        self.inner.capacity_frames()
    }
}

impl AudioConsumer {
    pub fn pop_stereo(&self) -> Option<(i16, i16)> {
        loop {
            let tail = self.inner.tail.load(Ordering::Acquire);
            let head = self.inner.head.load(Ordering::Acquire);
            if tail == head {
                return None;
            }
            let frame = self.inner.buf[tail].load(Ordering::Relaxed);
            // The producer may have stolen this slot to drop the oldest
            // frame; only commit the read if the tail is still ours.
            if self
                .inner
                .tail
                .compare_exchange(
                    tail,
                    self.inner.next_index(tail),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return Some(unpack(frame));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity_frames(&self) -> usize {
        self.inner.capacity_frames()
    }
}
