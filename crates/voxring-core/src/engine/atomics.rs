//! Lock-free diagnostics published by the render worker
//!
//! The render thread stores its view of the buffer after every quantum; the
//! control plane reads it without touching the ring buffer. All operations
//! use `Ordering::Relaxed`: the values are advisory and only need to become
//! visible eventually.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};

use crate::buffer::RingBuffer;
use crate::types::{BufferState, PlaybackRate};

/// Render-side state shared with the control plane
#[derive(Debug)]
pub struct PlaybackAtomics {
    buffered: AtomicUsize,
    capacity: AtomicUsize,
    threshold: AtomicUsize,
    state: AtomicU8,
    underflow: AtomicU64,
    /// Applied playback rate as `f64` bits
    rate_bits: AtomicU64,
    quanta: AtomicU64,
    growths: AtomicU64,
    faulted: AtomicBool,
    /// Size of the allocation that failed, valid once `faulted` is set
    fault_request: AtomicUsize,
}

impl PlaybackAtomics {
    pub fn new() -> Self {
        Self {
            buffered: AtomicUsize::new(0),
            capacity: AtomicUsize::new(0),
            threshold: AtomicUsize::new(0),
            state: AtomicU8::new(BufferState::Accumulating as u8),
            underflow: AtomicU64::new(0),
            rate_bits: AtomicU64::new(PlaybackRate::NORMAL.get().to_bits()),
            quanta: AtomicU64::new(0),
            growths: AtomicU64::new(0),
            faulted: AtomicBool::new(false),
            fault_request: AtomicUsize::new(0),
        }
    }

    /// Store the buffer's state (render thread)
    #[inline]
    pub fn publish(&self, buffer: &RingBuffer, rate: PlaybackRate) {
        self.buffered.store(buffer.unread_len(), Ordering::Relaxed);
        self.capacity.store(buffer.capacity(), Ordering::Relaxed);
        self.threshold
            .store(buffer.initial_buffer_length(), Ordering::Relaxed);
        self.state.store(buffer.state() as u8, Ordering::Relaxed);
        self.underflow
            .store(buffer.underflow_count(), Ordering::Relaxed);
        self.rate_bits.store(rate.get().to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn record_quantum(&self) {
        self.quanta.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_growth(&self) {
        self.growths.fetch_add(1, Ordering::Relaxed);
    }

    /// Flag the session as failed (render thread)
    pub fn mark_faulted(&self, requested: usize) {
        self.fault_request.store(requested, Ordering::Relaxed);
        self.faulted.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    /// Allocation size that failed, if the session faulted
    pub fn fault_request(&self) -> Option<usize> {
        self.is_faulted()
            .then(|| self.fault_request.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn state(&self) -> BufferState {
        BufferState::from_u8(self.state.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn applied_rate(&self) -> f64 {
        f64::from_bits(self.rate_bits.load(Ordering::Relaxed))
    }

    /// Copy everything into a plain snapshot
    pub fn snapshot(&self) -> PlaybackStats {
        PlaybackStats {
            buffered: self.buffered(),
            capacity: self.capacity.load(Ordering::Relaxed),
            initial_threshold: self.threshold.load(Ordering::Relaxed),
            state: self.state(),
            underflow: self.underflow.load(Ordering::Relaxed),
            applied_rate: self.applied_rate(),
            quanta_rendered: self.quanta.load(Ordering::Relaxed),
            growths: self.growths.load(Ordering::Relaxed),
            faulted: self.is_faulted(),
        }
    }
}

impl Default for PlaybackAtomics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`PlaybackAtomics`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackStats {
    /// Unread samples in the ring buffer
    pub buffered: usize,
    /// Ring buffer capacity in samples
    pub capacity: usize,
    /// Cushion required before playback (re)starts
    pub initial_threshold: usize,
    pub state: BufferState,
    /// Silence-filled samples since the last non-empty read
    pub underflow: u64,
    /// Rate the render worker used for its last quantum
    pub applied_rate: f64,
    pub quanta_rendered: u64,
    /// Times the ring buffer had to reallocate
    pub growths: u64,
    pub faulted: bool,
}

impl PlaybackStats {
    /// Buffered audio in milliseconds at `sample_rate`
    pub fn buffered_ms(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.buffered as f32 * 1000.0 / sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_mirrors_buffer() {
        let atomics = PlaybackAtomics::new();
        let mut buffer = RingBuffer::new(32, 4);
        buffer.write(&[0.5; 6]).unwrap();
        atomics.publish(&buffer, PlaybackRate::new(1.5));

        let stats = atomics.snapshot();
        assert_eq!(stats.buffered, 6);
        assert_eq!(stats.capacity, 32);
        assert_eq!(stats.initial_threshold, 4);
        assert_eq!(stats.state, BufferState::Ready);
        assert_eq!(stats.applied_rate, 1.5);
        assert_eq!(stats.quanta_rendered, 0);

        atomics.record_quantum();
        assert_eq!(atomics.snapshot().quanta_rendered, 1);
        assert!(!stats.faulted);
    }

    #[test]
    fn test_fault_request_only_after_fault() {
        let atomics = PlaybackAtomics::new();
        assert_eq!(atomics.fault_request(), None);
        atomics.mark_faulted(4096);
        assert_eq!(atomics.fault_request(), Some(4096));
        assert!(atomics.snapshot().faulted);
    }

    #[test]
    fn test_buffered_ms() {
        let mut stats = PlaybackAtomics::new().snapshot();
        stats.buffered = 2400;
        assert_eq!(stats.buffered_ms(24000), 100.0);
        assert_eq!(stats.buffered_ms(0), 0.0);
    }
}
