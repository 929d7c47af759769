//! Growable ring buffer with initial-buffering state machine
//!
//! Absorbs irregularly sized chunks from the network side and feeds a
//! fixed-size render quantum. All cursor math lives here.
//!
//! ```text
//!  0          read_index        write_index       capacity
//!  ├──────────────┼─────────────────┼─────────────────┤
//!  │   consumed   │     unread      │      free       │
//!  └──────────────┴─────────────────┴─────────────────┘
//! ```
//!
//! # Write policy
//!
//! 1. Append in place when the free tail fits the chunk
//! 2. Otherwise compact (move unread to offset 0) when the consumed head
//!    alone can hold the chunk
//! 3. Otherwise grow to `2 × (chunk + unread)`
//!
//! # Anti-stutter
//!
//! The buffer starts `Accumulating` and renders silence until the unread
//! region reaches `initial_buffer_length`. Once a read finds nothing to copy
//! it drops back to `Accumulating`, so playback only resumes with a full
//! cushion instead of stalling again on the next chunk.

use thiserror::Error;

use super::interp::linear_at;
use crate::types::{BufferState, PlaybackRate, Sample};

/// Errors raised by buffer growth
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The backing store could not be grown
    #[error("Failed to grow ring buffer to {requested} samples ({unread} unread)")]
    Allocation { requested: usize, unread: usize },
}

/// Which write path a chunk took
#[derive(Debug)]
pub enum WriteOutcome {
    /// Empty chunk, nothing stored
    Skipped,
    /// Fit in the free tail
    Appended,
    /// Unread region moved to offset 0 first
    Compacted,
    /// Backing store replaced; `retired` is the previous one
    ///
    /// Handed back so the render thread can defer its deallocation.
    Grown { retired: Vec<Sample> },
}

/// Single-producer single-consumer sample store
///
/// Not thread-safe by itself: owned by the render worker, which is the only
/// writer and reader.
#[derive(Debug)]
pub struct RingBuffer {
    /// Backing store, `len() == capacity`
    data: Vec<Sample>,
    read_index: usize,
    write_index: usize,
    initial_buffer_length: usize,
    state: BufferState,
    /// Silence-filled samples since the last non-empty read
    underflow_count: u64,
}

impl RingBuffer {
    /// Create a buffer with `capacity` samples pre-allocated
    pub fn new(capacity: usize, initial_buffer_length: usize) -> Self {
        Self {
            data: vec![0.0; capacity],
            read_index: 0,
            write_index: 0,
            initial_buffer_length,
            state: BufferState::Accumulating,
            underflow_count: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of samples written but not yet read
    #[inline]
    pub fn unread_len(&self) -> usize {
        self.write_index - self.read_index
    }

    /// View of the unread region
    pub fn unread(&self) -> &[Sample] {
        &self.data[self.read_index..self.write_index]
    }

    #[inline]
    pub fn state(&self) -> BufferState {
        self.state
    }

    #[inline]
    pub fn underflow_count(&self) -> u64 {
        self.underflow_count
    }

    #[inline]
    pub fn initial_buffer_length(&self) -> usize {
        self.initial_buffer_length
    }

    /// Change the cushion required before playback (re)starts
    ///
    /// Takes effect at the next write.
    pub fn set_initial_buffer_length(&mut self, samples: usize) {
        self.initial_buffer_length = samples;
    }

    /// Append a chunk to the unread region
    ///
    /// On allocation failure the buffer is left untouched.
    pub fn write(&mut self, samples: &[Sample]) -> Result<WriteOutcome, BufferError> {
        if samples.is_empty() {
            return Ok(WriteOutcome::Skipped);
        }
        let len = samples.len();

        let outcome = if self.write_index + len <= self.capacity() {
            WriteOutcome::Appended
        } else if self.read_index >= len {
            self.compact();
            WriteOutcome::Compacted
        } else {
            WriteOutcome::Grown {
                retired: self.grow(len)?,
            }
        };

        self.data[self.write_index..self.write_index + len].copy_from_slice(samples);
        self.write_index += len;

        if self.unread_len() >= self.initial_buffer_length {
            self.state = BufferState::Ready;
        }

        Ok(outcome)
    }

    /// Copy up to `destination.len()` samples out, zero-filling the rest
    ///
    /// Returns the number of real samples copied. While accumulating this is
    /// always 0, even if some samples are buffered.
    pub fn read(&mut self, destination: &mut [Sample]) -> usize {
        if destination.is_empty() {
            return 0;
        }
        if self.state == BufferState::Accumulating {
            destination.fill(0.0);
            return 0;
        }

        let copied = destination.len().min(self.unread_len());
        destination[..copied]
            .copy_from_slice(&self.data[self.read_index..self.read_index + copied]);
        destination[copied..].fill(0.0);
        self.read_index += copied;

        self.settle(copied, destination.len() - copied);
        copied
    }

    /// Read resampled to `rate`
    ///
    /// Consumes `ceil(destination.len() × rate)` samples (or whatever is
    /// unread) and linearly interpolates them onto the destination. Normal
    /// speed delegates to [`RingBuffer::read`] so the output is bit-identical.
    pub fn read_with_speed(&mut self, destination: &mut [Sample], rate: PlaybackRate) -> usize {
        if rate.is_normal() {
            return self.read(destination);
        }
        if destination.is_empty() {
            return 0;
        }
        if self.state == BufferState::Accumulating {
            destination.fill(0.0);
            return 0;
        }

        let rate = rate.get();
        let needed = (destination.len() as f64 * rate).ceil() as usize;
        let copied = needed.min(self.unread_len());

        if copied == 0 {
            destination.fill(0.0);
            self.settle(0, destination.len());
            return 0;
        }

        let source = &self.data[self.read_index..self.read_index + copied];
        let mut silent = 0usize;
        for (i, out) in destination.iter_mut().enumerate() {
            *out = match linear_at(source, i as f64 * rate) {
                Some(value) => value,
                None => {
                    silent += 1;
                    0.0
                }
            };
        }
        self.read_index += copied;

        self.settle(copied, silent);
        copied
    }

    /// Discard everything unread
    ///
    /// Capacity and state are left alone; an empty `Ready` buffer falls back
    /// to `Accumulating` on its next read.
    pub fn clear_buffer(&mut self) {
        self.read_index = 0;
        self.write_index = 0;
    }

    /// Post-read bookkeeping shared by plain and speed reads
    #[inline]
    fn settle(&mut self, copied: usize, silent: usize) {
        if copied == 0 {
            self.state = BufferState::Accumulating;
        } else {
            self.underflow_count = 0;
        }
        self.underflow_count += silent as u64;
    }

    /// Move the unread region to offset 0 (no allocation)
    fn compact(&mut self) {
        self.data.copy_within(self.read_index..self.write_index, 0);
        self.write_index -= self.read_index;
        self.read_index = 0;
    }

    /// Replace the backing store with one of `2 × (incoming + unread)` samples
    ///
    /// This is the only allocating path and it runs on the render thread;
    /// size the initial capacity so steady streaming never reaches it.
    fn grow(&mut self, incoming: usize) -> Result<Vec<Sample>, BufferError> {
        let unread = self.unread_len();
        let allocation_error = |requested| BufferError::Allocation { requested, unread };

        let requested = incoming
            .checked_add(unread)
            .and_then(|n| n.checked_mul(2))
            .ok_or_else(|| allocation_error(usize::MAX))?;

        let mut grown: Vec<Sample> = Vec::new();
        grown
            .try_reserve_exact(requested)
            .map_err(|_| allocation_error(requested))?;
        grown.extend_from_slice(&self.data[self.read_index..self.write_index]);
        grown.resize(requested, 0.0);

        self.read_index = 0;
        self.write_index = unread;
        Ok(std::mem::replace(&mut self.data, grown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<Sample> {
        (0..len).map(|i| i as Sample / len as Sample).collect()
    }

    #[test]
    fn test_starts_accumulating_and_empty() {
        let buffer = RingBuffer::new(16, 4);
        assert_eq!(buffer.state(), BufferState::Accumulating);
        assert_eq!(buffer.unread_len(), 0);
        assert_eq!(buffer.capacity(), 16);
    }

    #[test]
    fn test_unread_tracks_writes_minus_reads() {
        let mut buffer = RingBuffer::new(64, 0);
        let mut written = 0;
        let mut read = 0;
        let mut frame = [0.0; 5];

        for chunk in [3usize, 7, 11, 2] {
            buffer.write(&ramp(chunk)).unwrap();
            written += chunk;
            read += buffer.read(&mut frame);
            assert_eq!(buffer.unread_len(), written - read);
        }
    }

    #[test]
    fn test_append_in_place_when_tail_fits() {
        let mut buffer = RingBuffer::new(8, 0);
        assert!(matches!(buffer.write(&[0.1; 4]).unwrap(), WriteOutcome::Appended));
        assert!(matches!(buffer.write(&[0.2; 4]).unwrap(), WriteOutcome::Appended));
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.unread_len(), 8);
    }

    #[test]
    fn test_compacts_when_head_is_reclaimable() {
        let mut buffer = RingBuffer::new(8, 0);
        buffer.write(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let mut frame = [0.0; 4];
        assert_eq!(buffer.read(&mut frame), 4);

        // Tail has 2 free, head has 4 consumed: a 3-sample chunk compacts
        let outcome = buffer.write(&[7.0, 8.0, 9.0]).unwrap();
        assert!(matches!(outcome, WriteOutcome::Compacted));
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.unread(), &[5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_grows_to_twice_working_set() {
        let mut buffer = RingBuffer::new(8, 0);
        buffer.write(&[1.0; 6]).unwrap();
        let mut frame = [0.0; 2];
        buffer.read(&mut frame);

        // 4 unread, head only holds 2: grow to 2 × (5 + 4)
        match buffer.write(&[2.0; 5]).unwrap() {
            WriteOutcome::Grown { retired } => assert_eq!(retired.len(), 8),
            other => panic!("expected growth, got {:?}", other),
        }
        assert_eq!(buffer.capacity(), 18);
        assert_eq!(buffer.unread_len(), 9);
        assert_eq!(&buffer.unread()[..4], &[1.0; 4]);
        assert_eq!(&buffer.unread()[4..], &[2.0; 5]);
    }

    #[test]
    fn test_one_second_buffer_grows_for_oversized_chunk() {
        let mut buffer = RingBuffer::new(24000, 0);
        let chunk = ramp(30000);
        buffer.write(&chunk).unwrap();

        assert!(buffer.capacity() >= 60000);
        assert_eq!(buffer.unread_len(), 30000);
        assert_eq!(buffer.unread(), chunk.as_slice());
    }

    #[test]
    fn test_empty_write_is_skipped() {
        let mut buffer = RingBuffer::new(4, 0);
        assert!(matches!(buffer.write(&[]).unwrap(), WriteOutcome::Skipped));
        assert_eq!(buffer.state(), BufferState::Accumulating);
    }

    #[test]
    fn test_accumulating_reads_silence_until_threshold() {
        let mut buffer = RingBuffer::new(64, 8);
        let mut frame = [1.0; 4];

        buffer.write(&[0.5; 5]).unwrap();
        assert_eq!(buffer.read(&mut frame), 0);
        assert_eq!(frame, [0.0; 4]);
        assert_eq!(buffer.unread_len(), 5);

        buffer.write(&[0.5; 3]).unwrap();
        assert_eq!(buffer.state(), BufferState::Ready);
        assert_eq!(buffer.read(&mut frame), 4);
        assert_eq!(frame, [0.5; 4]);
    }

    #[test]
    fn test_drained_buffer_requires_fresh_cushion() {
        let mut buffer = RingBuffer::new(64, 4);
        let mut frame = [0.0; 4];

        buffer.write(&[0.25; 4]).unwrap();
        assert_eq!(buffer.read(&mut frame), 4);
        assert_eq!(buffer.unread_len(), 0);

        // Nothing left: this read flips back to accumulating
        assert_eq!(buffer.read(&mut frame), 0);
        assert_eq!(frame, [0.0; 4]);
        assert_eq!(buffer.state(), BufferState::Accumulating);

        // A partial cushion stays silent
        buffer.write(&[0.75; 3]).unwrap();
        frame.fill(1.0);
        assert_eq!(buffer.read(&mut frame), 0);
        assert_eq!(frame, [0.0; 4]);

        buffer.write(&[0.75; 1]).unwrap();
        assert_eq!(buffer.read(&mut frame), 4);
        assert_eq!(frame, [0.75; 4]);
    }

    #[test]
    fn test_partial_read_zero_fills_and_counts_underflow() {
        let mut buffer = RingBuffer::new(16, 0);
        buffer.write(&[0.5, 0.5]).unwrap();

        let mut frame = [1.0; 5];
        assert_eq!(buffer.read(&mut frame), 2);
        assert_eq!(frame, [0.5, 0.5, 0.0, 0.0, 0.0]);
        assert_eq!(buffer.underflow_count(), 3);

        assert_eq!(buffer.read(&mut frame), 0);
        assert_eq!(buffer.underflow_count(), 8);

        buffer.write(&[0.5; 5]).unwrap();
        assert_eq!(buffer.read(&mut frame), 5);
        assert_eq!(buffer.underflow_count(), 0);
    }

    #[test]
    fn test_clear_buffer_discards_unread() {
        let mut buffer = RingBuffer::new(16, 0);
        buffer.write(&[0.5; 10]).unwrap();
        buffer.clear_buffer();

        assert_eq!(buffer.unread_len(), 0);
        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.state(), BufferState::Ready);

        let mut frame = [1.0; 4];
        assert_eq!(buffer.read(&mut frame), 0);
        assert_eq!(frame, [0.0; 4]);
        assert_eq!(buffer.state(), BufferState::Accumulating);
    }

    #[test]
    fn test_speed_read_at_normal_rate_matches_plain_read() {
        let chunk = ramp(37);
        let mut plain = RingBuffer::new(64, 10);
        let mut speed = RingBuffer::new(64, 10);
        plain.write(&chunk).unwrap();
        speed.write(&chunk).unwrap();

        let mut a = [0.0; 16];
        let mut b = [0.0; 16];
        for _ in 0..4 {
            let copied_a = plain.read(&mut a);
            let copied_b = speed.read_with_speed(&mut b, PlaybackRate::NORMAL);
            assert_eq!(copied_a, copied_b);
            assert_eq!(
                a.map(f32::to_bits),
                b.map(f32::to_bits),
            );
            assert_eq!(plain.state(), speed.state());
        }
    }

    #[test]
    fn test_double_speed_interpolates_from_source_start() {
        let mut buffer = RingBuffer::new(8, 0);
        buffer.write(&[0.0, 1.0]).unwrap();

        let mut frame = [9.0; 1];
        assert_eq!(buffer.read_with_speed(&mut frame, PlaybackRate::new(2.0)), 2);
        assert_eq!(frame[0], 0.0);
        assert_eq!(buffer.unread_len(), 0);
    }

    #[test]
    fn test_double_speed_consumes_twice_the_frame() {
        let mut buffer = RingBuffer::new(32, 0);
        let chunk: Vec<Sample> = (0..16).map(|i| i as Sample).collect();
        buffer.write(&chunk).unwrap();

        let mut frame = [0.0; 4];
        assert_eq!(buffer.read_with_speed(&mut frame, PlaybackRate::new(2.0)), 8);
        assert_eq!(frame, [0.0, 2.0, 4.0, 6.0]);
        assert_eq!(buffer.unread_len(), 8);
    }

    #[test]
    fn test_half_speed_blends_neighbours() {
        let mut buffer = RingBuffer::new(32, 0);
        buffer.write(&[0.0, 1.0, 0.0, 1.0]).unwrap();

        let mut frame = [0.0; 4];
        assert_eq!(buffer.read_with_speed(&mut frame, PlaybackRate::new(0.5)), 2);
        assert_eq!(frame, [0.0, 0.5, 1.0, 1.0]);
        assert_eq!(buffer.unread(), &[0.0, 1.0]);
    }

    #[test]
    fn test_speed_read_short_source_pads_with_silence() {
        let mut buffer = RingBuffer::new(32, 0);
        buffer.write(&[0.5, 0.5, 0.5]).unwrap();

        let mut frame = [9.0; 4];
        assert_eq!(buffer.read_with_speed(&mut frame, PlaybackRate::new(1.5)), 3);
        // positions 0, 1.5, 3.0, 4.5 over a 3-sample source
        assert_eq!(frame, [0.5, 0.5, 0.0, 0.0]);
        assert_eq!(buffer.underflow_count(), 2);
    }

    #[test]
    fn test_speed_read_on_empty_ready_buffer_accumulates() {
        let mut buffer = RingBuffer::new(8, 2);
        buffer.write(&[0.5, 0.5]).unwrap();
        let mut frame = [0.0; 2];
        buffer.read_with_speed(&mut frame, PlaybackRate::new(1.5));
        assert_eq!(buffer.state(), BufferState::Ready);

        frame.fill(1.0);
        assert_eq!(buffer.read_with_speed(&mut frame, PlaybackRate::new(1.5)), 0);
        assert_eq!(frame, [0.0; 2]);
        assert_eq!(buffer.state(), BufferState::Accumulating);
    }

    #[test]
    fn test_speed_read_while_accumulating_is_silent() {
        let mut buffer = RingBuffer::new(8, 6);
        buffer.write(&[0.5; 4]).unwrap();

        let mut frame = [1.0; 2];
        assert_eq!(buffer.read_with_speed(&mut frame, PlaybackRate::new(2.0)), 0);
        assert_eq!(frame, [0.0; 2]);
        assert_eq!(buffer.unread_len(), 4);
    }

    #[test]
    fn test_threshold_change_applies_on_next_write() {
        let mut buffer = RingBuffer::new(16, 8);
        buffer.write(&[0.5; 4]).unwrap();
        buffer.set_initial_buffer_length(4);
        assert_eq!(buffer.state(), BufferState::Accumulating);

        buffer.write(&[0.5; 1]).unwrap();
        assert_eq!(buffer.state(), BufferState::Ready);
    }

    #[test]
    fn test_error_display() {
        let err = BufferError::Allocation {
            requested: 60000,
            unread: 12,
        };
        assert!(err.to_string().contains("60000"));
        assert!(err.to_string().contains("12"));
    }
}
