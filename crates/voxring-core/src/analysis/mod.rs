//! Visualization tap on the rendered output
//!
//! The render worker copies every frame it emits into a lock-free queue;
//! the control side drains that queue into a rolling window whenever the UI
//! polls. Read-only with respect to playback: a slow or absent reader only
//! causes tap samples to be dropped, never affects the ring buffer.

use crate::types::Sample;

/// Default rolling window length in samples
pub const DEFAULT_ANALYSIS_WINDOW: usize = 2048;

/// Control-side end of the tap
pub struct AnalysisTap {
    consumer: rtrb::Consumer<Sample>,
    /// Circular window of the most recent samples
    window: Vec<Sample>,
    /// Next write position in `window`
    cursor: usize,
    /// Valid samples in `window` (saturates at its length)
    filled: usize,
}

/// Create a tap with a rolling window of `window_len` samples
///
/// The returned producer goes to the render worker.
pub fn analysis_tap(window_len: usize) -> (rtrb::Producer<Sample>, AnalysisTap) {
    let window_len = window_len.max(1);
    // Room for several animation frames between polls
    let (producer, consumer) = rtrb::RingBuffer::new(window_len * 4);
    (
        producer,
        AnalysisTap {
            consumer,
            window: vec![0.0; window_len],
            cursor: 0,
            filled: 0,
        },
    )
}

impl AnalysisTap {
    /// Move everything the render worker produced into the window
    fn pump(&mut self) {
        let len = self.window.len();
        while let Ok(sample) = self.consumer.pop() {
            self.window[self.cursor] = sample;
            self.cursor = (self.cursor + 1) % len;
            self.filled = (self.filled + 1).min(len);
        }
    }

    /// RMS level of the window, 0.0 before any output
    pub fn volume(&mut self) -> f64 {
        self.pump();
        if self.filled == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .recent()
            .map(|s| {
                let s = f64::from(s);
                s * s
            })
            .sum();
        (sum / self.filled as f64).sqrt()
    }

    /// Window contents, oldest first
    pub fn samples(&mut self) -> Vec<f64> {
        self.pump();
        self.recent().map(f64::from).collect()
    }

    fn recent(&self) -> impl Iterator<Item = Sample> + '_ {
        let (older, newer) = if self.filled < self.window.len() {
            (&self.window[..0], &self.window[..self.filled])
        } else {
            (&self.window[self.cursor..], &self.window[..self.cursor])
        };
        older.iter().chain(newer.iter()).copied()
    }
}
