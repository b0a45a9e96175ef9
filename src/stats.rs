//! Session encode statistics
//!
//! Updated by the engine after each completed unit and each locally-handled
//! backpressure event; read for logging and the end-of-session report.

use std::time::{Duration, Instant};

/// Running statistics for one encode session
#[derive(Debug, Clone)]
pub struct EncodeStats {
    /// Units successfully synchronized
    pub frames_encoded: u64,

    /// Encoded bytes handed to the sink
    pub bytes_emitted: u64,

    /// Key frames among the encoded units
    pub keyframes: u64,

    /// Busy statuses absorbed by the retry loop
    pub busy_retries: u64,

    /// Bitstream buffer growths triggered by capacity conditions
    pub buffer_growths: u64,

    /// Non-fatal device warnings observed (adjusted params, partial
    /// acceleration)
    pub warnings: u64,

    /// Average completion-wait time per unit in milliseconds
    pub avg_sync_ms: f32,

    /// Longest completion wait observed (ms)
    pub max_sync_ms: f32,

    created_at: Instant,
}

impl Default for EncodeStats {
    fn default() -> Self {
        Self {
            frames_encoded: 0,
            bytes_emitted: 0,
            keyframes: 0,
            busy_retries: 0,
            buffer_growths: 0,
            warnings: 0,
            avg_sync_ms: 0.0,
            max_sync_ms: 0.0,
            created_at: Instant::now(),
        }
    }
}

impl EncodeStats {
    /// Record one completed unit
    pub fn record_frame(&mut self, bytes: usize, key_frame: bool, sync_wait: Duration) {
        self.frames_encoded += 1;
        self.bytes_emitted += bytes as u64;
        if key_frame {
            self.keyframes += 1;
        }

        let sync_ms = sync_wait.as_secs_f32() * 1000.0;
        if self.frames_encoded == 1 {
            self.avg_sync_ms = sync_ms;
        } else {
            // Exponential moving average (α = 0.1)
            self.avg_sync_ms = self.avg_sync_ms * 0.9 + sync_ms * 0.1;
        }
        self.max_sync_ms = self.max_sync_ms.max(sync_ms);
    }

    /// Time since the session was created
    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// End-of-session summary returned by the engine
#[derive(Debug, Clone, Copy)]
pub struct EncodeReport {
    /// Total units emitted
    pub frames: u64,
    /// Total encoded bytes
    pub bytes: u64,
    /// Wall time spent between the first submission and full drain
    pub elapsed: Duration,
}

impl EncodeReport {
    /// Achieved throughput in frames per second
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}
