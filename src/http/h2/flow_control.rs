//! HTTP/2 flow control
//!
//! This module implements flow control as defined in RFC 7540 Section 5.2.
//! The same pair of windows is kept for the connection and for each stream.

use super::error::{Error, Result};
use super::DEFAULT_INITIAL_WINDOW_SIZE;

/// Largest legal window size (2^31 - 1)
pub const MAX_WINDOW_SIZE: i64 = 0x7FFFFFFF;

/// Flow control window
#[derive(Debug, Clone)]
pub struct FlowControlWindow {
    initial_size: u32,
    /// Can go negative after a SETTINGS change shrinks the initial size
    current_size: i64,
}

impl FlowControlWindow {
    /// Create a new flow control window with specified initial size
    pub fn with_initial_size(initial_size: u32) -> Self {
        FlowControlWindow {
            initial_size,
            current_size: initial_size as i64,
        }
    }

    /// Get current window size
    pub fn size(&self) -> i64 {
        self.current_size
    }

    /// Get initial window size
    pub fn initial_size(&self) -> u32 {
        self.initial_size
    }

    /// Bytes that may be sent right now, capped at `limit`
    pub fn available(&self, limit: usize) -> usize {
        if self.current_size <= 0 {
            0
        } else {
            limit.min(self.current_size as usize)
        }
    }

    /// Increase window size (WINDOW_UPDATE)
    ///
    /// Returns the new window size
    pub fn increase(&mut self, increment: u32) -> Result<i64> {
        if increment == 0 {
            return Err(Error::Protocol(
                "Window update increment must be non-zero".to_string(),
            ));
        }

        let new_size = self.current_size + increment as i64;

        // RFC 7540 Section 6.9.1
        if new_size > MAX_WINDOW_SIZE {
            return Err(Error::FlowControl(format!(
                "Window size {} exceeds maximum (2^31-1)",
                new_size
            )));
        }

        self.current_size = new_size;
        Ok(self.current_size)
    }

    /// Decrease window size (data sent or received)
    pub fn decrease(&mut self, amount: usize) {
        self.current_size -= amount as i64;
    }

    /// Update initial window size from SETTINGS
    ///
    /// The current size moves by the same delta (RFC 7540 Section 6.9.2).
    pub fn update_initial_size(&mut self, new_initial_size: u32) -> Result<()> {
        let diff = new_initial_size as i64 - self.initial_size as i64;
        let new_current = self.current_size + diff;

        if new_current > MAX_WINDOW_SIZE {
            return Err(Error::FlowControl(format!(
                "New window size {} exceeds maximum (2^31-1)",
                new_current
            )));
        }

        self.initial_size = new_initial_size;
        self.current_size = new_current;

        Ok(())
    }
}

impl Default for FlowControlWindow {
    fn default() -> Self {
        Self::with_initial_size(DEFAULT_INITIAL_WINDOW_SIZE)
    }
}

/// Send and receive windows for the connection or a single stream
#[derive(Debug, Clone, Default)]
pub struct FlowControl {
    send_window: FlowControlWindow,
    recv_window: FlowControlWindow,
}

impl FlowControl {
    /// Create with specified initial window sizes
    pub fn with_initial_sizes(send_size: u32, recv_size: u32) -> Self {
        FlowControl {
            send_window: FlowControlWindow::with_initial_size(send_size),
            recv_window: FlowControlWindow::with_initial_size(recv_size),
        }
    }

    /// Get send window
    pub fn send_window(&self) -> &FlowControlWindow {
        &self.send_window
    }

    /// Get mutable send window
    pub fn send_window_mut(&mut self) -> &mut FlowControlWindow {
        &mut self.send_window
    }

    /// Get receive window
    pub fn recv_window(&self) -> &FlowControlWindow {
        &self.recv_window
    }

    /// Account for outbound data
    pub fn consume_send_window(&mut self, amount: usize) {
        self.send_window.decrease(amount);
    }

    /// Increase send window from WINDOW_UPDATE
    pub fn increase_send_window(&mut self, increment: u32) -> Result<i64> {
        self.send_window.increase(increment)
    }

    /// Account for inbound data
    ///
    /// Fails if the peer sent more than it was allowed to.
    pub fn consume_recv_window(&mut self, amount: usize) -> Result<()> {
        self.recv_window.decrease(amount);
        if self.recv_window.size() < 0 {
            return Err(Error::FlowControl(format!(
                "Peer overran receive window by {} bytes",
                -self.recv_window.size()
            )));
        }
        Ok(())
    }

    /// Increment to announce once less than half the receive window is left
    pub fn should_send_window_update(&self) -> Option<u32> {
        let recv_size = self.recv_window.size();
        let initial_size = self.recv_window.initial_size() as i64;

        if recv_size < initial_size / 2 {
            Some((initial_size - recv_size) as u32)
        } else {
            None
        }
    }

    /// Record an announced WINDOW_UPDATE (grows the receive window)
    pub fn send_window_update(&mut self, increment: u32) -> Result<i64> {
        self.recv_window.increase(increment)
    }
}
