//! Reusable curl handles for HTTP segments.
//!
//! A libcurl easy handle owns a connection cache that survives `reset()`, so
//! handing a finished handle back lets the next segment (or the next download
//! through the same transport) skip the TCP/TLS handshake.

use std::sync::Mutex;

use curl::easy::Easy;

pub struct HandlePool {
    idle: Mutex<Vec<Easy>>,
    capacity: usize,
}

impl HandlePool {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of handles waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Take an idle handle, or create a fresh one.
    pub fn checkout(&self) -> Easy {
        let reused = self.idle.lock().unwrap_or_else(|e| e.into_inner()).pop();
        reused.unwrap_or_else(Easy::new)
    }

    /// Return a handle. Options are reset; live connections are kept. Handles
    /// beyond capacity are dropped, closing their connections.
    pub fn checkin(&self, mut easy: Easy) {
        easy.reset();
        let mut idle = self.idle.lock().unwrap_or_else(|e| e.into_inner());
        if idle.len() < self.capacity {
            idle.push(easy);
        }
    }
}
