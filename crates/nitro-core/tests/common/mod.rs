//! Shared in-process servers for integration tests. Each test binary uses
//! only some of the helpers.
#![allow(dead_code)]

pub mod ftp_server;
pub mod range_server;

/// Deterministic non-repeating-ish test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}
