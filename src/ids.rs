//! Identifier generation for documents and list entries.
//!
//! Identifiers are produced outside the reducer and passed in with the action.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// `<base36 millis>-<base36 counter>-<random>`. The per-generator counter keeps
/// two calls within the same millisecond distinct even if the random part collides.
#[derive(Debug, Default)]
pub struct TimeRandomIds {
    counter: AtomicU64,
}

impl TimeRandomIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for TimeRandomIds {
    fn next_id(&self) -> String {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let random = Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", to_base36(millis), to_base36(seq), &random[..8])
    }
}

/// Deterministic `prefix-1`, `prefix-2`, ... generator.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
