//! Savepoint frame bookkeeping for one transaction scope.
//!
//! Frames live on a stack. Several frames may share a caller-visible name;
//! each gets a unique backend name, and lookups by name scan from the most
//! recent frame backward so the newest live frame always wins.

use crate::error::{DbError, DbResult};

/// One nameable rollback point inside a transaction scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavepointFrame {
    pub requested_name: String,
    /// Name sent to the backend, unique within the scope.
    pub internal_name: String,
    pub sequence: u64,
}

#[derive(Debug, Default)]
pub struct SavepointStack {
    frames: Vec<SavepointFrame>,
    next_sequence: u64,
}

impl SavepointStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new frame and return it.
    pub fn push(&mut self, requested_name: &str) -> SavepointFrame {
        self.next_sequence += 1;
        let frame = SavepointFrame {
            requested_name: requested_name.to_string(),
            internal_name: internal_name(requested_name, self.next_sequence),
            sequence: self.next_sequence,
        };
        self.frames.push(frame.clone());
        frame
    }

    /// Drop the most recent frame (used when the backend rejected its creation).
    pub fn pop(&mut self) -> Option<SavepointFrame> {
        self.frames.pop()
    }

    /// Most recent live frame with `name`, with its stack position.
    pub fn resolve(&self, name: &str) -> DbResult<(usize, &SavepointFrame)> {
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find(|(_, frame)| frame.requested_name == name)
            .ok_or_else(|| {
                DbError::transaction(format!(
                    "Savepoint '{}' does not exist or was already released or rolled back",
                    name
                ))
            })
    }

    /// Live frame created with `sequence`, with its stack position.
    pub fn resolve_sequence(&self, sequence: u64) -> DbResult<(usize, &SavepointFrame)> {
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find(|(_, frame)| frame.sequence == sequence)
            .ok_or_else(|| {
                DbError::transaction(
                    "Nested transaction savepoint was destroyed by an earlier rollback or release",
                )
            })
    }

    /// Destroy the frame at `index` and every frame created after it.
    pub fn discard_from(&mut self, index: usize) -> Vec<SavepointFrame> {
        if index >= self.frames.len() {
            return Vec::new();
        }
        self.frames.split_off(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Caller-visible names of the live frames, oldest first.
    pub fn names(&self) -> Vec<&str> {
        self.frames
            .iter()
            .map(|f| f.requested_name.as_str())
            .collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Backend name for a frame: `sp_<seq>_<name>` with the name reduced to `[A-Za-z0-9_]`.
fn internal_name(requested_name: &str, sequence: u64) -> String {
    let sanitized: String = requested_name
        .chars()
        .take(32)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        format!("sp_{}", sequence)
    } else {
        format!("sp_{}_{}", sequence, sanitized)
    }
}
