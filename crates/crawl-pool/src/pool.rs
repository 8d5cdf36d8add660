//! Credential pool with round-robin rotation order
//!
//! The pool owns the credential handles and a rotation order over their
//! indices. The front of the order is the current candidate; `rotate()`
//! moves it to the back. Credentials are never removed during a run, so
//! every credential is eventually retried.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::error::{Error, Result};

/// The current candidate credential and its index in the original list.
#[derive(Debug)]
pub struct Selected<'a, A> {
    pub index: usize,
    pub credential: &'a A,
}

/// Ordered credential handles plus a rotation order.
///
/// Invariant: `order` is a permutation of `0..credentials.len()`, so the
/// front always references a valid handle.
pub struct CredentialPool<A> {
    credentials: Vec<A>,
    order: VecDeque<usize>,
}

impl<A> CredentialPool<A> {
    /// Create a pool in credential-file order. An empty pool is allowed here
    /// but every `current()` call on it fails.
    pub fn new(credentials: Vec<A>) -> Self {
        let order = (0..credentials.len()).collect();
        info!(credentials = credentials.len(), "credential pool initialized");
        Self { credentials, order }
    }

    /// The credential at the front of the rotation order. No side effects.
    pub fn current(&self) -> Result<Selected<'_, A>> {
        let index = *self.order.front().ok_or(Error::EmptyPool)?;
        Ok(Selected {
            index,
            credential: &self.credentials[index],
        })
    }

    /// Move the front credential to the back. A no-op for pools of size 0 or 1.
    pub fn rotate(&mut self) {
        if let Some(front) = self.order.pop_front() {
            self.order.push_back(front);
            debug!(
                from = front,
                to = self.order.front().copied().unwrap_or(front),
                "rotated credential"
            );
        }
    }

    /// Rotate until `index` is at the front. Uses only `rotate()`, so the
    /// relative order of the other credentials is preserved.
    pub fn rotate_to(&mut self, index: usize) -> Result<()> {
        if index >= self.credentials.len() {
            return Err(Error::UnknownCredential(index));
        }
        while self.order.front() != Some(&index) {
            self.rotate();
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&A> {
        self.credentials.get(index)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Snapshot of the rotation order, front first.
    pub fn order(&self) -> Vec<usize> {
        self.order.iter().copied().collect()
    }
}
