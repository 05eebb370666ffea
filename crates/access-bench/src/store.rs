//! Host-owned backing store

use crate::error::{BenchError, Result};
use std::ops::Range;

/// Contiguous `i64` storage owned by the host
///
/// One store per case. It is handed to one repetition at a time and
/// zero-filled before every repetition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackingStore {
    data: Vec<i64>,
}

impl BackingStore {
    pub fn new(len: usize) -> Self {
        Self { data: vec![0; len] }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Zero-fill the whole store
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Check an extent starting at 0 fits in the store
    pub fn check_extent(&self, extent: usize) -> Result<()> {
        if extent > self.data.len() {
            return Err(BenchError::ExtentExceedsStore {
                extent,
                store: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.data
    }

    pub fn slice(&self, range: Range<usize>) -> &[i64] {
        &self.data[range]
    }

    pub fn slice_mut(&mut self, range: Range<usize>) -> &mut [i64] {
        &mut self.data[range]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_zero_fills() {
        let mut store = BackingStore::new(8);
        store.slice_mut(2..5).fill(9);
        assert_eq!(store.as_slice()[3], 9);
        store.reset();
        assert!(store.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn extent_checks() {
        let store = BackingStore::new(16);
        assert!(store.check_extent(16).is_ok());
        assert!(matches!(
            store.check_extent(17),
            Err(BenchError::ExtentExceedsStore { extent: 17, store: 16 })
        ));
        assert!(!store.is_empty());
        assert!(BackingStore::new(0).is_empty());
    }
}
