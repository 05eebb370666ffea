//! Buffer storage for the host device
//!
//! One `MemoryManager` per execution context. Buffers are plain heap vectors
//! of `i64`, zero-initialized on allocation.

use crate::backend::{BufferHandle, DeviceView};
use crate::error::{BackendError, Result};
use std::collections::HashMap;

pub struct MemoryManager {
    buffers: HashMap<u64, Vec<i64>>,

    /// Next buffer handle ID
    next_buffer_id: u64,
}

impl MemoryManager {
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            next_buffer_id: 1,
        }
    }

    /// Allocate a zeroed buffer of `len` elements
    pub fn allocate_buffer(&mut self, len: usize) -> Result<BufferHandle> {
        let id = self.next_buffer_id;
        self.next_buffer_id += 1;

        self.buffers.insert(id, vec![0i64; len]);

        Ok(BufferHandle::new(id))
    }

    /// Free a buffer
    pub fn free_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        if self.buffers.remove(&handle.id()).is_none() {
            return Err(BackendError::InvalidBufferHandle(handle));
        }
        Ok(())
    }

    /// Elements covered by `view`, bounds-checked against its buffer
    pub fn view(&self, view: &DeviceView) -> Result<&[i64]> {
        let buffer = self
            .buffers
            .get(&view.buffer.id())
            .ok_or(BackendError::InvalidBufferHandle(view.buffer))?;
        view.check_bounds(buffer.len())?;
        Ok(&buffer[view.range()])
    }

    /// Mutable elements covered by `view`, bounds-checked against its buffer
    pub fn view_mut(&mut self, view: &DeviceView) -> Result<&mut [i64]> {
        let buffer = self
            .buffers
            .get_mut(&view.buffer.id())
            .ok_or(BackendError::InvalidBufferHandle(view.buffer))?;
        view.check_bounds(buffer.len())?;
        Ok(&mut buffer[view.range()])
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AccessMode;

    #[test]
    fn test_memory_manager_buffer_allocation() {
        let mut manager = MemoryManager::new();

        let buffer = manager.allocate_buffer(1024).unwrap();
        let whole = DeviceView::prefix(buffer, AccessMode::Read, 1024);
        assert_eq!(manager.view(&whole).unwrap().len(), 1024);

        manager.free_buffer(buffer).unwrap();

        // Should fail after free
        assert!(manager.view(&whole).is_err());
        assert!(manager.free_buffer(buffer).is_err());
    }

    #[test]
    fn test_buffers_start_zeroed() {
        let mut manager = MemoryManager::new();
        let buffer = manager.allocate_buffer(16).unwrap();
        let view = DeviceView::prefix(buffer, AccessMode::Read, 16);
        assert!(manager.view(&view).unwrap().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_views_are_bounds_checked() {
        let mut manager = MemoryManager::new();
        let buffer = manager.allocate_buffer(8).unwrap();

        let inside = DeviceView::new(buffer, AccessMode::ReadWrite, 2, 4);
        manager.view_mut(&inside).unwrap().fill(5);
        assert_eq!(manager.view(&DeviceView::prefix(buffer, AccessMode::Read, 8)).unwrap(), &[0, 0, 5, 5, 5, 5, 0, 0]);

        let outside = DeviceView::new(buffer, AccessMode::Read, 6, 4);
        assert!(matches!(
            manager.view(&outside),
            Err(BackendError::ViewOutOfBounds { buffer_len: 8, .. })
        ));
    }
}
