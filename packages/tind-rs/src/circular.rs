use core::fmt;

use crate::error::Result;

/// Column of `len` copies of `value`, reporting allocation failure instead of aborting.
pub fn column(len: usize, value: f64) -> Result<Vec<f64>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)?;
    data.resize(len, value);
    Ok(data)
}

/// Fixed-capacity window over the most recent samples (overwrite-oldest when full).
///
/// Streaming kernels keep their look-behind history here. The storage is
/// reserved up front and never reallocated.
#[derive(Clone)]
pub struct Window {
    capacity: usize,
    head: usize, // next write index
    data: Vec<f64>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

impl Window {
    /// Fails with `OutOfMemory` when the storage cannot be reserved.
    pub fn new(capacity: usize) -> Result<Self> {
        assert!(capacity > 0, "capacity must be > 0");
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        Ok(Self {
            capacity,
            head: 0,
            data,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Pushes a sample, returning the one it evicted once the window is full.
    #[inline]
    pub fn push(&mut self, v: f64) -> Option<f64> {
        let evicted = if self.is_full() {
            Some(core::mem::replace(&mut self.data[self.head], v))
        } else {
            self.data.push(v);
            None
        };
        self.head = (self.head + 1) % self.capacity;
        evicted
    }

    /// Oldest sample; the next one `push` evicts when full.
    #[inline]
    pub fn oldest(&self) -> Option<f64> {
        if self.is_full() {
            Some(self.data[self.head])
        } else {
            self.data.first().copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{column, Window};
    use crate::error::{ErrorKind, TindError};

    #[test]
    fn window_evicts_oldest_first() {
        let mut w = Window::new(3).unwrap();
        assert_eq!(w.push(1.0), None);
        assert_eq!(w.push(2.0), None);
        assert_eq!(w.oldest(), Some(1.0));
        assert_eq!(w.push(3.0), None);
        assert!(w.is_full());
        assert_eq!(w.push(4.0), Some(1.0));
        assert_eq!(w.oldest(), Some(2.0));
        assert_eq!(w.push(5.0), Some(2.0));
        assert_eq!(w.push(6.0), Some(3.0));
        assert_eq!(w.push(7.0), Some(4.0));
        assert_eq!(w.oldest(), Some(5.0));
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn single_slot_window() {
        let mut w = Window::new(1).unwrap();
        assert!(w.is_empty());
        assert_eq!(w.oldest(), None);
        assert_eq!(w.push(10.0), None);
        assert_eq!(w.oldest(), Some(10.0));
        assert_eq!(w.push(20.0), Some(10.0));
        assert_eq!(w.oldest(), Some(20.0));
    }

    #[test]
    fn unreservable_storage_is_out_of_memory() {
        let err = Window::new(usize::MAX).unwrap_err();
        assert_eq!(err, TindError::OutOfMemory);
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert_eq!(column(usize::MAX, 0.0).unwrap_err(), TindError::OutOfMemory);
        assert_eq!(column(3, f64::NAN).unwrap().len(), 3);
    }
}
