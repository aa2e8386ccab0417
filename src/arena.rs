use std::alloc::{ self, Layout };
use std::ptr::NonNull;

use log::{ debug, trace };

use crate::{
  internal::assert_no_drop,
  config::TapeConfig,
  error::{ Result, TapeError },
};


/// Alignment of every segment. Blocks may request at most this much.

pub const MAX_ALIGN: usize = 64;


#[derive(Debug)]
struct Segment {
  ptr: NonNull<u8>,
  size: usize,
}

impl Segment {
  fn new(size: usize) -> Option<Self> {
    if size == 0 { return None }
    let layout = Layout::from_size_align(size, MAX_ALIGN).ok()?;
    let ptr = NonNull::new(unsafe { alloc::alloc(layout) })?;
    Some(Self { ptr, size })
  }
}

impl Drop for Segment {
  fn drop(&mut self) {
    unsafe {
      alloc::dealloc(self.ptr.as_ptr(), Layout::from_size_align_unchecked(self.size, MAX_ALIGN));
    }
  }
}


/// Bulk memory pool with sequential allocation and a single bulk recovery.
///
/// Memory is reserved in segments that never move, so blocks stay valid
/// when the arena grows. Individual blocks are never released. [recover](Arena::recover)
/// makes every block available again at once and keeps the segments around
/// for the next computation.
///
/// Nothing placed in the arena ever gets dropped. [alloc](Arena::alloc) refuses
/// to compile for types with drop glue.

#[derive(Debug)]
pub struct Arena {
  segments: Vec<Segment>,
  current: usize,
  cursor: usize,
  allocated: usize,
  capacity: usize,
  initial_capacity: usize,
  max_capacity: Option<usize>,
}

impl Default for Arena {
  fn default() -> Self {
    Self::new(&TapeConfig::default())
  }
}

impl Arena {
  /// Create an empty arena. No memory is reserved before the first allocation.

  pub fn new(config: &TapeConfig) -> Self {
    Self {
      segments: vec![],
      current: 0,
      cursor: 0,
      allocated: 0,
      capacity: 0,
      initial_capacity: config.initial_capacity,
      max_capacity: config.max_capacity,
    }
  }

  /// Return a block of at least `layout.size()` bytes aligned to `layout.align()`.

  pub fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>> {
    if layout.align() > MAX_ALIGN {
      return Err(TapeError::UnsupportedLayout { size: layout.size(), align: layout.align() })
    }
    loop {
      if let Some(segment) = self.segments.get(self.current) {
        let start = align_up(self.cursor, layout.align());
        if start <= segment.size && segment.size - start >= layout.size() {
          self.cursor = start + layout.size();
          self.allocated += layout.size();
          // Segment bases are aligned to MAX_ALIGN, so aligned offsets give aligned pointers
          return Ok(unsafe { NonNull::new_unchecked(segment.ptr.as_ptr().add(start)) })
        }
        if self.current + 1 < self.segments.len() {
          self.current += 1;
          self.cursor = 0;
          trace!("reusing arena segment {} of {}", self.current + 1, self.segments.len());
          continue
        }
      }
      self.grow(layout.size())?;
    }
  }

  /// Move `value` into the arena.

  pub fn alloc<N>(&mut self, value: N) -> Result<NonNull<N>> {
    assert_no_drop::<N>();
    let ptr = self.allocate(Layout::new::<N>())?.cast::<N>();
    unsafe { ptr.as_ptr().write(value) };
    Ok(ptr)
  }

  /// Copy `items` into a contiguous block of the arena.

  pub fn alloc_slice_copy<U: Copy>(&mut self, items: &[U]) -> Result<NonNull<[U]>> {
    let layout = Layout::array::<U>(items.len()).map_err(|_| TapeError::OutOfMemory {
      requested: usize::MAX,
      capacity: self.capacity,
    })?;
    let ptr = self.allocate(layout)?.cast::<U>();
    unsafe { std::ptr::copy_nonoverlapping(items.as_ptr(), ptr.as_ptr(), items.len()) };
    Ok(NonNull::slice_from_raw_parts(ptr, items.len()))
  }

  /// Invalidate every block handed out so far and rewind to the first segment.
  ///
  /// Callers must make sure nothing still points into the arena.

  pub fn recover(&mut self) {
    trace!("recovering {} arena bytes", self.allocated);
    self.current = 0;
    self.cursor = 0;
    self.allocated = 0;
  }

  /// Recover and give every segment but the first back to the system allocator.

  pub fn free_all(&mut self) {
    self.recover();
    if self.segments.len() > 1 {
      self.segments.truncate(1);
      self.capacity = self.segments[0].size;
      debug!("arena shrunk to {} bytes", self.capacity);
    }
  }

  /// Bytes handed out since the last recovery, excluding alignment padding.

  pub fn bytes_allocated(&self) -> usize {
    self.allocated
  }

  /// Bytes reserved from the system allocator.

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn segments(&self) -> usize {
    self.segments.len()
  }

  /// Whether `ptr` points into memory reserved by this arena.

  pub fn contains<U: ?Sized>(&self, ptr: NonNull<U>) -> bool {
    let addr = ptr.cast::<u8>().as_ptr() as usize;
    self.segments.iter().any(|segment| {
      let base = segment.ptr.as_ptr() as usize;
      addr >= base && addr < base + segment.size
    })
  }

  fn grow(&mut self, needed: usize) -> Result<()> {
    let preferred = match self.segments.last() {
      Some(last) => last.size.saturating_mul(2),
      None => self.initial_capacity,
    };
    let mut size = preferred.max(needed).max(1);
    if let Some(max) = self.max_capacity {
      let remaining = max.saturating_sub(self.capacity);
      if needed > remaining {
        return Err(TapeError::OutOfMemory { requested: needed, capacity: self.capacity })
      }
      size = size.min(remaining);
    }
    let segment = Segment::new(size)
      .ok_or(TapeError::OutOfMemory { requested: needed, capacity: self.capacity })?;
    self.capacity += size;
    debug!("arena grew by {size} bytes to {} bytes in {} segments", self.capacity, self.segments.len() + 1);
    self.segments.push(segment);
    self.current = self.segments.len() - 1;
    self.cursor = 0;
    Ok(())
  }
}

#[inline]
fn align_up(offset: usize, align: usize) -> usize {
  (offset + align - 1) & !(align - 1)
}
