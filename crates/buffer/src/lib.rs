//! Buffer pool manager sitting between the record manager and the
//! storage layer's paged file.
//!
//! A pool owns a fixed array of frames over one [`storage::PagedFile`].
//! Pins resolve a page number to a frame through a three-branch state
//! machine: hit an already-resident frame, fall back to an empty one,
//! or evict via the configured [`ReplacementStrategy`]. The legacy C
//! source hands callers a raw pointer into a frame's buffer that
//! outlives any lifetime tracking; [`PageHandle`] is instead an
//! index lease: [`BufferPool::frame_data`] / [`frame_data_mut`] borrow
//! from the pool itself, so the borrow checker enforces that the alias
//! cannot outlive the next `&mut self` call, rather than relying on a
//! runtime assertion to catch the same mistake.
//!
//! [`frame_data_mut`]: BufferPool::frame_data_mut


use common::{DbError, DbResult};
use std::path::{Path, PathBuf};
use storage::{PAGE_SIZE, PagedFile};

/// Page replacement policy a pool is configured with.
///
/// `Lfu` is declared but never dispatched in the legacy source; this
/// crate wires all four.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReplacementStrategy {
    Fifo,
    Lru,
    Clock,
    Lfu,
}

/// A lightweight pair identifying a pinned page and the frame it lives
/// in. Valid only until the next pool operation that could retarget the
/// frame (another pin past capacity, or `unpin_page`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageHandle {
    pub page_num: i32,
    frame_idx: usize,
}

impl PageHandle {
    pub fn page_num(&self) -> i32 {
        self.page_num
    }
}

/// A single buffer-pool slot.
///
/// `hit_num` doubles as the LRU monotonic hit counter and the CLOCK
/// reference bit (0 or 1); only one strategy is active per pool, so
/// the two meanings never collide. `ref_num` is the LFU reference
/// counter.
struct Frame {
    data: Box<[u8; PAGE_SIZE]>,
    page_num: Option<i32>,
    dirty: bool,
    pin_count: u32,
    hit_num: u64,
    ref_num: u64,
}

impl Frame {
    fn empty() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
            page_num: None,
            dirty: false,
            pin_count: 0,
            hit_num: 0,
            ref_num: 0,
        }
    }
}

/// Fixed-size pool of frames backed by one paged file.
pub struct BufferPool {
    page_file_name: PathBuf,
    file: PagedFile,
    frames: Vec<Frame>,
    strategy: ReplacementStrategy,
    read_io: u64,
    write_io: u64,
    fifo_hand: usize,
    clock_hand: usize,
    lru_clock: u64,
}

impl BufferPool {
    /// Allocates `num_pages` empty frames over an already-created paged
    /// file. `num_pages` must be at least 1.
    pub fn init(
        page_file_name: impl Into<PathBuf>,
        num_pages: usize,
        strategy: ReplacementStrategy,
    ) -> DbResult<Self> {
        if num_pages == 0 {
            return Err(DbError::Buffer("numPages must be >= 1".into()));
        }
        let page_file_name = page_file_name.into();
        let file = PagedFile::open(&page_file_name)?;
        let frames = (0..num_pages).map(|_| Frame::empty()).collect();
        Ok(Self {
            page_file_name,
            file,
            frames,
            strategy,
            read_io: 0,
            write_io: 0,
            fifo_hand: 0,
            clock_hand: 0,
            lru_clock: 0,
        })
    }

    pub fn page_file_name(&self) -> &Path {
        &self.page_file_name
    }

    pub fn num_pages(&self) -> usize {
        self.frames.len()
    }

    pub fn strategy(&self) -> ReplacementStrategy {
        self.strategy
    }

    /// Flushes dirty unpinned frames, then fails with
    /// `PinnedPagesInBuffer` if any frame is still pinned. Consumes
    /// `self` either way.
    pub fn shutdown(mut self) -> DbResult<()> {
        self.force_flush_pool()?;
        if self.frames.iter().any(|f| f.pin_count > 0) {
            return Err(DbError::Buffer("PINNED_PAGES_IN_BUFFER".into()));
        }
        Ok(())
    }

    /// Writes back every dirty, unpinned frame.
    pub fn force_flush_pool(&mut self) -> DbResult<()> {
        for idx in 0..self.frames.len() {
            if self.frames[idx].pin_count == 0 && self.frames[idx].dirty {
                self.write_frame(idx)?;
            }
        }
        Ok(())
    }

    /// Resolves `page_num` into a frame, pinning it: hit, load into an
    /// empty frame, or evict a victim frame and load into that.
    pub fn pin_page(&mut self, page_num: i32) -> DbResult<PageHandle> {
        if page_num < 0 {
            return Err(DbError::Buffer(format!("invalid page number {page_num}")));
        }

        if let Some(idx) = self.find_resident(page_num) {
            self.frames[idx].pin_count += 1;
            self.touch(idx);
            return Ok(PageHandle {
                page_num,
                frame_idx: idx,
            });
        }

        if let Some(idx) = self.find_empty() {
            self.load_into(idx, page_num)?;
            return Ok(PageHandle {
                page_num,
                frame_idx: idx,
            });
        }

        let idx = self
            .select_victim()
            .ok_or_else(|| DbError::Buffer("no unpinned frame available for eviction".into()))?;
        if self.frames[idx].dirty {
            self.write_frame(idx)?;
        }
        self.load_into(idx, page_num)?;
        Ok(PageHandle {
            page_num,
            frame_idx: idx,
        })
    }

    pub fn mark_dirty(&mut self, handle: &PageHandle) -> DbResult<()> {
        let idx = self.resolve(handle)?;
        self.frames[idx].dirty = true;
        Ok(())
    }

    /// Decrements the frame's pin count. Unpinning an already-unpinned
    /// frame is a permissive no-op, matching the legacy source's
    /// tolerance.
    pub fn unpin_page(&mut self, handle: &PageHandle) -> DbResult<()> {
        let idx = self.resolve(handle)?;
        if self.frames[idx].pin_count > 0 {
            self.frames[idx].pin_count -= 1;
        }
        Ok(())
    }

    /// Writes the frame's contents to disk unconditionally and clears
    /// its dirty bit.
    pub fn force_page(&mut self, handle: &PageHandle) -> DbResult<()> {
        let idx = self.resolve(handle)?;
        self.write_frame(idx)
    }

    pub fn frame_data(&self, handle: &PageHandle) -> DbResult<&[u8; PAGE_SIZE]> {
        let idx = self.resolve(handle)?;
        Ok(self.frames[idx].data.as_ref())
    }

    pub fn frame_data_mut(&mut self, handle: &PageHandle) -> DbResult<&mut [u8; PAGE_SIZE]> {
        let idx = self.resolve(handle)?;
        Ok(self.frames[idx].data.as_mut())
    }

    /// Page number resident in each frame, `None` for `NO_PAGE`.
    pub fn frame_contents(&self) -> Vec<Option<i32>> {
        self.frames.iter().map(|f| f.page_num).collect()
    }

    pub fn dirty_flags(&self) -> Vec<bool> {
        self.frames.iter().map(|f| f.dirty).collect()
    }

    pub fn fix_counts(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.pin_count).collect()
    }

    pub fn num_read_io(&self) -> u64 {
        self.read_io
    }

    pub fn num_write_io(&self) -> u64 {
        self.write_io
    }

    fn resolve(&self, handle: &PageHandle) -> DbResult<usize> {
        match self.frames.get(handle.frame_idx) {
            Some(f) if f.page_num == Some(handle.page_num) => Ok(handle.frame_idx),
            _ => Err(DbError::Buffer(format!(
                "RC_ERROR: page {} not resident in buffer pool",
                handle.page_num
            ))),
        }
    }

    fn find_resident(&self, page_num: i32) -> Option<usize> {
        self.frames
            .iter()
            .position(|f| f.page_num == Some(page_num))
    }

    fn find_empty(&self) -> Option<usize> {
        self.frames.iter().position(|f| f.page_num.is_none())
    }

    /// Loads `page_num` into frame `idx`, growing the underlying file
    /// first if the page doesn't exist yet. The record manager relies
    /// on this to extend a table's insert-scan loop without calling
    /// `ensure_capacity` itself.
    fn load_into(&mut self, idx: usize, page_num: i32) -> DbResult<()> {
        self.file.ensure_capacity(page_num + 1)?;
        self.file.read_block(page_num, self.frames[idx].data.as_mut())?;
        self.frames[idx].page_num = Some(page_num);
        self.frames[idx].dirty = false;
        self.frames[idx].pin_count = 1;
        self.frames[idx].hit_num = 0;
        self.frames[idx].ref_num = 0;
        self.read_io += 1;
        self.touch(idx);
        Ok(())
    }

    fn write_frame(&mut self, idx: usize) -> DbResult<()> {
        let page_num = self.frames[idx]
            .page_num
            .ok_or_else(|| DbError::Buffer("cannot flush an empty frame".into()))?;
        self.file.write_block(page_num, self.frames[idx].data.as_ref())?;
        self.frames[idx].dirty = false;
        self.write_io += 1;
        Ok(())
    }

    /// Updates the policy cookie for a frame that was just pinned,
    /// whether freshly loaded or re-pinned while already resident.
    fn touch(&mut self, idx: usize) {
        match self.strategy {
            ReplacementStrategy::Fifo => {}
            ReplacementStrategy::Lru => {
                self.lru_clock += 1;
                self.frames[idx].hit_num = self.lru_clock;
            }
            ReplacementStrategy::Clock => {
                self.frames[idx].hit_num = 1;
            }
            ReplacementStrategy::Lfu => {
                self.frames[idx].ref_num += 1;
            }
        }
    }

    fn select_victim(&mut self) -> Option<usize> {
        match self.strategy {
            ReplacementStrategy::Fifo => self.select_fifo(),
            ReplacementStrategy::Lru => self.select_lru(),
            ReplacementStrategy::Clock => self.select_clock(),
            ReplacementStrategy::Lfu => self.select_lfu(),
        }
    }

    /// Starts scanning at `fifo_hand` and advances circularly until an
    /// unpinned frame is found, then leaves the hand just past it.
    fn select_fifo(&mut self) -> Option<usize> {
        let n = self.frames.len();
        for i in 0..n {
            let idx = (self.fifo_hand + i) % n;
            if self.frames[idx].pin_count == 0 {
                self.fifo_hand = (idx + 1) % n;
                return Some(idx);
            }
        }
        None
    }

    /// Unpinned frame with the smallest hit counter; ties favor the
    /// lowest frame index (`min_by_key` returns the first minimum seen).
    fn select_lru(&self) -> Option<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.pin_count == 0)
            .min_by_key(|(_, f)| f.hit_num)
            .map(|(i, _)| i)
    }

    fn select_lfu(&self) -> Option<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.pin_count == 0)
            .min_by_key(|(_, f)| f.ref_num)
            .map(|(i, _)| i)
    }

    /// Advances the hand, clearing reference bits it passes over, until
    /// it lands on an unpinned frame with a cleared bit.
    fn select_clock(&mut self) -> Option<usize> {
        let n = self.frames.len();
        if n == 0 {
            return None;
        }
        for _ in 0..(2 * n + 1) {
            let idx = self.clock_hand;
            if self.frames[idx].pin_count == 0 {
                if self.frames[idx].hit_num == 0 {
                    self.clock_hand = (idx + 1) % n;
                    return Some(idx);
                }
                self.frames[idx].hit_num = 0;
            }
            self.clock_hand = (self.clock_hand + 1) % n;
        }
        None
    }
}
