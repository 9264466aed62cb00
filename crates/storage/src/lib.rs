//! Paged file abstraction: a contiguous sequence of fixed-size blocks on
//! disk, addressed by a zero-based page number, with a cursor tracking
//! the most recently touched block.
//!
//! The legacy source carries two divergent implementations of this
//! layer: one keeps the `FILE` handle open across calls, the other
//! reopens the file per write and sizes the write with `strlen` (wrong
//! for pages containing embedded NUL bytes). This crate follows the
//! first variant: the file descriptor lives in [`PagedFile`] for its
//! whole lifetime and every block write moves exactly [`PAGE_SIZE`]
//! bytes regardless of content.

#[cfg(test)]
mod tests;

use common::{DbError, DbResult};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Fixed block size in bytes; callers must use one value consistently
/// since it governs the catalog layout.
pub const PAGE_SIZE: usize = 4096;

/// An open paged file: an OS file descriptor plus the page-cursor state
/// the storage layer's read/write operations maintain.
#[derive(Debug)]
pub struct PagedFile {
    file_name: PathBuf,
    file: File,
    total_num_pages: i32,
    cur_page_pos: i32,
}

impl PagedFile {
    /// Creates a new page file containing exactly one zero-filled block.
    pub fn create(name: impl AsRef<Path>) -> DbResult<()> {
        let name = name.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(name)
            .map_err(|e| DbError::Storage(format!("FILE_NOT_FOUND: create {name:?} failed: {e}")))?;

        let zero = [0u8; PAGE_SIZE];
        let written = file
            .write(&zero)
            .map_err(|e| DbError::Storage(format!("WRITE_FAILED: {e}")))?;
        if written != PAGE_SIZE {
            return Err(DbError::Storage(format!(
                "WRITE_FAILED: wrote {written} of {PAGE_SIZE} bytes"
            )));
        }
        Ok(())
    }

    /// Opens an existing page file for read/write, positioning the
    /// cursor at page 0. The physical size is truncated down to a whole
    /// number of pages; any trailing partial-page bytes are ignored.
    pub fn open(name: impl AsRef<Path>) -> DbResult<Self> {
        let name = name.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(name)
            .map_err(|e| DbError::Storage(format!("FILE_NOT_FOUND: open {name:?} failed: {e}")))?;

        let len = file
            .metadata()
            .map_err(|e| DbError::Storage(format!("FILE_NOT_FOUND: stat {name:?} failed: {e}")))?
            .len();
        let total_num_pages = (len / PAGE_SIZE as u64) as i32;

        Ok(Self {
            file_name: name.to_path_buf(),
            file,
            total_num_pages,
            cur_page_pos: 0,
        })
    }

    /// Releases the underlying file descriptor.
    pub fn close(self) -> DbResult<()> {
        drop(self);
        Ok(())
    }

    /// Unlinks the page file from disk.
    pub fn destroy(name: impl AsRef<Path>) -> DbResult<()> {
        let name = name.as_ref();
        fs::remove_file(name)
            .map_err(|e| DbError::Storage(format!("FILE_NOT_FOUND: destroy {name:?} failed: {e}")))
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn total_num_pages(&self) -> i32 {
        self.total_num_pages
    }

    /// Returns the current page cursor as a page index, not a byte
    /// offset; dividing it by `PAGE_SIZE` again would be a bug.
    pub fn get_block_pos(&self) -> i32 {
        self.cur_page_pos
    }

    fn check_range(&self, page_num: i32) -> DbResult<()> {
        if page_num < 0 || page_num >= self.total_num_pages {
            return Err(DbError::Storage(format!(
                "READ_NON_EXISTING_PAGE: page {page_num} out of range (0..{})",
                self.total_num_pages
            )));
        }
        Ok(())
    }

    /// Reads block `page_num` into `buf`, setting the cursor to it.
    pub fn read_block(&mut self, page_num: i32, buf: &mut [u8; PAGE_SIZE]) -> DbResult<()> {
        self.check_range(page_num)?;
        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.read_exact(buf)?;
        self.cur_page_pos = page_num;
        Ok(())
    }

    pub fn read_first_block(&mut self, buf: &mut [u8; PAGE_SIZE]) -> DbResult<()> {
        self.read_block(0, buf)
    }

    pub fn read_last_block(&mut self, buf: &mut [u8; PAGE_SIZE]) -> DbResult<()> {
        self.read_block(self.total_num_pages - 1, buf)
    }

    pub fn read_previous_block(&mut self, buf: &mut [u8; PAGE_SIZE]) -> DbResult<()> {
        self.read_block(self.cur_page_pos - 1, buf)
    }

    pub fn read_current_block(&mut self, buf: &mut [u8; PAGE_SIZE]) -> DbResult<()> {
        self.read_block(self.cur_page_pos, buf)
    }

    pub fn read_next_block(&mut self, buf: &mut [u8; PAGE_SIZE]) -> DbResult<()> {
        self.read_block(self.cur_page_pos + 1, buf)
    }

    /// Writes `buf` to block `page_num`, setting the cursor to it.
    pub fn write_block(&mut self, page_num: i32, buf: &[u8; PAGE_SIZE]) -> DbResult<()> {
        if page_num < 0 || page_num >= self.total_num_pages {
            return Err(DbError::Storage(format!(
                "WRITE_NON_EXISTING_PAGE: page {page_num} out of range (0..{})",
                self.total_num_pages
            )));
        }
        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        let written = self
            .file
            .write(buf)
            .map_err(|e| DbError::Storage(format!("WRITE_FAILED: {e}")))?;
        if written != PAGE_SIZE {
            return Err(DbError::Storage(format!(
                "WRITE_FAILED: wrote {written} of {PAGE_SIZE} bytes"
            )));
        }
        self.cur_page_pos = page_num;
        Ok(())
    }

    /// Appends a zero-filled block, growing the file by one page.
    pub fn append_empty_block(&mut self) -> DbResult<()> {
        self.file.seek(SeekFrom::End(0))?;
        let zero = [0u8; PAGE_SIZE];
        let written = self
            .file
            .write(&zero)
            .map_err(|e| DbError::Storage(format!("WRITE_FAILED: {e}")))?;
        if written != PAGE_SIZE {
            return Err(DbError::Storage(format!(
                "WRITE_FAILED: wrote {written} of {PAGE_SIZE} bytes"
            )));
        }
        self.total_num_pages += 1;
        Ok(())
    }

    /// Grows the file until it holds at least `n` pages.
    pub fn ensure_capacity(&mut self, n: i32) -> DbResult<()> {
        while self.total_num_pages < n {
            self.append_empty_block()?;
        }
        Ok(())
    }
}
