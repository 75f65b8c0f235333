//! One page over the logical sequence `subdirectories ++ files`.
//!
//! Subdirectories are fully materialized (their count is bounded by the
//! fan-out of one directory) while files are fetched one window at a time.
//! The window arithmetic below keeps the concatenation gap-free and
//! duplicate-free for every offset and limit.

use std::ops::Range;

pub const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

/// Slice of the file sequence that belongs on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileWindow {
    pub offset: u64,
    pub limit: u64,
}

impl FileWindow {
    pub fn range(&self, len: usize) -> Range<usize> {
        let start = clamp(self.offset, len);
        let end = clamp(self.offset.saturating_add(self.limit), len);
        start..end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub count: u64,
    pub has_more: bool,
    /// Sequence index one past the last returned item.
    pub last_index: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    pub fn directory_range(&self, directory_count: usize) -> Range<usize> {
        let start = clamp(self.offset, directory_count);
        let end = clamp(self.offset.saturating_add(self.limit), directory_count);
        start..end
    }

    /// File window left after `directory_count` subdirectories precede the files.
    pub fn file_window(&self, directory_count: usize) -> FileWindow {
        let directories_on_page = self.directory_range(directory_count).len() as u64;
        FileWindow {
            offset: self.offset.saturating_sub(directory_count as u64),
            limit: self.limit.saturating_sub(directories_on_page),
        }
    }

    pub fn page_info(&self, directory_count: usize, file_count: u64, returned: usize) -> PageInfo {
        let count = directory_count as u64 + file_count;
        PageInfo {
            count,
            has_more: count > self.offset.saturating_add(self.limit),
            last_index: self.offset + returned as u64,
        }
    }

    pub fn previous_offset(&self) -> Option<u64> {
        (self.offset > 0).then(|| self.offset.saturating_sub(self.limit))
    }
}

pub(crate) fn take_range<T>(items: Vec<T>, range: Range<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(range.start)
        .take(range.len())
        .collect()
}

fn clamp(value: u64, len: usize) -> usize {
    usize::try_from(value).map_or(len, |value| value.min(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Applies the window arithmetic to in-memory sequences.
    fn page(directories: usize, files: usize, offset: u64, limit: u64) -> (Vec<usize>, Vec<usize>, PageInfo) {
        let pagination = Pagination::new(offset, limit);
        let dirs: Vec<usize> = (0..directories).collect();
        let all_files: Vec<usize> = (directories..directories + files).collect();
        let window = pagination.file_window(directories);
        let dirs = take_range(dirs, pagination.directory_range(directories));
        let files_page = take_range(all_files, window.range(files));
        let info = pagination.page_info(directories, files as u64, dirs.len() + files_page.len());
        (dirs, files_page, info)
    }

    #[test]
    fn page_straddles_the_boundary() {
        let (dirs, files, info) = page(2, 1, 1, 2);
        assert_eq!(dirs, vec![1]);
        assert_eq!(files, vec![2]);
        assert_eq!(info.count, 3);
        assert!(!info.has_more);
    }

    #[test]
    fn windows_concatenate_to_the_sequence() {
        for (d, f) in [(0, 5), (5, 0), (3, 4), (1, 1), (0, 0)] {
            for limit in 0..=(d + f + 1) as u64 {
                for offset in 0..=(d + f + 2) as u64 {
                    let (dirs, files, info) = page(d, f, offset, limit);
                    let got: Vec<usize> = dirs.into_iter().chain(files).collect();
                    let count = (d + f) as u64;
                    let start = offset.min(count) as usize;
                    let end = offset.saturating_add(limit).min(count) as usize;
                    let expected: Vec<usize> = (start..end).collect();
                    assert_eq!(got, expected, "d={d} f={f} offset={offset} limit={limit}");
                    assert_eq!(info.has_more, count > offset + limit);
                }
            }
        }
    }

    #[test]
    fn file_window_after_directories() {
        let pagination = Pagination::new(5, 3);
        assert_eq!(pagination.file_window(3), FileWindow { offset: 2, limit: 3 });
        let pagination = Pagination::new(2, 3);
        assert_eq!(pagination.file_window(3), FileWindow { offset: 0, limit: 2 });
    }

    #[test]
    fn previous_offset_clips_at_zero() {
        assert_eq!(Pagination::new(0, 10).previous_offset(), None);
        assert_eq!(Pagination::new(4, 10).previous_offset(), Some(0));
        assert_eq!(Pagination::new(25, 10).previous_offset(), Some(15));
    }

    #[test]
    fn huge_offsets_do_not_overflow() {
        let pagination = Pagination::new(u64::MAX, u64::MAX);
        assert_eq!(pagination.directory_range(3), 3..3);
        assert_eq!(pagination.file_window(3).range(10), 10..10);
    }
}
