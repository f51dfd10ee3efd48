//! Page-number pagination shared by listing queries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("page numbers are 1-based")]
    ZeroPage,
    #[error("page size must be greater than zero")]
    ZeroSize,
}

/// A 1-based request for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: u32,
    size: u32,
}

impl PageRequest {
    pub fn new(number: u32, size: u32) -> Result<Self, PaginationError> {
        if number == 0 {
            return Err(PaginationError::ZeroPage);
        }
        if size == 0 {
            return Err(PaginationError::ZeroSize);
        }
        Ok(Self { number, size })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }
}

/// One materialized page plus the totals needed for page indicators.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            number: request.number(),
            size: request.size(),
            total_items,
        }
    }

    /// Total page count; an empty collection still has one (empty) page.
    pub fn total_pages(&self) -> u32 {
        let size = u64::from(self.size.max(1));
        let pages = self.total_items.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages()
    }

    /// True when the requested page lies beyond the last page.
    pub fn is_out_of_range(&self) -> bool {
        self.number > self.total_pages()
    }
}
