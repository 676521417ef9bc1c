use serde::{Deserialize, Serialize};

/// Offset/limit cursor for one list call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
}

impl PageRequest {
    pub const fn first(limit: u64) -> Self {
        Self { offset: 0, limit }
    }

    /// Cursor for the page after this one
    pub const fn next(self) -> Self {
        Self { offset: self.offset + self.limit, limit: self.limit }
    }
}

/// One bounded slice of a larger result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// A full page means more may remain
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Page returned for a request with `limit`
    ///
    /// Only a short page ends the scan; an exactly full page cannot be told
    /// apart from "more data exists".
    pub fn from_response(items: Vec<T>, limit: u64) -> Self {
        let has_more = items.len() as u64 >= limit;
        Self { items, has_more }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
