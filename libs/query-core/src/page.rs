use serde::{Deserialize, Serialize};

/// Derived pagination metadata; always recomputed from the authoritative row count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    pub fn compute(total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            total,
            page,
            limit,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Response envelope for list endpoints: `{ "data": [...], "meta": {...} }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    /// Assemble a page from one result slice and the unpaginated total.
    pub fn assemble(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        Self {
            data: items,
            meta: PageMeta::compute(total, page, limit),
        }
    }

    /// Create an empty page for the given request position
    pub fn empty(page: u64, limit: u64) -> Self {
        Self::assemble(Vec::new(), 0, page, limit)
    }

    /// Map items while preserving meta (Domain->DTO mapping convenience)
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

pub fn assemble<T>(items: Vec<T>, total: u64, page: u64, limit: u64) -> Page<T> {
    Page::assemble(items, total, page, limit)
}
