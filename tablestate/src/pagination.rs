//! Client-side pagination over the host rows.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{TableError, TableResult};
use crate::handler::TableHandler;
use crate::record::Record;
use crate::state::Rows;

/// Initial page and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationConfig {
    /// 1-based page.
    pub page: usize,
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

impl PaginationConfig {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size,
        }
    }
}

/// Page cursor over [`Rows`].
///
/// Without a config every row is on the single page and changes are
/// ignored.
#[derive(Clone)]
pub struct Pagination {
    state: Option<Arc<RwLock<PaginationConfig>>>,
    rows: Rows,
    handler: Arc<dyn TableHandler>,
}

impl Pagination {
    pub fn new(rows: Rows, config: Option<PaginationConfig>, handler: Arc<dyn TableHandler>) -> Self {
        Self {
            state: config.map(|c| {
                Arc::new(RwLock::new(PaginationConfig {
                    page: c.page.max(1),
                    ..c
                }))
            }),
            rows,
            handler,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    fn current(&self) -> Option<PaginationConfig> {
        self.state.as_ref().and_then(|s| s.read().ok().map(|g| *g))
    }

    /// Current 1-based page.
    pub fn page(&self) -> usize {
        self.current().map(|c| c.page).unwrap_or(1)
    }

    /// Current page size (the row count when disabled).
    pub fn page_size(&self) -> usize {
        self.current()
            .map(|c| c.page_size)
            .unwrap_or_else(|| self.rows.len())
    }

    /// Number of pages, at least 1.
    pub fn total_pages(&self) -> usize {
        match self.current() {
            Some(c) if c.page_size > 0 => self.rows.len().div_ceil(c.page_size).max(1),
            _ => 1,
        }
    }

    /// Rows on the current page.
    pub fn page_rows(&self) -> Vec<Record> {
        let Some(c) = self.current() else {
            return self.rows.to_vec();
        };
        if c.page_size == 0 {
            return self.rows.to_vec();
        }
        let start = (c.page - 1).saturating_mul(c.page_size);
        self.rows.with(|rows| {
            rows.iter()
                .skip(start)
                .take(c.page_size)
                .cloned()
                .collect()
        })
    }

    fn update(&self, f: impl FnOnce(&mut PaginationConfig)) -> TableResult {
        let Some(state) = &self.state else {
            log::debug!("pagination change ignored: pagination disabled");
            return Err(TableError::ignored("pagination is disabled"));
        };
        let changed = {
            let Ok(mut guard) = state.write() else {
                return Err(TableError::ignored("pagination state unavailable"));
            };
            let before = *guard;
            f(&mut guard);
            (*guard != before).then_some(*guard)
        };
        if let Some(c) = changed {
            log::debug!("page {} of size {}", c.page, c.page_size);
            self.handler.on_pagination_change(c.page, c.page_size);
        }
        Ok(())
    }

    /// Go to a page, clamped to the existing pages.
    pub fn set_page(&self, page: usize) -> TableResult {
        let last = self.total_pages();
        self.update(|c| c.page = page.clamp(1, last))
    }

    /// Change the page size and go back to the first page.
    pub fn set_page_size(&self, page_size: usize) -> TableResult {
        self.update(|c| {
            if c.page_size != page_size {
                c.page_size = page_size;
                c.page = 1;
            }
        })
    }

    /// Go back to the first page.
    pub fn reset(&self) -> TableResult {
        self.update(|c| c.page = 1)
    }

    /// Pull the page back into range after the row count changed.
    pub fn clamp(&self) -> TableResult {
        let last = self.total_pages();
        self.update(|c| c.page = c.page.clamp(1, last))
    }
}

impl std::fmt::Debug for Pagination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pagination")
            .field("state", &self.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NoopHandler;

    fn rows(n: usize) -> Rows {
        Rows::new((0..n).map(|i| Record::new().set("id", i)).collect())
    }

    #[test]
    fn test_page_rows_slice() {
        let pagination = Pagination::new(rows(25), Some(PaginationConfig::new(10)), Arc::new(NoopHandler));
        assert_eq!(pagination.total_pages(), 3);
        pagination.set_page(3).unwrap();
        assert_eq!(pagination.page_rows().len(), 5);
    }

    #[test]
    fn test_disabled_is_single_page() {
        let pagination = Pagination::new(rows(25), None, Arc::new(NoopHandler));
        assert_eq!(pagination.total_pages(), 1);
        assert_eq!(pagination.page_rows().len(), 25);
        assert!(pagination.set_page(2).is_err());
    }

    #[test]
    fn test_zero_page_size() {
        let pagination = Pagination::new(rows(5), Some(PaginationConfig::new(0)), Arc::new(NoopHandler));
        assert_eq!(pagination.total_pages(), 1);
        assert_eq!(pagination.page_rows().len(), 5);
    }
}
