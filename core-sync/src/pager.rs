//! Lazy pagination over a remote folder listing.

use bridge_traits::storage::{ListFilter, RemoteFile, RemoteStore};
use std::collections::VecDeque;
use tracing::debug;

use crate::error::Result;

/// Yields the records of a folder one at a time, fetching pages on demand.
///
/// The pager is finite and cannot be restarted: once the store reports no
/// next page token and the buffer drains, `next` keeps returning `None`.
pub struct RemotePager<'a> {
    store: &'a dyn RemoteStore,
    folder_id: String,
    filter: ListFilter,
    buffer: VecDeque<RemoteFile>,
    next_token: Option<String>,
    exhausted: bool,
    pages_fetched: usize,
}

impl<'a> RemotePager<'a> {
    pub fn new(store: &'a dyn RemoteStore, folder_id: impl Into<String>, filter: ListFilter) -> Self {
        Self {
            store,
            folder_id: folder_id.into(),
            filter,
            buffer: VecDeque::new(),
            next_token: None,
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Next record, or `None` at the end of the listing.
    ///
    /// # Errors
    ///
    /// A failed page fetch is returned as is and leaves the pager exhausted.
    pub async fn next(&mut self) -> Result<Option<RemoteFile>> {
        loop {
            if let Some(file) = self.buffer.pop_front() {
                return Ok(Some(file));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let page = self
            .store
            .list_children(&self.folder_id, &self.filter, self.next_token.take())
            .await;

        let (files, next_token) = match page {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e.into());
            }
        };

        self.pages_fetched += 1;
        debug!(
            folder_id = %self.folder_id,
            page = self.pages_fetched,
            records = files.len(),
            has_more = next_token.is_some(),
            "Fetched listing page"
        );

        self.exhausted = next_token.is_none();
        self.next_token = next_token;
        self.buffer.extend(files);
        Ok(())
    }
}
