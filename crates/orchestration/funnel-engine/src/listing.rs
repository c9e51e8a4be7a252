//! Paginated key listing.

use crate::toolbox::ToolBox;
use funnel_error::{ErrorClass, Result, classify};
use funnel_traits::{Connector, Container, ListPage};
use funnel_types::ListOptions;
use std::collections::VecDeque;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Lazy iterator over the keys of one container.
///
/// Pages are fetched on demand, each starting after the last key of the
/// previous page. Transient and stale-session errors retry the same page
/// request after `retry_interval`, with no retry ceiling. Any other error
/// is yielded once and ends the iteration.
pub struct ListCursor<'a, C: Connector> {
    toolbox: &'a mut ToolBox<C>,
    container: String,
    marker: String,
    prefix: String,
    delimiter: String,
    retry_interval: Duration,
    buffer: VecDeque<String>,
    pages: u64,
    done: bool,
}

impl<'a, C: Connector> ListCursor<'a, C> {
    pub fn new(toolbox: &'a mut ToolBox<C>, container: impl Into<String>, options: ListOptions) -> Self {
        Self {
            toolbox,
            container: container.into(),
            marker: options.marker.unwrap_or_default(),
            prefix: options.prefix.unwrap_or_default(),
            delimiter: options.delimiter.unwrap_or_default(),
            retry_interval: options.retry_interval,
            buffer: VecDeque::new(),
            pages: 0,
            done: false,
        }
    }

    /// The marker the next page request will start after.
    ///
    /// Passing it to a new cursor resumes the listing at the first key not
    /// yet fetched.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Pages fetched so far.
    pub fn pages(&self) -> u64 {
        self.pages
    }

    fn fetch_page(&mut self) -> Result<ListPage> {
        loop {
            let result = self.toolbox.container(&self.container).and_then(|container| {
                container.list_keys(&self.marker, &self.prefix, &self.delimiter)
            });

            let error = match result {
                Ok(page) => return Ok(page),
                Err(e) => e,
            };

            match classify(&error) {
                ErrorClass::TransientTransport => {
                    warn!(
                        container = %self.container,
                        marker = %self.marker,
                        error = %error,
                        "Listing failed, retrying"
                    );
                }
                ErrorClass::StaleSession => {
                    warn!(
                        container = %self.container,
                        error = %error,
                        "Stale session while listing, resetting connection"
                    );
                    self.toolbox.reset();
                }
                _ => return Err(error),
            }
            thread::sleep(self.retry_interval);
        }
    }
}

impl<C: Connector> Iterator for ListCursor<'_, C> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(key) = self.buffer.pop_front() {
                return Some(Ok(key));
            }
            if self.done {
                return None;
            }

            match self.fetch_page() {
                Ok(page) => {
                    self.pages += 1;
                    debug!(
                        container = %self.container,
                        page = self.pages,
                        keys = page.keys.len(),
                        truncated = page.is_truncated,
                        "Fetched listing page"
                    );
                    if let Some(last) = page.last_key() {
                        self.marker = last.to_string();
                    }
                    // An empty page cannot advance the marker.
                    self.done = !page.is_truncated || page.keys.is_empty();
                    self.buffer.extend(page.keys.into_iter().map(|k| k.name));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
