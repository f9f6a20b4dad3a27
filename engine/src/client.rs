use crate::error::ClientError;
use crate::model::{ExecuteMultipleSettings, ItemResponse, Operation, Record};
use async_trait::async_trait;

/// Connection to the remote record service.
///
/// The engine never talks to the network itself. Callers inject an
/// implementation of this trait; the engine derives one session per worker
/// with [`clone_session`](RemoteClient::clone_session) and sends each batch
/// through [`execute_multiple`](RemoteClient::execute_multiple).
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use engine::client::RemoteClient;
/// use engine::error::ClientError;
/// use engine::model::{ExecuteMultipleSettings, ItemResponse, Operation};
///
/// struct NullClient;
///
/// #[async_trait]
/// impl RemoteClient for NullClient {
///     async fn clone_session(&self) -> Result<Self, ClientError> {
///         Ok(NullClient)
///     }
///
///     async fn execute_multiple(
///         &self,
///         requests: &[Operation],
///         _settings: ExecuteMultipleSettings,
///     ) -> Result<Vec<ItemResponse>, ClientError> {
///         Ok((0..requests.len()).map(ItemResponse::success).collect())
///     }
/// }
/// ```
#[async_trait]
pub trait RemoteClient: Send + Sync + Sized + 'static {
    /// Produces an independent session usable concurrently with `self`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the session cannot be established.
    async fn clone_session(&self) -> Result<Self, ClientError>;

    /// Executes `requests` as one round trip.
    ///
    /// With `continue_on_error` set, a faulting request must not stop the
    /// remaining ones; its fault is reported in the matching
    /// [`ItemResponse`].
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the round trip itself fails.
    async fn execute_multiple(
        &self,
        requests: &[Operation],
        settings: ExecuteMultipleSettings,
    ) -> Result<Vec<ItemResponse>, ClientError>;
}

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 5000;

/// Which records to retrieve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub entity: String,
    /// Columns to return; empty means only the id.
    pub columns: Vec<String>,
    pub page_size: u32,
}

impl RecordQuery {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            columns: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Cursor into a paged result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingInfo {
    /// One-based page number.
    pub page_number: u32,
    /// Opaque cookie returned with the previous page.
    pub paging_cookie: Option<String>,
    pub count: u32,
}

impl PagingInfo {
    pub fn first(count: u32) -> Self {
        Self {
            page_number: 1,
            paging_cookie: None,
            count,
        }
    }

    fn advance(&mut self, cookie: Option<String>) {
        self.page_number += 1;
        self.paging_cookie = cookie;
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub more_records: bool,
    pub paging_cookie: Option<String>,
}

/// A client that can answer paged record queries.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn retrieve_multiple(
        &self,
        query: &RecordQuery,
        paging: &PagingInfo,
    ) -> Result<RecordPage, ClientError>;
}

/// Retrieves every record matching `query`, following the paging cookie
/// until the service reports no more records.
///
/// # Errors
///
/// The first failing page aborts the retrieval.
pub async fn retrieve_all<S>(source: &S, query: &RecordQuery) -> Result<Vec<Record>, ClientError>
where
    S: RecordSource + ?Sized,
{
    let mut records = Vec::new();
    let mut paging = PagingInfo::first(query.page_size.max(1));

    loop {
        let page = source.retrieve_multiple(query, &paging).await?;
        log::debug!(
            "Retrieved page {} of '{}' with {} records",
            paging.page_number,
            query.entity,
            page.records.len()
        );
        records.extend(page.records);

        if !page.more_records {
            break;
        }
        paging.advance(page.paging_cookie);
    }

    log::info!(
        "Retrieved {} '{}' records in {} pages",
        records.len(),
        query.entity,
        paging.page_number
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct PagedSource {
        pages: Vec<RecordPage>,
        seen: Mutex<Vec<PagingInfo>>,
    }

    #[async_trait]
    impl RecordSource for PagedSource {
        async fn retrieve_multiple(
            &self,
            _query: &RecordQuery,
            paging: &PagingInfo,
        ) -> Result<RecordPage, ClientError> {
            self.seen.lock().unwrap().push(paging.clone());
            let index = (paging.page_number - 1) as usize;
            self.pages
                .get(index)
                .cloned()
                .ok_or_else(|| ClientError::Rejected("page out of range".into()))
        }
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|_| Record::new("account", Uuid::new_v4()))
            .collect()
    }

    #[tokio::test]
    async fn test_retrieve_all_follows_cookies() {
        let source = PagedSource {
            pages: vec![
                RecordPage {
                    records: records(2),
                    more_records: true,
                    paging_cookie: Some("c1".into()),
                },
                RecordPage {
                    records: records(2),
                    more_records: true,
                    paging_cookie: Some("c2".into()),
                },
                RecordPage {
                    records: records(1),
                    more_records: false,
                    paging_cookie: None,
                },
            ],
            seen: Mutex::new(Vec::new()),
        };

        let query = RecordQuery::new("account").with_page_size(2);
        let all = retrieve_all(&source, &query).await.unwrap();
        assert_eq!(all.len(), 5);

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], PagingInfo::first(2));
        assert_eq!(seen[1].paging_cookie.as_deref(), Some("c1"));
        assert_eq!(seen[2].page_number, 3);
        assert_eq!(seen[2].paging_cookie.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_retrieve_all_propagates_page_error() {
        let source = PagedSource {
            pages: vec![RecordPage {
                records: records(1),
                more_records: true,
                paging_cookie: None,
            }],
            seen: Mutex::new(Vec::new()),
        };

        let result = retrieve_all(&source, &RecordQuery::new("account")).await;
        assert!(matches!(result, Err(ClientError::Rejected(_))));
    }
}
