use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;

use super::config::QueryOptions;
use super::keys::QueryKey;
use super::store::{ErasedLoader, QueryClient, QueryError, downcast};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No data and no error yet.
    Pending,
    Success,
    /// The most recent load failed. Earlier data, if any, is still present.
    Error,
}

/// What an observer sees at one moment.
#[derive(Debug)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<QueryError>,
    pub status: QueryStatus,
    pub is_fetching: bool,
    pub is_stale: bool,
    pub updated_at: Option<Instant>,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            status: self.status,
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
            updated_at: self.updated_at,
        }
    }
}

impl<T> QueryState<T> {
    fn empty() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Pending,
            is_fetching: false,
            is_stale: true,
            updated_at: None,
        }
    }
}

/// Live subscription to one query key.
pub struct QueryObserver<T> {
    client: QueryClient,
    key: QueryKey,
    options: QueryOptions,
    loader: ErasedLoader,
    receiver: watch::Receiver<u64>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    pub(crate) fn new(
        client: QueryClient,
        key: QueryKey,
        options: QueryOptions,
        loader: ErasedLoader,
        receiver: watch::Receiver<u64>,
    ) -> Self {
        Self {
            client,
            key,
            options,
            loader,
            receiver,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Once the entry is removed the observer stays removed, even if the
    /// key is loaded again later; observe the key anew to follow it.
    pub fn state(&self) -> QueryState<T> {
        let snapshot = match self.client.snapshot(&self.key) {
            Some(snapshot) if !self.is_removed() => snapshot,
            _ => {
                let mut state = QueryState::empty();
                state.error = Some(self.removed());
                state.status = QueryStatus::Error;
                return state;
            }
        };

        let mut error = snapshot.error;
        let data = match snapshot.data.map(|data| downcast::<T>(&self.key, data)) {
            Some(Ok(data)) => Some(data),
            Some(Err(mismatch)) => {
                error = Some(mismatch);
                None
            }
            None => None,
        };
        let is_stale = snapshot.invalidated
            || snapshot.updated_at.is_none_or(|at| {
                Instant::now().saturating_duration_since(at) >= self.options.stale_time
            });
        let status = match (&error, &data) {
            (Some(_), _) => QueryStatus::Error,
            (None, Some(_)) => QueryStatus::Success,
            (None, None) => QueryStatus::Pending,
        };

        QueryState {
            data,
            error,
            status,
            is_fetching: snapshot.is_fetching,
            is_stale,
            updated_at: snapshot.updated_at,
        }
    }

    /// Wait for the next change to the entry and return the new state.
    pub async fn changed(&mut self) -> Result<QueryState<T>, QueryError> {
        self.receiver.changed().await.map_err(|_| self.removed())?;
        Ok(self.state())
    }

    /// Wait until no load is in flight and return that state.
    pub async fn settled(&mut self) -> Result<QueryState<T>, QueryError> {
        loop {
            let state = self.state();
            if !state.is_fetching {
                return Ok(state);
            }
            self.changed().await?;
        }
    }

    /// Force a reload with this observer's loader.
    pub async fn refetch(&self) -> Result<Arc<T>, QueryError> {
        if self.is_removed() {
            return Err(self.removed());
        }
        let data = self.client.fetch_erased(&self.key, &self.loader).await?;
        downcast(&self.key, data)
    }

    /// The entry this observer subscribed to has been dropped from the store.
    fn is_removed(&self) -> bool {
        self.receiver.has_changed().is_err()
    }

    fn removed(&self) -> QueryError {
        QueryError::Removed {
            key: self.key.clone(),
        }
    }
}
