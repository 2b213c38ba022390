//! Collaborator contracts
//!
//! The engine only talks to the outside world through these traits. Every
//! call is wrapped in [`bounded`], so a hung collaborator becomes an
//! `UpstreamUnavailable` error instead of a hung page.

use crate::error::{FeedError, RemoteError};
use crate::query::{CountProjection, RemoteQuery};
use async_trait::async_trait;
use palate_model::{CountRow, FriendRef, RawRecord, UserId};
use std::future::Future;
use std::time::Duration;

/// Who is signed in
pub trait AuthContext: Send + Sync {
    /// Current user, `None` when signed out
    fn current_user_id(&self) -> Option<UserId>;
}

/// Source of a user's social connections
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialGraph: Send + Sync {
    /// Friends of `user`
    async fn friends_of(&self, user: UserId) -> Result<Vec<FriendRef>, RemoteError>;
}

/// Remote record store with predicate pushdown
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Run a filtered, sorted, windowed query
    async fn query(&self, query: &RemoteQuery) -> Result<Vec<RawRecord>, RemoteError>;

    /// Lightweight projection over every record of `owners`, for counting
    async fn bulk_count(
        &self,
        owners: &[UserId],
        projection: &CountProjection,
    ) -> Result<Vec<CountRow>, RemoteError>;
}

/// Run a remote call under a timeout
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, FeedError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(FeedError::upstream(operation, e)),
        Err(_) => Err(FeedError::timeout(operation, limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let result: Result<(), FeedError> = bounded("page", Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(FeedError::timeout("page", Duration::from_millis(100))));
    }

    #[tokio::test]
    async fn remote_error_is_wrapped() {
        let result: Result<(), FeedError> = bounded("roster", Duration::from_secs(1), async {
            Err(RemoteError::Unavailable("503".into()))
        })
        .await;
        assert!(matches!(
            result,
            Err(FeedError::UpstreamUnavailable { operation: "roster", .. })
        ));
    }
}
