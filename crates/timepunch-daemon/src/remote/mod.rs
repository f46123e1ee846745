//! Remote time-tracking service client.
//!
//! The service speaks SOAP 1.1 over HTTP: two logical services under
//! `{endpoint}Services/`, authenticated by a credentials header element on
//! every call. The [`SwipeApi`] trait is the seam the gateway and the sync
//! reconciler program against; [`SoapSwipeClient`] is the production
//! implementation.

pub mod codec;
pub mod soap;
pub mod types;

pub use soap::SoapSwipeClient;
pub use types::{RemoteError, SwipeSummary};

use async_trait::async_trait;

/// Remote operations consumed by the punch engine.
///
/// Every error is connectivity-class from the caller's point of view:
/// definitive answers (system errors, punch exceptions) arrive in-band in
/// the [`SwipeSummary`].
#[async_trait]
pub trait SwipeApi: Send + Sync {
    /// Record a swipe and return the summary response.
    async fn record_swipe_summary(&self, swipe_input: &str) -> Result<SwipeSummary, RemoteError>;

    /// Same as [`Self::record_swipe_summary`] for swipes carrying a
    /// department override.
    async fn record_swipe_summary_department_override(
        &self,
        swipe_input: &str,
    ) -> Result<SwipeSummary, RemoteError>;

    /// Upload a punch photo. `dir` is the tenant id on the remote side.
    async fn save_image(&self, file_name: &str, data: &[u8], dir: &str)
    -> Result<(), RemoteError>;

    /// Verify the two required remote operations are reachable.
    async fn probe(&self) -> Result<(), RemoteError>;
}
