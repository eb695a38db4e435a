use crate::errors::PostFailure;
use crate::payload::AlertPayload;
use crate::response::AlertResponse;

/// One completed POST, as seen by a [`DeliveryObserver`]
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    /// Full URL the payload was posted to
    pub endpoint: &'a str,
    pub payload: &'a AlertPayload,
    pub outcome: Result<&'a AlertResponse, &'a PostFailure>,
}

impl Delivery<'_> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Hook invoked after every send, whether it succeeded or not
///
/// The client stores nothing itself. Implement this to persist or audit
/// payload/response pairs; retention is up to the implementor. Observers run
/// inline on the sending task, so keep them short.
///
/// ```rust
/// use std::sync::Arc;
/// use victorops_client::{Delivery, DeliveryObserver};
///
/// struct StdoutLog;
///
/// impl DeliveryObserver for StdoutLog {
///     fn on_delivery(&self, delivery: &Delivery<'_>) {
///         println!("{} -> success: {}", delivery.endpoint, delivery.is_success());
///     }
/// }
///
/// let observer: Arc<dyn DeliveryObserver> = Arc::new(StdoutLog);
/// ```
pub trait DeliveryObserver: Send + Sync {
    fn on_delivery(&self, delivery: &Delivery<'_>);
}
