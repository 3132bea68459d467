use async_trait::async_trait;

use super::HttpRequest;
use crate::error::TransportError;
use crate::protocol::ResponseEnvelope;

/// Performs resolved requests on behalf of connectors.
///
/// One executor may be shared by many connectors at once, so implementations
/// must be safe for concurrent use.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<ResponseEnvelope, TransportError>;
}
