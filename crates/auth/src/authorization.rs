//! Bearer authorization for outgoing requests.

use std::sync::Arc;
use tracing::warn;

use outpost_client::Request;

use crate::credentials::CredentialVault;

/// Attaches the current access token to requests.
///
/// A request without a stored token goes out unauthenticated. The stage
/// never fails; a rejected or missing credential surfaces downstream as a
/// 401.
#[derive(Debug, Clone)]
pub struct AuthorizationStage {
    vault: Arc<CredentialVault>,
}

impl AuthorizationStage {
    /// Create a stage reading tokens from `vault`.
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        Self { vault }
    }

    /// Set `Authorization: Bearer <token>` if a token is available.
    pub async fn apply(&self, request: Request) -> Request {
        match self.vault.access_token().await {
            Ok(Some(token)) => request.bearer_auth(token),
            Ok(None) => request,
            Err(e) => {
                warn!(error = %e, "Could not read access token; sending unauthenticated");
                request
            }
        }
    }
}
