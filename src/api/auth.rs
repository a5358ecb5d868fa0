use crate::api::models::LoginResponse;
use crate::error::Result;
use crate::transport::TransportClient;
use tracing::info;

pub struct AuthApi {
    transport: TransportClient,
}

impl AuthApi {
    pub fn new(transport: TransportClient) -> Self {
        Self { transport }
    }

    /// Logs in with form-encoded credentials and stores the returned token
    /// in the shared auth context.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let response: LoginResponse = self
            .transport
            .post_form("auth/login", &[("username", username), ("password", password)])
            .await?;

        self.transport.auth().set_credential(&response.access_token);
        info!("Logged in as {}", username);
        Ok(response)
    }

    /// Clears the stored credential
    pub fn logout(&self) {
        self.transport.auth().clear_credential();
    }
}
