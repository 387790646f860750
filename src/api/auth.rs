use reqwest::Method;
use validator::Validate;

use crate::api::{ClientError, HttpExamApi};
use crate::core::context::{Role, SessionContext};
use crate::schemas::auth::{LoginRequest, RegisterRequest, TokenResponse};
use crate::schemas::user::UserProfile;

impl HttpExamApi {
    /// Candidate login. The returned context is what `authenticated` expects.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<SessionContext, ClientError> {
        self.login_as(credentials, &["auth", "login"], Role::Student).await
    }

    pub async fn admin_login(
        &self,
        credentials: &LoginRequest,
    ) -> Result<SessionContext, ClientError> {
        self.login_as(credentials, &["auth", "admin", "login"], Role::Admin).await
    }

    pub async fn register(&self, form: &RegisterRequest) -> Result<UserProfile, ClientError> {
        form.validate().map_err(|e| ClientError::Validation(e.to_string()))?;
        let request = self.request(Method::POST, &["auth", "register"]).json(form);
        self.send_json("register", request).await
    }

    async fn login_as(
        &self,
        credentials: &LoginRequest,
        segments: &[&str],
        role: Role,
    ) -> Result<SessionContext, ClientError> {
        credentials.validate().map_err(|e| ClientError::Validation(e.to_string()))?;
        let request = self.request(Method::POST, segments).json(credentials);
        let response: TokenResponse = self.send_json("login", request).await?;

        let context = SessionContext::from_token(response.token, role)?;
        tracing::info!(
            subject = %context.identity().subject,
            role = context.identity().role.as_str(),
            "Logged in"
        );
        Ok(context)
    }
}
