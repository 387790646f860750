use reqwest::Method;
use validator::Validate;

use crate::api::{ClientError, HttpExamApi};
use crate::schemas::user::{ProfileUpdate, UserProfile};

impl HttpExamApi {
    pub async fn fetch_profile(&self) -> Result<UserProfile, ClientError> {
        self.require_context()?;
        let request = self.request(Method::GET, &["users", "me"]);
        self.send_json("fetch_profile", request).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ClientError> {
        self.require_context()?;
        update.validate().map_err(|e| ClientError::Validation(e.to_string()))?;
        let request = self.request(Method::PUT, &["users", "me"]).json(update);
        self.send_json("update_profile", request).await
    }
}
