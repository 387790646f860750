use std::time::Instant;

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::api::errors::ClientError;
use crate::core::config::ApiSettings;
use crate::core::context::SessionContext;
use crate::core::metrics;

const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Clone)]
pub struct HttpExamApi {
    client: Client,
    endpoint: Url,
    context: Option<SessionContext>,
}

impl HttpExamApi {
    pub fn new(settings: &ApiSettings) -> Result<Self, ClientError> {
        let raw = format!("{}{}", settings.base_url.trim_end_matches('/'), settings.prefix);
        let endpoint = Url::parse(&raw)
            .map_err(|err| ClientError::Validation(format!("invalid api endpoint {raw}: {err}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(ClientError::Validation(format!("invalid api endpoint {raw}")));
        }

        let client = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self { client, endpoint, context: None })
    }

    /// Same connection pool, but every request carries the context's bearer token.
    pub fn authenticated(&self, context: &SessionContext) -> Self {
        Self {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            context: Some(context.clone()),
        }
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    pub(crate) fn require_context(&self) -> Result<&SessionContext, ClientError> {
        self.context.as_ref().ok_or_else(|| ClientError::Unauthorized("login required".to_string()))
    }

    pub(crate) fn require_admin(&self) -> Result<&SessionContext, ClientError> {
        let context = self.require_context()?;
        if !context.is_admin() {
            return Err(ClientError::Forbidden("admin access required".to_string()));
        }
        Ok(context)
    }

    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        // `new` rejects endpoints that cannot carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Builds a request for `segments` below the API prefix; each segment is
    /// percent-encoded, so ids can be passed through as-is.
    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.client.request(method, self.url(segments));
        match &self.context {
            Some(context) => builder.bearer_auth(context.token()),
            None => builder,
        }
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        let body = self.execute(operation, builder).await?;
        serde_json::from_str(&body).map_err(|err| {
            tracing::warn!(operation, error = %err, "Unexpected response body");
            ClientError::Decode(err.to_string())
        })
    }

    pub(crate) async fn send_empty(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<(), ClientError> {
        self.execute(operation, builder).await.map(|_| ())
    }

    async fn execute(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<String, ClientError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let builder = builder.header(REQUEST_ID_HEADER, request_id.to_string());
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                metrics::record_request(operation, false, started.elapsed());
                tracing::warn!(operation, request_id = %request_id, error = %err, "Request failed");
                return Err(err.into());
            }
        };

        let status = response.status();
        let body = response.text().await?;
        metrics::record_request(operation, status.is_success(), started.elapsed());

        if !status.is_success() {
            tracing::warn!(
                operation,
                request_id = %request_id,
                status = status.as_u16(),
                "Backend rejected request"
            );
            return Err(ClientError::from_response(status, &body));
        }

        tracing::debug!(
            operation,
            request_id = %request_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );
        Ok(body)
    }
}
