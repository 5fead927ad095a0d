use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::clients::ClientError;
use crate::clients::http::{HttpConfig, ensure_success};
use crate::jobs::CallbackOutcome;

/// Delivers one outcome to one subscriber
#[async_trait]
pub trait CallbackSender: Send + Sync {
    async fn send(&self, url: &str, outcome: &CallbackOutcome) -> Result<(), ClientError>;
}

/// POSTs the outcome as JSON; any non-2xx answer counts as a failed delivery
pub struct HttpCallbackSender {
    client: Client,
}

impl HttpCallbackSender {
    pub fn new(config: &HttpConfig, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackSender for HttpCallbackSender {
    async fn send(&self, url: &str, outcome: &CallbackOutcome) -> Result<(), ClientError> {
        let response = self.client.post(url).json(outcome).send().await?;
        ensure_success("POST", response)?;
        debug!(url, job_id = %outcome.job_id, "Callback delivered");
        Ok(())
    }
}
