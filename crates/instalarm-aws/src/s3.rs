//! Alarm templates stored as S3 objects keyed by alarm key.

use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::debug;

use instalarm_core::{AlarmError, AlarmResult, BoxFuture};
use instalarm_template::TemplateSource;

#[derive(Clone)]
pub struct S3Templates {
    client: Client,
    bucket: String,
}

impl S3Templates {
    pub fn new(config: &SdkConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: Client::new(config),
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl TemplateSource for S3Templates {
    fn fetch<'a>(&'a self, alarm_key: &'a str) -> BoxFuture<'a, AlarmResult<String>> {
        Box::pin(async move {
            debug!(bucket = %self.bucket, key = %alarm_key, "fetching template");
            let output = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(alarm_key)
                .send()
                .await
                .map_err(|e| AlarmError::backend("GetObject", DisplayErrorContext(&e)))?;

            let bytes = output
                .body
                .collect()
                .await
                .map_err(|e| AlarmError::backend("GetObject", e))?
                .into_bytes();

            String::from_utf8(bytes.to_vec())
                .map_err(|e| AlarmError::template(alarm_key, format!("template is not UTF-8: {e}")))
        })
    }
}
