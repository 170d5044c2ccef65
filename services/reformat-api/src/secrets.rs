//! Credential secret resolution.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Where the fetch credentials come from. Resolved once at process start.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Raw secret string for `secret_id`.
    async fn secret_value(&self, secret_id: &str) -> Result<String>;
}

/// AWS Secrets Manager source.
pub struct SecretsManagerSource {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerSource {
    pub async fn new() -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_secretsmanager::Client::new(&aws_config),
        }
    }
}

#[async_trait]
impl SecretSource for SecretsManagerSource {
    async fn secret_value(&self, secret_id: &str) -> Result<String> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .with_context(|| format!("failed to read secret {secret_id}"))?;
        response
            .secret_string()
            .map(str::to_string)
            .context("secret has no string payload")
    }
}

/// Payload of the credential secret.
#[derive(Debug, Deserialize)]
pub struct NetrcSecret {
    pub netrc_content: String,
}

pub fn parse_netrc_secret(raw: &str) -> Result<NetrcSecret> {
    serde_json::from_str(raw).context("credential secret is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_netrc_payload() {
        let secret = parse_netrc_secret(
            r#"{ "netrc_content": "machine urs.earthdata.nasa.gov login user password pass" }"#,
        )
        .unwrap();
        assert!(secret.netrc_content.starts_with("machine "));
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(parse_netrc_secret(r#"{ "wrong_key": "x" }"#).is_err());
    }
}
