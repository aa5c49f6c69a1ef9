use crate::error::ApiError;
use async_trait::async_trait;
use configuration::NetworkConfig;

/// Resolves the public network identity (IP address) of this process.
///
/// A change of identity means exchange WebSocket sessions opened from the old
/// address are stale.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn current_identity(&self) -> Result<String, ApiError>;
}

/// Asks a plain-text "what is my IP" endpoint.
pub struct HttpIdentityResolver {
    client: reqwest::Client,
    url: String,
}

impl HttpIdentityResolver {
    pub fn new(network: &NetworkConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(network.request_timeout())
            .build()?;
        Ok(Self { client, url: network.identity_url.clone() })
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn current_identity(&self) -> Result<String, ApiError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_identity(&body)
    }
}

fn parse_identity(body: &str) -> Result<String, ApiError> {
    let identity = body.trim();
    if identity.is_empty() {
        return Err(ApiError::InvalidData("identity endpoint returned an empty body".to_string()));
    }
    Ok(identity.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_trimmed() {
        assert_eq!(parse_identity("203.0.113.7\n").unwrap(), "203.0.113.7");
    }

    #[test]
    fn blank_identity_is_an_error() {
        assert!(parse_identity(" \n").is_err());
    }
}
