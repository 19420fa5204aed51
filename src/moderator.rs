use serde::{Deserialize, Serialize};
use std::time::Duration;

const MODERATION_MODEL: &str = "omni-moderation-latest";
const MODERATION_ENDPOINT: &str = "https://api.openai.com/v1/moderations";

/// Calls an external moderation oracle on a text sample and reduces its
/// response to a single boolean. A missing API key makes every call a
/// permanent no-op (always `false`) without ever reaching the network.
pub struct Moderator {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Deserialize)]
struct ModerationResult {
    flagged: bool,
    categories: ModerationCategories,
}

#[derive(Deserialize)]
struct ModerationCategories {
    #[serde(default)]
    sexual: bool,
}

impl Moderator {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client, api_key }
    }

    /// `harmful` is `true` iff the oracle flags the content *and* marks the
    /// `sexual` category. Empty text and any oracle error both resolve to
    /// `false` without distinguishing the two to callers.
    pub async fn moderate(&self, text: &str) -> bool {
        if text.is_empty() || self.api_key.is_empty() {
            return false;
        }

        match self.call_oracle(text).await {
            Ok(response) => response
                .results
                .first()
                .map(|r| r.flagged && r.categories.sexual)
                .unwrap_or(false),
            Err(e) => {
                tracing::warn!(error = %e, "moderation oracle call failed");
                false
            }
        }
    }

    async fn call_oracle(&self, text: &str) -> Result<ModerationResponse, reqwest::Error> {
        self.client
            .post(MODERATION_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&ModerationRequest {
                model: MODERATION_MODEL,
                input: text,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_text_short_circuits_to_false() {
        let moderator = Moderator::new("some-key".to_string(), Duration::from_secs(5));
        assert!(!moderator.moderate("").await);
    }

    #[tokio::test]
    async fn missing_api_key_is_a_permanent_no_op() {
        let moderator = Moderator::new(String::new(), Duration::from_secs(5));
        assert!(!moderator.moderate("plenty of text here").await);
    }
}
