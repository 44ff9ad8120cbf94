use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{parse_plan_response, Planner};
use crate::config::PlannerConfig;
use crate::error::Error;
use crate::model::{Plan, PlannerInput};

const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You organize a messy folder (SOURCE) into a two-level library \
(LIBRARY: Category/Subcategory). You receive JSON {source, library}. Every source entry is a \
single top-level item that must be placed as a whole; never split or merge items.\n\
Reply with ONLY a JSON object of the form:\n\
{\"placements\": [{\"path\": <exact source rel_path>, \"category\": <name>, \
\"subcategory\": <name or null for directly in the category>, \"reason\": <short>}],\n\
 \"new_folders\": [{\"category\": <name>, \"subcategory\": <name or null>, \"reason\": <short>}],\n\
 \"notes\": <string>}\n\
Prefer existing categories and subcategories. Declare every category or subcategory that does \
not exist yet in new_folders. Folder names must be single path components.";

#[derive(Serialize)]
struct MessageContent {
    #[serde(rename = "type")]
    content_type: &'static str,
    text: String,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<MessageContent>,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Planner backed by an Anthropic Messages endpoint.
pub struct RemotePlanner {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl RemotePlanner {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Planner(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            max_tokens,
        })
    }

    /// Reads the API key from the environment variable named in the config.
    pub fn from_config(config: &PlannerConfig) -> Result<Self, Error> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Planner(format!("environment variable {} is not set", config.api_key_env))
        })?;
        Self::new(
            &config.endpoint,
            &config.model,
            &api_key,
            config.max_tokens,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn send(&self, user_message: String) -> Result<String, Error> {
        let request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: vec![MessageContent {
                    content_type: "text",
                    text: user_message,
                }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .map_err(|e| Error::Planner(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_text) {
                return Err(Error::Planner(format!("API error: {}", api_error.error.message)));
            }
            return Err(Error::Planner(format!("API error ({status}): {error_text}")));
        }

        let api_response: ApiResponse = response
            .json()
            .map_err(|e| Error::Planner(format!("failed to parse response: {e}")))?;

        let text = api_response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }
}

impl Planner for RemotePlanner {
    fn name(&self) -> &str {
        "remote"
    }

    fn plan(&self, input: &PlannerInput) -> Result<Plan, Error> {
        let payload = serde_json::to_string(input)?;
        info!(
            "Requesting plan from {} ({} entries, {} bytes)",
            self.endpoint,
            input.source.entries.len(),
            payload.len()
        );
        let text = self.send(payload)?;
        debug!("Planner replied with {} chars", text.len());
        parse_plan_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_planner_failure() {
        let config = PlannerConfig {
            api_key_env: "SORTBOX_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..PlannerConfig::default()
        };
        let err = RemotePlanner::from_config(&config).err().unwrap();
        assert!(matches!(err, Error::Planner(_)));
    }

    #[test]
    fn request_body_matches_messages_api() {
        let request = ApiRequest {
            model: "m",
            max_tokens: 10,
            system: "s",
            messages: vec![Message {
                role: "user",
                content: vec![MessageContent {
                    content_type: "text",
                    text: "{}".to_string(),
                }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["max_tokens"], 10);
    }
}
