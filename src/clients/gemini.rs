use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::clients::{
    KeywordExtractor,
    errors::{Error, Result},
};

/// Public Gemini API base URL.
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Model used when `GEMINI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Name of the single tool the model is asked to call.
pub const SEARCH_TOOL_NAME: &str = "deezer_playlist_search";

const SEARCH_TOOL_DESCRIPTION: &str =
    "Search for a music playlist on Deezer based on a mood keyword. Use this to find music.";
const QUERY_DESCRIPTION: &str = "The best single keyword or short phrase (in English) to search for a playlist matching the user's mood.";

const SYSTEM_PROMPT: &str = r#"You are a DJ assistant. Your goal is to translate the user's mood description into a SINGLE, effective search term for a music playlist on Deezer.

Examples:
- "I just broke up" -> "Breakup" or "Sad"
- "Coding all night" -> "Lo-fi" or "Focus"
- "Going to the gym" -> "Workout" or "Phonk"
- "Jantar romântico" -> "Dinner Jazz" or "Romantic"

ALWAYS call the 'deezer_playlist_search' tool with the best keyword."#;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAX_RETRIES: u32 = 2;
const RETRY_BASE_DELAY_MS: u64 = 200;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "functionCall", default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Content {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
                function_call: None,
            }],
        }
    }
}

// Schema-only declaration: it constrains the shape of the model's answer and is never executed
#[derive(Serialize, Debug)]
struct FunctionDeclaration {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Tool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize, Debug)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize, Debug, Default)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct GeminiErrorBody {
    error: GeminiError,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

fn search_tool() -> Tool {
    Tool {
        function_declarations: vec![FunctionDeclaration {
            name: SEARCH_TOOL_NAME,
            description: SEARCH_TOOL_DESCRIPTION,
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": QUERY_DESCRIPTION,
                    }
                },
                "required": ["query"],
            }),
        }],
    }
}

fn build_request(mood: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Content::text(None, SYSTEM_PROMPT),
        contents: vec![Content::text(Some("user"), mood)],
        tools: vec![search_tool()],
        generation_config: GenerationConfig { temperature: 0.0 },
    }
}

// First invocation of the search tool carrying a non-blank `query`
fn keyword_from_response(response: &GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .iter()
        .flat_map(|c| c.content.parts.iter())
        .filter_map(|p| p.function_call.as_ref())
        .find(|call| call.name == SEARCH_TOOL_NAME)
        .and_then(|call| call.args.get("query"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}

/// Client for Gemini's `generateContent` endpoint, used as a keyword extractor.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Fails on a blank API key.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::ConfigurationError(
                "GOOGLE_API_KEY must not be empty".into(),
            ));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(GeminiClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Retries after the first attempt for transient failures.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn generate(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            if let Ok(GeminiErrorBody { error }) = serde_json::from_str(&body) {
                warn!("Gemini API error {}: {}", error.code, error.message);
            }
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn generate_with_retry(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let mut attempt = 0;
        loop {
            match self.generate(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay_ms = RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1);
                    warn!(
                        "Gemini request failed ({e}), retry {attempt}/{} in {delay_ms}ms",
                        self.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(Error::LanguageModel(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl KeywordExtractor for GeminiClient {
    async fn extract_keyword(&self, mood: &str) -> Result<Option<String>> {
        let request = build_request(mood);
        let response = self.generate_with_retry(&request).await?;
        let keyword = keyword_from_response(&response);
        debug!("Gemini keyword for {mood:?}: {keyword:?}");
        Ok(keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool_call_response(name: &str, query: &str) -> Value {
        json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "functionCall": { "name": name, "args": { "query": query } } }]
                },
                "finishReason": "STOP"
            }]
        })
    }

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(server.uri(), "test-key", DEFAULT_MODEL).unwrap()
    }

    #[test]
    fn request_declares_single_search_tool() {
        let body = serde_json::to_value(build_request("Coding all night")).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Coding all night");
        assert!(
            body["systemInstruction"]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .contains("deezer_playlist_search")
        );
        assert_eq!(body["generationConfig"]["temperature"], 0.0);

        let declarations = body["tools"][0]["functionDeclarations"].as_array().unwrap();
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0]["name"], SEARCH_TOOL_NAME);
        assert_eq!(declarations[0]["parameters"]["required"], json!(["query"]));
        assert_eq!(
            declarations[0]["parameters"]["properties"]["query"]["type"],
            "string"
        );
    }

    #[test]
    fn keyword_requires_matching_tool_and_non_blank_query() {
        let parse = |v: Value| -> Option<String> {
            keyword_from_response(&serde_json::from_value(v).unwrap())
        };

        assert_eq!(
            parse(tool_call_response(SEARCH_TOOL_NAME, " Workout ")),
            Some("Workout".to_string())
        );
        assert_eq!(parse(tool_call_response("other_tool", "Workout")), None);
        assert_eq!(parse(tool_call_response(SEARCH_TOOL_NAME, "  ")), None);
        assert_eq!(
            parse(json!({ "candidates": [{ "content": { "parts": [{ "text": "Try Lo-fi" }] } }] })),
            None
        );
        assert_eq!(parse(json!({})), None);
    }

    #[tokio::test]
    async fn extracts_keyword_from_tool_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-lite:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(tool_call_response(SEARCH_TOOL_NAME, "Phonk")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let keyword = client(&server)
            .extract_keyword("Going to the gym")
            .await
            .unwrap();
        assert_eq!(keyword.as_deref(), Some("Phonk"));
    }

    #[tokio::test]
    async fn retries_transient_failures_twice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
            })))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).extract_keyword("sad").await.unwrap_err();
        assert!(matches!(err, Error::LanguageModel(_)));
    }

    #[tokio::test]
    async fn does_not_retry_auth_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server).extract_keyword("sad").await.is_err());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = GeminiClient::new(GEMINI_API_URL, " ", DEFAULT_MODEL).unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }
}
