use super::types::{CompareRequest, ErrorBody, Model, OptimizeRequest, OptimizeResponse, UsageStats};
use crate::config::Config;
use crate::error::ProbeError;
use crate::store::{PromptHistory, SavedPrompt};
use async_trait::async_trait;
use reqwest::{IntoUrl, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Everything the harness and the CLI need from the prompt optimization backend.
///
/// Network operations are async; the saved-prompt helpers only touch local storage.
#[async_trait]
pub trait PromptApi: Send + Sync {
    async fn check_health(&self) -> Result<bool, ProbeError>;
    async fn get_models(&self) -> Result<Vec<Model>, ProbeError>;
    async fn get_model_tips(&self, model_id: &str) -> Result<Vec<String>, ProbeError>;
    async fn get_model_structure(&self, model_id: &str) -> Result<Map<String, Value>, ProbeError>;
    async fn get_model_info(&self, model_id: &str) -> Result<Map<String, Value>, ProbeError>;
    async fn compare_models(&self, model_ids: &[String]) -> Result<Map<String, Value>, ProbeError>;
    async fn optimize_prompt(
        &self,
        input_text: &str,
        model_id: &str,
    ) -> Result<OptimizeResponse, ProbeError>;
    async fn get_stats(&self) -> Result<UsageStats, ProbeError>;
    async fn get_examples(&self, model_id: &str) -> Result<Vec<String>, ProbeError>;

    fn save_prompt(&self, record: &SavedPrompt) -> Result<(), ProbeError>;
    fn get_saved_prompts(&self) -> Result<Vec<SavedPrompt>, ProbeError>;
    /// Returns `false` when no record had this id.
    fn delete_saved_prompt(&self, id: &str) -> Result<bool, ProbeError>;
    /// Overwrites the saved prompts with `items`.
    fn restore_saved_prompts(&self, items: &[SavedPrompt]) -> Result<(), ProbeError>;
}

pub struct ApiClient {
    client: reqwest::Client,
    config: Config,
    history: PromptHistory,
}

impl ApiClient {
    pub fn new(config: Config, history: PromptHistory) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config, history })
    }

    pub fn base_url(&self) -> &str {
        &self.config.api_base_url
    }

    /// `root` under the base URL, followed by percent-encoded `segments`.
    fn segment_url(&self, root: &str, segments: &[&str]) -> Result<Url, ProbeError> {
        let mut url = Url::parse(&self.config.api_url(root))
            .map_err(|e| ProbeError::Config(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ProbeError::Config("base URL cannot carry a path".into()))?
            .extend(segments);
        Ok(url)
    }

    fn model_url(&self, model_id: &str, leaf: &str) -> Result<Url, ProbeError> {
        self.segment_url("model", &[model_id, leaf])
    }

    async fn get_json(&self, url: impl IntoUrl) -> Result<Value, ProbeError> {
        let res = self.client.get(url).send().await?;
        read_json(res).await
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: impl IntoUrl,
        body: &B,
    ) -> Result<Value, ProbeError> {
        let res = self.client.post(url).json(body).send().await?;
        read_json(res).await
    }
}

#[async_trait]
impl PromptApi for ApiClient {
    async fn check_health(&self) -> Result<bool, ProbeError> {
        let res = self.client.get(self.config.api_url("health")).send().await?;
        if !res.status().is_success() {
            log::warn!("Health endpoint answered {}", res.status());
        }
        Ok(res.status().is_success())
    }

    async fn get_models(&self) -> Result<Vec<Model>, ProbeError> {
        let body = self.get_json(self.config.api_url("models")).await?;
        field(body, "models")
    }

    async fn get_model_tips(&self, model_id: &str) -> Result<Vec<String>, ProbeError> {
        let body = self.get_json(self.model_url(model_id, "tips")?).await?;
        field(body, "tips")
    }

    async fn get_model_structure(&self, model_id: &str) -> Result<Map<String, Value>, ProbeError> {
        let body = self.get_json(self.model_url(model_id, "structure")?).await?;
        field(body, "structure")
    }

    async fn get_model_info(&self, model_id: &str) -> Result<Map<String, Value>, ProbeError> {
        let body = self.get_json(self.model_url(model_id, "info")?).await?;
        field(body, "info")
    }

    async fn compare_models(&self, model_ids: &[String]) -> Result<Map<String, Value>, ProbeError> {
        let body = self
            .post_json(self.config.api_url("models/compare"), &CompareRequest { model_ids })
            .await?;
        field(body, "comparison")
    }

    async fn optimize_prompt(
        &self,
        input_text: &str,
        model_id: &str,
    ) -> Result<OptimizeResponse, ProbeError> {
        let input_text = required("input text", input_text)?;
        let model_id = required("model id", model_id)?;

        let res = self
            .client
            .post(self.config.api_url("optimize"))
            .json(&OptimizeRequest { input_text, model_id })
            .send()
            .await?;

        let status = res.status();
        if status.is_success() {
            return Ok(res.json().await?);
        }

        // Rejections still carry a structured body with `error`; hand it back as a response.
        let text = res.text().await.unwrap_or_default();
        match serde_json::from_str::<OptimizeResponse>(&text) {
            Ok(mut rejected) if rejected.error.is_some() => {
                log::warn!("Optimize rejected ({status}): {}", rejected.error.as_deref().unwrap_or_default());
                rejected.success = false;
                Ok(rejected)
            }
            _ => Err(http_error(status, &text)),
        }
    }

    async fn get_stats(&self) -> Result<UsageStats, ProbeError> {
        let body = self.get_json(self.config.api_url("stats")).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn get_examples(&self, model_id: &str) -> Result<Vec<String>, ProbeError> {
        let body = self.get_json(self.segment_url("examples", &[model_id])?).await?;
        field(body, "examples")
    }

    fn save_prompt(&self, record: &SavedPrompt) -> Result<(), ProbeError> {
        self.history.save(record)
    }

    fn get_saved_prompts(&self) -> Result<Vec<SavedPrompt>, ProbeError> {
        self.history.list()
    }

    fn delete_saved_prompt(&self, id: &str) -> Result<bool, ProbeError> {
        self.history.delete(id)
    }

    fn restore_saved_prompts(&self, items: &[SavedPrompt]) -> Result<(), ProbeError> {
        self.history.replace(items)
    }
}

/// Trims `value`, rejecting it when nothing is left.
fn required<'a>(what: &str, value: &'a str) -> Result<&'a str, ProbeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProbeError::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}

/// Name to store alongside a saved prompt: the one the response reports, else the
/// catalogue entry for `model_id`, else the id itself.
pub async fn resolve_model_name<A: PromptApi + ?Sized>(
    api: &A,
    response: &OptimizeResponse,
    model_id: &str,
) -> String {
    if let Some(name) = response.model_name() {
        return name;
    }
    match api.get_models().await {
        Ok(models) => models
            .into_iter()
            .find(|m| m.model_id == model_id && !m.model_name.is_empty())
            .map(|m| m.model_name)
            .unwrap_or_else(|| model_id.to_string()),
        Err(e) => {
            log::warn!("Could not look up a name for '{model_id}': {e}");
            model_id.to_string()
        }
    }
}

async fn read_json(res: Response) -> Result<Value, ProbeError> {
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        return Err(http_error(status, &text));
    }
    Ok(res.json().await?)
}

fn http_error(status: StatusCode, body: &str) -> ProbeError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| format!("server error ({status})"));
    log::error!("API Error {status}: {message}");
    ProbeError::Http { status: status.as_u16(), message }
}

/// Pulls `key` out of a response envelope. An absent or null field reads as empty.
fn field<T: DeserializeOwned + Default>(mut body: Value, key: &str) -> Result<T, ProbeError> {
    match body.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => Ok(serde_json::from_value(v)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::extract::{Json, Path};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};
    use axum::Router;
    use serde_json::json;
    use std::sync::Arc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn client_for(base: &str) -> ApiClient {
        let mut config = Config::default();
        config.set_base_url(base);
        let history = PromptHistory::new(Arc::new(MemoryStore::new()), 10);
        ApiClient::new(config, history).unwrap()
    }

    fn backend() -> Router {
        Router::new()
            .route("/api/health", get(|| async { Json(json!({ "status": "healthy" })) }))
            .route(
                "/api/models",
                get(|| async {
                    Json(json!({
                        "success": true,
                        "models": [
                            { "model_id": "gpt-4o", "model_name": "GPT-4o", "provider": "OpenAI" },
                            { "model_id": "suno", "model_name": "Suno", "provider": "Suno" }
                        ]
                    }))
                }),
            )
            .route(
                "/api/model/{id}/tips",
                get(|Path(id): Path<String>| async move {
                    Json(json!({ "success": true, "tips": [format!("tip for {id}")] }))
                }),
            )
            .route(
                "/api/model/{id}/structure",
                get(|| async { Json(json!({ "success": true })) }),
            )
            .route(
                "/api/model/{id}/info",
                get(|| async {
                    (AxumStatus::NOT_FOUND, Json(json!({ "error": "unknown model" })))
                }),
            )
            .route(
                "/api/models/compare",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({ "success": true, "comparison": { "requested": body["model_ids"] } }))
                }),
            )
            .route(
                "/api/optimize",
                post(|Json(body): Json<Value>| async move {
                    if body["model_id"] == "broken" {
                        return (AxumStatus::BAD_REQUEST, Json(json!({ "error": "quota exceeded" })));
                    }
                    (
                        AxumStatus::OK,
                        Json(json!({
                            "success": true,
                            "optimized_prompt": format!("optimized: {}", body["input_text"].as_str().unwrap_or_default()),
                            "optimization_tips": ["be specific"]
                        })),
                    )
                }),
            )
            .route(
                "/api/stats",
                get(|| async {
                    Json(json!({
                        "total_requests": 3,
                        "model_usage": { "gpt-4o": 3 },
                        "top_models": [["gpt-4o", 3]]
                    }))
                }),
            )
            .route(
                "/api/examples/{model}",
                get(|Path(model): Path<String>| async move {
                    if model != "gpt-4o" {
                        return (
                            AxumStatus::NOT_FOUND,
                            Json(json!({ "error": format!("no examples for '{model}'") })),
                        );
                    }
                    (
                        AxumStatus::OK,
                        Json(json!({
                            "model": model,
                            "examples": ["Summarize a meeting transcript", "Draft a cover letter"],
                            "count": 2
                        })),
                    )
                }),
            )
    }

    #[tokio::test]
    async fn test_catalogue_endpoints() {
        let api = client_for(&serve(backend()).await);

        assert!(api.check_health().await.unwrap());

        let models = api.get_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[1].model_id, "suno");

        let tips = api.get_model_tips("gpt-4o").await.unwrap();
        assert_eq!(tips, vec!["tip for gpt-4o".to_string()]);

        // Missing envelope field reads as empty.
        assert!(api.get_model_structure("gpt-4o").await.unwrap().is_empty());

        let ids = vec!["gpt-4o".to_string(), "suno".to_string()];
        let comparison = api.compare_models(&ids).await.unwrap();
        assert_eq!(comparison["requested"], json!(["gpt-4o", "suno"]));
    }

    #[tokio::test]
    async fn test_error_body_becomes_http_error() {
        let api = client_for(&serve(backend()).await);

        let err = api.get_model_info("nope").await.unwrap_err();
        match err {
            ProbeError::Http { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "unknown model");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_optimize_success_and_rejection() {
        let api = client_for(&serve(backend()).await);

        let ok = api.optimize_prompt("sunrise", "gpt-4o").await.unwrap();
        assert!(ok.success);
        assert_eq!(ok.optimized_prompt.as_deref(), Some("optimized: sunrise"));
        assert_eq!(ok.tips(), vec!["be specific".to_string()]);

        let rejected = api.optimize_prompt("sunrise", "broken").await.unwrap();
        assert!(!rejected.success);
        assert_eq!(rejected.error.as_deref(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn test_optimize_trims_input_before_sending() {
        let api = client_for(&serve(backend()).await);

        let ok = api.optimize_prompt("  sunrise \n", " gpt-4o ").await.unwrap();
        assert_eq!(ok.optimized_prompt.as_deref(), Some("optimized: sunrise"));
    }

    #[tokio::test]
    async fn test_optimize_rejects_blank_input_without_a_request() {
        // Nothing listens here, so an Api error would mean a request went out.
        let api = client_for("http://127.0.0.1:1/api");

        let err = api.optimize_prompt("   \t", "gpt-4o").await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidInput(ref m) if m.contains("input text")), "{err}");

        let err = api.optimize_prompt("sunrise", "  ").await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidInput(ref m) if m.contains("model id")), "{err}");
    }

    #[tokio::test]
    async fn test_examples_endpoint() {
        let api = client_for(&serve(backend()).await);

        let examples = api.get_examples("gpt-4o").await.unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0], "Summarize a meeting transcript");

        let err = api.get_examples("suno").await.unwrap_err();
        assert!(matches!(err, ProbeError::Http { status: 404, ref message } if message.contains("suno")));
    }

    #[tokio::test]
    async fn test_stats_and_unreachable_server() {
        let api = client_for(&serve(backend()).await);
        let stats = api.get_stats().await.unwrap();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.top_models, vec![("gpt-4o".to_string(), 3)]);
        assert_eq!(stats.model_usage["gpt-4o"], 3);

        let dead = client_for("http://127.0.0.1:1/api");
        assert!(matches!(dead.check_health().await, Err(ProbeError::Api(_))));
    }

    #[tokio::test]
    async fn test_model_name_resolution_falls_back_to_catalogue() {
        let api = client_for(&serve(backend()).await);
        let bare = OptimizeResponse { success: true, ..Default::default() };

        assert_eq!(resolve_model_name(&api, &bare, "gpt-4o").await, "GPT-4o");
        assert_eq!(resolve_model_name(&api, &bare, "unlisted").await, "unlisted");

        let mut named = bare.clone();
        named.extra.insert("model_info".into(), json!({ "model_name": "Reported" }));
        assert_eq!(resolve_model_name(&api, &named, "gpt-4o").await, "Reported");

        let dead = client_for("http://127.0.0.1:1/api");
        assert_eq!(resolve_model_name(&dead, &bare, "gpt-4o").await, "gpt-4o");
    }

    #[test]
    fn test_model_url_encodes_segments() {
        let api = client_for("http://localhost:5000/api");
        let url = api.model_url("gpt 4/o", "tips").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/model/gpt%204%2Fo/tips");
    }

    #[test]
    fn test_saved_prompt_helpers_delegate_to_history() {
        let api = client_for("http://localhost:5000/api");
        let record = SavedPrompt::new("gpt-4o", "GPT-4o", "in", "out");
        api.save_prompt(&record).unwrap();
        assert_eq!(api.get_saved_prompts().unwrap(), vec![record.clone()]);
        assert!(api.delete_saved_prompt(&record.id).unwrap());
        assert!(!api.delete_saved_prompt(&record.id).unwrap());
        assert!(api.get_saved_prompts().unwrap().is_empty());

        api.restore_saved_prompts(std::slice::from_ref(&record)).unwrap();
        assert_eq!(api.get_saved_prompts().unwrap(), vec![record]);
    }
}
