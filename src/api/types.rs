use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub model_id: String,
    pub model_name: String,
    pub provider: String,
    pub category: Option<String>,
    pub capabilities: Vec<String>,
    pub supports_multimodal: bool,
}

#[derive(Debug, Serialize)]
pub struct OptimizeRequest<'a> {
    pub input_text: &'a str,
    pub model_id: &'a str,
}

/// Body of `POST optimize`. Fields beyond the three the harness checks
/// (tips, structure, token limits, ...) are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OptimizeResponse {
    pub fn tips(&self) -> Vec<String> {
        ["optimization_tips", "tips"]
            .iter()
            .find_map(|key| self.extra.get(*key))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Display name of the model that handled the request, when the backend reports one.
    pub fn model_name(&self) -> Option<String> {
        self.extra
            .get("model_info")
            .and_then(|info| info.get("model_name"))
            .or_else(|| self.extra.get("model_name"))
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Serialize)]
pub struct CompareRequest<'a> {
    pub model_ids: &'a [String],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageStats {
    pub total_requests: u64,
    pub model_usage: HashMap<String, u64>,
    pub category_usage: HashMap<String, u64>,
    pub recent_requests_count: u64,
    pub top_models: Vec<(String, u64)>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}
