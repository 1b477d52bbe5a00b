use serde::{Deserialize, Serialize};

/// Request body for the generate-stream endpoint.
///
/// The API accepts a batch of prompts; this client always sends exactly one,
/// so `text` is a single-element list. `openai_api_key` is serialized as
/// `null` when unset because the endpoint distinguishes "absent key" from
/// "empty key".
#[derive(Serialize, Clone, Debug)]
pub struct GenerateRequest {
    pub text: Vec<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub openai_api_key: Option<String>,
}

impl GenerateRequest {
    pub fn new(
        prompt: String,
        model: String,
        max_tokens: u32,
        temperature: f64,
        openai_api_key: Option<String>,
    ) -> Self {
        Self {
            text: vec![prompt],
            model,
            max_tokens,
            temperature,
            openai_api_key,
        }
    }
}

/// One decoded record from a `data: ` line of the response stream.
///
/// The endpoint sends bookkeeping records without a `token` field; those are
/// not errors, just no-ops for the renderer.
#[derive(Deserialize, Debug)]
pub struct StreamChunk {
    pub token: Option<String>,
}
