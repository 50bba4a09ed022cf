//! Function entry points and the serverless response envelope.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::context::ServiceContext;
use crate::encode::OutputImage;
use crate::error::BannerError;
use crate::params::{GenerateParams, MergeParams};
use crate::pipeline;

/// The two deployable functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Function {
    /// Image, banner, same image.
    Generate,
    /// Top image, bar, bottom image.
    Merge,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generate => "generate",
            Self::Merge => "merge",
        })
    }
}

impl FromStr for Function {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(Self::Generate),
            "merge" => Ok(Self::Merge),
            other => Err(format!("Unknown function '{other}'. Valid: generate, merge")),
        }
    }
}

/// An inbound function event. Only the query string is consulted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    /// Query string parameters; `null` is treated as empty.
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

/// What a function hands back to its transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Body, base64 encoded when `is_base64_encoded` is set.
    pub body: String,
    /// Whether `body` must be base64 decoded before sending.
    pub is_base64_encoded: bool,
}

impl FunctionResponse {
    /// A 200 carrying an encoded image.
    #[must_use]
    pub fn image(output: &OutputImage) -> Self {
        Self {
            status_code: 200,
            headers: BTreeMap::from([("Content-Type".to_string(), output.mime_type().to_string())]),
            body: base64::engine::general_purpose::STANDARD.encode(&output.bytes),
            is_base64_encoded: true,
        }
    }

    /// The JSON error envelope shared by every failure.
    #[must_use]
    pub fn error(err: &BannerError) -> Self {
        let body = serde_json::json!({
            "error": { "kind": err.kind(), "message": err.to_string() }
        });
        Self {
            status_code: err.status_code(),
            headers: BTreeMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
            body: body.to_string(),
            is_base64_encoded: false,
        }
    }

    /// Raw body bytes, decoding base64 when flagged.
    ///
    /// # Errors
    ///
    /// Returns an error if a flagged body is not valid base64.
    pub fn body_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        if self.is_base64_encoded {
            base64::engine::general_purpose::STANDARD.decode(&self.body)
        } else {
            Ok(self.body.as_bytes().to_vec())
        }
    }
}

/// Run one invocation of `function`.
///
/// Parameters are validated before anything is fetched. Every failure is
/// logged here, once, and converted into the error envelope.
pub async fn handle(
    function: Function,
    query: &HashMap<String, String>,
    ctx: &ServiceContext,
) -> FunctionResponse {
    tracing::info!(%function, "invocation");
    match run(function, query, ctx).await {
        Ok(output) => {
            tracing::info!(
                %function,
                width = output.width,
                height = output.height,
                bytes = output.bytes.len(),
                "image composed"
            );
            FunctionResponse::image(&output)
        }
        Err(err) if err.status_code() < 500 => {
            tracing::warn!(%function, kind = err.kind(), error = %err, "rejected request");
            FunctionResponse::error(&err)
        }
        Err(err) => {
            tracing::error!(%function, kind = err.kind(), error = %err, "invocation failed");
            FunctionResponse::error(&err)
        }
    }
}

async fn run(
    function: Function,
    query: &HashMap<String, String>,
    ctx: &ServiceContext,
) -> Result<OutputImage, BannerError> {
    match function {
        Function::Generate => {
            let params = GenerateParams::from_query(query).map_err(BannerError::Validation)?;
            pipeline::generate(ctx.source.as_ref(), &ctx.renderer, params).await
        }
        Function::Merge => {
            let params = MergeParams::from_query(query).map_err(BannerError::Validation)?;
            pipeline::merge(ctx.source.as_ref(), &ctx.renderer, params).await
        }
    }
}
