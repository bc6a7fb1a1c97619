//! Remote execution client used by the RunPad "Run" feature.
//! （RunPad「執行」功能使用的遠端執行用戶端。）
//!
//! Each run is one `POST /run` round trip carrying the buffered source and the
//! lower-cased service identifier of the active language. The service replies
//! with captured output or an error payload; a missing or unreadable reply is a
//! transport failure rather than a payload.
//! 每次執行只會送出一次 `POST /run`，內容為目前的程式碼與小寫的語言識別字串。

pub mod http;
pub mod scripted;

pub use http::HttpExecutionClient;
pub use scripted::{ScriptedClient, ScriptedReply};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path of the execution endpoint relative to the configured base URL.
pub const RUN_PATH: &str = "/run";

/// Errors that prevent a response from being obtained at all.
/// （無法取得任何回應時的錯誤。）
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("execution service unreachable: {0}")]
    Transport(String),
    #[error("failed to decode execution response: {0}")]
    Decode(String),
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// JSON body of a run request.
/// （執行請求的 JSON 內容。）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub code: String,
    pub language: String,
}

impl RunRequest {
    /// Creates a request; the language identifier is lower-cased for the wire.
    /// （建立請求；語言識別字串會轉為小寫。）
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into().to_lowercase(),
        }
    }
}

/// Raw response body as produced by the execution service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decoded result of a run that reached the service.
/// （已送達服務的執行結果。）
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunResponse {
    Output(String),
    ErrorOutput(String),
}

impl RunResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, RunResponse::ErrorOutput(_))
    }

    /// Parses a response body. Anything that is not a JSON object is a decode error.
    pub fn from_json(body: &str) -> Result<Self, ClientError> {
        let wire: WireResponse =
            serde_json::from_str(body).map_err(|err| ClientError::Decode(err.to_string()))?;
        Ok(Self::from(wire))
    }
}

impl From<WireResponse> for RunResponse {
    fn from(wire: WireResponse) -> Self {
        let non_empty = |value: Option<String>| value.filter(|text| !text.is_empty());
        if let Some(stderr) = non_empty(wire.stderr) {
            return RunResponse::ErrorOutput(stderr);
        }
        if let Some(error) = non_empty(wire.error) {
            return RunResponse::ErrorOutput(error);
        }
        RunResponse::Output(wire.output.unwrap_or_default())
    }
}

/// Boundary to the remote interpreter. No retries or cancellation happen here.
/// （遠端直譯器的邊界；此處不做重試或取消。）
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn submit(&self, request: RunRequest) -> Result<RunResponse, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialises_to_wire_shape() {
        let request = RunRequest::new("print(1)", "Python");
        let json = serde_json::to_value(&request).expect("serialise");
        assert_eq!(
            json,
            serde_json::json!({ "code": "print(1)", "language": "python" })
        );
    }

    #[test]
    fn stderr_takes_precedence_over_output() {
        let response =
            RunResponse::from_json(r#"{"output":"partial","stderr":"boom"}"#).expect("decode");
        assert_eq!(response, RunResponse::ErrorOutput("boom".into()));
    }

    #[test]
    fn error_field_is_an_error_payload() {
        let response = RunResponse::from_json(r#"{"error":"unsupported language"}"#).unwrap();
        assert_eq!(
            response,
            RunResponse::ErrorOutput("unsupported language".into())
        );
    }

    #[test]
    fn empty_stderr_falls_back_to_output() {
        let response = RunResponse::from_json(r#"{"output":"1\n","stderr":""}"#).unwrap();
        assert_eq!(response, RunResponse::Output("1\n".into()));
        assert!(!response.is_error());
    }

    #[test]
    fn missing_output_is_empty_text() {
        assert_eq!(
            RunResponse::from_json("{}").unwrap(),
            RunResponse::Output(String::new())
        );
    }

    #[test]
    fn non_json_body_is_decode_error() {
        let err = RunResponse::from_json("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
