use serde::{Deserialize, Serialize};
use serde_json::Value;

/// File content handed over by the host for transfer. The bytes are sent
/// as-is; nothing here opens, sniffs or validates them.
#[derive(Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Transfer response, returned to the caller untouched. It only reports
/// that the bytes arrived, not that processing finished.
///
/// Any JSON value is accepted; the accessors read the fields servers
/// commonly send without requiring them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadOutcome {
    body: Value,
}

impl UploadOutcome {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name).filter(|v| !v.is_null())
    }

    /// `success` when sent as a boolean
    pub fn success(&self) -> Option<bool> {
        self.field("success").and_then(Value::as_bool)
    }

    pub fn message(&self) -> Option<&str> {
        self.field("message").and_then(Value::as_str)
    }

    pub fn status(&self) -> Option<&str> {
        self.field("status").and_then(Value::as_str)
    }

    /// Raw `error` field: a string or a numeric code, depending on the server
    pub fn error(&self) -> Option<&Value> {
        self.field("error")
    }

    pub fn result(&self) -> Option<&Value> {
        self.field("result")
    }

    pub fn as_json(&self) -> &Value {
        &self.body
    }

    pub fn into_json(self) -> Value {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accepts_string_and_numeric_error() {
        let outcome: UploadOutcome =
            serde_json::from_str(r#"{"success":false,"error":"file too large"}"#).unwrap();
        assert_eq!(outcome.success(), Some(false));
        assert_eq!(outcome.error(), Some(&serde_json::json!("file too large")));

        let outcome: UploadOutcome = serde_json::from_str(r#"{"error":413}"#).unwrap();
        assert_eq!(outcome.error(), Some(&serde_json::json!(413)));
        assert_eq!(outcome.success(), None);
    }

    #[test]
    fn test_outcome_keeps_unknown_fields_and_nested_result() {
        let body = r#"{"error":0,"message":"ok","result":{"upload_file_key":"abc"},"media_id":7}"#;
        let outcome: UploadOutcome = serde_json::from_str(body).unwrap();

        assert_eq!(outcome.message(), Some("ok"));
        assert_eq!(
            outcome.result().and_then(|r| r.get("upload_file_key")),
            Some(&serde_json::json!("abc"))
        );
        assert_eq!(outcome.as_json()["media_id"], 7);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::from_str::<Value>(body).unwrap()
        );
    }

    #[test]
    fn test_outcome_accepts_non_object_bodies() {
        let outcome: UploadOutcome = serde_json::from_str(r#""stored""#).unwrap();
        assert_eq!(outcome.success(), None);
        assert_eq!(outcome.into_json(), serde_json::json!("stored"));
    }

    #[test]
    fn test_upload_file_debug_hides_bytes() {
        let file = UploadFile::new("clip.mp4", vec![0u8; 4]).with_content_type("video/mp4");
        let debug = format!("{:?}", file);
        assert!(debug.contains("clip.mp4"));
        assert!(debug.contains("len: 4"));
        assert_eq!(file.len(), 4);
        assert!(!file.is_empty());
    }
}
