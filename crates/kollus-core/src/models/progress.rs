use serde::{Deserialize, Serialize};

/// Progress payload of a status response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressResult {
    /// Percentage in 0-100
    pub progress: f64,
    #[serde(default)]
    pub status: String,
}

/// One read of the status address.
///
/// `error` is the server-level indicator; only `Some(0)` together with a
/// `result` counts as a usable reading. When `error` is anything else the
/// `result` payload is not inspected, and one that does not fit
/// [`ProgressResult`] is dropped instead of failing the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct ProgressSnapshot {
    pub error: Option<i64>,
    pub result: Option<ProgressResult>,
}

#[derive(Deserialize)]
struct RawSnapshot {
    error: Option<i64>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

impl TryFrom<RawSnapshot> for ProgressSnapshot {
    type Error = serde_json::Error;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        let result = match (raw.error, raw.result) {
            (_, None) => None,
            (Some(0), Some(value)) => Some(serde_json::from_value(value)?),
            (_, Some(value)) => serde_json::from_value(value).ok(),
        };
        Ok(Self {
            error: raw.error,
            result,
        })
    }
}

impl ProgressSnapshot {
    pub fn in_progress(progress: f64, status: impl Into<String>) -> Self {
        Self {
            error: Some(0),
            result: Some(ProgressResult {
                progress,
                status: status.into(),
            }),
        }
    }

    pub fn server_error(code: i64) -> Self {
        Self {
            error: Some(code),
            result: None,
        }
    }

    /// Progress value, if the snapshot carries no server error.
    pub fn progress(&self) -> Option<f64> {
        match (self.error, &self.result) {
            (Some(0), Some(result)) => Some(result.progress),
            _ => None,
        }
    }

    pub fn status_label(&self) -> Option<&str> {
        self.result.as_ref().map(|r| r.status.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.progress().is_some_and(|p| p >= 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_parses_integer_progress() {
        let snapshot: ProgressSnapshot = serde_json::from_str(
            r#"{"error":0,"result":{"progress":55,"status":"transcoding"}}"#,
        )
        .unwrap();
        assert_eq!(snapshot.progress(), Some(55.0));
        assert_eq!(snapshot.status_label(), Some("transcoding"));
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn test_server_error_hides_progress() {
        let snapshot: ProgressSnapshot = serde_json::from_str(
            r#"{"error":1,"result":{"progress":80,"status":"failed"}}"#,
        )
        .unwrap();
        assert_eq!(snapshot.progress(), None);
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn test_server_error_tolerates_any_result_payload() {
        for body in [
            r#"{"error":1,"message":"not ready","result":[]}"#,
            r#"{"error":1,"result":{}}"#,
            r#"{"error":2,"result":"pending"}"#,
        ] {
            let snapshot: ProgressSnapshot = serde_json::from_str(body).unwrap();
            assert_eq!(snapshot.progress(), None, "{}", body);
            assert_eq!(snapshot.result, None, "{}", body);
        }
    }

    #[test]
    fn test_malformed_result_without_error_fails() {
        assert!(serde_json::from_str::<ProgressSnapshot>(r#"{"error":0,"result":[]}"#).is_err());
        assert!(serde_json::from_str::<ProgressSnapshot>(r#"{"error":0,"result":{}}"#).is_err());
    }

    #[test]
    fn test_missing_fields_are_not_a_reading() {
        let snapshot: ProgressSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot.error, None);
        assert_eq!(snapshot.progress(), None);

        let snapshot: ProgressSnapshot = serde_json::from_str(r#"{"error":0}"#).unwrap();
        assert_eq!(snapshot.progress(), None);
    }

    #[test]
    fn test_complete_at_or_above_hundred() {
        assert!(ProgressSnapshot::in_progress(100.0, "done").is_complete());
        assert!(ProgressSnapshot::in_progress(101.0, "done").is_complete());
        assert!(!ProgressSnapshot::server_error(3).is_complete());
    }
}
