use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{UploadError, UploadResult};
use crate::format::format_expire_time;

/// Upload mode. Decides which host issues the destination and which
/// payload fields the request must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UploadVariant {
    #[default]
    Normal,
    Passthrough,
    Filelive,
}

impl UploadVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadVariant::Normal => "normal",
            UploadVariant::Passthrough => "passthrough",
            UploadVariant::Filelive => "filelive",
        }
    }

    /// Passthrough and filelive destinations are issued by the upload host.
    pub fn uses_upload_host(&self) -> bool {
        matches!(self, UploadVariant::Passthrough | UploadVariant::Filelive)
    }
}

impl fmt::Display for UploadVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(UploadVariant::Normal),
            "passthrough" => Ok(UploadVariant::Passthrough),
            "filelive" => Ok(UploadVariant::Filelive),
            other => Err(format!(
                "Invalid upload variant '{}'. Must be: normal, passthrough, or filelive",
                other
            )),
        }
    }
}

/// Parameters for one destination request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRequest {
    /// Seconds until the issued destination expires
    pub expire_time: u64,
    pub category_key: Option<String>,
    pub title: Option<String>,
    pub variant: UploadVariant,
    /// Transcoding profile; only read for passthrough uploads
    pub profile_key: Option<String>,
}

impl DestinationRequest {
    pub fn new(expire_time: u64, variant: UploadVariant) -> Self {
        Self {
            expire_time,
            category_key: None,
            title: None,
            variant,
            profile_key: None,
        }
    }

    pub fn with_category_key(mut self, category_key: impl Into<String>) -> Self {
        self.category_key = Some(category_key.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_profile_key(mut self, profile_key: impl Into<String>) -> Self {
        self.profile_key = Some(profile_key.into());
        self
    }

    /// Category key, treating an empty string as absent.
    pub fn category_key(&self) -> Option<&str> {
        non_empty(self.category_key.as_deref())
    }

    pub fn title(&self) -> Option<&str> {
        non_empty(self.title.as_deref())
    }

    pub fn profile_key(&self) -> Option<&str> {
        non_empty(self.profile_key.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A destination issued by the service for one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationDescriptor {
    /// Where the file bytes are posted
    pub upload_url: String,
    /// Where processing progress is polled
    pub progress_url: String,
    pub upload_file_key: String,
    pub expires_at: DateTime<Utc>,
}

impl DestinationDescriptor {
    /// Expiry rendered in Korea Standard Time.
    pub fn formatted_expiry(&self) -> Option<String> {
        format_expire_time(self.expires_at.timestamp())
    }
}

/// Destination payload nested under `result` (numeric `error` envelope).
#[derive(Debug, Clone, Deserialize)]
pub struct ResultDestination {
    pub upload_url: String,
    pub progress_url: String,
    pub upload_file_key: String,
    pub will_be_expired_at: i64,
}

/// Destination payload nested under `data` (string `status` envelope).
#[derive(Debug, Clone, Deserialize)]
pub struct DataDestination {
    pub upload_url: String,
    pub progress_url: String,
    pub upload_file_key: String,
    pub expired_at: i64,
}

/// Raw create_url response. Servers answer with one of two envelopes; the
/// last variant catches every body that carries neither destination.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CreateUrlResponse {
    Result {
        error: i64,
        message: Option<String>,
        result: ResultDestination,
    },
    Data {
        status: String,
        message: Option<String>,
        data: DataDestination,
    },
    Rejected {
        status: Option<String>,
        error: Option<i64>,
        message: Option<String>,
    },
}

impl CreateUrlResponse {
    /// Normalize either envelope into a descriptor, failing closed on
    /// anything that is not an explicit success.
    pub fn into_descriptor(self) -> UploadResult<DestinationDescriptor> {
        match self {
            CreateUrlResponse::Result {
                error: 0, result, ..
            } => Ok(DestinationDescriptor {
                expires_at: expiry_instant(result.will_be_expired_at)?,
                upload_url: result.upload_url,
                progress_url: result.progress_url,
                upload_file_key: result.upload_file_key,
            }),
            CreateUrlResponse::Result { error, message, .. } => Err(UploadError::rejected(
                Some(error),
                message.unwrap_or_else(|| "create_url request failed".to_string()),
            )),
            CreateUrlResponse::Data {
                status, data, ..
            } if is_success_status(&status) => Ok(DestinationDescriptor {
                expires_at: expiry_instant(data.expired_at)?,
                upload_url: data.upload_url,
                progress_url: data.progress_url,
                upload_file_key: data.upload_file_key,
            }),
            CreateUrlResponse::Data {
                status, message, ..
            } => Err(UploadError::rejected(None, message.unwrap_or(status))),
            CreateUrlResponse::Rejected {
                status,
                error,
                message,
            } => Err(UploadError::rejected(
                error,
                message.or(status).unwrap_or_else(|| {
                    "create_url response carried no upload destination".to_string()
                }),
            )),
        }
    }
}

fn is_success_status(status: &str) -> bool {
    status.eq_ignore_ascii_case("success") || status.eq_ignore_ascii_case("ok")
}

fn expiry_instant(timestamp: i64) -> UploadResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
        UploadError::transport(
            "Failed to parse create_url response",
            anyhow::anyhow!("expiry timestamp {} out of range", timestamp),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> UploadResult<DestinationDescriptor> {
        serde_json::from_value::<CreateUrlResponse>(value)
            .expect("any JSON object parses")
            .into_descriptor()
    }

    #[test]
    fn test_variant_parse_and_display() {
        assert_eq!("normal".parse::<UploadVariant>(), Ok(UploadVariant::Normal));
        assert_eq!(
            "PassThrough".parse::<UploadVariant>(),
            Ok(UploadVariant::Passthrough)
        );
        assert_eq!(UploadVariant::Filelive.to_string(), "filelive");
        assert!("chunked".parse::<UploadVariant>().is_err());
    }

    #[test]
    fn test_variant_host_routing_flag() {
        assert!(!UploadVariant::Normal.uses_upload_host());
        assert!(UploadVariant::Passthrough.uses_upload_host());
        assert!(UploadVariant::Filelive.uses_upload_host());
    }

    #[test]
    fn test_request_empty_fields_are_absent() {
        let request = DestinationRequest::new(600, UploadVariant::Passthrough)
            .with_category_key("")
            .with_title("Demo")
            .with_profile_key("");
        assert_eq!(request.category_key(), None);
        assert_eq!(request.title(), Some("Demo"));
        assert_eq!(request.profile_key(), None);
    }

    #[test]
    fn test_result_envelope_success() {
        let descriptor = parse(json!({
            "error": 0,
            "message": "",
            "result": {
                "upload_url": "https://upload.example/u/abc",
                "progress_url": "https://upload.example/p/abc",
                "upload_file_key": "abc",
                "will_be_expired_at": 1_700_000_000
            }
        }))
        .unwrap();

        assert_eq!(descriptor.upload_url, "https://upload.example/u/abc");
        assert_eq!(descriptor.progress_url, "https://upload.example/p/abc");
        assert_eq!(descriptor.upload_file_key, "abc");
        assert_eq!(descriptor.expires_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_data_envelope_success() {
        let descriptor = parse(json!({
            "status": "success",
            "data": {
                "upload_url": "https://upload.example/u/def",
                "progress_url": "https://upload.example/p/def",
                "upload_file_key": "def",
                "expired_at": 1_700_000_600
            }
        }))
        .unwrap();

        assert_eq!(descriptor.upload_file_key, "def");
        assert_eq!(descriptor.expires_at.timestamp(), 1_700_000_600);
    }

    #[test]
    fn test_result_envelope_with_error_code_is_rejected() {
        let err = parse(json!({
            "error": 1,
            "message": "invalid category",
            "result": {
                "upload_url": "u",
                "progress_url": "p",
                "upload_file_key": "k",
                "will_be_expired_at": 0
            }
        }))
        .unwrap_err();

        match err {
            UploadError::RemoteRejection { code, message } => {
                assert_eq!(code, Some(1));
                assert_eq!(message, "invalid category");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_data_envelope_with_failure_status_is_rejected() {
        let err = parse(json!({
            "status": "fail",
            "message": "token expired",
            "data": {
                "upload_url": "u",
                "progress_url": "p",
                "upload_file_key": "k",
                "expired_at": 0
            }
        }))
        .unwrap_err();

        assert!(matches!(
            err,
            UploadError::RemoteRejection { code: None, ref message } if message == "token expired"
        ));
    }

    #[test]
    fn test_missing_nested_object_is_rejected() {
        let err = parse(json!({ "error": 401, "message": "Unauthorized" })).unwrap_err();
        assert!(matches!(
            err,
            UploadError::RemoteRejection { code: Some(401), ref message } if message == "Unauthorized"
        ));

        let err = parse(json!({ "status": "success" })).unwrap_err();
        assert!(matches!(
            err,
            UploadError::RemoteRejection { code: None, ref message } if message == "success"
        ));

        let err = parse(json!({})).unwrap_err();
        assert!(matches!(err, UploadError::RemoteRejection { code: None, .. }));
    }

    #[test]
    fn test_null_result_falls_back_to_rejection() {
        let err = parse(json!({ "error": 5, "message": "quota", "result": null })).unwrap_err();
        assert!(matches!(
            err,
            UploadError::RemoteRejection { code: Some(5), .. }
        ));
    }

    #[test]
    fn test_formatted_expiry_uses_kst() {
        let descriptor = DestinationDescriptor {
            upload_url: "u".to_string(),
            progress_url: "p".to_string(),
            upload_file_key: "k".to_string(),
            expires_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        };
        assert_eq!(
            descriptor.formatted_expiry().as_deref(),
            Some("1970-01-01 09:00:00 KST")
        );
    }
}
