//! Upload protocol calls.
//!
//! Every method makes exactly one request. Nothing is retried.

use crate::UploadClient;
use kollus_core::models::CreateUrlResponse;
use kollus_core::{
    DestinationDescriptor, DestinationRequest, ProgressSnapshot, UploadError, UploadFile,
    UploadOutcome, UploadResult, UploadVariant,
};
use reqwest::multipart::{Form, Part};

const FILELIVE_PROFILE_SUFFIX: &str = "-filelive";

/// Ordered form fields for a destination request.
///
/// Fails before anything is sent when the variant's required fields are
/// missing: passthrough needs a profile key, filelive needs a category key
/// to derive its profile from.
pub fn destination_form_fields(
    request: &DestinationRequest,
) -> UploadResult<Vec<(&'static str, String)>> {
    let profile_key = match request.variant {
        UploadVariant::Passthrough => Some(request.profile_key().ok_or_else(|| {
            UploadError::configuration("Profile Key required for passthrough upload")
        })?),
        _ => None,
    };

    let selected_profile_key = match request.variant {
        UploadVariant::Filelive => {
            let category_key = request.category_key().ok_or_else(|| {
                UploadError::configuration("Category Key required for filelive upload")
            })?;
            Some(format!("{}{}", category_key, FILELIVE_PROFILE_SUFFIX))
        }
        _ => None,
    };

    let mut fields = vec![("expire_time", request.expire_time.to_string())];
    if let Some(category_key) = request.category_key() {
        fields.push(("category_key", category_key.to_string()));
    }
    if let Some(title) = request.title() {
        fields.push(("title", title.to_string()));
    }
    fields.push(("is_encryption_upload", "0".to_string()));
    fields.push(("is_audio_upload", "0".to_string()));
    let is_passthrough = u8::from(request.variant == UploadVariant::Passthrough);
    fields.push(("is_passthrough", is_passthrough.to_string()));
    if let Some(profile_key) = profile_key {
        fields.push(("profile_key", profile_key.to_string()));
    }
    if let Some(selected) = selected_profile_key {
        fields.push(("selected_profile_key", selected));
    }

    Ok(fields)
}

impl UploadClient {
    /// Request a signed upload destination.
    #[tracing::instrument(skip(self, request), fields(variant = %request.variant))]
    pub async fn create_destination(
        &self,
        request: &DestinationRequest,
    ) -> UploadResult<DestinationDescriptor> {
        let fields = destination_form_fields(request)?;
        let form = fields
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        tracing::debug!(
            endpoint = %self.destination_endpoint(request.variant),
            expire_time = request.expire_time,
            "Requesting upload destination"
        );

        let response: CreateUrlResponse = self
            .post_multipart(
                &self.authorized_destination_url(request.variant),
                form,
                "create_url",
            )
            .await?
            .json_or_rejection()?;

        match response.into_descriptor() {
            Ok(descriptor) => {
                tracing::info!(
                    upload_file_key = %descriptor.upload_file_key,
                    expires_at = %descriptor.expires_at,
                    "Upload destination created"
                );
                Ok(descriptor)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Upload destination request rejected");
                Err(e)
            }
        }
    }

    /// Post the file to a destination's upload address.
    ///
    /// With `return_url`, the service redirects there (outside its own pages)
    /// once it has received the file. The outcome is returned untouched and
    /// only covers the byte transfer, not processing. Any JSON body is an
    /// outcome, whatever the HTTP status; anything else is a transport error.
    pub async fn transfer_file(
        &self,
        upload_url: &str,
        file: UploadFile,
        return_url: Option<&str>,
    ) -> UploadResult<UploadOutcome> {
        let size = file.len();
        let file_name = file.file_name;

        let mut part = Part::bytes(file.bytes).file_name(file_name.clone());
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type).map_err(|e| {
                UploadError::configuration(format!(
                    "Invalid content type '{}': {}",
                    content_type, e
                ))
            })?;
        }

        let mut form = Form::new()
            .part("upload-file", part)
            .text("disable_alert", "1")
            .text("accept", "application/json");

        if let Some(return_url) = return_url.filter(|url| !url.is_empty()) {
            form = form
                .text("return_url", return_url.to_string())
                .text("redirection_scope", "outer");
        }

        tracing::debug!(file_name = %file_name, size, "Transferring file");

        let outcome: UploadOutcome = self
            .post_multipart(upload_url, form, "upload")
            .await?
            .json()?;

        tracing::info!(
            file_name = %file_name,
            success = ?outcome.success(),
            "File transfer finished"
        );
        Ok(outcome)
    }

    /// Read one progress snapshot. The progress address needs no credential.
    pub async fn fetch_progress(&self, progress_url: &str) -> UploadResult<ProgressSnapshot> {
        let snapshot: ProgressSnapshot = self.get(progress_url, "progress").await?.json()?;
        tracing::trace!(
            error = ?snapshot.error,
            progress = ?snapshot.progress(),
            "Progress snapshot received"
        );
        Ok(snapshot)
    }
}
