use std::collections::HashMap;

use axum::extract::Multipart;

/// Result type used by the shared upload helpers.
pub type UploadResult<T> = Result<T, UploadError>;

/// Error returned when a multipart form cannot be read or breaks a field limit.
#[derive(Debug)]
pub struct UploadError {
    code: &'static str,
    message: String,
}

impl UploadError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Flash code for the admin banner.
    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UploadError {}

/// Limits for a single multipart file field.
#[derive(Debug, Clone, Copy)]
pub struct FileFieldConfig<'a> {
    pub field_name: &'a str,
    pub max_files: usize,
    pub max_bytes: usize,
}

impl<'a> FileFieldConfig<'a> {
    pub fn new(field_name: &'a str, max_bytes: usize) -> Self {
        Self {
            field_name,
            max_files: 1,
            max_bytes,
        }
    }
}

/// A file field buffered in memory.
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    pub field_name: String,
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub files: Vec<ReceivedFile>,
    pub text_fields: HashMap<String, Vec<String>>,
}

impl UploadOutcome {
    #[cfg(test)]
    pub fn files_for<'a>(&'a self, field_name: &str) -> impl Iterator<Item = &'a ReceivedFile> {
        self.files
            .iter()
            .filter(move |file| file.field_name == field_name)
    }

    /// Moves the first file of a field out of the outcome.
    pub fn take_file(&mut self, field_name: &str) -> Option<ReceivedFile> {
        let index = self
            .files
            .iter()
            .position(|file| file.field_name == field_name)?;
        Some(self.files.remove(index))
    }

    pub fn first_text(&self, field_name: &str) -> Option<&str> {
        self.text_fields
            .get(field_name)
            .and_then(|values| values.first().map(|s| s.as_str()))
    }
}

/// Reads a whole multipart form into memory.
///
/// File inputs left empty by the browser (no file name, no bytes) are
/// skipped. Files on fields without a config are rejected.
pub async fn read_upload_form(
    mut multipart: Multipart,
    field_configs: &[FileFieldConfig<'_>],
) -> UploadResult<UploadOutcome> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut outcome = UploadOutcome::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| UploadError::new("upload_invalid", format!("unreadable form: {err}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(|err| {
                UploadError::new("upload_invalid", format!("unreadable field `{field_name}`: {err}"))
            })?;
            outcome
                .text_fields
                .entry(field_name)
                .or_default()
                .push(value);
            continue;
        };

        let Some(config) = field_configs
            .iter()
            .find(|config| config.field_name == field_name)
        else {
            return Err(UploadError::new(
                "upload_invalid",
                format!("unexpected file field `{field_name}`"),
            ));
        };

        let content_type = field
            .content_type()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref())
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|err| {
            UploadError::new("upload_invalid", format!("unreadable upload data: {err}"))
        })? {
            if bytes.len() + chunk.len() > config.max_bytes {
                return Err(UploadError::new(
                    "upload_too_large",
                    format!(
                        "field `{}` exceeds {} bytes",
                        config.field_name, config.max_bytes
                    ),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        if file_name.is_empty() && bytes.is_empty() {
            continue;
        }

        let count = counts.entry(config.field_name).or_default();
        if *count >= config.max_files {
            return Err(UploadError::new(
                "upload_invalid",
                format!(
                    "field `{}` accepts at most {} file(s)",
                    config.field_name, config.max_files
                ),
            ));
        }
        *count += 1;

        outcome.files.push(ReceivedFile {
            field_name,
            original_name: file_name,
            content_type,
            bytes,
        });
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{Request, header},
    };

    use super::*;

    const BOUNDARY: &str = "apex-boundary";

    fn multipart_request(parts: &[(&str, Option<(&str, &str)>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, file, value) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file {
                Some((file_name, content_type)) => {
                    body.push_str(&format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    ));
                }
                None => {
                    body.push_str(&format!(
                        "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                    ));
                }
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn read(
        request: Request<Body>,
        configs: &[FileFieldConfig<'_>],
    ) -> UploadResult<UploadOutcome> {
        let multipart = Multipart::from_request(request, &()).await.unwrap();
        read_upload_form(multipart, configs).await
    }

    #[tokio::test]
    async fn collects_text_and_files() {
        let request = multipart_request(&[
            ("title", None, "Chapitre 1"),
            ("file", Some(("cours.pdf", "application/pdf")), "%PDF-1.4"),
        ]);
        let mut outcome = read(request, &[FileFieldConfig::new("file", 1024)])
            .await
            .unwrap();

        assert_eq!(outcome.first_text("title"), Some("Chapitre 1"));
        assert_eq!(outcome.files_for("file").count(), 1);
        let file = outcome.take_file("file").unwrap();
        assert_eq!(file.original_name, "cours.pdf");
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.bytes, b"%PDF-1.4");
        assert!(outcome.take_file("file").is_none());
    }

    #[tokio::test]
    async fn skips_empty_file_inputs() {
        let request = multipart_request(&[
            ("content", None, "Bonjour"),
            ("image", Some(("", "application/octet-stream")), ""),
        ]);
        let outcome = read(request, &[FileFieldConfig::new("image", 1024)])
            .await
            .unwrap();
        assert!(outcome.files.is_empty());
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let request = multipart_request(&[("file", Some(("big.bin", "application/octet-stream")), "0123456789")]);
        let err = read(request, &[FileFieldConfig::new("file", 4)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "upload_too_large");
    }

    #[tokio::test]
    async fn rejects_unknown_file_field() {
        let request = multipart_request(&[("other", Some(("x.txt", "text/plain")), "x")]);
        let err = read(request, &[FileFieldConfig::new("file", 1024)])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "upload_invalid");
    }

    #[tokio::test]
    async fn enforces_file_count() {
        let request = multipart_request(&[
            ("file", Some(("a.txt", "text/plain")), "a"),
            ("file", Some(("b.txt", "text/plain")), "b"),
        ]);
        let err = read(request, &[FileFieldConfig::new("file", 1024)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at most 1"));
    }
}
