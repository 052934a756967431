use std::collections::HashMap;

use axum::extract::Multipart;

use super::error::ApiError;

/// An uploaded file part.
#[derive(Debug, Clone, Default)]
pub struct FilePart {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Text fields plus the first file found under one of the accepted names.
#[derive(Debug, Default)]
pub struct UploadForm {
    texts: HashMap<String, String>,
    pub file: Option<FilePart>,
}

impl UploadForm {
    /// Drains `multipart`. Parts named in `file_fields` are read as the
    /// file (the first one wins); every other part is read as text.
    pub async fn read(mut multipart: Multipart, file_fields: &[&str]) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if file_fields.contains(&name.as_str()) {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if form.file.is_none() {
                    form.file = Some(FilePart {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else if !name.is_empty() {
                let value = field.text().await?;
                form.texts.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Trimmed text field; blank values count as absent.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.texts
            .get(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}
