//! Multipart form bodies
//!
//! Kept as plain data (rather than `reqwest::multipart::Form`, which is
//! single-use) so a call can be dispatched a second time after a refresh.

use bytes::Bytes;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum PartBody {
    Text(String),
    File {
        bytes: Bytes,
        file_name: String,
        content_type: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct Part {
    name: String,
    body: PartBody,
}

/// A `multipart/form-data` body, sent untouched by POST/PUT/PATCH.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            body: PartBody::Text(value.into()),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
        content_type: Option<&str>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            body: PartBody::File {
                bytes: bytes.into(),
                file_name: file_name.into(),
                content_type: content_type.map(str::to_owned),
            },
        });
        self
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|part| part.name.as_str())
    }

    /// Build the single-use reqwest form for one dispatch.
    pub fn to_reqwest(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            form = match &part.body {
                PartBody::Text(value) => form.text(part.name.clone(), value.clone()),
                PartBody::File {
                    bytes,
                    file_name,
                    content_type,
                } => {
                    let mut file = reqwest::multipart::Part::bytes(bytes.to_vec())
                        .file_name(file_name.clone());
                    if let Some(content_type) = content_type {
                        file = file.mime_str(content_type).map_err(|e| {
                            Error::Encode(format!("invalid content type for {}: {e}", part.name))
                        })?;
                    }
                    form.part(part.name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}
