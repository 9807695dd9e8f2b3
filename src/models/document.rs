//! Deal document request/response models

use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};

use crate::entities::deal_documents::{self, DocumentCategory};

const MAX_DOCUMENT_NAME_LENGTH: usize = 255;

/// Body of POST /deals/{id}/documents. The file itself is uploaded elsewhere.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddDocumentRequest {
    pub name: String,
    pub file_url: String,
    pub file_type: Option<String>,
    /// Size in bytes
    pub file_size: Option<i64>,
    #[serde(default = "default_category")]
    pub category: DocumentCategory,
}

fn default_category() -> DocumentCategory {
    DocumentCategory::Other
}

impl AddDocumentRequest {
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Document name cannot be empty".to_string());
        }
        if name.chars().count() > MAX_DOCUMENT_NAME_LENGTH {
            return Err(format!(
                "Document name cannot exceed {} characters",
                MAX_DOCUMENT_NAME_LENGTH
            ));
        }
        if !self.file_url.starts_with("https://") && !self.file_url.starts_with("http://") {
            return Err("fileUrl must be an http(s) URL".to_string());
        }
        if let Some(size) = self.file_size {
            if size < 0 {
                return Err("fileSize cannot be negative".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: i32,
    pub deal_id: i32,
    pub uploader_id: i32,
    pub name: String,
    pub file_url: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub category: DocumentCategory,
    pub created_at: DateTimeWithTimeZone,
}

impl From<deal_documents::Model> for DocumentResponse {
    fn from(model: deal_documents::Model) -> Self {
        Self {
            id: model.id,
            deal_id: model.deal_id,
            uploader_id: model.uploader_id,
            name: model.name,
            file_url: model.file_url,
            file_type: model.file_type,
            file_size: model.file_size,
            category: model.category,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentResponse>,
}
