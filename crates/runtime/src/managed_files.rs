// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Managed-file operations: `file.save`/`file.delete` request handling,
//! wrapping [`agentmc_storage::materializer`] with doc-id allow-list
//! validation and path safety (spec §4.3.7).

use agentmc_storage::{MaterializeError, MaterializedFile};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FileSaveRequest {
    pub request_id: Option<String>,
    pub doc_id: String,
    pub base_hash: String,
    pub title: Option<String>,
    pub body_markdown: String,
}

#[derive(Debug, Clone)]
pub struct FileDeleteRequest {
    pub request_id: Option<String>,
    pub doc_id: String,
    pub base_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOpError {
    MissingRequestId,
    DocIdNotAllowed,
    Conflict { current_hash: String },
    NotFound,
    Io(String),
}

impl FileOpError {
    pub fn code(&self) -> &'static str {
        match self {
            FileOpError::MissingRequestId => "invalid_request",
            FileOpError::DocIdNotAllowed => "invalid_doc_id",
            FileOpError::Conflict { .. } => "conflict",
            FileOpError::NotFound => "not_found",
            FileOpError::Io(_) => "io_error",
        }
    }

    pub fn current_hash(&self) -> Option<&str> {
        match self {
            FileOpError::Conflict { current_hash } => Some(current_hash),
            _ => None,
        }
    }
}

impl From<MaterializeError> for FileOpError {
    fn from(e: MaterializeError) -> Self {
        match e {
            MaterializeError::Conflict { current_hash } => FileOpError::Conflict { current_hash },
            MaterializeError::NotFound(_) => FileOpError::NotFound,
            MaterializeError::PathEscapesWorkspace(_) | MaterializeError::DocIdNotAllowed(_) => {
                FileOpError::DocIdNotAllowed
            }
            MaterializeError::Io { path, source } => FileOpError::Io(format!("{path}: {source}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileSaveOk {
    pub request_id: String,
    pub doc_id: String,
    pub base_hash: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct FileDeleteOk {
    pub request_id: String,
    pub doc_id: String,
}

/// A doc id is allowed only if it matches `[A-Za-z0-9._-]+` and is present
/// in the configured allow-list.
fn is_allowed(doc_id: &str, allowlist: &[String]) -> bool {
    let shape_ok = !doc_id.is_empty()
        && doc_id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    shape_ok && allowlist.iter().any(|d| d == doc_id)
}

/// Collapses runs of whitespace and trims the ends.
fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub async fn handle_file_save(
    workspace_root: &Path,
    allowlist: &[String],
    request: FileSaveRequest,
) -> Result<FileSaveOk, (String, FileOpError)> {
    let request_id = request.request_id.ok_or(FileOpError::MissingRequestId)
        .map_err(|e| (String::new(), e))?;

    if !is_allowed(&request.doc_id, allowlist) {
        return Err((request_id, FileOpError::DocIdNotAllowed));
    }

    let MaterializedFile { base_hash, .. } =
        agentmc_storage::materializer::save_managed_file(
            workspace_root,
            &request.doc_id,
            &request.base_hash,
            &request.body_markdown,
        )
        .await
        .map_err(|e| (request_id.clone(), FileOpError::from(e)))?;

    Ok(FileSaveOk {
        request_id,
        doc_id: request.doc_id,
        base_hash,
        title: normalize_title(request.title.as_deref().unwrap_or("")),
    })
}

pub async fn handle_file_delete(
    workspace_root: &Path,
    allowlist: &[String],
    request: FileDeleteRequest,
) -> Result<FileDeleteOk, (String, FileOpError)> {
    let request_id = request.request_id.ok_or(FileOpError::MissingRequestId)
        .map_err(|e| (String::new(), e))?;

    if !is_allowed(&request.doc_id, allowlist) {
        return Err((request_id, FileOpError::DocIdNotAllowed));
    }

    agentmc_storage::materializer::remove_file(workspace_root, &request.doc_id, &request.base_hash)
        .await
        .map_err(|e| (request_id.clone(), FileOpError::from(e)))?;

    Ok(FileDeleteOk { request_id, doc_id: request.doc_id })
}

#[cfg(test)]
#[path = "managed_files_tests.rs"]
mod tests;
