// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to write state file {path}: {source}")]
    Write { path: String, source: std::io::Error },
    #[error("state file {path} is not valid JSON: {source}")]
    Decode { path: String, source: serde_json::Error },
}

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("path {0} escapes the workspace root")]
    PathEscapesWorkspace(String),
    #[error("doc_id {0} is not in the allow-list")]
    DocIdNotAllowed(String),
    #[error("base_hash mismatch: current={current_hash}")]
    Conflict { current_hash: String },
    #[error("io error writing {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("doc_id {0} does not exist")]
    NotFound(String),
}
