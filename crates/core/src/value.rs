// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Dynamic representation for weakly-typed Hub payloads (`payload`, `meta`,
//! `runtime_meta`). Per the design note in spec §9, these are narrowed at
//! the boundary with explicit `as_*` helpers — nothing downstream pattern
//! matches on `serde_json::Value` directly.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaggedValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Array(Vec<TaggedValue>),
    Object(BTreeMap<String, TaggedValue>),
}

impl Default for TaggedValue {
    fn default() -> Self {
        TaggedValue::Null
    }
}

impl TaggedValue {
    pub fn from_json(value: Json) -> Self {
        match value {
            Json::Null => TaggedValue::Null,
            Json::Bool(b) => TaggedValue::Bool(b),
            Json::Number(n) => TaggedValue::Number(n),
            Json::String(s) => TaggedValue::Text(s),
            Json::Array(arr) => TaggedValue::Array(arr.into_iter().map(Self::from_json).collect()),
            Json::Object(map) => TaggedValue::Object(
                map.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            TaggedValue::Null => Json::Null,
            TaggedValue::Bool(b) => Json::Bool(*b),
            TaggedValue::Number(n) => Json::Number(n.clone()),
            TaggedValue::Text(s) => Json::String(s.clone()),
            TaggedValue::Array(arr) => Json::Array(arr.iter().map(Self::to_json).collect()),
            TaggedValue::Object(map) => {
                Json::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TaggedValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TaggedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TaggedValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TaggedValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, TaggedValue>> {
        match self {
            TaggedValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[TaggedValue]> {
        match self {
            TaggedValue::Array(arr) => Some(arr.as_slice()),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&TaggedValue> {
        self.as_object().and_then(|m| m.get(key))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TaggedValue::Null)
    }

    pub fn object(entries: impl IntoIterator<Item = (String, TaggedValue)>) -> Self {
        TaggedValue::Object(entries.into_iter().collect())
    }

    pub fn text(s: impl Into<String>) -> Self {
        TaggedValue::Text(s.into())
    }
}

impl From<&str> for TaggedValue {
    fn from(s: &str) -> Self {
        TaggedValue::Text(s.to_string())
    }
}

impl From<String> for TaggedValue {
    fn from(s: String) -> Self {
        TaggedValue::Text(s)
    }
}

impl From<bool> for TaggedValue {
    fn from(b: bool) -> Self {
        TaggedValue::Bool(b)
    }
}

impl From<i64> for TaggedValue {
    fn from(n: i64) -> Self {
        TaggedValue::Number(n.into())
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
