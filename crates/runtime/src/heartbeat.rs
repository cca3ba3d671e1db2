// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Heartbeat Emitter: composes a host+Engine telemetry snapshot and POSTs
//! it to the Hub (spec §4.5).

use agentmc_core::{sha256_hex, AgentProfile, EngineProvider, RuntimeState};
use agentmc_hub::types::HeartbeatRequest;
use agentmc_hub::HubApi;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use sysinfo::{Disks, System};
use tokio::process::Command;

const IP_ECHO_TIMEOUT: Duration = Duration::from_secs(4);
const TELEMETRY_PROBE_TIMEOUT: Duration = Duration::from_secs(4);
const USER_AGENT: &str = concat!("agentmc-runtime/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum HeartbeatError {
    #[error("no models available at heartbeat time")]
    NoModels,
    #[error("heartbeat send failed: {0}")]
    Hub(#[from] agentmc_hub::HubError),
    #[error("failed persisting runtime state: {0}")]
    State(#[from] agentmc_storage::StateError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToolAvailability {
    pub chat_realtime: bool,
    pub files_realtime: bool,
    pub notifications_realtime: bool,
}

pub struct HeartbeatInputs<'a> {
    pub provider: &'a EngineProvider,
    pub profile: &'a AgentProfile,
    pub tool_availability: ToolAvailability,
    pub fingerprint_override: Option<&'a str>,
    pub public_ip_override: Option<&'a str>,
    pub ip_echo_endpoints: &'a [String],
    /// The embedded Engine's gateway binary, probed for telemetry. `None`
    /// for `external` providers (no telemetry probing, spec §4.5).
    pub engine_binary: Option<&'a Path>,
}

/// Builds the three-object heartbeat report (spec §4.5). Fails if the
/// provider has no models — missing models at send time is fatal for that
/// send, not for the runtime.
pub async fn build_report(inputs: &HeartbeatInputs<'_>) -> Result<HeartbeatRequest, HeartbeatError> {
    if !inputs.provider.has_models() {
        return Err(HeartbeatError::NoModels);
    }

    let host_snapshot = collect_host_snapshot(
        inputs.fingerprint_override,
        inputs.public_ip_override,
        inputs.ip_echo_endpoints,
    )
    .await;

    let telemetry = match inputs.engine_binary {
        Some(binary) => probe_engine_telemetry(binary).await,
        None => Value::Object(Map::new()),
    };

    let mut meta = json!({
        "type": "heartbeat",
        "runtime": {
            "name": inputs.provider.name,
            "version": inputs.provider.version,
            "build": inputs.provider.build,
        },
        "models": inputs.provider.models,
        "runtime_mode": inputs.provider.mode,
        "node_version": env!("CARGO_PKG_VERSION"),
        "tool_availability": {
            "chat_realtime": inputs.tool_availability.chat_realtime,
            "files_realtime": inputs.tool_availability.files_realtime,
            "notifications_realtime": inputs.tool_availability.notifications_realtime,
        },
    });
    merge_telemetry(&mut meta, telemetry);

    let host = json!({
        "fingerprint": host_snapshot.fingerprint,
        "name": host_snapshot.hostname,
        "meta": {
            "hostname": host_snapshot.hostname,
            "ip": host_snapshot.private_ip,
            "network": {
                "private_ip": host_snapshot.private_ip,
                "public_ip": host_snapshot.public_ip,
            },
            "os": host_snapshot.os,
            "os_version": host_snapshot.os_version,
            "arch": host_snapshot.arch,
            "cpu": host_snapshot.cpu,
            "cpu_cores": host_snapshot.cpu_cores,
            "ram_gb": host_snapshot.ram_gb,
            "disk": {
                "total_bytes": host_snapshot.disk_total_bytes,
                "free_bytes": host_snapshot.disk_free_bytes,
            },
            "uptime_seconds": host_snapshot.uptime_seconds,
            "runtime": {
                "name": "agentmc-runtime",
                "version": env!("CARGO_PKG_VERSION"),
            },
        },
    });

    let agent = json!({
        "id": inputs.profile.id,
        "name": inputs.profile.name,
        "type": inputs.profile.kind,
        "identity": inputs.profile.identity,
    });

    Ok(HeartbeatRequest {
        meta: agentmc_core::TaggedValue::from_json(meta),
        host: agentmc_core::TaggedValue::from_json(host),
        agent: agentmc_core::TaggedValue::from_json(agent),
    })
}

/// Sends one heartbeat and, on success, advances `last_heartbeat_at`.
/// Failures are returned to the caller (routed through the error sink by
/// the Supervisor Loop) and never advance the timestamp.
pub async fn send_heartbeat(
    hub: &dyn HubApi,
    state_path: &Path,
    inputs: &HeartbeatInputs<'_>,
    now_iso: &str,
) -> Result<(), HeartbeatError> {
    let report = build_report(inputs).await?;
    hub.heartbeat(report).await?;
    agentmc_storage::save_state(state_path, |state: &mut RuntimeState| {
        state.last_heartbeat_at = Some(now_iso.to_string());
    })
    .await?;
    Ok(())
}

struct HostSnapshot {
    fingerprint: String,
    hostname: String,
    private_ip: String,
    public_ip: String,
    os: String,
    os_version: String,
    arch: String,
    cpu: String,
    cpu_cores: usize,
    ram_gb: f64,
    disk_total_bytes: u64,
    disk_free_bytes: u64,
    uptime_seconds: u64,
}

async fn collect_host_snapshot(
    fingerprint_override: Option<&str>,
    public_ip_override: Option<&str>,
    ip_echo_endpoints: &[String],
) -> HostSnapshot {
    let mut sys = System::new_all();
    sys.refresh_all();

    let hostname = System::host_name().unwrap_or_else(|| "unknown-host".to_string());
    let os = System::name().unwrap_or_else(|| "unknown".to_string());
    let os_version = System::os_version().unwrap_or_else(|| "unknown".to_string());
    let arch = System::cpu_arch();
    let cpu = sys.cpus().first().map(|c| c.brand().to_string()).unwrap_or_default();
    let cpu_cores = sys.cpus().len();
    let ram_gb = sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0);
    let uptime_seconds = System::uptime();

    let disks = Disks::new_with_refreshed_list();
    let (disk_total_bytes, disk_free_bytes) = disks
        .iter()
        .fold((0u64, 0u64), |(total, free), disk| (total + disk.total_space(), free + disk.available_space()));

    let private_ip =
        local_ip_address::local_ip().map(|ip| ip.to_string()).unwrap_or_else(|_| "0.0.0.0".to_string());

    let public_ip = resolve_public_ip(public_ip_override, &private_ip, ip_echo_endpoints).await;

    let fingerprint = fingerprint_override.map(str::to_string).unwrap_or_else(|| {
        compute_fingerprint(&hostname, &private_ip, &public_ip, &os, &arch)
    });

    HostSnapshot {
        fingerprint,
        hostname,
        private_ip,
        public_ip,
        os,
        os_version,
        arch,
        cpu,
        cpu_cores,
        ram_gb,
        disk_total_bytes,
        disk_free_bytes,
        uptime_seconds,
    }
}

/// SHA-256 of `hostname | private_ip | public_ip | os | arch`.
fn compute_fingerprint(hostname: &str, private_ip: &str, public_ip: &str, os: &str, arch: &str) -> String {
    sha256_hex(format!("{hostname}|{private_ip}|{public_ip}|{os}|{arch}").as_bytes())
}

fn is_private_ipv4(ip: &str) -> bool {
    let Ok(addr) = ip.parse::<std::net::Ipv4Addr>() else { return false };
    addr.is_private() || addr.is_loopback() || addr.is_link_local()
}

/// Public IP resolution order: explicit override, then the first
/// non-private local IPv4, then IP-echo endpoints (spec §4.5).
async fn resolve_public_ip(explicit: Option<&str>, private_ip: &str, endpoints: &[String]) -> String {
    if let Some(ip) = explicit {
        return ip.to_string();
    }
    if !is_private_ipv4(private_ip) {
        return private_ip.to_string();
    }
    for endpoint in endpoints {
        if let Some(ip) = probe_ip_echo(endpoint).await {
            return ip;
        }
    }
    private_ip.to_string()
}

async fn probe_ip_echo(endpoint: &str) -> Option<String> {
    let client = reqwest::Client::builder().timeout(IP_ECHO_TIMEOUT).build().ok()?;
    let response = client.get(endpoint).header("User-Agent", USER_AGENT).send().await.ok()?;
    let text = response.text().await.ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.parse::<std::net::IpAddr>().is_err() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

const TELEMETRY_COMMANDS: &[&[&str]] =
    &[&["status", "--json", "--usage"], &["status", "--json"], &["health", "--json"]];
const MODELS_COMMAND: &[&str] = &["models", "status", "--json"];

/// Probes telemetry commands in order, merging whichever succeed, plus
/// `models status --json` (spec §4.5).
async fn probe_engine_telemetry(binary: &Path) -> Value {
    let mut merged = Map::new();
    for args in TELEMETRY_COMMANDS {
        if let Some(value) = run_probe(binary, args).await {
            merge_object(&mut merged, value);
        }
    }
    if let Some(models) = run_probe(binary, MODELS_COMMAND).await {
        if let Some(list) = models.get("models") {
            merged.insert("models".to_string(), normalize_models(list));
        }
    }

    let mut merged_value = Value::Object(merged);
    backfill_context_percent_used(&mut merged_value);
    merged_value
}

async fn run_probe(binary: &Path, args: &[&str]) -> Option<Value> {
    let mut cmd = Command::new(binary);
    cmd.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let output = tokio::time::timeout(TELEMETRY_PROBE_TIMEOUT, cmd.output()).await.ok()?.ok()?;
    parse_trailing_json(&output.stdout).or_else(|| extract_freetext_telemetry(&output.stdout))
}

fn parse_trailing_json(bytes: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(bytes);
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }
    text.lines().rev().find_map(|line| {
        let line = line.trim();
        if line.is_empty() { None } else { serde_json::from_str::<Value>(line).ok() }
    })
}

fn merge_object(target: &mut Map<String, Value>, value: Value) {
    if let Value::Object(map) = value {
        for (key, v) in map {
            target.insert(key, v);
        }
    }
}

fn merge_telemetry(meta: &mut Value, telemetry: Value) {
    let Value::Object(telemetry_map) = telemetry else { return };
    let Value::Object(meta_map) = meta else { return };
    for (key, value) in telemetry_map {
        meta_map.entry(key).or_insert(value);
    }
}

fn normalize_models(list: &Value) -> Value {
    let Some(array) = list.as_array() else { return list.clone() };
    let mut seen = std::collections::HashSet::new();
    let deduped: Vec<Value> = array
        .iter()
        .filter(|entry| match entry {
            Value::String(s) => seen.insert(s.clone()),
            _ => true,
        })
        .cloned()
        .collect();
    Value::Array(deduped)
}

/// Regex-based fallback extraction from free-text telemetry lines when
/// structured JSON fields are absent (spec §4.5).
fn extract_freetext_telemetry(bytes: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(bytes);
    let mut out = Map::new();

    if let Some(caps) = re_tokens()?.captures(&text) {
        out.insert("tokens_in".to_string(), json!(caps[1].parse::<u64>().ok()?));
        out.insert("tokens_out".to_string(), json!(caps[2].parse::<u64>().ok()?));
    }
    if let Some(caps) = re_cache()?.captures(&text) {
        out.insert("cache_hit_percent".to_string(), json!(caps[1].parse::<f64>().ok()?));
        out.insert("cache_hits".to_string(), json!(caps[2].parse::<u64>().ok()?));
        out.insert("cache_new".to_string(), json!(caps[3].parse::<u64>().ok()?));
    }
    if let Some(caps) = re_context()?.captures(&text) {
        let used: f64 = caps[1].parse().ok()?;
        let max: f64 = caps[2].parse().ok()?;
        out.insert("context_used".to_string(), json!(used));
        out.insert("context_max".to_string(), json!(max));
        out.insert("context_percent_used".to_string(), json!(caps[3].parse::<f64>().ok()?));
    }
    if let Some(caps) = re_usage_left()?.captures(&text) {
        out.insert("usage_percent_left".to_string(), json!(caps[1].parse::<f64>().ok()?));
    }
    if let Some(caps) = re_usage_reset()?.captures(&text) {
        out.insert("usage_resets_at".to_string(), json!(caps[1].to_string()));
    }

    if out.is_empty() { None } else { Some(Value::Object(out)) }
}

/// Re-derives `context_percent_used` from `used/max*100` when the field is
/// missing but the raw counters are present (spec §4.5).
fn backfill_context_percent_used(value: &mut Value) {
    let Value::Object(map) = value else { return };
    if map.contains_key("context_percent_used") {
        return;
    }
    let used = map.get("context_used").and_then(Value::as_f64);
    let max = map.get("context_max").and_then(Value::as_f64);
    if let (Some(used), Some(max)) = (used, max) {
        if max > 0.0 {
            map.insert("context_percent_used".to_string(), json!(used / max * 100.0));
        }
    }
}

fn re_tokens() -> Option<Regex> {
    Regex::new(r"(\d+)\s*in\s*[,.]?\s*(\d+)\s*out").ok()
}
fn re_cache() -> Option<Regex> {
    Regex::new(r"(\d+(?:\.\d+)?)%\s*hit\s*(\d+)\s*cached\s*(\d+)\s*new").ok()
}
fn re_context() -> Option<Regex> {
    Regex::new(r"(\d+(?:\.\d+)?)\s*/\s*(\d+(?:\.\d+)?)\s*\((\d+(?:\.\d+)?)%\)").ok()
}
fn re_usage_left() -> Option<Regex> {
    Regex::new(r"(\d+(?:\.\d+)?)%\s*left").ok()
}
fn re_usage_reset() -> Option<Regex> {
    Regex::new(r"@\s*(\d{1,2}:\d{2})").ok()
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
