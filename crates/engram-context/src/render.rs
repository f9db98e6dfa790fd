//! Per-event-type renderers.
//!
//! The registry has first refusal; a `None` result falls through to the
//! built-in renderer for the type, and unknown types get the generic
//! metadata list. Metadata is sanitized before anything is rendered.

use std::collections::HashMap;

use serde_json::Value;

use engram_core::sanitize::sanitize_value;

use crate::memory::RetrievedMemory;
use crate::options::{ContextFormat, ContextOptions};

/// A custom renderer: returns `None` to decline the entry.
pub type Renderer = Box<dyn Fn(&RetrievedMemory) -> Option<String> + Send + Sync>;

/// Registry mapping event_type → renderer.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: HashMap<String, Renderer>,
}

impl RendererRegistry {
    pub fn register(&mut self, event_type: impl Into<String>, renderer: Renderer) {
        self.renderers.insert(event_type.into(), renderer);
    }

    fn custom(&self, memory: &RetrievedMemory) -> Option<String> {
        let event_type = memory.event_type.as_deref()?;
        let renderer = self.renderers.get(event_type)?;
        renderer(memory)
    }
}

/// Render one entry, custom renderer first, then the built-ins.
pub(crate) fn render_entry(
    registry: &RendererRegistry,
    memory: &RetrievedMemory,
    options: &ContextOptions,
) -> String {
    let metadata = sanitize_value(&memory.metadata);

    let body = registry
        .custom(memory)
        .unwrap_or_else(|| builtin_body(memory, &metadata));

    let mut block = String::new();
    let event_type = memory.event_type.as_deref().unwrap_or("memory");
    match options.format {
        ContextFormat::Markdown => {
            block.push_str(&format!("### {event_type}"));
            if options.include_score {
                block.push_str(&format!(" (score: {:.3})", memory.score));
            }
            block.push('\n');
        }
        ContextFormat::Plain => {
            block.push_str(&format!("[{event_type}]"));
            if options.include_score {
                block.push_str(&format!(" score={:.3}", memory.score));
            }
            block.push('\n');
        }
    }
    if let Some(timestamp) = memory.timestamp {
        block.push_str(&timestamp.to_rfc3339());
        block.push('\n');
    }
    block.push_str(&body);

    if options.include_metadata {
        if let Some(rendered) = render_metadata_list(&metadata) {
            block.push('\n');
            block.push_str(&rendered);
        }
    }
    block
}

fn builtin_body(memory: &RetrievedMemory, metadata: &Value) -> String {
    match memory.event_type.as_deref() {
        Some("code_write") => render_code_write(memory, metadata),
        Some("command_run") => render_command_run(memory, metadata),
        Some("test_run") => render_test_run(metadata),
        Some("git_commit") => render_git_commit(memory, metadata),
        _ => memory.content.clone(),
    }
}

fn meta_str<'a>(metadata: &'a Value, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(Value::as_str)
}

fn meta_display(metadata: &Value, key: &str) -> Option<String> {
    metadata.get(key).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn render_code_write(memory: &RetrievedMemory, metadata: &Value) -> String {
    let mut lines = Vec::new();
    if let Some(file) = meta_str(metadata, "file") {
        let language = meta_str(metadata, "language").unwrap_or("unknown");
        lines.push(format!("{file} ({language})"));
    }
    if let Some(functions) = metadata.get("functions").and_then(Value::as_array) {
        let names: Vec<&str> = functions.iter().filter_map(Value::as_str).collect();
        if !names.is_empty() {
            lines.push(format!("functions: {}", names.join(", ")));
        }
    }
    lines.push(memory.content.clone());
    lines.join("\n")
}

fn render_command_run(memory: &RetrievedMemory, metadata: &Value) -> String {
    let command = meta_str(metadata, "command").unwrap_or(&memory.content);
    let mut line = format!("$ {command}");
    if let Some(exit_code) = meta_display(metadata, "exit_code") {
        line.push_str(&format!(" (exit {exit_code}"));
        if let Some(duration) = meta_display(metadata, "duration") {
            line.push_str(&format!(", {duration}ms"));
        }
        line.push(')');
    }
    if let Some(cwd) = meta_str(metadata, "cwd") {
        line.push_str(&format!(" in {cwd}"));
    }
    line
}

fn render_test_run(metadata: &Value) -> String {
    let file = meta_str(metadata, "file").unwrap_or("tests");
    let passed = meta_display(metadata, "passed").unwrap_or_else(|| "?".to_string());
    let failed = meta_display(metadata, "failed").unwrap_or_else(|| "?".to_string());
    let mut line = format!("{file}: {passed} passed, {failed} failed");
    if let Some(duration) = meta_display(metadata, "duration") {
        line.push_str(&format!(" in {duration}ms"));
    }
    line
}

fn render_git_commit(memory: &RetrievedMemory, metadata: &Value) -> String {
    let hash = meta_str(metadata, "hash").unwrap_or("unknown");
    let short = &hash[..hash.len().min(8)];
    let branch = meta_str(metadata, "branch").unwrap_or("unknown");
    let author = meta_str(metadata, "author").unwrap_or("unknown");
    let message = meta_str(metadata, "message").unwrap_or(&memory.content);
    format!("{short} on {branch} by {author}: {message}")
}

/// Generic `key: value` list over the (already sanitized) metadata.
fn render_metadata_list(metadata: &Value) -> Option<String> {
    let map = metadata.as_object()?;
    if map.is_empty() {
        return None;
    }
    let lines: Vec<String> = map
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("- {k}: {s}"),
            other => format!("- {k}: {other}"),
        })
        .collect();
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options() -> ContextOptions {
        ContextOptions::default()
    }

    #[test]
    fn code_write_renders_file_and_functions() {
        let memory = RetrievedMemory::new("1", "fn sum() {}", 1.0)
            .with_event_type("code_write")
            .with_metadata(json!({
                "file": "src/math.rs",
                "language": "rust",
                "functions": ["sum", "mul"],
            }));
        let block = render_entry(&RendererRegistry::default(), &memory, &options());
        assert!(block.contains("src/math.rs (rust)"));
        assert!(block.contains("functions: sum, mul"));
        assert!(block.contains("fn sum() {}"));
    }

    #[test]
    fn command_run_renders_exit_and_cwd() {
        let memory = RetrievedMemory::new("1", "cargo test", 1.0)
            .with_event_type("command_run")
            .with_metadata(json!({
                "command": "cargo test",
                "exit_code": 0,
                "duration": 1250,
                "cwd": "/repo",
            }));
        let block = render_entry(&RendererRegistry::default(), &memory, &options());
        assert!(block.contains("$ cargo test (exit 0, 1250ms) in /repo"));
    }

    #[test]
    fn git_commit_renders_short_hash() {
        let memory = RetrievedMemory::new("1", "msg", 1.0)
            .with_event_type("git_commit")
            .with_metadata(json!({
                "hash": "0123456789abcdef",
                "branch": "main",
                "author": "dev",
                "message": "fix parser",
            }));
        let block = render_entry(&RendererRegistry::default(), &memory, &options());
        assert!(block.contains("01234567 on main by dev: fix parser"));
    }

    #[test]
    fn custom_renderer_has_first_refusal() {
        let mut registry = RendererRegistry::default();
        registry.register(
            "code_write",
            Box::new(|m| Some(format!("CUSTOM {}", m.id))),
        );
        let memory = RetrievedMemory::new("42", "body", 1.0).with_event_type("code_write");
        let block = render_entry(&registry, &memory, &options());
        assert!(block.contains("CUSTOM 42"));
        assert!(!block.contains("body"));
    }

    #[test]
    fn declining_custom_renderer_falls_through() {
        let mut registry = RendererRegistry::default();
        registry.register("code_write", Box::new(|_| None));
        let memory = RetrievedMemory::new("42", "body", 1.0).with_event_type("code_write");
        let block = render_entry(&registry, &memory, &options());
        assert!(block.contains("body"));
    }

    #[test]
    fn sensitive_metadata_is_redacted() {
        let memory = RetrievedMemory::new("1", "content", 1.0)
            .with_metadata(json!({ "api_key": "sk-123", "plain": "ok" }));
        let mut opts = options();
        opts.include_metadata = true;
        let block = render_entry(&RendererRegistry::default(), &memory, &opts);
        assert!(block.contains("[REDACTED]"));
        assert!(!block.contains("sk-123"));
        assert!(block.contains("plain: ok"));
    }
}
