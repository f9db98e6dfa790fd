//! End-to-end flows through the facade.

use std::sync::Arc;

use engram_core::config::{LimiterConfig, WindowStrategy};
use engram_core::{EngramConfig, EngramError, EventType};
use engram_storage::Embedder;
use engram::Engram;

fn bag_of_bytes_embedder() -> Embedder {
    Arc::new(|text: &str| {
        let mut vector = vec![0.0f32; 8];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % 8] += byte as f32 / 255.0;
        }
        Ok(vector)
    })
}

fn config(dir: &std::path::Path) -> EngramConfig {
    EngramConfig {
        db_path: ":memory:".to_string(),
        vector_dir: Some(dir.join("vectors")),
        blob_root: dir.join("blobs"),
        ..Default::default()
    }
}

#[tokio::test]
async fn capture_then_inject_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let system = Engram::open(config(dir.path()), Some(bag_of_bytes_embedder())).unwrap();

    let captured = system
        .capture_event(
            "ws1",
            EventType::CodeWrite,
            "implemented the retry helper with exponential backoff and jitter",
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(captured.kind, "captured");
    assert!(captured.session_id.starts_with("session_"));

    let injection = system
        .inject_context("ws1", "how does the retry helper work?", None)
        .await
        .unwrap();
    assert_eq!(injection.kind, "context");
    assert_eq!(injection.workspace_id, "ws1");
    assert_eq!(injection.memory_count, 1);
    assert!(injection.context.contains("retry helper"));

    // Both flows converged on the same workspace session.
    assert_eq!(injection.session_id, captured.session_id);
    system.shutdown();
}

#[tokio::test]
async fn empty_prompt_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let system = Engram::open(config(dir.path()), None).unwrap();

    let err = system.inject_context("ws1", "   ", None).await.unwrap_err();
    assert!(matches!(err, EngramError::Validation { .. }));
    assert!(err.to_string().contains("EMPTY_PROMPT"));
    system.shutdown();
}

#[tokio::test]
async fn admission_control_denies_over_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.limiter = LimiterConfig {
        max_requests: 2,
        window_ms: 60_000,
        strategy: WindowStrategy::Sliding,
        ..Default::default()
    };
    let system = Engram::open(cfg, None).unwrap();

    for _ in 0..2 {
        system
            .capture_event("ws1", EventType::CommandRun, "cargo check", None, None)
            .await
            .unwrap();
    }
    let err = system
        .capture_event("ws1", EventType::CommandRun, "cargo check", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngramError::RateLimited { .. }));
    system.shutdown();
}

#[tokio::test]
async fn explicit_session_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let system = Engram::open(config(dir.path()), None).unwrap();

    let first = system
        .capture_event("ws1", EventType::UserPrompt, "hello", None, None)
        .await
        .unwrap();
    let second = system
        .capture_event(
            "ws1",
            EventType::UserPrompt,
            "hello again",
            None,
            Some(&first.session_id),
        )
        .await
        .unwrap();
    assert_eq!(first.session_id, second.session_id);
    system.shutdown();
}

#[tokio::test]
async fn context_block_stays_within_default_budget() {
    let dir = tempfile::tempdir().unwrap();
    let system = Engram::open(config(dir.path()), None).unwrap();

    for i in 0..40 {
        system
            .capture_event(
                "ws1",
                EventType::CodeWrite,
                &format!("change {i}: {}", "word ".repeat(120)),
                None,
                None,
            )
            .await
            .unwrap();
    }

    let injection = system
        .inject_context("ws1", "summarize recent changes", None)
        .await
        .unwrap();
    assert!(injection.context.len() <= 8 * 1024);
    system.shutdown();
}
