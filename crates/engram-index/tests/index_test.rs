//! Integration tests: event rows, filters, mappings, sessions.

use chrono::{Duration, Utc};
use engram_core::{
    EngramError, Event, EventType, NewEvent, OrderBy, OrderDirection, QueryFilters, Session,
};
use engram_index::RelationalIndex;

fn make_event(content: &str, session_id: &str) -> Event {
    Event::assign_id(NewEvent::new(EventType::CodeWrite, content, session_id))
}

#[test]
fn insert_and_get_roundtrip() {
    let index = RelationalIndex::open_in_memory().unwrap();
    let event = make_event("function sum(a,b){return a+b;}", "s1");

    index.insert_memory(&event).unwrap();
    let got = index.get_by_id(&event.id).unwrap().expect("row should exist");

    assert_eq!(got.id, event.id);
    assert_eq!(got.event_type, EventType::CodeWrite);
    assert_eq!(got.content, event.content);
    assert_eq!(got.session_id, "s1");
}

#[test]
fn duplicate_id_is_conflict() {
    let index = RelationalIndex::open_in_memory().unwrap();
    let event = make_event("dup", "s1");

    index.insert_memory(&event).unwrap();
    let err = index.insert_memory(&event).unwrap_err();
    assert!(matches!(err, EngramError::Conflict { .. }), "got {err:?}");
}

#[test]
fn batch_insert_is_atomic() {
    let index = RelationalIndex::open_in_memory().unwrap();
    let a = make_event("a", "s1");
    let b = make_event("b", "s1");
    let mut dup = make_event("dup of a", "s1");
    dup.id = a.id.clone();

    let err = index.insert_memories_batch(&[a, b, dup]).unwrap_err();
    assert!(matches!(err, EngramError::Conflict { .. }));

    // Nothing from the failed batch landed.
    assert_eq!(index.count("memories").unwrap(), 0);
}

#[test]
fn filter_by_session_ordered_desc_with_limit() {
    let index = RelationalIndex::open_in_memory().unwrap();
    let base = Utc::now();
    for i in 0..5 {
        let mut event = make_event(&format!("event {i}"), "s1");
        event.timestamp = base + Duration::seconds(i);
        index.insert_memory(&event).unwrap();
    }
    // Another session that must not leak in.
    index.insert_memory(&make_event("other", "s2")).unwrap();

    let filters = QueryFilters {
        session_id: Some("s1".to_string()),
        limit: Some(3),
        order_by: Some(OrderBy::Timestamp),
        order_direction: Some(OrderDirection::Desc),
        ..Default::default()
    };
    let got = index.filter(&filters).unwrap();

    assert_eq!(got.len(), 3);
    assert_eq!(got[0].content, "event 4");
    assert_eq!(got[1].content, "event 3");
    assert_eq!(got[2].content, "event 2");
}

#[test]
fn filter_by_type_and_time_range() {
    let index = RelationalIndex::open_in_memory().unwrap();
    let base = Utc::now();

    let mut old = make_event("old", "s1");
    old.timestamp = base - Duration::hours(2);
    index.insert_memory(&old).unwrap();

    let mut recent = make_event("recent", "s1");
    recent.timestamp = base;
    index.insert_memory(&recent).unwrap();

    let mut prompt = Event::assign_id(NewEvent::new(EventType::UserPrompt, "hi", "s1"));
    prompt.timestamp = base;
    index.insert_memory(&prompt).unwrap();

    let filters = QueryFilters {
        event_type: Some(EventType::CodeWrite),
        start_time: Some(base - Duration::hours(1)),
        ..Default::default()
    };
    let got = index.filter(&filters).unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].content, "recent");
}

#[test]
fn get_by_ids_preserves_order() {
    let index = RelationalIndex::open_in_memory().unwrap();
    let a = make_event("a", "s1");
    let b = make_event("b", "s1");
    let c = make_event("c", "s1");
    for e in [&a, &b, &c] {
        index.insert_memory(e).unwrap();
    }

    let ids = vec![c.id.clone(), "missing".to_string(), a.id.clone()];
    let got = index.get_by_ids(&ids).unwrap();
    assert_eq!(got.len(), 2);
    assert_eq!(got[0].id, c.id);
    assert_eq!(got[1].id, a.id);
}

#[test]
fn vector_mapping_roundtrip() {
    let index = RelationalIndex::open_in_memory().unwrap();
    index
        .upsert_vector_mapping("mem-1", "vec-1", "test-model", "hash-1")
        .unwrap();
    index
        .upsert_vector_mapping("mem-2", "vec-2", "test-model", "hash-2")
        .unwrap();

    let resolved = index
        .memory_ids_for_vectors(&[
            "vec-2".to_string(),
            "vec-unknown".to_string(),
            "vec-1".to_string(),
        ])
        .unwrap();
    assert_eq!(
        resolved,
        vec![Some("mem-2".to_string()), None, Some("mem-1".to_string())]
    );
    assert_eq!(
        index.vector_id_for_memory("mem-1").unwrap(),
        Some("vec-1".to_string())
    );
}

#[test]
fn content_hash_lookup_scopes_by_model() {
    let index = RelationalIndex::open_in_memory().unwrap();
    index
        .upsert_vector_mapping("mem-1", "vec-1", "model-a", "shared-hash")
        .unwrap();

    assert_eq!(
        index
            .vector_id_for_content_hash("shared-hash", "model-a")
            .unwrap(),
        Some("vec-1".to_string())
    );
    // Same content under a different model must re-embed.
    assert_eq!(
        index
            .vector_id_for_content_hash("shared-hash", "model-b")
            .unwrap(),
        None
    );
    assert_eq!(
        index
            .vector_id_for_content_hash("unseen-hash", "model-a")
            .unwrap(),
        None
    );
}

#[test]
fn session_mirror_and_rehydration() {
    let index = RelationalIndex::open_in_memory().unwrap();
    let mut session = Session::new("session_1_aaaa", "ws1");
    index.upsert_session(&session).unwrap();

    let active = index.active_sessions().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].workspace_id, "ws1");

    session.end();
    index.upsert_session(&session).unwrap();
    assert!(index.active_sessions().unwrap().is_empty());

    let got = index.get_session("session_1_aaaa").unwrap().unwrap();
    assert!(!got.is_active);
    assert!(got.end_time.is_some());
}

#[test]
fn statistics_aggregate() {
    let index = RelationalIndex::open_in_memory().unwrap();
    index.insert_memory(&make_event("abcd", "s1")).unwrap();
    index.insert_memory(&make_event("efgh", "s1")).unwrap();
    index
        .insert_memory(&Event::assign_id(NewEvent::new(
            EventType::UserPrompt,
            "hello",
            "s1",
        )))
        .unwrap();

    let stats = index.statistics().unwrap();
    assert_eq!(stats.total_memories, 3);
    assert_eq!(stats.total_size, 13);
    assert_eq!(stats.by_type.get("code_write"), Some(&2));
    assert_eq!(stats.by_type.get("user_prompt"), Some(&1));
    assert!(stats.oldest.is_some());
    assert!(stats.newest.is_some());
}

#[test]
fn transaction_rolls_back_on_error() {
    let index = RelationalIndex::open_in_memory().unwrap();
    let result: Result<(), _> = index.transaction(|tx| {
        let params: &[&dyn rusqlite::ToSql] = &[&"ws", &"main", &"abc123"];
        tx.run(
            "INSERT INTO git_states (workspace_id, branch, commit_hash) VALUES (?1, ?2, ?3)",
            params,
        )?;
        Err(EngramError::internal("forced rollback"))
    });
    assert!(result.is_err());
    assert_eq!(index.count("git_states").unwrap(), 0);
}

#[test]
fn file_backed_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.db");
    let event = make_event("persisted", "s1");

    {
        let index = RelationalIndex::open(&path, 2, 5_000).unwrap();
        index.insert_memory(&event).unwrap();
    }

    let index = RelationalIndex::open(&path, 2, 5_000).unwrap();
    let got = index.get_by_id(&event.id).unwrap().unwrap();
    assert_eq!(got.content, "persisted");
}

#[test]
fn closed_index_rejects_operations() {
    let index = RelationalIndex::open_in_memory().unwrap();
    index.close();
    let err = index.get_by_id("any").unwrap_err();
    assert!(matches!(err, EngramError::Closed));
}
