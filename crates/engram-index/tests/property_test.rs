//! Property tests: row round-trips and filter consistency.

use engram_core::{Event, EventType, NewEvent, QueryFilters};
use engram_index::RelationalIndex;
use proptest::prelude::*;

fn arbitrary_event(content: String, session: String, type_idx: usize) -> Event {
    let types = EventType::all();
    let mut new = NewEvent::new(types[type_idx % types.len()], content, format!("s-{session}"));
    new.metadata = serde_json::json!({ "n": type_idx });
    Event::assign_id(new)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn insert_then_get_roundtrips(
        content in "[a-zA-Z0-9 ]{1,200}",
        session in "[a-z]{1,8}",
        type_idx in 0usize..16,
    ) {
        let index = RelationalIndex::open_in_memory().unwrap();
        let event = arbitrary_event(content, session, type_idx);
        index.insert_memory(&event).unwrap();

        let got = index.get_by_id(&event.id).unwrap().unwrap();
        prop_assert_eq!(got.content, event.content);
        prop_assert_eq!(got.event_type, event.event_type);
        prop_assert_eq!(got.session_id, event.session_id);
        prop_assert_eq!(got.metadata, event.metadata);
    }

    #[test]
    fn filter_by_session_returns_only_that_session(
        contents in prop::collection::vec("[a-z ]{1,40}", 1..20),
    ) {
        let index = RelationalIndex::open_in_memory().unwrap();
        let mut in_target = 0usize;
        for (i, content) in contents.iter().enumerate() {
            let session = if i % 2 == 0 { "target" } else { "other" };
            let event = Event::assign_id(NewEvent::new(EventType::CodeWrite, content.clone(), session));
            index.insert_memory(&event).unwrap();
            if i % 2 == 0 {
                in_target += 1;
            }
        }

        let got = index.filter(&QueryFilters::for_session("target")).unwrap();
        prop_assert_eq!(got.len(), in_target);
        prop_assert!(got.iter().all(|e| e.session_id == "target"));
    }
}
