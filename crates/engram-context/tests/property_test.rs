//! Property test: the byte budget holds for arbitrary inputs.

use engram_context::{ContextBuilder, ContextOptions, RetrievedMemory};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn artifact_never_exceeds_max_size(
        contents in prop::collection::vec("[a-zA-Z ]{0,300}", 0..20),
        max_size in 32usize..2_000,
    ) {
        let builder = ContextBuilder::new(ContextOptions {
            max_size,
            deduplicate_threshold: 1.0,
            ..Default::default()
        });
        let memories: Vec<RetrievedMemory> = contents
            .into_iter()
            .enumerate()
            .map(|(i, content)| RetrievedMemory::new(format!("m{i}"), content, i as f64))
            .collect();

        let output = builder.build(&memories);
        prop_assert!(output.len() <= max_size);
    }
}
