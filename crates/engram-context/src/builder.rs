//! The build pipeline: validate → dedupe → sort → render → size-bound.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::memory::RetrievedMemory;
use crate::options::ContextOptions;
use crate::render::{render_entry, Renderer, RendererRegistry};
use crate::similarity::content_similarity;

/// Marker appended when the artifact hits the byte budget.
pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// Statistics of the most recent build.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BuildStats {
    pub input_memories: usize,
    pub output_memories: usize,
    pub duplicates_removed: usize,
    pub total_size: usize,
    pub truncated: bool,
    pub build_time: Duration,
}

/// The context builder. Holds options, the renderer registry, and the
/// stats of the last build.
pub struct ContextBuilder {
    options: ContextOptions,
    registry: RendererRegistry,
    last_stats: Mutex<BuildStats>,
}

impl ContextBuilder {
    pub fn new(options: ContextOptions) -> Self {
        Self {
            options,
            registry: RendererRegistry::default(),
            last_stats: Mutex::new(BuildStats::default()),
        }
    }

    /// Register a custom renderer for an event type. It has first refusal
    /// on every entry of that type; returning `None` falls through to the
    /// built-in rendering.
    pub fn register_renderer(&mut self, event_type: impl Into<String>, renderer: Renderer) {
        self.registry.register(event_type, renderer);
    }

    /// Assemble the context artifact. The result never exceeds
    /// `options.max_size` bytes.
    pub fn build(&self, memories: &[RetrievedMemory]) -> String {
        let started = Instant::now();
        let input_memories = memories.len();

        // Entries without an id or content cannot be rendered or deduped.
        let valid: Vec<&RetrievedMemory> =
            memories.iter().filter(|m| m.is_renderable()).collect();

        let (survivors, duplicates_removed) = self.deduplicate(valid);

        // Stable sort keeps input order for equal scores.
        let mut ranked = survivors;
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let separator = "\n\n";

        let mut output = String::new();
        let mut output_memories = 0;
        let mut truncated = false;
        for memory in &ranked {
            let block = render_entry(&self.registry, memory, &self.options);
            let extra = if output.is_empty() { 0 } else { separator.len() };
            if output.len() + extra + block.len() > self.options.max_size {
                truncated = true;
                break;
            }
            if !output.is_empty() {
                output.push_str(separator);
            }
            output.push_str(&block);
            output_memories += 1;
        }

        if truncated {
            output = append_marker(output, self.options.max_size);
        }

        let stats = BuildStats {
            input_memories,
            output_memories,
            duplicates_removed,
            total_size: output.len(),
            truncated,
            build_time: started.elapsed(),
        };
        debug!(
            input = stats.input_memories,
            output = stats.output_memories,
            deduped = stats.duplicates_removed,
            size = stats.total_size,
            truncated = stats.truncated,
            "context built"
        );
        if let Ok(mut guard) = self.last_stats.lock() {
            *guard = stats;
        }

        output
    }

    /// Greedy clustering by pairwise similarity; the highest-scored
    /// member of each cluster survives. Threshold 1.0 disables dedup.
    fn deduplicate<'a>(
        &self,
        memories: Vec<&'a RetrievedMemory>,
    ) -> (Vec<&'a RetrievedMemory>, usize) {
        let threshold = self.options.deduplicate_threshold;
        if threshold >= 1.0 {
            return (memories, 0);
        }

        let mut clusters: Vec<&RetrievedMemory> = Vec::new();
        let mut removed = 0;
        'next: for memory in memories {
            for representative in clusters.iter_mut() {
                if content_similarity(&memory.content, &representative.content) >= threshold {
                    removed += 1;
                    // Keep the higher score; earlier input wins ties.
                    if memory.score > representative.score {
                        *representative = memory;
                    }
                    continue 'next;
                }
            }
            clusters.push(memory);
        }
        (clusters, removed)
    }

    /// Statistics of the most recent `build` call.
    pub fn get_last_build_stats(&self) -> BuildStats {
        self.last_stats
            .lock()
            .map(|guard| *guard)
            .unwrap_or_default()
    }
}

/// Trim the artifact so the truncation marker fits inside the budget,
/// then append it.
fn append_marker(mut output: String, max_size: usize) -> String {
    if max_size <= TRUNCATION_MARKER.len() {
        return TRUNCATION_MARKER
            .as_bytes()
            .get(..max_size)
            .and_then(|b| std::str::from_utf8(b).ok())
            .unwrap_or_default()
            .to_string();
    }
    let budget = max_size - TRUNCATION_MARKER.len();
    if output.len() > budget {
        let mut cut = budget;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
    }
    output.push_str(TRUNCATION_MARKER);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_fits_the_budget() {
        let out = append_marker("x".repeat(600), 500);
        assert!(out.len() <= 500);
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn tiny_budget_still_bounded() {
        let out = append_marker("hello".to_string(), 5);
        assert!(out.len() <= 5);
    }
}
