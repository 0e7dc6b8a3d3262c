//! Coalescing confirmed matches into maximal block runs.

use std::collections::BTreeMap;

use crate::sync::types::BlockMatchResult;

/// A maximal run of consecutive matched blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start_index: u32,
    pub end_index: u32,
    /// Offset of the run in the source.
    pub start_offset: u64,
    /// Exact byte length of the run; sums the member block sizes, so a run
    /// ending in the short final block is accounted correctly.
    pub size: u64,
}

impl BlockSpan {
    fn from_match(m: &BlockMatchResult) -> Self {
        Self {
            start_index: m.block_index,
            end_index: m.block_index,
            start_offset: m.comparison_offset,
            size: m.block_size,
        }
    }

    /// Source offset one past the run.
    pub fn end_offset(&self) -> u64 {
        self.start_offset + self.size
    }
}

/// Merges unordered match results into maximal spans.
///
/// Two matches coalesce only when they are adjacent in both the block
/// sequence and the source offset sequence; repeated content in the source
/// therefore never glues unrelated runs together. Duplicate matches for the
/// same block keep the smallest source offset, which makes the result
/// independent of input order.
#[derive(Debug, Default)]
pub struct MatchMerger {
    matches: BTreeMap<u32, BlockMatchResult>,
}

impl MatchMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb a batch of match results.
    pub fn merge_results(&mut self, results: &[BlockMatchResult]) {
        for result in results {
            match self.matches.get(&result.block_index) {
                Some(existing) if existing.comparison_offset <= result.comparison_offset => {}
                _ => {
                    self.matches.insert(result.block_index, *result);
                }
            }
        }
    }

    /// The merged spans, ordered by start block index.
    pub fn merged_spans(&self) -> Vec<BlockSpan> {
        let mut spans: Vec<BlockSpan> = Vec::new();

        for result in self.matches.values() {
            if let Some(last) = spans.last_mut() {
                if result.block_index == last.end_index + 1
                    && result.comparison_offset == last.end_offset()
                {
                    last.end_index = result.block_index;
                    last.size += result.block_size;
                    continue;
                }
            }
            spans.push(BlockSpan::from_match(result));
        }

        spans
    }
}
