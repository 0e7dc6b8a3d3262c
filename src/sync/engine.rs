//! The synchronization engine: sign, delta and patch.
//!
//! `sign` fingerprints the local destination file block by block. `delta`
//! scans the remote source against that signature and splits it into runs
//! already present locally and byte ranges that must be fetched. `patch`
//! replays the plan, interleaving local copies with fetches, to rebuild the
//! source byte for byte.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::config::{Config, SizeFn};
use crate::error::SyncError;
use crate::hash::rolling::RollingChecksum;
use crate::hash::strong::StrongHasher;
use crate::ioutil::read_full;
use crate::sync::index::ChecksumIndex;
use crate::sync::merge::{BlockSpan, MatchMerger};
use crate::sync::types::{
    BlockMatchResult, ChunkChecksum, ChunkChecksums, FoundBlockSpan, MissingBlockSpan,
    PatcherBlockSpan,
};
use crate::transfer::requester::BlockRequester;

/// Scan position handling in the matcher.
///
/// The state exists because a confirmed match makes the window jump past
/// itself instead of sliding by one; that jump is what keeps emitted
/// matches disjoint in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Slide the window by one byte; the weak hash rolls.
    ReadNextByte,
    /// A match was just emitted; jump a full window and rescan.
    ReadNextBlock,
    /// End of source processed.
    ReadNone,
}

/// The rsync-style engine.
///
/// One instance owns mutable hasher state and is not safe for concurrent
/// use; callers that need parallelism construct one engine per worker.
/// Within one sync cycle the operations run strictly in the order
/// sign, delta, patch.
pub struct BlockSync {
    block_size: usize,
    strong_hasher: Box<dyn StrongHasher>,
    full_checksum: Box<dyn StrongHasher>,
    max_request_block_size: u64,
    requester: Box<dyn BlockRequester>,
    size_fn: SizeFn,
}

impl std::fmt::Debug for BlockSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockSync")
            .field("block_size", &self.block_size)
            .field("max_request_block_size", &self.max_request_block_size)
            .finish()
    }
}

impl BlockSync {
    /// Validate `config` and build an engine from it.
    pub fn new(config: Config) -> Result<Self, SyncError> {
        Ok(Self::from_validated(config.into_validated()?))
    }

    pub(crate) fn from_validated(config: crate::config::ValidatedConfig) -> Self {
        let strong_hasher = (config.strong_hasher)();
        let full_checksum = (config.strong_hasher)();

        Self {
            block_size: config.block_size,
            strong_hasher,
            full_checksum,
            max_request_block_size: config.max_request_block_size,
            requester: config.requester,
            size_fn: config.size_fn,
        }
    }

    /// Configured checksum block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Read the destination and emit per-block checksums.
    ///
    /// Every non-empty block produces one [`ChunkChecksum`]; only the last
    /// block may be short, and an empty destination produces none. A
    /// whole-file digest is computed alongside.
    pub fn sign<R: Read>(&mut self, mut dest: R) -> Result<ChunkChecksums, SyncError> {
        self.strong_hasher.reset();
        self.full_checksum.reset();

        let mut buffer = vec![0u8; self.block_size];
        let mut checksums = Vec::new();
        let mut index: u32 = 0;

        loop {
            let n = read_full(&mut dest, &mut buffer)?;
            if n == 0 {
                break;
            }

            let block = &buffer[..n];
            self.full_checksum.write(block);
            self.strong_hasher.write(block);

            checksums.push(ChunkChecksum {
                block_index: index,
                block_size: n as u64,
                weak_hash: RollingChecksum::checksum(block),
                strong_hash: self.strong_hasher.finalize(),
            });
            index += 1;

            if n < buffer.len() {
                break;
            }
        }

        tracing::debug!(
            blocks = checksums.len(),
            block_size = self.block_size,
            "signed destination"
        );

        Ok(ChunkChecksums {
            checksums,
            config_block_size: self.block_size as u64,
            file_hash: self.full_checksum.finalize(),
            mod_time: 0,
        })
    }

    /// Diff the source against a signature into a patch plan.
    ///
    /// Matching reuses the block size recorded in the signature. The
    /// resulting found and missing spans tile `[0, source size)` exactly,
    /// and every missing span respects the configured request cap.
    pub fn delta<R: Read>(
        &mut self,
        mut source: R,
        signature: &ChunkChecksums,
    ) -> Result<PatcherBlockSpan, SyncError> {
        let block_size = signature.config_block_size as usize;
        let index = ChecksumIndex::new(signature);
        let results = self.match_blocks(&mut source, block_size, &index)?;

        let mut merger = MatchMerger::new();
        merger.merge_results(&results);
        let spans = merger.merged_spans();

        let source_size = (self.size_fn)()?;
        let plan = self.assemble_plan(&spans, signature.config_block_size, source_size);

        tracing::debug!(
            found = plan.found.len(),
            missing = plan.missing.len(),
            source_size,
            "assembled patch plan"
        );

        Ok(plan)
    }

    /// Replay `plan` against the local destination, writing the rebuilt
    /// source to `out`.
    ///
    /// Found runs are copied out of `local`; missing ranges come from the
    /// configured requester. The cursor must always land on the head of one
    /// of the two lists, otherwise the plan is corrupt.
    pub fn patch<R, W>(
        &mut self,
        mut local: R,
        plan: &PatcherBlockSpan,
        mut out: W,
    ) -> Result<(), SyncError>
    where
        R: Read + Seek,
        W: Write,
    {
        let mut found = plan.found.as_slice();
        let mut missing = plan.missing.as_slice();
        let mut cursor: u64 = 0;

        loop {
            if let Some(head) = found.first() {
                if head.match_offset == cursor {
                    cursor += copy_found_span(&mut local, head, &mut out)?;
                    found = &found[1..];
                    continue;
                }
            }

            if let Some(head) = missing.first() {
                if head.start_offset == cursor {
                    let requested = head.len();
                    let data = self.requester.request(head.start_offset, head.end_offset)?;
                    out.write_all(&data)?;
                    cursor += data.len() as u64;
                    missing = &missing[1..];

                    // A short fetch is end-of-source; mid-plan it means the
                    // source no longer matches the plan.
                    if (data.len() as u64) < requested
                        && !(found.is_empty() && missing.is_empty())
                    {
                        return Err(SyncError::PlanUnderrun {
                            expected: requested,
                            actual: data.len() as u64,
                        });
                    }
                    continue;
                }
            }

            if found.is_empty() && missing.is_empty() {
                break;
            }

            return Err(SyncError::OutOfOrderPlan { offset: cursor });
        }

        out.flush()?;
        tracing::debug!(bytes = cursor, "patched destination");
        Ok(())
    }

    /// Scan the source left to right and emit every confirmed block match.
    fn match_blocks<R: Read>(
        &mut self,
        source: &mut R,
        block_size: usize,
        index: &ChecksumIndex<'_>,
    ) -> Result<Vec<BlockMatchResult>, SyncError> {
        let mut results = Vec::new();
        if index.block_count() == 0 {
            return Ok(results);
        }

        let mut window = vec![0u8; block_size];
        let n = read_full(source, &mut window)?;
        window.truncate(n);
        if window.is_empty() {
            return Ok(results);
        }

        let mut offset: u64 = 0;
        let mut weak = RollingChecksum::new();
        weak.update_block(&window);
        let mut state = ScanState::ReadNextByte;

        while state != ScanState::ReadNone {
            let mut matched = false;
            if let Some(candidates) = index.find_weak(weak.digest()) {
                self.strong_hasher.write(&window);
                let strong = self.strong_hasher.finalize();

                if let Some(chunk) = index.find_strong(candidates, &strong).first() {
                    results.push(BlockMatchResult {
                        block_index: chunk.block_index,
                        block_size: chunk.block_size,
                        comparison_offset: offset,
                    });
                    matched = true;
                }
            }

            state = if matched {
                ScanState::ReadNextBlock
            } else {
                ScanState::ReadNextByte
            };

            match state {
                ScanState::ReadNextBlock => {
                    // Jump past the matched window; the weak hash has no
                    // rolling predecessor there and is recomputed.
                    offset += window.len() as u64;
                    window.resize(block_size, 0);
                    let n = read_full(source, &mut window)?;
                    window.truncate(n);

                    if window.is_empty() {
                        state = ScanState::ReadNone;
                    } else {
                        weak.update_block(&window);
                    }
                }
                ScanState::ReadNextByte => {
                    let old_byte = window[0];
                    let mut next = [0u8; 1];
                    let n = read_full(source, &mut next)?;
                    offset += 1;

                    if n == 1 {
                        window.copy_within(1.., 0);
                        let last = window.len() - 1;
                        window[last] = next[0];
                        weak.roll_byte(old_byte, next[0]);
                    } else {
                        // Source exhausted: the window shrinks, and the
                        // shorter window hashes differently, so rescan.
                        window.remove(0);
                        if window.is_empty() {
                            state = ScanState::ReadNone;
                        } else {
                            weak.update_block(&window);
                        }
                    }
                }
                ScanState::ReadNone => break,
            }
        }

        tracing::debug!(matches = results.len(), "matched source against signature");
        Ok(results)
    }

    /// Turn merged spans into the found list and its complement, capping
    /// missing spans to the configured request size.
    fn assemble_plan(
        &self,
        spans: &[BlockSpan],
        block_size: u64,
        source_size: u64,
    ) -> PatcherBlockSpan {
        let mut by_offset: Vec<&BlockSpan> = spans.iter().collect();
        by_offset.sort_by_key(|span| span.start_offset);

        let found = by_offset
            .iter()
            .map(|span| FoundBlockSpan {
                start_index: span.start_index,
                end_index: span.end_index,
                match_offset: span.start_offset,
                block_size,
            })
            .collect();

        let mut missing = Vec::new();
        let mut cursor: u64 = 0;
        for span in &by_offset {
            if span.start_offset > cursor {
                missing.push(MissingBlockSpan {
                    start_offset: cursor,
                    end_offset: span.start_offset - 1,
                });
            }
            cursor = span.end_offset();
        }
        if cursor < source_size {
            missing.push(MissingBlockSpan {
                start_offset: cursor,
                end_offset: source_size - 1,
            });
        }

        PatcherBlockSpan {
            found,
            missing: cap_missing_spans(missing, self.max_request_block_size),
            mod_time: 0,
        }
    }
}

/// Copy one found run out of the destination, block by block.
///
/// The final destination block may be short; the bytes actually copied are
/// returned so the patch cursor advances by the true span length.
fn copy_found_span<R: Read + Seek, W: Write>(
    local: &mut R,
    span: &FoundBlockSpan,
    out: &mut W,
) -> Result<u64, SyncError> {
    local.seek(SeekFrom::Start(span.block_size * u64::from(span.start_index)))?;

    let mut buffer = vec![0u8; span.block_size as usize];
    let mut copied: u64 = 0;

    for _ in 0..span.block_count() {
        let n = read_full(local, &mut buffer)?;
        if n == 0 {
            break;
        }
        out.write_all(&buffer[..n])?;
        copied += n as u64;
        if n < buffer.len() {
            break;
        }
    }

    Ok(copied)
}

/// Split every span wider than `cap` into consecutive cap-sized pieces.
/// A cap of zero leaves the spans untouched.
fn cap_missing_spans(spans: Vec<MissingBlockSpan>, cap: u64) -> Vec<MissingBlockSpan> {
    if cap == 0 {
        return spans;
    }

    let mut capped = Vec::with_capacity(spans.len());
    for span in spans {
        let mut start = span.start_offset;
        while span.end_offset - start + 1 > cap {
            capped.push(MissingBlockSpan {
                start_offset: start,
                end_offset: start + cap - 1,
            });
            start += cap;
        }
        capped.push(MissingBlockSpan {
            start_offset: start,
            end_offset: span.end_offset,
        });
    }
    capped
}
