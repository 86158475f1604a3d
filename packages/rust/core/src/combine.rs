//! Recombining undersized pre-chunks.
//!
//! Section boundaries can leave small pre-chunks behind (a lone heading, a
//! one-line section). The combiner merges each pre-chunk into the one before
//! it while the accumulation stays under `combine_text_under_n_chars` and the
//! merge still fits the hard max.

use crate::prechunk::PreChunk;

/// Iterator adapter that merges consecutive pre-chunks when they fit.
pub struct PreChunkCombiner<'a, I>
where
    I: Iterator<Item = PreChunk<'a>>,
{
    pre_chunks: I,
    accum: Option<PreChunk<'a>>,
}

impl<'a, I> PreChunkCombiner<'a, I>
where
    I: Iterator<Item = PreChunk<'a>>,
{
    pub fn new(pre_chunks: I) -> Self {
        Self {
            pre_chunks,
            accum: None,
        }
    }
}

impl<'a, I> Iterator for PreChunkCombiner<'a, I>
where
    I: Iterator<Item = PreChunk<'a>>,
{
    type Item = PreChunk<'a>;

    fn next(&mut self) -> Option<PreChunk<'a>> {
        for pre_chunk in self.pre_chunks.by_ref() {
            match self.accum.take() {
                None => self.accum = Some(pre_chunk),
                Some(accum) if accum.can_combine(&pre_chunk) => {
                    self.accum = Some(accum.combine(&pre_chunk));
                }
                Some(full) => {
                    self.accum = Some(pre_chunk);
                    return Some(full);
                }
            }
        }
        self.accum.take()
    }
}
