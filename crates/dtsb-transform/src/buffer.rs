//! Reference Buffer: offset-addressed edits against an immutable source text.
//!
//! The text is split into chunks on demand. Every edit names offsets in the *original*
//! text, so edits can be recorded in any order and never invalidate each other's
//! positions. Chunks are threaded through an output-order list that `move_range`
//! relinks; `finish` emits the list in one linear pass.
//!
//! Rules:
//! - `remove` is idempotent and may overlap earlier removals.
//! - `overwrite` of exactly the same range replaces the earlier text (last writer wins).
//! - Any edit that would split a chunk whose text was already replaced is an
//!   [`TransformError::EditConflict`].
//! - Text inserted with `append_left` / `append_right` survives removal of the
//!   neighbouring chunk.

use crate::error::{Result, TransformError};
use dtsb_common::Span;
use rustc_hash::FxHashMap;

type ChunkId = usize;

#[derive(Debug, Clone)]
struct Chunk {
    start: usize,
    end: usize,
    content: String,
    intro: String,
    outro: String,
    edited: bool,
    prev: Option<ChunkId>,
    next: Option<ChunkId>,
}

impl Chunk {
    fn is_replaced(&self) -> bool {
        self.edited && !self.content.is_empty()
    }
}

pub struct EditBuffer<'a> {
    original: &'a str,
    chunks: Vec<Chunk>,
    first: ChunkId,
    last: ChunkId,
    by_start: FxHashMap<usize, ChunkId>,
    by_end: FxHashMap<usize, ChunkId>,
    intro: String,
    outro: String,
}

impl<'a> EditBuffer<'a> {
    pub fn new(original: &'a str) -> Self {
        let chunk = Chunk {
            start: 0,
            end: original.len(),
            content: original.to_string(),
            intro: String::new(),
            outro: String::new(),
            edited: false,
            prev: None,
            next: None,
        };
        let mut by_start = FxHashMap::default();
        let mut by_end = FxHashMap::default();
        by_start.insert(0, 0);
        by_end.insert(original.len(), 0);
        EditBuffer {
            original,
            chunks: vec![chunk],
            first: 0,
            last: 0,
            by_start,
            by_end,
            intro: String::new(),
            outro: String::new(),
        }
    }

    /// Insert text at the very beginning of the output.
    pub fn prepend(&mut self, content: &str) {
        self.intro.insert_str(0, content);
    }

    /// Insert text at the very end of the output.
    pub fn append(&mut self, content: &str) {
        self.outro.push_str(content);
    }

    /// Insert text at `index`, attached to the chunk that ends there.
    ///
    /// When that chunk is moved, the text moves with it.
    pub fn append_left(&mut self, index: usize, content: &str) -> Result<()> {
        self.split(index)?;
        match self.by_end.get(&index) {
            Some(&id) => self.chunks[id].outro.push_str(content),
            None => self.intro.push_str(content),
        }
        Ok(())
    }

    /// Insert text at `index`, attached to the chunk that starts there.
    pub fn append_right(&mut self, index: usize, content: &str) -> Result<()> {
        self.split(index)?;
        match self.by_start.get(&index) {
            Some(&id) => self.chunks[id].intro.push_str(content),
            None => self.outro.push_str(content),
        }
        Ok(())
    }

    /// Like [`append_right`](Self::append_right), but before text already inserted there.
    pub fn prepend_right(&mut self, index: usize, content: &str) -> Result<()> {
        self.split(index)?;
        match self.by_start.get(&index) {
            Some(&id) => self.chunks[id].intro.insert_str(0, content),
            None => self.outro.insert_str(0, content),
        }
        Ok(())
    }

    /// Delete the original text in `[start, end)`.
    pub fn remove(&mut self, start: usize, end: usize) -> Result<()> {
        if start == end {
            return Ok(());
        }
        self.check_range(start, end)?;
        self.split(start)?;
        self.split(end)?;
        for id in self.chunks_between(start, end)? {
            let chunk = &mut self.chunks[id];
            chunk.content.clear();
            chunk.edited = true;
        }
        Ok(())
    }

    /// Replace the original text in `[start, end)` with `content`.
    pub fn overwrite(&mut self, start: usize, end: usize, content: &str) -> Result<()> {
        if start == end {
            return Err(conflict(start, end, "cannot overwrite an empty range"));
        }
        self.check_range(start, end)?;
        self.split(start)?;
        self.split(end)?;
        let ids = self.chunks_between(start, end)?;
        for (i, id) in ids.into_iter().enumerate() {
            let chunk = &mut self.chunks[id];
            chunk.content = if i == 0 { content.to_string() } else { String::new() };
            chunk.edited = true;
        }
        Ok(())
    }

    /// Move the original text in `[start, end)` so it is emitted right before the chunk
    /// starting at `index` (or at the end when `index` is the text length).
    pub fn move_range(&mut self, start: usize, end: usize, index: usize) -> Result<()> {
        if start == end {
            return Ok(());
        }
        self.check_range(start, end)?;
        if index >= start && index < end {
            return Err(conflict(start, end, "cannot move a range inside itself"));
        }
        self.split(start)?;
        self.split(end)?;
        self.split(index)?;

        let ids = self.chunks_between(start, end)?;
        for pair in ids.windows(2) {
            if self.chunks[pair[0]].next != Some(pair[1]) {
                return Err(conflict(start, end, "range is no longer contiguous"));
            }
        }
        let (first, last) = match (ids.first(), ids.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Ok(()),
        };
        let new_right = self.by_start.get(&index).copied();
        if new_right.is_none() && last == self.last {
            return Ok(());
        }

        // Detach.
        let old_left = self.chunks[first].prev;
        let old_right = self.chunks[last].next;
        match old_left {
            Some(left) => self.chunks[left].next = old_right,
            None => {
                if let Some(right) = old_right {
                    self.first = right;
                }
            }
        }
        match old_right {
            Some(right) => self.chunks[right].prev = old_left,
            None => {
                if let Some(left) = old_left {
                    self.last = left;
                }
            }
        }

        // Reattach before `new_right`.
        let new_left = match new_right {
            Some(right) => self.chunks[right].prev,
            None => Some(self.last),
        };
        self.chunks[first].prev = new_left;
        self.chunks[last].next = new_right;
        match new_left {
            Some(left) => self.chunks[left].next = Some(first),
            None => self.first = first,
        }
        match new_right {
            Some(right) => self.chunks[right].prev = Some(last),
            None => self.last = last,
        }
        Ok(())
    }

    /// Emit the edited text.
    pub fn finish(&self) -> String {
        let mut out = String::with_capacity(self.original.len() + self.intro.len() + self.outro.len());
        out.push_str(&self.intro);
        let mut cursor = Some(self.first);
        while let Some(id) = cursor {
            let chunk = &self.chunks[id];
            out.push_str(&chunk.intro);
            out.push_str(&chunk.content);
            out.push_str(&chunk.outro);
            cursor = chunk.next;
        }
        out.push_str(&self.outro);
        out
    }

    fn check_range(&self, start: usize, end: usize) -> Result<()> {
        if start > end {
            return Err(conflict(end, start, "range start exceeds its end"));
        }
        self.check_offset(start)?;
        self.check_offset(end)
    }

    fn check_offset(&self, index: usize) -> Result<()> {
        if index > self.original.len() || !self.original.is_char_boundary(index) {
            return Err(conflict(index, index, "offset is outside the text"));
        }
        Ok(())
    }

    /// Chunk ids covering `[start, end)` in original order. Both ends must be chunk
    /// boundaries.
    fn chunks_between(&self, start: usize, end: usize) -> Result<Vec<ChunkId>> {
        let mut ids = Vec::new();
        let mut pos = start;
        while pos < end {
            let id = *self
                .by_start
                .get(&pos)
                .ok_or_else(|| conflict(start, end, "range does not align with chunk boundaries"))?;
            ids.push(id);
            pos = self.chunks[id].end;
        }
        Ok(ids)
    }

    fn split(&mut self, index: usize) -> Result<()> {
        self.check_offset(index)?;
        if self.by_start.contains_key(&index) || self.by_end.contains_key(&index) {
            return Ok(());
        }
        let Some(id) = self
            .chunks
            .iter()
            .position(|chunk| chunk.start < index && index < chunk.end)
        else {
            return Ok(());
        };
        if self.chunks[id].is_replaced() {
            let chunk = &self.chunks[id];
            return Err(conflict(
                chunk.start,
                chunk.end,
                "cannot split a range whose text was already replaced",
            ));
        }

        let new_id = self.chunks.len();
        let chunk = &mut self.chunks[id];
        let split_at = index - chunk.start;
        let tail_content = if chunk.edited {
            String::new()
        } else {
            chunk.content.split_off(split_at)
        };
        let tail = Chunk {
            start: index,
            end: chunk.end,
            content: tail_content,
            intro: String::new(),
            outro: std::mem::take(&mut chunk.outro),
            edited: chunk.edited,
            prev: Some(id),
            next: chunk.next,
        };
        chunk.end = index;
        let old_next = chunk.next.replace(new_id);

        if let Some(next) = old_next {
            self.chunks[next].prev = Some(new_id);
        } else if self.last == id {
            self.last = new_id;
        }
        self.by_end.insert(index, id);
        self.by_start.insert(index, new_id);
        self.by_end.insert(tail.end, new_id);
        self.chunks.push(tail);
        Ok(())
    }
}

fn conflict(start: usize, end: usize, message: &str) -> TransformError {
    TransformError::EditConflict {
        span: Span::from_offsets(start, end),
        message: message.to_string(),
    }
}
