//! Alignment of pre-execution cells against post-execution cells.
//!
//! The execution engine may splice cells into the notebook (an
//! "injected-parameters" cell after the parameters cell, an error banner
//! before a failing cell) and adds an empty `tags` array to every cell. The
//! [`CellAligner`] walks both sequences with independent cursors, skips the
//! spliced cells, checks that paired cells still hold the same source and
//! strips the empty `tags` arrays whose pre-execution cell had none.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{serde_error, ErrorInfo, NbError};
use crate::model::Cell;

/// Tags the execution engine puts on cells it inserts.
pub const DEFAULT_MARKER_TAGS: [&str; 2] = ["papermill-error-cell-tag", "injected-parameters"];

/// Closed set of tags identifying engine-inserted cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerTags(BTreeSet<String>);

impl Default for MarkerTags {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_TAGS)
    }
}

impl MarkerTags {
    /// Builds a marker set from exactly the given tags.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }

    /// Adds further tags to the set.
    pub fn extend<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Returns true if `tag` is a marker.
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Iterates over the markers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns true if any of the cell's tags is a marker.
    pub fn marks(&self, cell: &Cell) -> bool {
        cell.tags().into_iter().any(|tag| self.contains(tag))
    }

    /// Returns true if the cell's tags are exactly one marker.
    pub fn is_marker_cell(&self, cell: &Cell) -> bool {
        match cell.tags_value() {
            Some(Value::Array(tags)) => {
                tags.len() == 1 && tags[0].as_str().is_some_and(|tag| self.contains(tag))
            }
            _ => false,
        }
    }
}

/// Position of a [`CellAligner`] in its walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignState {
    /// Nothing consumed yet.
    Start,
    /// Pairing pre-execution cells with post-execution cells.
    WalkPre,
    /// All pre-execution cells consumed; checking leftover post cells.
    VerifyTrailing,
    /// Every post-execution cell is accounted for.
    Done,
    /// The walk stopped on an alignment error.
    Failed,
}

/// Correspondence established by a successful walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    /// `(pre index, post index)` pairs.
    pub pairs: Vec<(usize, usize)>,
    /// Post indices of skipped engine-inserted cells.
    pub skipped: Vec<usize>,
    /// Post indices whose spurious empty `tags` were removed.
    pub repaired: Vec<usize>,
}

/// Two-cursor walker over pre- and post-execution cells.
#[derive(Debug)]
pub struct CellAligner<'a> {
    pre: &'a [Cell],
    post: &'a mut [Cell],
    markers: &'a MarkerTags,
    pre_idx: usize,
    post_idx: usize,
    state: AlignState,
    alignment: Alignment,
}

impl<'a> CellAligner<'a> {
    /// Creates a walker positioned before the first cell of each sequence.
    pub fn new(pre: &'a [Cell], post: &'a mut [Cell], markers: &'a MarkerTags) -> Self {
        Self {
            pre,
            post,
            markers,
            pre_idx: 0,
            post_idx: 0,
            state: AlignState::Start,
            alignment: Alignment::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> AlignState {
        self.state
    }

    /// Current `(pre, post)` cursor positions.
    pub fn cursors(&self) -> (usize, usize) {
        (self.pre_idx, self.post_idx)
    }

    /// Correspondence recorded so far.
    pub fn alignment(&self) -> &Alignment {
        &self.alignment
    }

    /// Advances the post cursor past engine-inserted cells and returns how
    /// many were skipped.
    pub fn skip_injected(&mut self) -> usize {
        let start = self.post_idx;
        while let Some(cell) = self.post.get(self.post_idx) {
            if !self.markers.marks(cell) {
                break;
            }
            tracing::debug!(post_index = self.post_idx, "skipping engine-inserted cell");
            self.alignment.skipped.push(self.post_idx);
            self.post_idx += 1;
        }
        self.post_idx - start
    }

    /// Performs one transition of the walk.
    ///
    /// `Done` and `Failed` are absorbing. An error moves the walker to
    /// `Failed` and is returned once.
    pub fn step(&mut self) -> Result<AlignState, NbError> {
        let next = match self.state {
            AlignState::Start => Ok(AlignState::WalkPre),
            AlignState::WalkPre => self.walk_one(),
            AlignState::VerifyTrailing => self.verify_trailing(),
            AlignState::Done | AlignState::Failed => return Ok(self.state),
        };
        match next {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(err) => {
                self.state = AlignState::Failed;
                Err(err)
            }
        }
    }

    /// Runs the walk to completion.
    pub fn run(mut self) -> Result<Alignment, NbError> {
        while self.step()? != AlignState::Done {}
        Ok(self.alignment)
    }

    fn walk_one(&mut self) -> Result<AlignState, NbError> {
        let pre_cells = self.pre;
        let Some(pre) = pre_cells.get(self.pre_idx) else {
            return Ok(AlignState::VerifyTrailing);
        };
        if self.markers.is_marker_cell(pre) {
            let post = self.current_post()?;
            if pre.tags_value() != post.tags_value() {
                return Err(NbError::Alignment(
                    ErrorInfo::new(
                        "nbtidy.align.marker_tags",
                        format!(
                            "cell {}: tags {} != {}",
                            self.pre_idx,
                            render(pre.tags_value()),
                            render(post.tags_value())
                        ),
                    )
                    .with_context("pre_index", self.pre_idx.to_string())
                    .with_context("post_index", self.post_idx.to_string()),
                ));
            }
        } else {
            self.skip_injected();
            let (pre_idx, post_idx) = (self.pre_idx, self.post_idx);
            let post = self.current_post_mut()?;
            if !pre.source.same_text(&post.source) {
                let pre_source = format!("{:?}", pre.source.joined());
                let post_source = format!("{:?}", post.source.joined());
                return Err(NbError::Alignment(
                    ErrorInfo::new(
                        "nbtidy.align.source_mismatch",
                        format!("cell {pre_idx}: source {pre_source} != {post_source}"),
                    )
                    .with_context("pre_index", pre_idx.to_string())
                    .with_context("post_index", post_idx.to_string())
                    .with_context("pre_source", pre_source)
                    .with_context("post_source", post_source),
                ));
            }
            if !pre.has_tags_key() && post.has_empty_tags() {
                post.remove_tags();
                self.alignment.repaired.push(post_idx);
            }
        }
        self.alignment.pairs.push((self.pre_idx, self.post_idx));
        self.pre_idx += 1;
        self.post_idx += 1;
        Ok(AlignState::WalkPre)
    }

    fn verify_trailing(&mut self) -> Result<AlignState, NbError> {
        self.skip_injected();
        if self.post_idx == self.post.len() {
            return Ok(AlignState::Done);
        }
        let excess = &self.post[self.post_idx..];
        let body = serde_json::to_string(excess)
            .map_err(|err| serde_error("nbtidy.align.extra_cells", err))?;
        Err(NbError::Alignment(
            ErrorInfo::new(
                "nbtidy.align.extra_cells",
                format!(
                    "post-execution document has {} extra cell(s): {}",
                    excess.len(),
                    body
                ),
            )
            .with_context("extra", excess.len().to_string())
            .with_context("post_index", self.post_idx.to_string()),
        ))
    }

    fn current_post(&self) -> Result<&Cell, NbError> {
        self.post.get(self.post_idx).ok_or_else(|| self.exhausted())
    }

    fn current_post_mut(&mut self) -> Result<&mut Cell, NbError> {
        if self.post_idx >= self.post.len() {
            return Err(self.exhausted());
        }
        Ok(&mut self.post[self.post_idx])
    }

    fn exhausted(&self) -> NbError {
        NbError::Alignment(
            ErrorInfo::new(
                "nbtidy.align.post_exhausted",
                format!(
                    "cell {}: post-execution document ran out of cells ({} available)",
                    self.pre_idx,
                    self.post.len()
                ),
            )
            .with_context("pre_index", self.pre_idx.to_string()),
        )
    }
}

fn render(tags: Option<&Value>) -> String {
    match tags {
        Some(value) => value.to_string(),
        None => "None".to_string(),
    }
}

/// Aligns `post` against `pre`, removing spurious empty `tags` from `post`.
///
/// Repairs made before a failure are kept in `post`.
pub fn reconcile_cells(
    pre: &[Cell],
    post: &mut [Cell],
    markers: &MarkerTags,
) -> Result<Alignment, NbError> {
    CellAligner::new(pre, post, markers).run()
}
