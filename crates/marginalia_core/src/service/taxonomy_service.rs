//! Code taxonomy use-case service.
//!
//! # Responsibility
//! - Validate forest invariants above the repository layer.
//! - Provide create, rename, recolor, reparent, drag-drop and delete flows.
//!
//! # Invariants
//! - Parent codes must exist when provided.
//! - Reparenting never creates a cycle; a rejected move leaves the taxonomy
//!   untouched.
//! - Deletion follows exactly one named `CodeDeletePolicy`.

use crate::model::annotation::CodingId;
use crate::model::code::{Code, CodeId, CodeValidationError};
use crate::repo::annotation_repo::{AnnotationRepoError, AnnotationRepository};
use crate::repo::code_repo::{CodeRepoError, CodeRepository};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Child and coding handling when a code is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CodeDeletePolicy {
    /// Refuse while the code has children or codings.
    #[default]
    Reject,
    /// Delete the code, its whole subtree, and every coding of those codes.
    Cascade,
    /// Move direct children to the deleted code's parent; delete the code's
    /// own codings.
    PromoteChildren,
}

/// Drop zone inside a target code's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    /// Top quartile: sibling placed before the target.
    Before,
    /// Middle half: child of the target.
    Inside,
    /// Bottom quartile: sibling placed after the target.
    After,
}

/// Classifies a relative vertical pointer position (`0.0` = row top).
///
/// Values outside `[0, 1]` (and NaN) are clamped.
pub fn classify_drop(relative_y: f64) -> DropPosition {
    let y = if relative_y.is_nan() {
        0.5
    } else {
        relative_y.clamp(0.0, 1.0)
    };
    if y < 0.25 {
        DropPosition::Before
    } else if y > 0.75 {
        DropPosition::After
    } else {
        DropPosition::Inside
    }
}

/// Summary of a successful delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeDeletion {
    /// Removed codes, leaves first.
    pub removed_codes: Vec<CodeId>,
    pub removed_codings: Vec<CodingId>,
    /// Children re-attached to the deleted code's parent.
    pub promoted_codes: Vec<CodeId>,
}

/// Errors from taxonomy service operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    /// Name is blank after trim.
    InvalidName,
    /// Color is not a hex color.
    InvalidColor(String),
    /// Target code does not exist.
    CodeNotFound(CodeId),
    /// Parent code does not exist.
    ParentNotFound(CodeId),
    /// Reparent would make a code its own ancestor.
    CycleDetected { code_id: CodeId, parent_id: CodeId },
    /// `Reject` policy: code still has children.
    CodeHasChildren(CodeId),
    /// `Reject` policy: code is still referenced by codings.
    CodeInUse { code_id: CodeId, codings: usize },
    /// Code repository failure.
    Repo(CodeRepoError),
    /// Annotation repository failure.
    Annotations(AnnotationRepoError),
}

impl Display for TaxonomyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "code name must not be blank"),
            Self::InvalidColor(value) => write!(f, "invalid code color `{value}`"),
            Self::CodeNotFound(id) => write!(f, "code not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent code not found: {id}"),
            Self::CycleDetected { code_id, parent_id } => write!(
                f,
                "reparent would create cycle: code {code_id} under parent {parent_id}"
            ),
            Self::CodeHasChildren(id) => write!(f, "code has children: {id}"),
            Self::CodeInUse { code_id, codings } => {
                write!(f, "code {code_id} is referenced by {codings} coding(s)")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::Annotations(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaxonomyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Annotations(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodeValidationError> for TaxonomyError {
    fn from(value: CodeValidationError) -> Self {
        match value {
            CodeValidationError::BlankName => Self::InvalidName,
            CodeValidationError::InvalidColor(color) => Self::InvalidColor(color),
        }
    }
}

impl From<CodeRepoError> for TaxonomyError {
    fn from(value: CodeRepoError) -> Self {
        match value {
            CodeRepoError::Validation(err) => err.into(),
            CodeRepoError::NotFound(id) => Self::CodeNotFound(id),
            CodeRepoError::ParentNotFound(id) => Self::ParentNotFound(id),
            CodeRepoError::HasChildren(id) => Self::CodeHasChildren(id),
            other => Self::Repo(other),
        }
    }
}

impl From<AnnotationRepoError> for TaxonomyError {
    fn from(value: AnnotationRepoError) -> Self {
        Self::Annotations(value)
    }
}

/// Taxonomy service facade over code and annotation repositories.
pub struct TaxonomyService<'a, C: CodeRepository, A: AnnotationRepository> {
    codes: &'a mut C,
    annotations: &'a mut A,
}

impl<'a, C: CodeRepository, A: AnnotationRepository> TaxonomyService<'a, C, A> {
    /// Creates service from repository implementations.
    pub fn new(codes: &'a mut C, annotations: &'a mut A) -> Self {
        Self { codes, annotations }
    }

    /// Creates one code under optional parent.
    pub fn add_code(
        &mut self,
        name: &str,
        color: &str,
        parent_id: Option<CodeId>,
    ) -> Result<Code, TaxonomyError> {
        let code = Code::new(name, color, parent_id)?;
        if let Some(parent_id) = parent_id {
            self.ensure_parent_exists(parent_id)?;
        }
        let code = self.codes.insert_code(code)?;
        debug!(
            "event=code_add module=taxonomy status=ok code_id={} parent_id={:?}",
            code.id, code.parent_id
        );
        Ok(code)
    }

    pub fn get_code(&self, code_id: CodeId) -> Option<Code> {
        self.codes.get_code(code_id)
    }

    /// Lists every code in insertion order.
    pub fn list_codes(&self) -> Vec<Code> {
        self.codes.list_codes()
    }

    /// Lists child codes under optional parent.
    pub fn list_children(&self, parent_id: Option<CodeId>) -> Result<Vec<Code>, TaxonomyError> {
        if let Some(parent_id) = parent_id {
            self.ensure_parent_exists(parent_id)?;
        }
        Ok(self.codes.list_children(parent_id))
    }

    pub fn rename_code(&mut self, code_id: CodeId, name: &str) -> Result<Code, TaxonomyError> {
        Ok(self.codes.rename_code(code_id, name)?)
    }

    pub fn recolor_code(&mut self, code_id: CodeId, color: &str) -> Result<Code, TaxonomyError> {
        Ok(self.codes.recolor_code(code_id, color)?)
    }

    /// Rewrites one code's parent pointer; the code is appended to the new
    /// sibling list.
    pub fn reparent(
        &mut self,
        code_id: CodeId,
        new_parent_id: Option<CodeId>,
    ) -> Result<(), TaxonomyError> {
        self.move_code(code_id, new_parent_id, None)
    }

    /// Moves one code under optional parent and optional sibling index.
    pub fn move_code(
        &mut self,
        code_id: CodeId,
        new_parent_id: Option<CodeId>,
        target_order: Option<usize>,
    ) -> Result<(), TaxonomyError> {
        self.ensure_code_exists(code_id)?;

        if let Some(parent_id) = new_parent_id {
            if parent_id == code_id {
                return Err(self.reject_cycle(code_id, parent_id));
            }
            self.ensure_parent_exists(parent_id)?;
            if self.would_create_cycle(code_id, parent_id)? {
                return Err(self.reject_cycle(code_id, parent_id));
            }
        }

        self.codes.move_code(code_id, new_parent_id, target_order)?;
        info!(
            "event=code_reparent module=taxonomy status=ok code_id={} parent_id={:?} order={:?}",
            code_id, new_parent_id, target_order
        );
        Ok(())
    }

    /// Applies a drag-and-drop gesture of `dragged_id` onto `target_id`.
    ///
    /// Returns the classified drop position.
    pub fn drop_code(
        &mut self,
        dragged_id: CodeId,
        target_id: CodeId,
        relative_y: f64,
    ) -> Result<DropPosition, TaxonomyError> {
        self.ensure_code_exists(dragged_id)?;
        let target = self
            .codes
            .get_code(target_id)
            .ok_or(TaxonomyError::CodeNotFound(target_id))?;

        let position = classify_drop(relative_y);
        match position {
            DropPosition::Inside => self.move_code(dragged_id, Some(target_id), None)?,
            DropPosition::Before | DropPosition::After => {
                if dragged_id == target_id {
                    return Ok(position);
                }
                let siblings = self
                    .codes
                    .list_children(target.parent_id)
                    .into_iter()
                    .map(|code| code.id)
                    .filter(|id| *id != dragged_id)
                    .collect::<Vec<_>>();
                let target_index = siblings
                    .iter()
                    .position(|id| *id == target_id)
                    .unwrap_or(siblings.len());
                let order = match position {
                    DropPosition::Before => target_index,
                    _ => target_index + 1,
                };
                self.move_code(dragged_id, target.parent_id, Some(order))?;
            }
        }
        Ok(position)
    }

    /// Deletes one code according to `policy`.
    pub fn delete_code(
        &mut self,
        code_id: CodeId,
        policy: CodeDeletePolicy,
    ) -> Result<CodeDeletion, TaxonomyError> {
        let code = self
            .codes
            .get_code(code_id)
            .ok_or(TaxonomyError::CodeNotFound(code_id))?;

        let deletion = match policy {
            CodeDeletePolicy::Reject => {
                if !self.codes.list_children(Some(code_id)).is_empty() {
                    warn!(
                        "event=code_delete module=taxonomy status=rejected reason=has_children code_id={}",
                        code_id
                    );
                    return Err(TaxonomyError::CodeHasChildren(code_id));
                }
                let codings = self.annotations.codings_for_code(code_id).len();
                if codings > 0 {
                    warn!(
                        "event=code_delete module=taxonomy status=rejected reason=in_use code_id={} codings={}",
                        code_id, codings
                    );
                    return Err(TaxonomyError::CodeInUse { code_id, codings });
                }
                self.codes.remove_code(code_id)?;
                CodeDeletion {
                    removed_codes: vec![code_id],
                    ..CodeDeletion::default()
                }
            }
            CodeDeletePolicy::Cascade => {
                let mut subtree = self.descendants(code_id)?;
                subtree.reverse();
                subtree.push(code_id);
                let removed_codings = self
                    .annotations
                    .remove_codings_for_codes(&subtree.iter().copied().collect::<HashSet<_>>());
                for id in &subtree {
                    self.codes.remove_code(*id)?;
                }
                CodeDeletion {
                    removed_codes: subtree,
                    removed_codings,
                    promoted_codes: Vec::new(),
                }
            }
            CodeDeletePolicy::PromoteChildren => {
                let children = self
                    .codes
                    .list_children(Some(code_id))
                    .into_iter()
                    .map(|child| child.id)
                    .collect::<Vec<_>>();
                for child_id in &children {
                    self.codes.move_code(*child_id, code.parent_id, None)?;
                }
                let removed_codings = self
                    .annotations
                    .remove_codings_for_codes(&HashSet::from([code_id]));
                self.codes.remove_code(code_id)?;
                CodeDeletion {
                    removed_codes: vec![code_id],
                    removed_codings,
                    promoted_codes: children,
                }
            }
        };

        info!(
            "event=code_delete module=taxonomy status=ok policy={:?} code_id={} removed_codes={} removed_codings={}",
            policy,
            code_id,
            deletion.removed_codes.len(),
            deletion.removed_codings.len()
        );
        Ok(deletion)
    }

    /// Ancestors from direct parent up to the root.
    pub fn ancestors(&self, code_id: CodeId) -> Result<Vec<CodeId>, TaxonomyError> {
        let code = self
            .codes
            .get_code(code_id)
            .ok_or(TaxonomyError::CodeNotFound(code_id))?;
        let mut chain = Vec::new();
        let mut visited = HashSet::from([code_id]);
        let mut cursor = code.parent_id;
        while let Some(current) = cursor {
            if !visited.insert(current) {
                break;
            }
            chain.push(current);
            cursor = self.codes.get_code(current).and_then(|node| node.parent_id);
        }
        Ok(chain)
    }

    /// Number of ancestors; roots have depth 0.
    pub fn depth(&self, code_id: CodeId) -> Result<usize, TaxonomyError> {
        Ok(self.ancestors(code_id)?.len())
    }

    /// Every descendant in breadth-first, sibling-ordered sequence.
    pub fn descendants(&self, code_id: CodeId) -> Result<Vec<CodeId>, TaxonomyError> {
        self.ensure_code_exists(code_id)?;
        let mut result = Vec::new();
        let mut frontier = vec![code_id];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for parent in frontier {
                for child in self.codes.list_children(Some(parent)) {
                    result.push(child.id);
                    next.push(child.id);
                }
            }
            frontier = next;
        }
        Ok(result)
    }

    fn ensure_code_exists(&self, code_id: CodeId) -> Result<(), TaxonomyError> {
        self.codes
            .get_code(code_id)
            .map(|_| ())
            .ok_or(TaxonomyError::CodeNotFound(code_id))
    }

    fn ensure_parent_exists(&self, parent_id: CodeId) -> Result<(), TaxonomyError> {
        self.codes
            .get_code(parent_id)
            .map(|_| ())
            .ok_or(TaxonomyError::ParentNotFound(parent_id))
    }

    fn reject_cycle(&self, code_id: CodeId, parent_id: CodeId) -> TaxonomyError {
        warn!(
            "event=code_reparent module=taxonomy status=rejected reason=cycle code_id={} parent_id={}",
            code_id, parent_id
        );
        TaxonomyError::CycleDetected { code_id, parent_id }
    }

    fn would_create_cycle(
        &self,
        code_id: CodeId,
        candidate_parent_id: CodeId,
    ) -> Result<bool, TaxonomyError> {
        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent_id);
        while let Some(current) = cursor {
            if current == code_id {
                return Ok(true);
            }
            if !visited.insert(current) {
                return Ok(true);
            }

            let node = self
                .codes
                .get_code(current)
                .ok_or(TaxonomyError::ParentNotFound(current))?;
            cursor = node.parent_id;
        }
        Ok(false)
    }
}
