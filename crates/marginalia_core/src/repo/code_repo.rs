//! Code taxonomy repository contracts and in-memory arena implementation.
//!
//! # Responsibility
//! - Store codes in an id-indexed arena with an explicit parent field.
//! - Maintain the ordered children index in the same call as every parent
//!   pointer change.
//!
//! # Invariants
//! - Child listing is deterministic: `sort_order ASC`.
//! - `sort_order` is dense (`0..n`) within each sibling list.
//! - A code with children cannot be removed at this layer.
//! - Cycle prevention is a service-level concern; the repository only
//!   checks that referenced parents exist.

use crate::model::code::{normalize_code_name, normalize_color, Code, CodeId, CodeValidationError};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by code repository operations.
pub type CodeRepoResult<T> = Result<T, CodeRepoError>;

/// Errors from code repository operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeRepoError {
    /// Name or color failed field validation.
    Validation(CodeValidationError),
    /// Target code does not exist.
    NotFound(CodeId),
    /// Referenced parent code does not exist.
    ParentNotFound(CodeId),
    /// Id is already taken by another code.
    DuplicateId(CodeId),
    /// Code still has child codes.
    HasChildren(CodeId),
}

impl Display for CodeRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "code not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent code not found: {id}"),
            Self::DuplicateId(id) => write!(f, "code id already exists: {id}"),
            Self::HasChildren(id) => write!(f, "code still has children: {id}"),
        }
    }
}

impl Error for CodeRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodeValidationError> for CodeRepoError {
    fn from(value: CodeValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Repository interface for the code forest.
pub trait CodeRepository {
    /// Inserts one code at the end of its parent's child list.
    fn insert_code(&mut self, code: Code) -> CodeRepoResult<Code>;
    /// Loads one code by id.
    fn get_code(&self, id: CodeId) -> Option<Code>;
    /// Lists every code in insertion order.
    fn list_codes(&self) -> Vec<Code>;
    /// Lists children under one parent (`None` = roots) by sibling order.
    fn list_children(&self, parent_id: Option<CodeId>) -> Vec<Code>;
    /// Renames one code.
    fn rename_code(&mut self, id: CodeId, name: &str) -> CodeRepoResult<Code>;
    /// Recolors one code.
    fn recolor_code(&mut self, id: CodeId, color: &str) -> CodeRepoResult<Code>;
    /// Moves one code under another parent at an optional sibling index.
    ///
    /// `target_order` indexes the destination siblings excluding the moved
    /// code and is clamped; `None` appends.
    fn move_code(
        &mut self,
        id: CodeId,
        new_parent_id: Option<CodeId>,
        target_order: Option<usize>,
    ) -> CodeRepoResult<()>;
    /// Removes one leaf code.
    fn remove_code(&mut self, id: CodeId) -> CodeRepoResult<Code>;
    /// Insertion sequence of a code, used as a stable analytics tie-break.
    fn insertion_rank(&self, id: CodeId) -> Option<u64>;
    /// Monotonic counter bumped by every successful mutation.
    fn revision(&self) -> u64;
}

#[derive(Debug, Clone)]
struct CodeSlot {
    code: Code,
    seq: u64,
}

/// Arena-backed code repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCodeRepository {
    nodes: HashMap<CodeId, CodeSlot>,
    children: HashMap<Option<CodeId>, Vec<CodeId>>,
    next_seq: u64,
    revision: u64,
}

impl InMemoryCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: CodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Child ids under one parent, by sibling order.
    pub fn child_ids(&self, parent_id: Option<CodeId>) -> &[CodeId] {
        self.children
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn slot_mut(&mut self, id: CodeId) -> CodeRepoResult<&mut CodeSlot> {
        self.nodes.get_mut(&id).ok_or(CodeRepoError::NotFound(id))
    }

    fn reindex(&mut self, parent_id: Option<CodeId>) {
        let Some(ids) = self.children.get(&parent_id) else {
            return;
        };
        for (index, id) in ids.iter().enumerate() {
            if let Some(slot) = self.nodes.get_mut(id) {
                slot.code.sort_order = index as i64;
            }
        }
    }

    fn detach(&mut self, id: CodeId, parent_id: Option<CodeId>) {
        if let Some(siblings) = self.children.get_mut(&parent_id) {
            siblings.retain(|sibling| *sibling != id);
            if siblings.is_empty() {
                self.children.remove(&parent_id);
            }
        }
        self.reindex(parent_id);
    }
}

impl CodeRepository for InMemoryCodeRepository {
    fn insert_code(&mut self, mut code: Code) -> CodeRepoResult<Code> {
        code.validate()?;
        if self.nodes.contains_key(&code.id) {
            return Err(CodeRepoError::DuplicateId(code.id));
        }
        if let Some(parent_id) = code.parent_id {
            if !self.nodes.contains_key(&parent_id) {
                return Err(CodeRepoError::ParentNotFound(parent_id));
            }
        }

        let siblings = self.children.entry(code.parent_id).or_default();
        code.sort_order = siblings.len() as i64;
        siblings.push(code.id);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.nodes.insert(
            code.id,
            CodeSlot {
                code: code.clone(),
                seq,
            },
        );
        self.revision += 1;
        Ok(code)
    }

    fn get_code(&self, id: CodeId) -> Option<Code> {
        self.nodes.get(&id).map(|slot| slot.code.clone())
    }

    fn list_codes(&self) -> Vec<Code> {
        let mut slots = self.nodes.values().collect::<Vec<_>>();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| slot.code.clone()).collect()
    }

    fn list_children(&self, parent_id: Option<CodeId>) -> Vec<Code> {
        self.child_ids(parent_id)
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|slot| slot.code.clone())
            .collect()
    }

    fn rename_code(&mut self, id: CodeId, name: &str) -> CodeRepoResult<Code> {
        let normalized = normalize_code_name(name)?;
        let slot = self.slot_mut(id)?;
        slot.code.name = normalized;
        let code = slot.code.clone();
        self.revision += 1;
        Ok(code)
    }

    fn recolor_code(&mut self, id: CodeId, color: &str) -> CodeRepoResult<Code> {
        let normalized = normalize_color(color)?;
        let slot = self.slot_mut(id)?;
        slot.code.color = normalized;
        let code = slot.code.clone();
        self.revision += 1;
        Ok(code)
    }

    fn move_code(
        &mut self,
        id: CodeId,
        new_parent_id: Option<CodeId>,
        target_order: Option<usize>,
    ) -> CodeRepoResult<()> {
        let old_parent_id = self
            .nodes
            .get(&id)
            .ok_or(CodeRepoError::NotFound(id))?
            .code
            .parent_id;
        if let Some(parent_id) = new_parent_id {
            if !self.nodes.contains_key(&parent_id) {
                return Err(CodeRepoError::ParentNotFound(parent_id));
            }
        }

        self.detach(id, old_parent_id);
        let siblings = self.children.entry(new_parent_id).or_default();
        let index = target_order
            .unwrap_or(siblings.len())
            .min(siblings.len());
        siblings.insert(index, id);
        self.slot_mut(id)?.code.parent_id = new_parent_id;
        self.reindex(new_parent_id);
        self.revision += 1;
        Ok(())
    }

    fn remove_code(&mut self, id: CodeId) -> CodeRepoResult<Code> {
        let parent_id = self
            .nodes
            .get(&id)
            .ok_or(CodeRepoError::NotFound(id))?
            .code
            .parent_id;
        if !self.child_ids(Some(id)).is_empty() {
            return Err(CodeRepoError::HasChildren(id));
        }

        self.detach(id, parent_id);
        let slot = self.nodes.remove(&id).ok_or(CodeRepoError::NotFound(id))?;
        self.revision += 1;
        Ok(slot.code)
    }

    fn insertion_rank(&self, id: CodeId) -> Option<u64> {
        self.nodes.get(&id).map(|slot| slot.seq)
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}
