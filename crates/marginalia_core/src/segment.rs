//! Render-ready partition of document text under overlapping annotations.
//!
//! # Responsibility
//! - Convert the coding/paraphrase intervals of one document into an ordered,
//!   gap-free sequence of segments.
//! - Resolve display precedence between the coding and paraphrase slots.
//!
//! # Invariants
//! - Segments cover `[0, length)` exactly; concatenated `text` equals the
//!   document text.
//! - At one offset, intervals ending there are closed before intervals
//!   starting there are opened.
//! - Each slot shows the most recently opened interval that is still open.
//! - A paraphrase wins over a coding for the primary highlight.
//! - Partitioning k intervals over n chars costs O(k log k + n). Segments
//!   share one activation log instead of carrying their own coding stack.

use crate::model::annotation::{Coding, CodingId, Paraphrase, ParaphraseId};
use crate::model::document::{byte_offsets, Document};
use crate::repo::annotation_repo::AnnotationRepository;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which annotation namespaces a view displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewFilter {
    Codes,
    Paraphrases,
    #[default]
    Both,
}

impl ViewFilter {
    fn shows_codings(self) -> bool {
        matches!(self, Self::Codes | Self::Both)
    }

    fn shows_paraphrases(self) -> bool {
        matches!(self, Self::Paraphrases | Self::Both)
    }
}

/// Dominant highlight of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    None,
    Coding(CodingId),
    Paraphrase(ParaphraseId),
}

/// A displayed coding interval, listed in the order the sweep opened it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodingActivation {
    pub coding_id: CodingId,
    pub start: usize,
    pub end: usize,
}

/// One maximal run of text sharing the same active annotation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'d> {
    /// Char offset, inclusive.
    pub start: usize,
    /// Char offset, exclusive.
    pub end: usize,
    pub text: &'d str,
    pub active_coding: Option<CodingId>,
    pub active_paraphrase: Option<ParaphraseId>,
    /// Number of codings open over this segment.
    pub depth: usize,
    activations: Arc<[CodingActivation]>,
}

impl Segment<'_> {
    /// Every open coding, in activation order. The last one is
    /// `active_coding`. Built on request in O(k).
    pub fn stacked_codings(&self) -> Vec<CodingId> {
        self.activations
            .iter()
            .filter(|activation| activation.start <= self.start && self.end <= activation.end)
            .map(|activation| activation.coding_id)
            .collect()
    }

    /// Activation log of the whole partition. Every segment of one
    /// partition returns the same slice.
    pub fn activations(&self) -> &[CodingActivation] {
        &self.activations
    }

    pub fn highlight(&self) -> Highlight {
        match (self.active_paraphrase, self.active_coding) {
            (Some(paraphrase), _) => Highlight::Paraphrase(paraphrase),
            (None, Some(coding)) => Highlight::Coding(coding),
            (None, None) => Highlight::None,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self.highlight(), Highlight::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    // Declaration order is the processing order at equal offsets.
    End,
    Start,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Coding(CodingId),
    Paraphrase(ParaphraseId),
}

#[derive(Debug, Clone, Copy)]
struct Event {
    offset: usize,
    kind: EventKind,
    rank: usize,
    start: usize,
    end: usize,
    slot: Slot,
}

impl Event {
    // Starts are processed in (start, rank) order, so this key sorts open
    // intervals by activation.
    fn activation_key(&self) -> (usize, usize) {
        (self.start, self.rank)
    }
}

/// Open intervals of one slot, ordered by activation.
struct OpenSet<T> {
    open: BTreeMap<(usize, usize), T>,
}

impl<T: Copy> OpenSet<T> {
    fn new() -> Self {
        Self {
            open: BTreeMap::new(),
        }
    }

    fn apply(&mut self, event: &Event, id: T) {
        match event.kind {
            EventKind::Start => {
                self.open.insert(event.activation_key(), id);
            }
            EventKind::End => {
                self.open.remove(&event.activation_key());
            }
        }
    }

    fn top(&self) -> Option<T> {
        self.open.last_key_value().map(|(_, id)| *id)
    }

    fn len(&self) -> usize {
        self.open.len()
    }
}

/// Partitions `document` under the given intervals.
///
/// Intervals of other documents or with ranges outside the text are ignored.
/// `codings` and `paraphrases` are expected in creation order; among
/// intervals opening at the same offset the later-created one becomes active.
pub fn partition<'d>(
    document: &'d Document,
    codings: &[Coding],
    paraphrases: &[Paraphrase],
    filter: ViewFilter,
) -> Vec<Segment<'d>> {
    let length = document.char_len();
    if length == 0 {
        return Vec::new();
    }

    let mut events = Vec::new();
    let in_bounds = |start: usize, end: usize| start < end && end <= length;
    if filter.shows_codings() {
        for (rank, coding) in codings.iter().enumerate() {
            if coding.document_id == document.id && in_bounds(coding.start, coding.end) {
                push_interval(&mut events, coding.start, coding.end, rank, Slot::Coding(coding.id));
            }
        }
    }
    if filter.shows_paraphrases() {
        for (rank, paraphrase) in paraphrases.iter().enumerate() {
            if paraphrase.document_id == document.id && in_bounds(paraphrase.start, paraphrase.end) {
                push_interval(
                    &mut events,
                    paraphrase.start,
                    paraphrase.end,
                    rank,
                    Slot::Paraphrase(paraphrase.id),
                );
            }
        }
    }
    events.sort_by_key(|event| (event.offset, event.kind, event.rank));

    let mut boundaries = Vec::with_capacity(events.len() + 2);
    boundaries.push(0);
    boundaries.extend(events.iter().map(|event| event.offset));
    boundaries.push(length);
    boundaries.dedup();

    // Boundaries are validated against `length`, so the lookup cannot miss.
    let Some(bytes) = byte_offsets(&document.text, &boundaries) else {
        return Vec::new();
    };

    let activations = events
        .iter()
        .filter_map(|event| match (event.kind, event.slot) {
            (EventKind::Start, Slot::Coding(coding_id)) => Some(CodingActivation {
                coding_id,
                start: event.start,
                end: event.end,
            }),
            _ => None,
        })
        .collect::<Arc<[CodingActivation]>>();

    let mut open_codings = OpenSet::new();
    let mut open_paraphrases = OpenSet::new();
    let mut pending = events.iter().peekable();
    let mut segments = Vec::with_capacity(boundaries.len().saturating_sub(1));

    for (index, window) in boundaries.windows(2).enumerate() {
        let (start, end) = (window[0], window[1]);
        while let Some(event) = pending.next_if(|event| event.offset == start) {
            match event.slot {
                Slot::Coding(id) => open_codings.apply(event, id),
                Slot::Paraphrase(id) => open_paraphrases.apply(event, id),
            }
        }
        segments.push(Segment {
            start,
            end,
            text: &document.text[bytes[index]..bytes[index + 1]],
            active_coding: open_codings.top(),
            active_paraphrase: open_paraphrases.top(),
            depth: open_codings.len(),
            activations: Arc::clone(&activations),
        });
    }
    segments
}

/// Loads one document's intervals from `annotations` and partitions it.
pub fn render_segments<'d, A: AnnotationRepository + ?Sized>(
    document: &'d Document,
    annotations: &A,
    filter: ViewFilter,
) -> Vec<Segment<'d>> {
    let mut codings = annotations.list_codings();
    codings.retain(|coding| coding.document_id == document.id);
    let mut paraphrases = annotations.list_paraphrases();
    paraphrases.retain(|paraphrase| paraphrase.document_id == document.id);
    partition(document, &codings, &paraphrases, filter)
}

fn push_interval(events: &mut Vec<Event>, start: usize, end: usize, rank: usize, slot: Slot) {
    let event = |offset, kind| Event {
        offset,
        kind,
        rank,
        start,
        end,
        slot,
    };
    events.push(event(start, EventKind::Start));
    events.push(event(end, EventKind::End));
}
