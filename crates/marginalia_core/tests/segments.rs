use marginalia_core::{
    partition, Coding, Document, Highlight, Paraphrase, ParaphraseDraft, Segment, ViewFilter,
    Workspace,
};
use proptest::prelude::*;
use uuid::Uuid;

#[test]
fn two_codings_split_sentence_into_four_segments() {
    let mut workspace = Workspace::new();
    let document = workspace.add_document(Document::new("The cat sat.")).unwrap();
    let a = workspace.taxonomy().add_code("A", "#ff0000", None).unwrap();
    let b = workspace.taxonomy().add_code("B", "#0000ff", None).unwrap();
    let mut intervals = workspace.intervals();
    let first = intervals.create_coding(a.id, document, 0, 3).unwrap();
    let second = intervals.create_coding(b.id, document, 4, 7).unwrap();

    let segments = intervals.segments(document, ViewFilter::Both).unwrap();
    let texts = segments.iter().map(|segment| segment.text).collect::<Vec<_>>();
    assert_eq!(texts, vec!["The", " ", "cat", " sat."]);
    let highlights = segments
        .iter()
        .map(|segment| segment.highlight())
        .collect::<Vec<_>>();
    assert_eq!(
        highlights,
        vec![
            Highlight::Coding(first.id),
            Highlight::None,
            Highlight::Coding(second.id),
            Highlight::None,
        ]
    );
}

#[test]
fn uncoded_document_is_one_plain_segment() {
    let mut workspace = Workspace::new();
    let document = workspace.add_document(Document::new("plain text")).unwrap();

    let segments = workspace.segments(document, ViewFilter::Both).unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "plain text");
    assert!(segments[0].is_plain());
}

#[test]
fn later_coding_at_same_start_becomes_active() {
    let mut workspace = Workspace::new();
    let document = workspace.add_document(Document::new("0123456789")).unwrap();
    let code = workspace.taxonomy().add_code("A", "#ff0000", None).unwrap();
    let mut intervals = workspace.intervals();
    let long = intervals.create_coding(code.id, document, 2, 9).unwrap();
    let short = intervals.create_coding(code.id, document, 2, 5).unwrap();

    let segments = intervals.segments(document, ViewFilter::Codes).unwrap();
    let spans = segments
        .iter()
        .map(|segment| (segment.start, segment.end, segment.active_coding))
        .collect::<Vec<_>>();
    assert_eq!(
        spans,
        vec![
            (0, 2, None),
            (2, 5, Some(short.id)),
            (5, 9, Some(long.id)),
            (9, 10, None),
        ]
    );
    assert_eq!(segments[1].stacked_codings(), vec![long.id, short.id]);
}

#[test]
fn paraphrase_view_ignores_codings() {
    let mut workspace = Workspace::new();
    let document = workspace.add_document(Document::new("abcdefgh")).unwrap();
    let code = workspace.taxonomy().add_code("A", "#ff0000", None).unwrap();
    let mut intervals = workspace.intervals();
    intervals.create_coding(code.id, document, 0, 8).unwrap();
    let paraphrase = intervals
        .create_paraphrase(ParaphraseDraft {
            document_id: document,
            start: 2,
            end: 4,
            paraphrase_text: "cd".to_string(),
            generalization: None,
            category_id: None,
        })
        .unwrap();

    let segments = workspace.segments(document, ViewFilter::Paraphrases).unwrap();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[1].highlight(), Highlight::Paraphrase(paraphrase.id));
    assert!(segments.iter().all(|segment| segment.active_coding.is_none()));
}

#[test]
fn unknown_document_is_an_orphan_reference() {
    let workspace = Workspace::new();
    assert!(workspace.segments(Uuid::new_v4(), ViewFilter::Both).is_err());
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Coding,
    Paraphrase,
}

fn intervals_strategy() -> impl Strategy<Value = (String, Vec<(Kind, usize, usize)>)> {
    "[a-zé ]{1,40}".prop_flat_map(|text| {
        let length = text.chars().count();
        let kind = prop_oneof![Just(Kind::Coding), Just(Kind::Paraphrase)];
        let interval = (kind, 0..length, 1..=length).prop_map(move |(kind, start, width)| {
            let end = (start + width).min(length);
            (kind, start, end.max(start + 1))
        });
        (Just(text), prop::collection::vec(interval, 0..10))
    })
}

fn filter_strategy() -> impl Strategy<Value = ViewFilter> {
    prop_oneof![
        Just(ViewFilter::Codes),
        Just(ViewFilter::Paraphrases),
        Just(ViewFilter::Both),
    ]
}

fn split_intervals(
    document: &Document,
    intervals: &[(Kind, usize, usize)],
) -> (Vec<Coding>, Vec<Paraphrase>) {
    let mut codings = Vec::new();
    let mut paraphrases = Vec::new();
    for (kind, start, end) in intervals {
        let quoted = document.slice(*start, *end).unwrap_or_default().to_string();
        match kind {
            Kind::Coding => codings.push(Coding {
                id: Uuid::new_v4(),
                code_id: Uuid::new_v4(),
                document_id: document.id,
                start: *start,
                end: *end,
                text: quoted,
            }),
            Kind::Paraphrase => paraphrases.push(Paraphrase {
                id: Uuid::new_v4(),
                document_id: document.id,
                start: *start,
                end: *end,
                original_text: quoted,
                paraphrase_text: "gist".to_string(),
                generalization: None,
                category_id: None,
            }),
        }
    }
    (codings, paraphrases)
}

/// Index of the most recently opened interval covering `segment`: latest
/// start first, then latest created.
fn latest_covering(spans: &[(usize, usize)], segment: &Segment<'_>) -> Option<usize> {
    spans
        .iter()
        .enumerate()
        .filter(|(_, (start, end))| *start <= segment.start && segment.end <= *end)
        .max_by_key(|(index, (start, _))| (*start, *index))
        .map(|(index, _)| index)
}

proptest! {
    /// Segments tile `[0, length)` and reproduce the text in order, for any
    /// mix of codings and paraphrases under any view.
    #[test]
    fn segments_partition_the_document(
        (text, intervals) in intervals_strategy(),
        filter in filter_strategy()
    ) {
        let document = Document::new(text.clone());
        let (codings, paraphrases) = split_intervals(&document, &intervals);

        let segments = partition(&document, &codings, &paraphrases, filter);
        prop_assert_eq!(segments.first().map(|segment| segment.start), Some(0));
        prop_assert_eq!(segments.last().map(|segment| segment.end), Some(document.char_len()));
        for pair in segments.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }
        for segment in &segments {
            prop_assert!(segment.start < segment.end);
            prop_assert_eq!(segment.text.chars().count(), segment.end - segment.start);
        }
        let rebuilt = segments.iter().map(|segment| segment.text).collect::<String>();
        prop_assert_eq!(rebuilt, text);
    }

    /// Each slot shows the latest-opened covering interval of the namespaces
    /// the view displays, and a paraphrase takes the primary highlight.
    #[test]
    fn active_state_matches_filter_and_precedence(
        (text, intervals) in intervals_strategy(),
        filter in filter_strategy()
    ) {
        let document = Document::new(text);
        let (codings, paraphrases) = split_intervals(&document, &intervals);
        let coding_spans = codings
            .iter()
            .map(|coding| (coding.start, coding.end))
            .collect::<Vec<_>>();
        let paraphrase_spans = paraphrases
            .iter()
            .map(|paraphrase| (paraphrase.start, paraphrase.end))
            .collect::<Vec<_>>();
        let shows_codings = !matches!(filter, ViewFilter::Paraphrases);
        let shows_paraphrases = !matches!(filter, ViewFilter::Codes);

        for segment in partition(&document, &codings, &paraphrases, filter) {
            let expected_coding = if shows_codings {
                latest_covering(&coding_spans, &segment).map(|index| codings[index].id)
            } else {
                None
            };
            let expected_paraphrase = if shows_paraphrases {
                latest_covering(&paraphrase_spans, &segment).map(|index| paraphrases[index].id)
            } else {
                None
            };
            prop_assert_eq!(segment.active_coding, expected_coding);
            prop_assert_eq!(segment.active_paraphrase, expected_paraphrase);

            let stacked = segment.stacked_codings();
            prop_assert_eq!(stacked.len(), segment.depth);
            prop_assert_eq!(stacked.last().copied(), segment.active_coding);

            let expected_highlight = match (segment.active_paraphrase, segment.active_coding) {
                (Some(paraphrase), _) => Highlight::Paraphrase(paraphrase),
                (None, Some(coding)) => Highlight::Coding(coding),
                (None, None) => Highlight::None,
            };
            prop_assert_eq!(segment.highlight(), expected_highlight);
        }
    }
}
