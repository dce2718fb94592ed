use proptest::prelude::*;
use reply_capture::{
    extract_products, sanitize, CaptureConfig, LineDecoder, Operation, Reconstructor,
    ReconstructionState,
};

const CONTENT: &str = "/message/content/parts/0";

fn body_from_appends(pieces: &[String]) -> Vec<u8> {
    let mut body = String::new();
    for piece in pieces {
        let payload = serde_json::json!({ "p": CONTENT, "o": "append", "v": piece });
        body.push_str(&format!("data: {payload}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

fn reconstruct_chunked(body: &[u8], cuts: &[usize]) -> ReconstructionState {
    let mut decoder = LineDecoder::new(1024 * 1024);
    let mut reconstructor = Reconstructor::new(CaptureConfig::default(), None);
    let mut start = 0;
    for &cut in cuts.iter().chain(std::iter::once(&body.len())) {
        for line in decoder.push(&body[start..cut]) {
            reconstructor.push_line(line);
        }
        start = cut;
    }
    if let Some(line) = decoder.finish() {
        reconstructor.push_line(line);
    }
    reconstructor.finish().state
}

fn residue_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("For ".to_string()),
            Just("\n".to_string()),
            Just("  ".to_string()),
            Just("\"".to_string()),
            Just("[".to_string()),
            Just("]".to_string()),
            Just("{\"selections\":[[\"turn0product1\",\"A\"]]}".to_string()),
            Just("product2\",\"Chair\"]".to_string()),
            Just("【turn0search1】".to_string()),
            Just("entity[\"product\",\"Lamp\"]".to_string()),
            "[a-zA-Z .,]{0,8}",
        ],
        0..24,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn sanitize_is_idempotent(text in residue_text()) {
        let once = sanitize(&text);
        prop_assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn sanitize_never_adds_text(text in residue_text()) {
        prop_assert!(sanitize(&text).chars().count() <= text.chars().count());
    }

    #[test]
    fn chunk_boundaries_do_not_change_result(
        pieces in prop::collection::vec("[a-z \u{e9}\u{4e16}\u{1f600}\\n\"]{1,6}", 1..12),
        raw_cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..16),
    ) {
        let body = body_from_appends(&pieces);
        let mut cuts: Vec<usize> = raw_cuts.iter().map(|idx| idx.index(body.len())).collect();
        cuts.sort_unstable();

        let whole = reconstruct_chunked(&body, &[]);
        let chunked = reconstruct_chunked(&body, &cuts);
        prop_assert_eq!(whole.accumulated_text(), pieces.concat());
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn truncated_stream_yields_prefix_of_full_reply(
        pieces in prop::collection::vec("[a-z \u{e9}\u{4e16}]{1,6}", 1..10),
        cut in any::<prop::sample::Index>(),
    ) {
        let body = body_from_appends(&pieces);
        let full = pieces.concat();
        let truncated = &body[..cut.index(body.len())];

        let state = reconstruct_chunked(truncated, &[]);
        prop_assert!(full.starts_with(state.accumulated_text()));
    }

    #[test]
    fn accumulated_text_never_shrinks(
        ops in prop::collection::vec(
            prop_oneof![
                "[a-z\u{e9}]{0,5}".prop_map(|v| (true, v)),
                "[a-z\u{e9}]{0,20}".prop_map(|v| (false, v)),
            ],
            1..20,
        ),
    ) {
        let config = CaptureConfig::default();
        let mut state = ReconstructionState::new();
        let mut previous = 0;
        for (is_append, value) in ops {
            let operation = if is_append {
                Operation::RawValue(value)
            } else {
                Operation::LegacySnapshot { parts: vec![value], message_id: None }
            };
            state.apply(operation, &config);
            let chars = state.accumulated_text().chars().count();
            prop_assert!(chars >= previous);
            previous = chars;
        }
    }

    #[test]
    fn product_indices_are_unique(
        refs in prop::collection::vec((0u32..5, "[A-Za-z ]{0,6}"), 0..12),
    ) {
        let text: String = refs
            .iter()
            .map(|(index, name)| format!("x product{index}\",\"{name}\"] "))
            .collect();
        if let Some(products) = extract_products(&text) {
            let mut indices: Vec<u32> = products.iter().map(|p| p.index).collect();
            let total = indices.len();
            indices.sort_unstable();
            indices.dedup();
            prop_assert_eq!(indices.len(), total);
        } else {
            prop_assert!(refs.is_empty());
        }
    }
}
