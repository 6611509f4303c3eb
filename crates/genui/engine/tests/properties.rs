//! Property tests for the diff engine and the incremental extractor.

use genui_engine::{diff_specs, extract, ObjectExtractor};
use genui_types::{apply_patches, Node, Spec};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_id() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("a"),
        Just("b"),
        Just("c"),
        Just("d"),
        Just("e/f"),
        Just("g~h"),
    ]
    .prop_map(String::from)
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-z ]{0,8}".prop_map(Value::from),
        (-100i64..100).prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

fn arb_props() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        prop_oneof![Just("text"), Just("label"), Just("size"), Just("tags")],
        prop_oneof![
            arb_scalar(),
            prop::collection::vec(arb_scalar(), 0..3).prop_map(Value::from),
        ],
        0..4,
    )
    .prop_map(|entries| {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<Map<String, Value>>(),
        )
    })
}

fn arb_node() -> impl Strategy<Value = Node> {
    (
        prop_oneof![Just("Card"), Just("Text"), Just("Button"), Just("Stack")],
        arb_props(),
        prop::collection::vec(arb_id(), 0..3),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(node_type, props, children, visible)| {
            let mut node = Node::new(node_type).with_children(children);
            node.props = props;
            node.visible = visible.map(Value::from);
            node
        })
}

fn arb_spec() -> impl Strategy<Value = Spec> {
    (
        prop_oneof![Just(String::new()), arb_id()],
        prop::collection::btree_map(arb_id(), arb_node(), 0..5),
        prop::option::of(prop::collection::btree_map("[a-z]{1,4}", arb_scalar(), 0..3)),
    )
        .prop_map(|(root, elements, state)| Spec {
            root,
            elements,
            state: state.map(|s| s.into_iter().collect()),
        })
}

fn objects_stream() -> impl Strategy<Value = (String, Vec<Value>)> {
    prop::collection::vec(
        (
            "[a-z .`]{0,6}",
            prop::collection::btree_map("[a-z]{1,3}", "[a-z{}\\[\\]\" ]{0,6}", 0..3),
        ),
        0..4,
    )
    .prop_map(|parts| {
        let mut text = String::new();
        let mut objects = Vec::new();
        for (noise, fields) in parts {
            let object = json!(fields);
            text.push_str(&noise);
            text.push_str(&object.to_string());
            objects.push(object);
        }
        (text, objects)
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Applying diff(a, b) to a reproduces b.
    #[test]
    fn diff_round_trips(a in arb_spec(), b in arb_spec()) {
        let patches = diff_specs(&a, &b).unwrap();
        prop_assert_eq!(apply_patches(&a, &patches).unwrap(), b);
    }

    /// Patch order is sorted by (path, op) and stable across runs.
    #[test]
    fn diff_is_sorted_and_deterministic(a in arb_spec(), b in arb_spec()) {
        let first = diff_specs(&a, &b).unwrap();
        let second = diff_specs(&a.clone(), &b.clone()).unwrap();
        prop_assert_eq!(&first, &second);
        for pair in first.windows(2) {
            prop_assert!((pair[0].path.as_str(), pair[0].op) <= (pair[1].path.as_str(), pair[1].op));
        }
    }

    /// Feeding a buffer whole or split at arbitrary points yields the same objects.
    #[test]
    fn extraction_is_split_invariant(
        (text, expected) in objects_stream(),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let whole = extract(&text);
        prop_assert_eq!(&whole.objects(), &expected);

        let boundaries: Vec<usize> = (0..=text.len())
            .filter(|i| text.is_char_boundary(*i))
            .collect();
        let mut points: Vec<usize> = cuts.iter().map(|c| boundaries[c.index(boundaries.len())]).collect();
        points.sort_unstable();
        points.dedup();

        let mut extractor = ObjectExtractor::new();
        let mut streamed = Vec::new();
        let mut last = 0;
        for point in points.into_iter().chain(std::iter::once(text.len())) {
            if point < last {
                continue;
            }
            streamed.extend(extractor.push(&text[last..point]).objects());
            last = point;
        }
        prop_assert_eq!(streamed, expected);
        prop_assert_eq!(extractor.emitted(), whole.objects().len());
    }
}

#[test]
fn pricing_card_tree_survives_chunked_streaming() {
    let tree = json!({
        "type": "Card",
        "children": [
            {"type": "CardHeader", "children": [{"type": "CardTitle", "props": {"text": "Pro"}}]},
            {"type": "CardContent", "children": ["$29 / month"]}
        ]
    });
    let text = format!("Here you go:\n```json\n{}\n```", tree);
    let mut extractor = ObjectExtractor::new();
    let mut found = Vec::new();
    for chunk in text.as_bytes().chunks(7) {
        found.extend(extractor.push(std::str::from_utf8(chunk).unwrap()).objects());
    }
    assert_eq!(found, vec![tree]);
}
