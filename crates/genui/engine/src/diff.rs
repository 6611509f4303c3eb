//! Minimal, deterministic patch sets between specs.
//!
//! Objects are diffed key by key; arrays and scalars that differ are
//! replaced whole. Emitted paths are therefore never prefixes of each
//! other, so the sorted order (path, then op) is also a valid apply order.

use genui_types::{pointer, Patch, Spec};
use serde_json::Value;

/// Patches that turn `from` into `to`.
pub fn diff_specs(from: &Spec, to: &Spec) -> Result<Vec<Patch>, serde_json::Error> {
    let before = serde_json::to_value(from)?;
    let after = serde_json::to_value(to)?;
    Ok(diff_values(&before, &after))
}

/// Patches that turn document `from` into document `to`.
pub fn diff_values(from: &Value, to: &Value) -> Vec<Patch> {
    let mut patches = Vec::new();
    walk(from, to, "", &mut patches);
    patches.sort_by(|a, b| a.path.cmp(&b.path).then(a.op.cmp(&b.op)));
    patches
}

fn walk(from: &Value, to: &Value, path: &str, out: &mut Vec<Patch>) {
    if from == to {
        return;
    }
    match (from, to) {
        (Value::Object(before), Value::Object(after)) => {
            for (key, old) in before {
                let child = pointer::push(path, key);
                match after.get(key) {
                    Some(new) => walk(old, new, &child, out),
                    None => out.push(Patch::remove(child)),
                }
            }
            for (key, new) in after {
                if !before.contains_key(key) {
                    out.push(Patch::add(pointer::push(path, key), new.clone()));
                }
            }
        }
        _ => out.push(Patch::replace(path, to.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genui_types::{apply_patches, Node, PatchOp};
    use serde_json::json;

    fn card(title: &str) -> Spec {
        let mut spec = Spec::with_root("card");
        spec.insert("card", Node::new("Card").with_children(["title"]));
        spec.insert("title", Node::new("CardTitle").with_prop("text", json!(title)));
        spec
    }

    #[test]
    fn empty_to_card_adds_everything() {
        let patches = diff_specs(&Spec::empty(), &card("Pro")).unwrap();
        let summary: Vec<(PatchOp, &str)> =
            patches.iter().map(|p| (p.op, p.path.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (PatchOp::Add, "/elements/card"),
                (PatchOp::Add, "/elements/title"),
                (PatchOp::Replace, "/root"),
            ]
        );
        assert_eq!(apply_patches(&Spec::empty(), &patches).unwrap(), card("Pro"));
    }

    #[test]
    fn prop_change_is_a_single_replace() {
        let patches = diff_specs(&card("Pro"), &card("Team")).unwrap();
        assert_eq!(
            patches,
            vec![Patch::replace("/elements/title/props/text", json!("Team"))]
        );
    }

    #[test]
    fn arrays_are_replaced_whole() {
        let mut next = card("Pro");
        next.insert("card", Node::new("Card").with_children(["title", "body"]));
        next.insert("body", Node::new("CardContent"));
        let patches = diff_specs(&card("Pro"), &next).unwrap();
        assert!(patches.contains(&Patch::replace(
            "/elements/card/children",
            json!(["title", "body"])
        )));
        assert_eq!(apply_patches(&card("Pro"), &patches).unwrap(), next);
    }

    #[test]
    fn removal_and_escaping() {
        let mut from = card("Pro");
        from.insert("odd/id~", Node::new("Badge"));
        let patches = diff_specs(&from, &card("Pro")).unwrap();
        assert_eq!(patches, vec![Patch::remove("/elements/odd~1id~0")]);
    }

    #[test]
    fn identical_specs_produce_nothing() {
        assert!(diff_specs(&card("Pro"), &card("Pro")).unwrap().is_empty());
    }

    #[test]
    fn non_object_roots_are_replaced() {
        assert_eq!(diff_values(&json!(1), &json!([1])), vec![Patch::replace("", json!([1]))]);
    }
}
