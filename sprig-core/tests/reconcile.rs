//! End-to-end reconciliation tests over the in-memory host.

use std::sync::Arc;

use parking_lot::Mutex;
use sprig_core::reactive::{Flush, RawObject, Runtime, Value};
use sprig_core::render::{mount_reactive, HostOp, Key, MemoryHost, NodeId, Renderer, VNode};
use sprig_core::RenderError;

fn setup() -> (Renderer<MemoryHost>, NodeId) {
    let mut host = MemoryHost::new();
    let root = host.create_root("div");
    (Renderer::new(host), root)
}

fn list(keys: &[i64]) -> VNode<NodeId> {
    VNode::element("ul").with_children(
        keys.iter()
            .map(|k| VNode::element("li").with_key(*k).with_text(k.to_string()))
            .collect(),
    )
}

fn markup(keys: &[i64]) -> String {
    let items: String = keys.iter().map(|k| format!("<li>{k}</li>")).collect();
    format!("<ul>{items}</ul>")
}

fn count(ops: &[HostOp], pred: impl Fn(&HostOp) -> bool) -> usize {
    ops.iter().filter(|op| pred(op)).count()
}

/// Every transition between these orderings ends in the right markup and
/// reuses every surviving node.
#[test]
fn transitions_preserve_nodes() {
    let orderings: [&[i64]; 8] = [
        &[1, 2, 3, 4, 5],
        &[5, 4, 3, 2, 1],
        &[2, 3, 4, 5, 1],
        &[1, 6, 2, 7, 3],
        &[],
        &[3],
        &[9, 8, 1, 2, 3, 4],
        &[4, 1, 3, 2],
    ];

    for from in orderings {
        for to in orderings {
            let (mut renderer, root) = setup();
            let mut tree = None;
            renderer.render(&root, &mut tree, Some(list(from))).unwrap();
            renderer.ops_mut().take_ops();

            renderer.render(&root, &mut tree, Some(list(to))).unwrap();
            assert_eq!(renderer.ops().inner_markup(root), markup(to), "{from:?} -> {to:?}");

            let fresh = to.iter().filter(|k| !from.contains(k)).count();
            let created = count(renderer.ops().ops(), |op| {
                matches!(op, HostOp::CreateElement { .. })
            });
            assert_eq!(created, fresh, "{from:?} -> {to:?}");
        }
    }
}

/// Moving one node to the front costs one insert.
#[test]
fn single_move_is_one_insert() {
    let (mut renderer, root) = setup();
    let mut tree = None;
    renderer.render(&root, &mut tree, Some(list(&[1, 2, 3, 4, 5, 6]))).unwrap();
    renderer.ops_mut().take_ops();

    renderer.render(&root, &mut tree, Some(list(&[1, 5, 2, 3, 4, 6]))).unwrap();
    let ops = renderer.ops_mut().take_ops();
    assert_eq!(count(&ops, |op| matches!(op, HostOp::Insert { .. })), 1);
    assert_eq!(count(&ops, |op| matches!(op, HostOp::Remove { .. })), 0);
}

#[test]
fn duplicate_keys_are_rejected() {
    let (mut renderer, root) = setup();
    let mut tree = None;
    renderer.render(&root, &mut tree, Some(list(&[1, 2]))).unwrap();

    let err = renderer.render(&root, &mut tree, Some(list(&[1, 1]))).unwrap_err();
    assert_eq!(err, RenderError::DuplicateKey(Key::Int(1)));
}

#[test]
fn nested_keyed_lists() {
    let (mut renderer, root) = setup();
    let mut tree = None;
    fn view(groups: &[(&str, &[i64])]) -> VNode<NodeId> {
        VNode::element("section").with_children(
            groups
                .iter()
                .map(|&(name, keys)| {
                    VNode::element("div")
                        .with_key(name)
                        .with_children(vec![VNode::text(name), list(keys)])
                })
                .collect(),
        )
    }

    renderer
        .render(&root, &mut tree, Some(view(&[("a", &[1, 2]), ("b", &[3])])))
        .unwrap();
    renderer
        .render(&root, &mut tree, Some(view(&[("b", &[3, 4]), ("a", &[2, 1])])))
        .unwrap();

    assert_eq!(
        renderer.ops().inner_markup(root),
        format!(
            "<section><div>b{}</div><div>a{}</div></section>",
            markup(&[3, 4]),
            markup(&[2, 1])
        )
    );
}

/// A reactive list drives a mounted view through the job queue.
#[test]
fn reactive_list_drives_view() {
    let rt = Runtime::new();
    let mut host = MemoryHost::new();
    let root = host.create_root("div");
    let renderer = Arc::new(Mutex::new(Renderer::new(host)));

    let items = rt
        .reactive(&RawObject::list(vec![Value::from(1), Value::from(2), Value::from(3)]))
        .into_list()
        .unwrap();

    let reader = items.clone();
    let handle = mount_reactive(
        &rt,
        Arc::clone(&renderer),
        root,
        move || {
            let keys: Vec<i64> = reader
                .iter()
                .filter_map(|item| item.as_f64())
                .map(|n| n as i64)
                .collect();
            list(&keys)
        },
        Flush::Post,
    );
    assert_eq!(renderer.lock().ops().inner_markup(root), markup(&[1, 2, 3]));
    renderer.lock().ops_mut().take_ops();

    items.unshift(3).unwrap();
    items.pop().unwrap();
    rt.flush_jobs();

    assert_eq!(renderer.lock().ops().inner_markup(root), markup(&[3, 1, 2]));
    let ops = renderer.lock().ops_mut().take_ops();
    assert_eq!(count(&ops, |op| matches!(op, HostOp::CreateElement { .. })), 0);
    assert_eq!(handle.render_count(), 2);
}
