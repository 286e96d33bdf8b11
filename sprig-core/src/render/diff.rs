//! Keyed Reconciliation
//!
//! [`reconcile`] turns the realized children of a container from an old
//! sibling list into a new one, calling only the four [`Host`] operations.
//!
//! # Algorithm
//!
//! 1. Patch the common prefix: pairs with equal keys from the front.
//! 2. Patch the common suffix: pairs with equal keys from the back.
//! 3. If only new nodes remain, mount them before the first suffix node.
//! 4. If only old nodes remain, unmount them.
//! 5. Otherwise match the remaining old nodes to new ones by key. Matched
//!    pairs are patched, unmatched old nodes unmounted. `sources[i]` records
//!    which old node the i-th remaining new node came from.
//! 6. Walk the remaining new nodes backward. Unmatched ones are mounted.
//!    If step 5 saw the old positions go backwards, matched nodes that are
//!    not in the longest increasing subsequence of `sources` are moved. Each
//!    node is placed before its already-placed right neighbour.
//!
//! # Keys
//!
//! Keys must be unique among siblings; duplicates are rejected before any
//! operation runs. Keyless nodes match each other during prefix and suffix
//! trimming. If any keyless node is left in the unmatched middle, the whole
//! middle is replaced: every old node unmounted, every new node mounted.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::host::Host;
use super::lis::longest_increasing_subsequence;
use super::vnode::{Key, VNode};
use crate::error::RenderError;

#[derive(Debug, Default)]
struct Summary {
    patched: usize,
    mounted: usize,
    unmounted: usize,
    moved: usize,
}

/// Reconcile `old` into `new` inside `container`.
///
/// `anchor` is the node following this sibling list in the container, if
/// any; nodes appended at the end of the list go before it. On success every
/// node in `new` is realized and in order.
pub fn reconcile<H: Host>(
    host: &mut H,
    old: &[VNode<H::Node>],
    new: &mut [VNode<H::Node>],
    container: &H::Node,
    anchor: Option<&H::Node>,
) -> Result<(), RenderError> {
    ensure_unique_keys(old)?;
    ensure_unique_keys(new)?;

    let mut summary = Summary::default();

    // 1. Common prefix.
    let mut start = 0;
    while start < old.len() && start < new.len() && old[start].key == new[start].key {
        let after = anchor_at(old, start + 1, anchor);
        host.patch(&old[start], &mut new[start], container, after.as_ref())?;
        summary.patched += 1;
        start += 1;
    }

    // 2. Common suffix. Ends are exclusive.
    let mut old_end = old.len();
    let mut new_end = new.len();
    while old_end > start && new_end > start && old[old_end - 1].key == new[new_end - 1].key {
        let after = anchor_at(new, new_end, anchor);
        host.patch(&old[old_end - 1], &mut new[new_end - 1], container, after.as_ref())?;
        summary.patched += 1;
        old_end -= 1;
        new_end -= 1;
    }

    let old_middle = &old[start..old_end];
    let keyless = old_middle.iter().any(|n| n.key.is_none())
        || new[start..new_end].iter().any(|n| n.key.is_none());

    if old_middle.is_empty() || new_end == start || keyless {
        // 3, 4, or a keyless middle: unmount what is left, mount what is new.
        for node in old_middle {
            host.unmount(node)?;
            summary.unmounted += 1;
        }
        let before = anchor_at(new, new_end, anchor);
        for node in &mut new[start..new_end] {
            host.mount(node, container, before.as_ref())?;
            summary.mounted += 1;
        }
    } else {
        reconcile_middle(host, old, new, (start, old_end, new_end), container, anchor, &mut summary)?;
    }

    debug!(
        patched = summary.patched,
        mounted = summary.mounted,
        unmounted = summary.unmounted,
        moved = summary.moved,
        "reconciled children"
    );
    Ok(())
}

/// Steps 5 and 6 over `old[start..old_end]` and `new[start..new_end]`.
fn reconcile_middle<H: Host>(
    host: &mut H,
    old: &[VNode<H::Node>],
    new: &mut [VNode<H::Node>],
    (start, old_end, new_end): (usize, usize, usize),
    container: &H::Node,
    anchor: Option<&H::Node>,
    summary: &mut Summary,
) -> Result<(), RenderError> {
    let count = new_end - start;
    let key_index: HashMap<Key, usize> = (start..new_end)
        .filter_map(|i| new[i].key.clone().map(|key| (key, i)))
        .collect();

    let mut sources: Vec<Option<usize>> = vec![None; count];
    let mut moved = false;
    let mut furthest = 0;
    let mut matched = 0;

    for (i, old_node) in old.iter().enumerate().take(old_end).skip(start) {
        // Every new slot is taken; whatever is left is gone.
        if matched >= count {
            host.unmount(old_node)?;
            summary.unmounted += 1;
            continue;
        }

        let target = old_node.key.as_ref().and_then(|key| key_index.get(key)).copied();
        match target {
            Some(k) => {
                let after = anchor_at(old, i + 1, anchor);
                host.patch(old_node, &mut new[k], container, after.as_ref())?;
                summary.patched += 1;
                matched += 1;
                sources[k - start] = Some(i);
                if k < furthest {
                    moved = true;
                } else {
                    furthest = k;
                }
            }
            None => {
                host.unmount(old_node)?;
                summary.unmounted += 1;
            }
        }
    }

    let stable = if moved {
        longest_increasing_subsequence(&sources)
    } else {
        Vec::new()
    };
    let mut remaining = stable.len();

    for offset in (0..count).rev() {
        let position = start + offset;
        match sources[offset] {
            None => {
                let before = anchor_at(new, position + 1, anchor);
                host.mount(&mut new[position], container, before.as_ref())?;
                summary.mounted += 1;
            }
            Some(_) if moved => {
                if remaining > 0 && stable[remaining - 1] == offset {
                    remaining -= 1;
                } else {
                    let before = anchor_at(new, position + 1, anchor);
                    host.move_node(&new[position], container, before.as_ref())?;
                    summary.moved += 1;
                }
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// First realized node at or after `from`, falling back to `fallback`.
fn anchor_at<N: Clone>(nodes: &[VNode<N>], from: usize, fallback: Option<&N>) -> Option<N> {
    nodes
        .get(from..)
        .and_then(|rest| rest.iter().find_map(VNode::first_el))
        .or_else(|| fallback.cloned())
}

pub(super) fn ensure_unique_keys<N>(nodes: &[VNode<N>]) -> Result<(), RenderError> {
    let mut seen = HashSet::new();
    for key in nodes.iter().filter_map(|n| n.key.as_ref()) {
        if !seen.insert(key) {
            return Err(RenderError::DuplicateKey(key.clone()));
        }
    }
    Ok(())
}
