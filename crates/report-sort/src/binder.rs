//! Writes a group order back into the host tree.

use report_sort_core::logging::targets;

use crate::error::Result;
use crate::host::HostTree;
use crate::model::{RowGroup, SeparatorPosition};

/// Re-append every group's rows to their parent container in order.
///
/// For the group at render position `i`: pre separators, then the data row
/// (carrying `alternating_marker` when `i` is odd), then post separators.
/// Rows outside the model are left where they are, so after a full pass the
/// managed rows sit after any unmanaged siblings.
#[tracing::instrument(skip(tree, groups), target = "report_sort::binder", level = "debug")]
pub fn render<T: HostTree>(
    tree: &mut T,
    groups: &[RowGroup<T::Node>],
    alternating_marker: &str,
) -> Result<()> {
    let mut moved = 0usize;

    for (position, group) in groups.iter().enumerate() {
        let Some(parent) = group_parent(tree, group)? else {
            tracing::debug!(target: targets::BINDER, group_id = group.group_id, "Group is detached, skipping");
            continue;
        };

        for separator in group.separators_at(SeparatorPosition::Pre) {
            reattach(tree, parent, separator)?;
            moved += 1;
        }

        if let Some(row) = &group.data_row {
            if !alternating_marker.is_empty() {
                tree.remove_marker(row.element, alternating_marker)?;
                if position % 2 != 0 {
                    tree.add_marker(row.element, alternating_marker)?;
                }
            }
            reattach(tree, parent, row.element)?;
            moved += 1;
        }

        for separator in group.separators_at(SeparatorPosition::Post) {
            reattach(tree, parent, separator)?;
            moved += 1;
        }
    }

    tracing::debug!(target: targets::BINDER, groups = groups.len(), rows = moved, "Rendered groups");
    Ok(())
}

/// The container a group renders into: its data row's parent, else its
/// first separator's.
fn group_parent<T: HostTree>(tree: &T, group: &RowGroup<T::Node>) -> Result<Option<T::Node>> {
    if let Some(row) = &group.data_row {
        if let Some(parent) = tree.parent(row.element)? {
            return Ok(Some(parent));
        }
    }
    for separator in &group.separators {
        if let Some(parent) = tree.parent(separator.element)? {
            return Ok(Some(parent));
        }
    }
    Ok(None)
}

fn reattach<T: HostTree>(tree: &mut T, parent: T::Node, node: T::Node) -> Result<()> {
    tree.detach(node)?;
    tree.append_child(parent, node)?;
    Ok(())
}
