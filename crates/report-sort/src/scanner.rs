//! Tree scanning.
//!
//! One pass over the root's descendants parses every element's markers into
//! a [`NodeMarkers`] descriptor, then builds the [`ReportModel`]: headers get
//! an activation affordance, rows are chunked into groups of the group span,
//! and each data row's columns are normalized.

use std::collections::{HashMap, HashSet};

use report_sort_core::logging::targets;

use crate::config::SortConfig;
use crate::error::Result;
use crate::host::HostTree;
use crate::marker::NodeMarkers;
use crate::model::{
    DataRow, Direction, HeaderColumn, ReportModel, RowColumn, RowGroup, SeparatorPosition,
    SeparatorRow,
};
use crate::normalize::normalize_column;

/// Side-table key holding an affordance's direction.
pub const ORDER_KEY: &str = "order";
/// Side-table key holding an affordance's column id.
pub const ORDER_ID_KEY: &str = "orderID";
/// Tag of created affordance elements.
pub const AFFORDANCE_TAG: &str = "div";
/// Prefix of an affordance's `id` attribute, followed by the column id.
pub const AFFORDANCE_ID_PREFIX: &str = "imgColArrow_";

type Descriptors<N> = HashMap<N, NodeMarkers>;

/// Scan `root` and build its report model.
///
/// Headers are returned in reverse document order. When several headers share
/// an id only the first one processed, the last in document order, is kept.
/// Each kept header gets a fresh affordance child, so callers re-scanning a
/// root must remove the previous affordances first.
#[tracing::instrument(skip(tree, config), target = "report_sort::scan", level = "debug")]
pub fn scan<T: HostTree>(
    tree: &mut T,
    root: T::Node,
    config: &SortConfig,
) -> Result<ReportModel<T::Node>> {
    let mut order = Vec::new();
    let mut descriptors = Descriptors::new();
    for node in tree.descendants(root)? {
        let classes = tree.markers(node)?;
        let markers = config.markers.describe(classes.as_slice());
        if !markers.is_empty() {
            order.push(node);
            descriptors.insert(node, markers);
        }
    }

    let headers = scan_headers(tree, &order, &descriptors, config)?;

    let rows: Vec<(T::Node, u32)> = order
        .iter()
        .filter_map(|node| descriptors[node].row.map(|index| (*node, index)))
        .collect();
    let group_span = group_span(rows.iter().map(|(_, index)| *index));

    let mut groups = Vec::with_capacity(rows.len().div_ceil(group_span));
    for (group_id, chunk) in rows.chunks(group_span).enumerate() {
        groups.push(scan_group(tree, group_id, chunk, &descriptors)?);
    }

    tracing::debug!(
        target: targets::SCAN,
        headers = headers.len(),
        rows = rows.len(),
        groups = groups.len(),
        group_span,
        "Scanned report"
    );

    Ok(ReportModel {
        headers,
        groups,
        group_span,
    })
}

/// Compute the group span from the row indices in document order.
///
/// The span is the running maximum over the first strictly increasing run
/// of indices, and never less than 1.
pub fn group_span(indices: impl IntoIterator<Item = u32>) -> usize {
    let mut max = 0;
    for index in indices {
        if index > max {
            max = index;
        } else {
            break;
        }
    }
    (max as usize).max(1)
}

fn scan_headers<T: HostTree>(
    tree: &mut T,
    order: &[T::Node],
    descriptors: &Descriptors<T::Node>,
    config: &SortConfig,
) -> Result<Vec<HeaderColumn<T::Node>>> {
    let mut headers: Vec<HeaderColumn<T::Node>> = Vec::new();
    for &element in order.iter().rev() {
        let Some(id) = descriptors[&element].header.clone() else {
            continue;
        };
        if let Some(kept) = headers.iter().find(|header| header.id == id) {
            tracing::debug!(
                target: targets::SCAN,
                column = %id,
                ?element,
                kept = ?kept.element,
                "Skipping header with a duplicate id"
            );
            continue;
        }

        let affordance = tree.create_element(AFFORDANCE_TAG);
        tree.set_attribute(affordance, "id", &format!("{AFFORDANCE_ID_PREFIX}{id}"))?;
        tree.add_marker(affordance, &config.affordance_marker)?;
        tree.set_data(affordance, ORDER_KEY, config.order.as_str())?;
        tree.set_data(affordance, ORDER_ID_KEY, &id)?;
        tree.listen_activation(affordance)?;
        tree.append_child(element, affordance)?;
        tree.set_attribute(element, "position", "relative")?;

        tracing::trace!(target: targets::SCAN, column = %id, ?element, "Attached affordance");

        headers.push(HeaderColumn {
            element,
            affordance,
            id,
            order: Direction::None,
        });
    }
    Ok(headers)
}

fn scan_group<T: HostTree>(
    tree: &T,
    group_id: usize,
    chunk: &[(T::Node, u32)],
    descriptors: &Descriptors<T::Node>,
) -> Result<RowGroup<T::Node>> {
    let mut group = RowGroup {
        group_id,
        data_row: None,
        separators: Vec::new(),
    };

    for &(element, _) in chunk {
        let columns = column_elements(tree, element, descriptors)?;
        if columns.is_empty() {
            let position = if group.data_row.is_some() {
                SeparatorPosition::Post
            } else {
                SeparatorPosition::Pre
            };
            group.separators.push(SeparatorRow { element, position });
            continue;
        }

        if let Some(previous) = &group.data_row {
            tracing::debug!(
                target: targets::SCAN,
                group_id,
                replaced = ?previous.element,
                by = ?element,
                "Group has more than one data row, keeping the last"
            );
        }

        let mut row_columns = Vec::with_capacity(columns.len());
        for column in columns {
            row_columns.push(scan_column(tree, column, descriptors)?);
        }
        group.data_row = Some(DataRow {
            element,
            columns: row_columns,
        });
    }

    Ok(group)
}

/// Column elements of a row in document order, skipping columns nested
/// inside another column.
fn column_elements<T: HostTree>(
    tree: &T,
    row: T::Node,
    descriptors: &Descriptors<T::Node>,
) -> Result<Vec<T::Node>> {
    let candidates: Vec<T::Node> = tree
        .descendants(row)?
        .into_iter()
        .filter(|node| descriptors.get(node).is_some_and(|m| m.column.is_some()))
        .collect();
    let set: HashSet<T::Node> = candidates.iter().copied().collect();

    let mut columns = Vec::with_capacity(candidates.len());
    'candidates: for &column in &candidates {
        let mut ancestor = tree.parent(column)?;
        while let Some(node) = ancestor {
            if node == row {
                break;
            }
            if set.contains(&node) {
                continue 'candidates;
            }
            ancestor = tree.parent(node)?;
        }
        columns.push(column);
    }
    Ok(columns)
}

fn scan_column<T: HostTree>(
    tree: &T,
    element: T::Node,
    descriptors: &Descriptors<T::Node>,
) -> Result<RowColumn<T::Node>> {
    let markers = &descriptors[&element];
    let id = markers.column.clone().unwrap_or_default();

    let mut data: Vec<(T::Node, _)> = tree
        .descendants(element)?
        .into_iter()
        .filter_map(|node| {
            let value_type = descriptors.get(&node)?.data.clone()?;
            Some((node, value_type))
        })
        .collect();
    if data.is_empty() {
        if let Some(value_type) = markers.data.clone() {
            data.push((element, value_type));
        }
    }

    let mut values = Vec::with_capacity(data.len());
    for (node, value_type) in data {
        values.push((cell_text(tree, node)?, value_type));
    }
    let (value, value_type) = normalize_column(&values);

    tracing::trace!(
        target: targets::SCAN,
        column = %id,
        value = %value,
        value_type = %value_type,
        "Scanned column"
    );

    Ok(RowColumn {
        element,
        id,
        value,
        value_type,
    })
}

/// Text content of an element, or its form value when the text is empty.
fn cell_text<T: HostTree>(tree: &T, node: T::Node) -> Result<String> {
    let text = tree.text_content(node)?;
    if !text.is_empty() {
        return Ok(text);
    }
    Ok(tree.form_value(node)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SortEngine;
    use crate::model::ValueType;
    use report_sort_core::{NodeId, NodeTree};

    fn cell(tree: &mut NodeTree, row: NodeId, class: &str, text: &str) -> NodeId {
        let cell = tree.create_child(row, "td").unwrap();
        tree.set_class_name(cell, class).unwrap();
        tree.set_text(cell, text).unwrap();
        cell
    }

    #[test]
    fn test_group_span() {
        assert_eq!(group_span([]), 1);
        assert_eq!(group_span([1, 1, 1]), 1);
        assert_eq!(group_span([1, 2, 1, 2]), 2);
        assert_eq!(group_span([1, 2, 3, 1]), 3);
        assert_eq!(group_span([2, 1]), 2);
        assert_eq!(group_span([0, 0]), 1);
    }

    #[test]
    fn test_headers_reverse_order_with_affordances() {
        let mut tree = NodeTree::new();
        let root = tree.create("table");
        let head = tree.create_child(root, "tr").unwrap();
        let name = cell(&mut tree, head, "sort-head-name", "Name");
        let age = cell(&mut tree, head, "wide sort-head-age", "Age");

        let model = scan(&mut tree, root, &SortConfig::default()).unwrap();

        let ids: Vec<_> = model.headers.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["age", "name"]);
        assert_eq!(model.headers[0].element, age);
        assert_eq!(model.headers[1].element, name);

        let affordance = model.headers[1].affordance;
        assert_eq!(tree.parent(affordance).unwrap(), Some(name));
        assert!(tree.has_class(affordance, "imgArrow").unwrap());
        assert_eq!(tree.data(affordance, ORDER_KEY).unwrap(), Some("asc"));
        assert_eq!(tree.data(affordance, ORDER_ID_KEY).unwrap(), Some("name"));
        assert!(tree.is_listening(affordance).unwrap());
        assert_eq!(tree.attribute(name, "position").unwrap(), Some("relative"));
    }

    #[test]
    fn test_affordance_id() {
        let mut tree = NodeTree::new();
        let root = tree.create("tr");
        cell(&mut tree, root, "sort-head-total", "Total");

        let model = scan(&mut tree, root, &SortConfig::default()).unwrap();

        let affordance = model.header("total").unwrap().affordance;
        assert_eq!(tree.attribute(affordance, "id").unwrap(), Some("imgColArrow_total"));
    }

    #[test]
    fn test_duplicate_header_ids_keep_one() {
        let mut tree = NodeTree::new();
        let root = tree.create("tr");
        let first = cell(&mut tree, root, "sort-head-name", "Name");
        let second = cell(&mut tree, root, "sort-head-name", "Name again");
        cell(&mut tree, root, "sort-head-age", "Age");

        let model = scan(&mut tree, root, &SortConfig::default()).unwrap();

        let ids: Vec<_> = model.headers.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["age", "name"]);
        let name = model.header("name").unwrap();
        assert_eq!(name.element, second);
        assert_eq!(model.header_for_element(name.affordance).map(|h| h.element), Some(second));
        assert!(tree.children(first).unwrap().is_empty());
        assert_eq!(tree.children(second).unwrap(), &[name.affordance]);
        assert_eq!(tree.attribute(first, "position").unwrap(), None);
    }

    #[test]
    fn test_last_data_row_in_chunk_wins() {
        let mut tree = NodeTree::new();
        let root = tree.create("tbody");
        let mut rows = Vec::new();
        for (class, text) in [("sort-row-1", "x"), ("sort-row-2", "y")] {
            let row = tree.create_child(root, "tr").unwrap();
            tree.set_class_name(row, class).unwrap();
            cell(&mut tree, row, "sort-column-a sort-data", text);
            rows.push(row);
        }

        let model = scan(&mut tree, root, &SortConfig::default()).unwrap();

        assert_eq!(model.group_span, 2);
        assert_eq!(model.groups.len(), 1);
        let group = &model.groups[0];
        assert_eq!(group.data_row.as_ref().map(|r| r.element), Some(rows[1]));
        assert_eq!(group.column("a").unwrap().value, "y");
        assert!(group.separators.is_empty());
    }

    #[test]
    fn test_empty_column_id_scans_and_sorts() {
        let mut tree = NodeTree::new();
        let root = tree.create("table");
        let head = tree.create_child(root, "tr").unwrap();
        cell(&mut tree, head, "sort-head-", "Unnamed");
        let mut rows = Vec::new();
        for text in ["b", "a"] {
            let row = tree.create_child(root, "tr").unwrap();
            tree.set_class_name(row, "sort-row").unwrap();
            cell(&mut tree, row, "sort-column- sort-data", text);
            rows.push(row);
        }

        let mut model = scan(&mut tree, root, &SortConfig::default()).unwrap();

        assert_eq!(model.headers[0].id, "");
        assert_eq!(model.groups[0].column("").unwrap().value, "b");
        assert!(SortEngine::default().sort_in_place(&mut model.groups, "", Direction::Asc));
        let order: Vec<_> = model
            .groups
            .iter()
            .filter_map(|g| g.data_row.as_ref().map(|r| r.element))
            .collect();
        assert_eq!(order, vec![rows[1], rows[0]]);
    }

    #[test]
    fn test_separator_positions() {
        let mut tree = NodeTree::new();
        let root = tree.create("tbody");
        let sep = tree.create_child(root, "tr").unwrap();
        tree.set_class_name(sep, "sort-row-1").unwrap();
        let data = tree.create_child(root, "tr").unwrap();
        tree.set_class_name(data, "sort-row-2").unwrap();
        cell(&mut tree, data, "sort-column-a sort-data", "x");

        let model = scan(&mut tree, root, &SortConfig::default()).unwrap();

        assert_eq!(model.group_span, 2);
        assert_eq!(model.groups.len(), 1);
        let group = &model.groups[0];
        assert_eq!(group.data_row.as_ref().map(|r| r.element), Some(data));
        assert_eq!(
            group.separators,
            vec![SeparatorRow {
                element: sep,
                position: SeparatorPosition::Pre
            }]
        );
    }

    #[test]
    fn test_short_final_chunk() {
        let mut tree = NodeTree::new();
        let root = tree.create("tbody");
        for class in ["sort-row-1", "sort-row-2", "sort-row-1"] {
            let row = tree.create_child(root, "tr").unwrap();
            tree.set_class_name(row, class).unwrap();
        }

        let model = scan(&mut tree, root, &SortConfig::default()).unwrap();

        assert_eq!(model.groups.len(), 2);
        assert_eq!(model.groups[1].group_id, 1);
        assert_eq!(model.groups[1].separators.len(), 1);
        assert!(model.groups[1].data_row.is_none());
    }

    #[test]
    fn test_nested_columns_are_skipped() {
        let mut tree = NodeTree::new();
        let root = tree.create("tbody");
        let row = tree.create_child(root, "tr").unwrap();
        tree.set_class_name(row, "sort-row").unwrap();
        let outer = cell(&mut tree, row, "sort-column-outer", "");
        let inner = tree.create_child(outer, "span").unwrap();
        tree.set_class_name(inner, "sort-column-inner sort-data-number").unwrap();
        tree.set_text(inner, "12").unwrap();

        let model = scan(&mut tree, root, &SortConfig::default()).unwrap();

        let columns = &model.groups[0].data_row.as_ref().unwrap().columns;
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].id, "outer");
        assert_eq!(columns[0].value, "12");
        assert_eq!(columns[0].value_type, ValueType::Number);
    }

    #[test]
    fn test_multi_value_column_is_text() {
        let mut tree = NodeTree::new();
        let root = tree.create("tbody");
        let row = tree.create_child(root, "tr").unwrap();
        tree.set_class_name(row, "sort-row").unwrap();
        let column = cell(&mut tree, row, "sort-column-place", "");
        for (class, text) in [("sort-data-number", "10"), ("sort-data", "New York")] {
            let span = tree.create_child(column, "span").unwrap();
            tree.set_class_name(span, class).unwrap();
            tree.set_text(span, text).unwrap();
        }

        let model = scan(&mut tree, root, &SortConfig::default()).unwrap();

        let column = model.groups[0].column("place").unwrap();
        assert_eq!(column.value, "10, newyork");
        assert_eq!(column.value_type, ValueType::Text);
    }

    #[test]
    fn test_form_value_fallback() {
        let mut tree = NodeTree::new();
        let root = tree.create("tbody");
        let row = tree.create_child(root, "tr").unwrap();
        tree.set_class_name(row, "sort-row").unwrap();
        let input = cell(&mut tree, row, "sort-column-qty sort-data-number", "");
        tree.set_value(input, "1,500").unwrap();

        let model = scan(&mut tree, root, &SortConfig::default()).unwrap();

        assert_eq!(model.groups[0].column("qty").unwrap().value, "1500");
    }

    #[test]
    fn test_no_markers() {
        let mut tree = NodeTree::new();
        let root = tree.create("table");
        tree.create_child(root, "tr").unwrap();

        let model = scan(&mut tree, root, &SortConfig::default()).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.group_span, 1);
    }
}
