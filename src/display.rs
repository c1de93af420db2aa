//! Terminal rendering for the `sift` binary

use owo_colors::{OwoColorize, Stream};
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::columns::Column;
use crate::pagination::PaginationViewModel;
use crate::selection::{FilterIntent, RenderNode};

/// One line per row: section headers in bold, then checkboxes indented by
/// nesting level.
pub fn format_filter_row(index: usize, node: &RenderNode) -> String {
    if node.is_disabled {
        return format!(
            "{:>3}  {}",
            index,
            node.filter
                .title
                .if_supports_color(Stream::Stdout, |t| t.bold())
        );
    }

    let indent = "  ".repeat(usize::from(node.indent.level()) + 1);
    let checkbox = if node.filter.selected {
        "[x]"
            .if_supports_color(Stream::Stdout, |t| t.green())
            .to_string()
    } else {
        "[ ]".to_string()
    };
    format!(
        "{:>3}  {}{} {} {}",
        index,
        indent,
        checkbox,
        node.filter.title,
        format!("({})", node.filter.value).if_supports_color(Stream::Stdout, |t| t.dimmed())
    )
}

pub fn format_filter_list(rows: &[RenderNode]) -> String {
    rows.iter()
        .enumerate()
        .map(|(i, row)| format_filter_row(i, row))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_intent(intent: &FilterIntent) -> String {
    let sign = if intent.selected { "+" } else { "-" };
    format!("{} {}", sign, intent.value)
}

/// Render result records as a table over `columns`.
pub fn format_result_table(columns: &[Column], items: &[Value]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.title.clone()));
    for item in items {
        builder.push_record(columns.iter().map(|c| cell_text(item.get(&c.key))));
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| cell_text(Some(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

pub fn format_pagination(vm: &PaginationViewModel) -> String {
    if !vm.visible {
        return "no results loaded".to_string();
    }
    format!(
        "Page {} of {}, {} item(s), {} per page",
        vm.current_page, vm.page_count, vm.total_items, vm.page_size
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FilterCatalog, FilterNode};
    use crate::query::PageSize;
    use crate::selection::{ActiveFilters, project};
    use serde_json::json;

    #[test]
    fn test_format_filter_list() {
        owo_colors::set_override(false);
        let catalog = FilterCatalog::new(vec![FilterNode::group(
            "Operating system",
            "os",
            vec![FilterNode::group(
                "RHEL",
                "rhel",
                vec![FilterNode::leaf("RHEL 8", "rhel8")],
            )],
        )])
        .unwrap();
        let rows = project(&catalog, &ActiveFilters::from_selected(["rhel8"]));
        let output = format_filter_list(&rows);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("Operating system"));
        assert!(lines[1].contains("  [ ] RHEL"));
        assert!(lines[2].contains("    [x] RHEL 8"));
        assert!(lines[2].contains("(rhel8)"));
    }

    #[test]
    fn test_format_result_table() {
        let columns = vec![Column::new("name", "Name"), Column::new("tags", "Tags")];
        let items = vec![json!({"name": "web-01", "tags": ["a", "b"]}), json!({"name": "db-01"})];
        let table = format_result_table(&columns, &items);
        insta::assert_snapshot!(table, @r"
        ╭────────┬──────╮
        │ Name   │ Tags │
        ├────────┼──────┤
        │ web-01 │ a, b │
        │ db-01  │ -    │
        ╰────────┴──────╯
        ");
    }

    #[test]
    fn test_format_pagination() {
        let vm = PaginationViewModel {
            current_page: 2,
            page_size: PageSize::Twenty,
            total_items: 45,
            page_size_options: PageSize::OPTIONS.to_vec(),
            page_count: 3,
            visible: true,
        };
        assert_eq!(
            format_pagination(&vm),
            "Page 2 of 3, 45 item(s), 20 per page"
        );
    }

    #[test]
    fn test_format_intent() {
        assert_eq!(format_intent(&FilterIntent::select("rhel8")), "+ rhel8");
        assert_eq!(format_intent(&FilterIntent::deselect("rhel9")), "- rhel9");
    }
}
