use sift::catalog::{FilterCatalog, FilterNode};
use sift::query::{
    PageSize, QueryState, apply_filter_intents, apply_page, apply_page_size, apply_sort,
    apply_structural_flag, apply_text_search,
};
use sift::selection::{ActiveFilters, FilterIntent, Indent, project, toggle};
use sift::{SiftError, SortDirection};

fn os_catalog() -> FilterCatalog {
    FilterCatalog::new(vec![FilterNode::group(
        "Platform",
        "platform",
        vec![FilterNode::group(
            "OS",
            "os",
            vec![
                FilterNode::leaf("RHEL8", "rhel8"),
                FilterNode::leaf("RHEL9", "rhel9"),
            ],
        )],
    )])
    .unwrap()
}

fn wide_catalog() -> FilterCatalog {
    FilterCatalog::new(vec![
        FilterNode::group(
            "Platform",
            "platform",
            vec![
                FilterNode::group(
                    "OS",
                    "os",
                    vec![
                        FilterNode::leaf("RHEL8", "rhel8"),
                        FilterNode::leaf("RHEL9", "rhel9"),
                    ],
                ),
                FilterNode::group("Empty", "empty", vec![]),
                FilterNode::leaf("Windows", "windows"),
            ],
        ),
        FilterNode::group(
            "Severity",
            "severity",
            vec![
                FilterNode::leaf("Critical", "critical"),
                FilterNode::leaf("Important", "important"),
            ],
        ),
    ])
    .unwrap()
}

fn row_index(rows: &[sift::RenderNode], value: &str) -> usize {
    rows.iter()
        .position(|r| !r.is_disabled && r.filter.value == value)
        .unwrap()
}

fn selected(rows: &[sift::RenderNode]) -> Vec<&str> {
    rows.iter()
        .filter(|r| r.filter.selected)
        .map(|r| r.filter.value.as_str())
        .collect()
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn test_projection_shape_independent_of_selection() {
    let catalog = wide_catalog();
    let baseline = project(&catalog, &ActiveFilters::new());
    assert_eq!(baseline.len(), catalog.node_count());

    let order: Vec<&str> = baseline.iter().map(|r| r.filter.value.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "platform", "os", "rhel8", "rhel9", "empty", "windows", "severity", "critical",
            "important"
        ]
    );

    let intents = [
        FilterIntent::select("rhel9"),
        FilterIntent::select("critical"),
        FilterIntent::deselect("rhel9"),
        FilterIntent::select("windows"),
    ];
    for n in 0..=intents.len() {
        let state = apply_filter_intents(QueryState::default(), &intents[..n]);
        let rows = project(&catalog, state.filters());
        let values: Vec<&str> = rows.iter().map(|r| r.filter.value.as_str()).collect();
        assert_eq!(values, order);
    }
}

#[test]
fn test_projection_headers_and_indent() {
    let rows = project(&wide_catalog(), &ActiveFilters::new());
    let headers: Vec<&str> = rows
        .iter()
        .filter(|r| r.is_disabled)
        .map(|r| r.filter.title.as_str())
        .collect();
    assert_eq!(headers, vec!["Platform", "Severity"]);
    assert_eq!(rows[1].indent, Indent::Top);
    assert_eq!(rows[2].indent, Indent::Nested);
    assert!(rows.iter().all(|r| r.filter.group == "platform" || r.filter.group == "severity"));
}

#[test]
fn test_empty_catalog_projects_nothing() {
    assert!(project(&FilterCatalog::empty(), &ActiveFilters::new()).is_empty());
}

// ============================================================================
// Cascade toggling
// ============================================================================

#[test]
fn test_os_group_cascade_scenario() {
    let catalog = os_catalog();
    let rows = project(&catalog, &ActiveFilters::new());

    let (rows, intents) = toggle(&rows, row_index(&rows, "os")).unwrap();
    assert_eq!(
        intents,
        vec![
            FilterIntent::select("os"),
            FilterIntent::select("rhel8"),
            FilterIntent::select("rhel9"),
        ]
    );
    assert_eq!(selected(&rows), vec!["os", "rhel8", "rhel9"]);

    let (rows, intents) = toggle(&rows, row_index(&rows, "rhel8")).unwrap();
    assert_eq!(intents, vec![FilterIntent::deselect("rhel8")]);
    assert_eq!(selected(&rows), vec!["os", "rhel9"]);
}

#[test]
fn test_toggle_matches_reprojection() {
    let catalog = wide_catalog();
    let mut state = QueryState::default();
    for value in ["os", "rhel9", "critical", "os", "windows", "empty"] {
        let rows = project(&catalog, state.filters());
        let (toggled, intents) = toggle(&rows, row_index(&rows, value)).unwrap();
        state = apply_filter_intents(state, &intents);
        assert_eq!(toggled, project(&catalog, state.filters()), "after toggling {value}");
    }
}

#[test]
fn test_double_toggle_restores_descendants() {
    let catalog = wide_catalog();
    let start = ActiveFilters::from_selected(["critical"]);
    let rows = project(&catalog, &start);
    let os = row_index(&rows, "os");

    let (once, _) = toggle(&rows, os).unwrap();
    let (twice, _) = toggle(&once, os).unwrap();
    assert_eq!(twice, rows);
}

#[test]
fn test_empty_group_toggles_like_leaf() {
    let rows = project(&wide_catalog(), &ActiveFilters::new());
    let (_, intents) = toggle(&rows, row_index(&rows, "empty")).unwrap();
    assert_eq!(intents, vec![FilterIntent::select("empty")]);
}

#[test]
fn test_toggle_errors() {
    let rows = project(&wide_catalog(), &ActiveFilters::new());
    let len = rows.len();
    assert!(matches!(
        toggle(&rows, len),
        Err(SiftError::IndexOutOfRange { index, len: l }) if index == len && l == len
    ));
    assert!(matches!(toggle(&rows, 0), Err(SiftError::DisabledNode(_))));
    assert!(toggle(&rows, 0).unwrap_err().is_programming_error());
}

// ============================================================================
// Page reset table
// ============================================================================

fn page_three() -> QueryState {
    apply_page(QueryState::new(PageSize::Twenty).with_flag("affected", false), 3).unwrap()
}

#[test]
fn test_page_size_scenario() {
    let state = page_three();
    assert_eq!((state.page(), state.page_size()), (3, PageSize::Twenty));
    let state = apply_page_size(state, PageSize::Fifty).unwrap();
    assert_eq!((state.page(), state.page_size()), (1, PageSize::Fifty));
}

#[test]
fn test_every_changing_transition_except_sort_and_page_resets() {
    let cases: Vec<(&str, QueryState)> = vec![
        (
            "filters",
            apply_filter_intents(page_three(), &[FilterIntent::select("rhel8")]),
        ),
        ("text search", apply_text_search(page_three(), "name", "web")),
        (
            "page size",
            apply_page_size(page_three(), PageSize::Hundred).unwrap(),
        ),
        (
            "show all",
            apply_structural_flag(page_three(), sift::query::SHOW_ALL, true).unwrap(),
        ),
        (
            "extra flag",
            apply_structural_flag(page_three(), "affected", true).unwrap(),
        ),
    ];
    for (name, state) in cases {
        assert_eq!(state.page(), 1, "{name} should reset the page");
    }

    assert_eq!(apply_sort(page_three(), "name", SortDirection::Desc).page(), 3);
    assert_eq!(apply_page(page_three(), 5).unwrap().page(), 5);
}
