use nbtidy_core::model::{Cell, Document};
use nbtidy_core::{clean_cell, clean_document, CleanOptions};
use serde_json::json;

fn executed_cell() -> Cell {
    serde_json::from_value(json!({
        "cell_type": "code",
        "execution_count": 3,
        "id": "abc123",
        "metadata": {
            "execution": {"iopub.execute_input": "2024-01-01T00:00:00"},
            "papermill": {"duration": 0.5, "status": "completed"},
            "widgets": {},
            "tags": [],
            "scrolled": true
        },
        "outputs": [],
        "source": "x = 1"
    }))
    .expect("cell parses")
}

fn executed_document() -> Document {
    let mut doc = Document::new(vec![executed_cell(), Cell::markdown("# done").with_tags(&[])]);
    doc.metadata.insert("papermill".to_string(), json!({"parameters": {}}));
    doc.metadata.insert("kernelspec".to_string(), json!({"name": "python3"}));
    doc
}

#[test]
fn strict_clean_drops_bookkeeping_ids_and_empty_tags() {
    let mut cell = executed_cell();
    clean_cell(&mut cell, &CleanOptions::strict());
    assert_eq!(cell.id, None);
    let metadata = cell.metadata.expect("metadata kept");
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata.get("scrolled"), Some(&json!(true)));
}

#[test]
fn keep_ids_and_force_tags() {
    let mut cell = Cell::code("x").with_id("keep-me");
    let opts = CleanOptions {
        keep_ids: true,
        keep_tags: Some(true),
    };
    clean_cell(&mut cell, &opts);
    assert_eq!(cell.id.as_deref(), Some("keep-me"));
    assert_eq!(cell.tags_value(), Some(&json!([])));
}

#[test]
fn unset_tag_mode_leaves_tags_alone() {
    let mut cell = executed_cell();
    let opts = CleanOptions {
        keep_ids: false,
        keep_tags: None,
    };
    clean_cell(&mut cell, &opts);
    assert!(cell.has_empty_tags());
}

#[test]
fn non_empty_tags_survive_strict_clean() {
    let mut cell = Cell::code("x").with_tags(&["parameters"]);
    clean_cell(&mut cell, &CleanOptions::strict());
    assert_eq!(cell.tags(), vec!["parameters"]);
}

#[test]
fn absent_metadata_stays_absent() {
    let mut cell = Cell::code("x");
    cell.metadata = None;
    clean_cell(
        &mut cell,
        &CleanOptions {
            keep_ids: false,
            keep_tags: Some(true),
        },
    );
    assert_eq!(cell.metadata, None);
}

#[test]
fn document_clean_removes_engine_metadata() {
    let mut doc = executed_document();
    clean_document(&mut doc, &CleanOptions::strict());
    assert!(!doc.metadata.contains_key("papermill"));
    assert!(doc.metadata.contains_key("kernelspec"));
    assert!(doc.cells.iter().all(|cell| !cell.has_tags_key()));
}

#[test]
fn cleaning_is_idempotent() {
    for opts in [
        CleanOptions::strict(),
        CleanOptions::default(),
        CleanOptions {
            keep_ids: true,
            keep_tags: Some(true),
        },
    ] {
        let mut doc = executed_document();
        clean_document(&mut doc, &opts);
        let once = doc.clone();
        clean_document(&mut doc, &opts);
        assert_eq!(doc, once, "options {opts:?}");
    }
}
