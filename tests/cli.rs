mod common;

use std::fs;

use predicates::str::contains;
use serde_json::Value;

use common::{ROSTER_CSV, TestWorkspace, roster_import};

fn preview_json(args: &[&str]) -> Value {
    let output = roster_import()
        .args(args)
        .output()
        .expect("run preview");
    assert!(
        output.status.success(),
        "preview failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("preview emits JSON")
}

#[test]
fn fields_lists_builtin_registry() {
    roster_import()
        .arg("fields")
        .assert()
        .success()
        .stdout(contains("importance_level"))
        .stdout(contains("active, inactive, deceased, unknown"))
        .stdout(contains("Main Character"));
}

#[test]
fn suggest_maps_observed_headers() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let output = roster_import()
        .args(["suggest", "-i", input.to_str().unwrap()])
        .output()
        .expect("run suggest");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let line_for = |observed: &str| {
        stdout
            .lines()
            .find(|line| line.starts_with(observed))
            .unwrap_or_else(|| panic!("no line for {observed}"))
            .to_string()
    };
    assert!(line_for("Character Name").ends_with("name"));
    assert!(line_for("is main character").ends_with("is_main_character"));
    assert!(line_for("Importance").ends_with("importance_level"));
}

#[test]
fn preview_json_reports_rows_stats_and_registry() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let json = preview_json(&["preview", "-i", input.to_str().unwrap(), "--json"]);

    assert_eq!(json["totalRows"], 4);
    assert_eq!(json["stats"]["validRows"], 3);
    assert_eq!(json["stats"]["invalidRows"], 1);
    assert_eq!(json["stats"]["duplicateNames"], serde_json::json!(["ari vale"]));
    assert_eq!(json["suggestedMapping"]["Status"], "status");
    assert!(json["databaseFields"].as_array().unwrap().len() > 10);

    let first = &json["previewData"][0];
    assert_eq!(first["rowIndex"], 0);
    assert_eq!(first["rawData"]["name"], "Ari Vale");
    assert_eq!(first["transformed"]["personality"]["temper"], "calm");
    assert_eq!(first["transformed"]["skills"], serde_json::json!(["archery", "stealth"]));
    assert_eq!(first["transformed"]["is_main_character"], true);

    let second = &json["previewData"][1];
    assert_eq!(second["validation"]["isValid"], true);
    assert_eq!(second["validation"]["warnings"].as_array().unwrap().len(), 2);
    assert_eq!(second["transformed"]["status"], "active");
    assert_eq!(second["transformed"]["importance_level"], 5);
    assert_eq!(
        second["transformed"]["personality"],
        serde_json::json!({"description": "Cheerful"})
    );

    let third = &json["previewData"][2];
    assert_eq!(third["transformed"]["status"], "inactive");
    assert_eq!(third["transformed"]["skills"], serde_json::json!(["cooking"]));

    let last = &json["previewData"][3];
    assert_eq!(last["validation"]["isValid"], false);
    assert!(last["transformed"]["name"].is_null());
}

#[test]
fn preview_honours_row_limit_and_operator_mapping_file() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let mapping = workspace.write(
        "mapping.json",
        r#"{"Character Name": "name", "Alias List": "aliases"}"#,
    );
    let mapping_arg = format!("@{}", mapping.display());
    let json = preview_json(&[
        "preview",
        "-i",
        input.to_str().unwrap(),
        "--mapping",
        &mapping_arg,
        "--rows",
        "1",
        "--json",
    ]);

    assert_eq!(json["previewData"].as_array().unwrap().len(), 1);
    assert_eq!(json["appliedMapping"]["Alias List"], "aliases");
    let first = &json["previewData"][0];
    assert_eq!(first["transformed"]["aliases"], serde_json::json!(["Red", "The Fox"]));
    // Columns the operator did not map keep their observed names.
    assert_eq!(first["rawData"]["Status"], "active");
    assert_eq!(first["transformed"]["status"], "active");
    assert_eq!(first["transformed"]["importance_level"], 5);
}

#[test]
fn preview_table_summarizes_rows() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    roster_import()
        .args(["preview", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Ari Vale"))
        .stdout(contains("Name is required"))
        .stdout(contains("4 row(s): 3 valid, 1 invalid"))
        .stdout(contains("Duplicate names: ari vale"));
}

#[test]
fn preview_reads_json_from_stdin() {
    let body = r#"["oops", {"name": "Ari", "aliases": ["A", 7], "is_protagonist": true}]"#;
    let output = roster_import()
        .args(["preview", "-i", "-", "--media-type", "application/json", "--json"])
        .write_stdin(body)
        .output()
        .expect("run preview");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["totalRows"], 1);
    assert_eq!(json["skippedEntries"][0]["index"], 0);
    assert_eq!(json["previewData"][0]["rowIndex"], 1);
    let transformed = &json["previewData"][0]["transformed"];
    assert_eq!(transformed["aliases"], serde_json::json!(["A", "7"]));
    assert_eq!(transformed["is_protagonist"], true);
}

#[test]
fn import_writes_valid_rows_and_report() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let output = workspace.path().join("characters.jsonl");
    let report = workspace.path().join("report.json");
    roster_import()
        .args([
            "import",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--report",
            report.to_str().unwrap(),
        ])
        .assert()
        .success();

    let written = fs::read_to_string(&output).expect("read output");
    let names = written
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["name"].clone())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Ari Vale", "Sam Ode", "ari vale"]);

    let report: Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("read report")).unwrap();
    assert_eq!(report["committed"], serde_json::json!([0, 1, 2]));
    assert_eq!(report["rejected"][0]["rowIndex"], 3);
    assert_eq!(report["totalRows"], 4);
    assert!(report["batchId"].as_str().is_some());
}

#[test]
fn import_can_skip_duplicate_names() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("roster.csv", ROSTER_CSV);
    let output = workspace.path().join("characters.jsonl");
    roster_import()
        .args([
            "import",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--skip-duplicates",
        ])
        .assert()
        .success();

    let written = fs::read_to_string(&output).expect("read output");
    assert_eq!(written.lines().count(), 1);
    assert!(written.contains("Sam Ode"));
}

#[test]
fn custom_registry_replaces_builtin_schema() {
    let workspace = TestWorkspace::new();
    let registry = workspace.write(
        "registry.yaml",
        "fields:\n  - key: title\n    required: true\n    kind: string\n  - key: rank\n    kind: number\n    min: 1\n    max: 3\n    outOfRange: clamp\n",
    );
    let input = workspace.write("items.csv", "Title,Rank\nSword,9\n");
    let json = preview_json(&[
        "preview",
        "-i",
        input.to_str().unwrap(),
        "--registry",
        registry.to_str().unwrap(),
        "--json",
    ]);
    assert_eq!(json["databaseFields"].as_array().unwrap().len(), 2);
    assert_eq!(json["previewData"][0]["transformed"]["title"], "Sword");
    assert_eq!(json["previewData"][0]["transformed"]["rank"], 3);
    assert_eq!(
        json["previewData"][0]["validation"]["warnings"][0],
        "Rank should be a number between 1 and 3"
    );
}
