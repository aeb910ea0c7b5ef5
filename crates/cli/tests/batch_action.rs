use assert_cmd::Command;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn run_cli_raw(workdir: &Path, request: &Value) -> (bool, Value) {
    let output = Command::cargo_bin("huilerie")
        .expect("binary")
        .current_dir(workdir)
        .env_remove("HUILERIE_DB")
        .arg("command")
        .arg("--json")
        .arg(request.to_string())
        .output()
        .expect("command run");

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    (output.status.success(), body)
}

fn run_cli(workdir: &Path, request: Value) -> Value {
    let (ok, body) = run_cli_raw(workdir, &request);
    assert!(ok, "request: {request}\nresponse: {body}");
    body
}

fn batch_items(response: &Value) -> Vec<Value> {
    response["data"]["items"]
        .as_array()
        .cloned()
        .unwrap_or_default()
}

#[test]
fn batch_feeds_earlier_results_into_later_items() {
    let temp = tempdir().unwrap();
    let request = json!({
        "action": "batch",
        "payload": {
            "items": [
                { "id": "seed", "action": "box_seed", "payload": { "box_count": 10 } },
                { "id": "farmer", "action": "farmer_create", "payload": { "name": "Lotfi", "kind": "large" } },
                {
                    "id": "boxes",
                    "action": "box_assign_bulk",
                    "payload": { "farmer_id": { "$ref": "#/items/farmer/data/id" }, "box_ids": [3, 4] }
                },
                {
                    "id": "check",
                    "action": "box_get",
                    "payload": { "box_id": { "$ref": "#/items/boxes/data/assigned/1/id" } }
                }
            ]
        }
    });

    let response = run_cli(temp.path(), request);
    assert_eq!(response["status"], "ok");
    assert_eq!(response["data"]["version"], 1);
    assert_eq!(response["data"]["stopped"], false);
    assert_eq!(response["meta"]["batch_items"], 4);

    let items = batch_items(&response);
    let farmer_id = items[1]["data"]["id"].clone();
    assert_eq!(items[2]["data"]["farmer_id"], farmer_id);
    assert_eq!(items[3]["data"]["id"], 4);
    assert_eq!(items[3]["data"]["status"], "IN_USE");
}

#[test]
fn stop_on_error_skips_the_rest() {
    let temp = tempdir().unwrap();
    let request = json!({
        "action": "batch",
        "payload": {
            "stop_on_error": true,
            "items": [
                { "id": "missing", "action": "farmer_get", "payload": { "farmer_id": 404 } },
                { "id": "never", "action": "farmer_create", "payload": { "name": "Ghost", "kind": "small" } }
            ]
        }
    });

    let response = run_cli(temp.path(), request);
    assert_eq!(response["data"]["stopped"], true);
    let items = batch_items(&response);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"], "error");
    assert_eq!(items[0]["error"]["code"], "not_found");

    let farmers = run_cli(temp.path(), json!({ "action": "farmer_list" }));
    assert_eq!(farmers["meta"]["count"], 0);
}

#[test]
fn failed_items_do_not_stop_the_batch_by_default() {
    let temp = tempdir().unwrap();
    let request = json!({
        "action": "batch",
        "payload": {
            "items": [
                { "id": "a", "action": "farmer_create", "payload": { "name": "Amel", "kind": "small" } },
                { "id": "a", "action": "farmer_create", "payload": { "name": "Twice", "kind": "small" } },
                { "id": " ", "action": "farmer_list" },
                { "id": "nested", "action": "batch", "payload": { "items": [] } },
                { "id": "bad_ref", "action": "farmer_get", "payload": { "farmer_id": { "$ref": "#/items/zzz/data/id" } } },
                { "id": "b", "action": "farmer_list" }
            ]
        }
    });

    let response = run_cli(temp.path(), request);
    assert_eq!(response["data"]["stopped"], false);
    let items = batch_items(&response);
    let statuses: Vec<&str> = items
        .iter()
        .map(|item| item["status"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(statuses, vec!["ok", "error", "error", "error", "error", "ok"]);
    for rejected in &items[1..5] {
        assert_eq!(rejected["error"]["code"], "invalid_request");
    }
    assert_eq!(items[5]["meta"]["count"], 1);
}

#[test]
fn dashboard_cache_is_dropped_after_writes() {
    let temp = tempdir().unwrap();
    let request = json!({
        "action": "batch",
        "payload": {
            "items": [
                { "id": "first", "action": "dashboard" },
                { "id": "second", "action": "dashboard" },
                { "id": "write", "action": "farmer_create", "payload": { "name": "Rim", "kind": "small" } },
                { "id": "third", "action": "dashboard" }
            ]
        }
    });

    let response = run_cli(temp.path(), request);
    let items = batch_items(&response);
    assert_eq!(items[0]["meta"]["cache_hit"], false);
    assert_eq!(items[1]["meta"]["cache_hit"], true);
    assert_eq!(items[3]["meta"]["cache_hit"], false);
    assert_eq!(items[0]["data"]["farmers"], 0);
    assert_eq!(items[3]["data"]["farmers"], 1);
}

#[test]
fn no_cache_option_bypasses_the_dashboard_cache() {
    let temp = tempdir().unwrap();
    let request = json!({
        "action": "batch",
        "options": { "no_cache": true },
        "payload": {
            "items": [
                { "id": "first", "action": "dashboard" },
                { "id": "second", "action": "dashboard" }
            ]
        }
    });

    let response = run_cli(temp.path(), request);
    let items = batch_items(&response);
    assert_eq!(items[1]["meta"]["cache_hit"], false);
}

#[test]
fn invalid_requests_are_reported_as_json() {
    let temp = tempdir().unwrap();

    #[allow(deprecated)]
    let output = Command::cargo_bin("huilerie")
        .expect("binary")
        .current_dir(temp.path())
        .env_remove("HUILERIE_DB")
        .args(["command", "--json", "{not json"])
        .output()
        .expect("command run");
    assert!(!output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["error"]["code"], "invalid_request");

    let (ok, body) = run_cli_raw(temp.path(), &json!({ "action": "farmer_teleport" }));
    assert!(!ok);
    assert_eq!(body["error"]["code"], "invalid_request");

    let (ok, body) = run_cli_raw(
        temp.path(),
        &json!({ "action": "farmer_create", "payload": { "kind": "small" } }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "invalid_request");
    assert_eq!(body["next_actions"][0]["action"], "capabilities");
}

#[test]
fn capabilities_list_every_action() {
    let temp = tempdir().unwrap();
    let response = run_cli(temp.path(), json!({ "action": "capabilities" }));
    let actions: Vec<&str> = response["data"]["actions"]
        .as_array()
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    for expected in ["batch", "box_assign_bulk", "session_create", "payroll", "farmer_statement"] {
        assert!(actions.contains(&expected), "missing {expected}: {actions:?}");
    }
}
