use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
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
    assert_eq!(body["status"], "ok");
    body
}

fn setup_mill() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    fs::write(
        temp.path().join("huilerie.toml"),
        "[inventory]\nbox_count = 20\nmax_bulk_boxes = 10\n",
    )
    .unwrap();
    let seeded = run_cli(temp.path(), json!({ "action": "box_seed" }));
    assert_eq!(seeded["data"]["inserted"], 20);
    temp
}

fn create_farmer(workdir: &Path, name: &str) -> i64 {
    let created = run_cli(
        workdir,
        json!({ "action": "farmer_create", "payload": { "name": name, "kind": "small" } }),
    );
    created["data"]["id"].as_i64().expect("farmer id")
}

fn box_ids(assigned: &Value) -> Vec<u64> {
    assigned["data"]["assigned"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|record| record["id"].as_u64())
        .collect()
}

#[test]
fn seeding_twice_keeps_existing_boxes() {
    let temp = setup_mill();
    let again = run_cli(temp.path(), json!({ "action": "box_seed" }));
    assert_eq!(again["data"]["inserted"], 0);
    assert_eq!(again["data"]["counts"]["total"], 20);
    assert_eq!(again["data"]["counts"]["available"], 20);
}

#[test]
fn seeding_is_capped_at_the_configured_inventory() {
    let temp = setup_mill();
    let (ok, body) = run_cli_raw(
        temp.path(),
        &json!({ "action": "box_seed", "payload": { "box_count": 25 } }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "validation");

    let (ok, body) = run_cli_raw(
        temp.path(),
        &json!({ "action": "box_get", "payload": { "box_id": 21 } }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "not_found");
}

#[test]
fn suggested_next_actions_carry_only_known_fields() {
    let temp = setup_mill();
    let root = temp.path();
    let created = run_cli(
        root,
        json!({ "action": "farmer_create", "payload": { "name": "Najet", "kind": "small" } }),
    );
    let farmer_id = created["data"]["id"].clone();
    assert_eq!(created["next_actions"][0]["action"], "box_assign_bulk");
    assert_eq!(created["next_actions"][0]["args"], json!({ "farmer_id": farmer_id }));

    let assigned = run_cli(
        root,
        json!({ "action": "box_assign", "payload": { "farmer_id": farmer_id, "box_id": 7 } }),
    );
    assert_eq!(assigned["next_actions"][0]["action"], "box_weigh");
    assert_eq!(assigned["next_actions"][0]["args"], json!({ "box_id": 7 }));
}

#[test]
fn boxes_move_between_available_and_in_use() {
    let temp = setup_mill();
    let root = temp.path();
    let farmer_id = create_farmer(root, "Salah");

    let assigned = run_cli(
        root,
        json!({
            "action": "box_assign_bulk",
            "payload": { "farmer_id": farmer_id, "box_ids": [1, 2], "ranges": [{ "start": 5, "end": 6 }] }
        }),
    );
    assert_eq!(box_ids(&assigned), vec![1, 2, 5, 6]);
    assert_eq!(assigned["meta"]["count"], 4);

    let weighed = run_cli(
        root,
        json!({ "action": "box_weigh", "payload": { "box_id": 1, "weight_kg": 31.5 } }),
    );
    assert_eq!(weighed["data"]["weight_kg"], 31.5);

    let released = run_cli(root, json!({ "action": "box_release", "payload": { "box_id": 2 } }));
    assert_eq!(released["data"]["status"], "AVAILABLE");
    assert_eq!(released["data"]["farmer_id"], Value::Null);

    let in_use = run_cli(
        root,
        json!({ "action": "box_list", "payload": { "farmer_id": farmer_id } }),
    );
    let ids: Vec<u64> = in_use["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|record| record["id"].as_u64())
        .collect();
    assert_eq!(ids, vec![1, 5, 6]);

    let all_back = run_cli(
        root,
        json!({ "action": "box_release_farmer", "payload": { "farmer_id": farmer_id } }),
    );
    assert_eq!(all_back["meta"]["count"], 3);
}

#[test]
fn bulk_assignment_reports_every_busy_box() {
    let temp = setup_mill();
    let root = temp.path();
    let first = create_farmer(root, "Salah");
    let second = create_farmer(root, "Mounira");

    run_cli(
        root,
        json!({ "action": "box_assign_bulk", "payload": { "farmer_id": first, "box_ids": [2, 5] } }),
    );

    let (ok, body) = run_cli_raw(
        root,
        &json!({ "action": "box_assign_bulk", "payload": { "farmer_id": second, "box_ids": [2, 3, 5] } }),
    );
    assert!(!ok);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["code"], "conflict");
    assert_eq!(body["error"]["details"]["box_ids"], json!([2, 5]));
    assert_eq!(body["next_actions"][0]["action"], "box_list");

    // Nothing from the failed request was applied.
    let box_three = run_cli(root, json!({ "action": "box_get", "payload": { "box_id": 3 } }));
    assert_eq!(box_three["data"]["status"], "AVAILABLE");
}

#[test]
fn bulk_assignment_respects_inventory_limits() {
    let temp = setup_mill();
    let root = temp.path();
    let farmer_id = create_farmer(root, "Salah");

    let (ok, body) = run_cli_raw(
        root,
        &json!({
            "action": "box_assign_bulk",
            "payload": { "farmer_id": farmer_id, "ranges": [{ "start": 15, "end": 25 }] }
        }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "validation");

    let (ok, body) = run_cli_raw(
        root,
        &json!({
            "action": "box_assign_bulk",
            "payload": { "farmer_id": farmer_id, "ranges": [{ "start": 1, "end": 11 }] }
        }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "validation");
}

#[test]
fn chkara_sacks_reuse_freed_ids_above_inventory() {
    let temp = setup_mill();
    let root = temp.path();
    let farmer_id = create_farmer(root, "Salah");

    let created = run_cli(
        root,
        json!({ "action": "box_assign_bulk", "payload": { "farmer_id": farmer_id, "chkara_count": 3 } }),
    );
    assert_eq!(created["data"]["created_chkara"], json!([21, 22, 23]));
    assert_eq!(created["data"]["assigned"][0]["kind"], "chkara");

    // Inventory boxes cannot be deleted, busy sacks neither.
    let (ok, body) = run_cli_raw(root, &json!({ "action": "box_delete", "payload": { "box_id": 4 } }));
    assert!(!ok);
    assert_eq!(body["error"]["code"], "validation");
    let (ok, body) = run_cli_raw(root, &json!({ "action": "box_delete", "payload": { "box_id": 22 } }));
    assert!(!ok);
    assert_eq!(body["error"]["code"], "conflict");

    run_cli(root, json!({ "action": "box_release", "payload": { "box_id": 22 } }));
    run_cli(root, json!({ "action": "box_delete", "payload": { "box_id": 22 } }));

    let refill = run_cli(
        root,
        json!({ "action": "box_assign_bulk", "payload": { "farmer_id": farmer_id, "chkara_count": 2 } }),
    );
    assert_eq!(refill["data"]["created_chkara"], json!([22, 24]));
}

#[test]
fn unknown_box_is_not_found() {
    let temp = setup_mill();
    let (ok, body) = run_cli_raw(
        temp.path(),
        &json!({ "action": "box_get", "payload": { "box_id": 99 } }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "not_found");
}
