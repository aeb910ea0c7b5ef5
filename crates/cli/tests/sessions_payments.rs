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
    body
}

/// A mill with one small farmer holding boxes 1 (40 kg) and 2 (60 kg).
fn setup_session_ready() -> (tempfile::TempDir, i64) {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(
        root.join("huilerie.toml"),
        "[inventory]\nbox_count = 20\n\n[pricing]\nsmall_price_per_kg = 200\nlarge_price_per_kg = 180\n",
    )
    .unwrap();
    run_cli(root, json!({ "action": "box_seed" }));
    let farmer = run_cli(
        root,
        json!({ "action": "farmer_create", "payload": { "name": "Hedi", "kind": "small" } }),
    );
    let farmer_id = farmer["data"]["id"].as_i64().expect("farmer id");
    run_cli(
        root,
        json!({ "action": "box_assign_bulk", "payload": { "farmer_id": farmer_id, "box_ids": [1, 2] } }),
    );
    run_cli(root, json!({ "action": "box_weigh", "payload": { "box_id": 1, "weight_kg": 40.0 } }));
    run_cli(root, json!({ "action": "box_weigh", "payload": { "box_id": 2, "weight_kg": 60.0 } }));
    (temp, farmer_id)
}

fn create_session(root: &Path, farmer_id: i64) -> Value {
    run_cli(
        root,
        json!({
            "action": "session_create",
            "payload": {
                "farmer_id": farmer_id,
                "box_ids": [1, 2],
                "oil_weight_kg": 20.0,
                "processing_date": "2025-11-20"
            }
        }),
    )
}

#[test]
fn session_totals_and_releases_boxes() {
    let (temp, farmer_id) = setup_session_ready();
    let root = temp.path();

    let session = create_session(root, farmer_id);
    let data = &session["data"];
    assert_eq!(data["olive_weight_kg"], 100.0);
    assert_eq!(data["oil_yield_percent"], 20.0);
    assert_eq!(data["price_per_kg"], 200);
    assert_eq!(data["total_price"], 20_000);
    assert_eq!(data["payment_status"], "unpaid");
    assert_eq!(data["boxes"].as_array().map(Vec::len), Some(2));
    assert_eq!(session["next_actions"][0]["action"], "payment_record");

    let box_one = run_cli(root, json!({ "action": "box_get", "payload": { "box_id": 1 } }));
    assert_eq!(box_one["data"]["status"], "AVAILABLE");
    assert_eq!(box_one["data"]["weight_kg"], Value::Null);
}

#[test]
fn session_needs_weighed_boxes_of_the_farmer() {
    let (temp, farmer_id) = setup_session_ready();
    let root = temp.path();

    let (ok, body) = run_cli_raw(
        root,
        &json!({
            "action": "session_create",
            "payload": { "farmer_id": farmer_id, "box_ids": [1, 3], "oil_weight_kg": 5.0 }
        }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "conflict");

    let (ok, body) = run_cli_raw(
        root,
        &json!({
            "action": "session_create",
            "payload": { "farmer_id": farmer_id, "box_ids": [1, 1], "oil_weight_kg": 5.0 }
        }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "validation");
}

#[test]
fn payments_move_status_to_paid_and_block_overpayment() {
    let (temp, farmer_id) = setup_session_ready();
    let root = temp.path();
    let session_id = create_session(root, farmer_id)["data"]["id"]
        .as_i64()
        .expect("session id");

    let first = run_cli(
        root,
        json!({ "action": "payment_record", "payload": { "session_id": session_id, "amount": 5_000, "method": " cash " } }),
    );
    assert_eq!(first["data"]["method"], "cash");

    let partial = run_cli(root, json!({ "action": "session_get", "payload": { "session_id": session_id } }));
    assert_eq!(partial["data"]["payment_status"], "partial");
    assert_eq!(partial["data"]["outstanding"], 15_000);

    let (ok, body) = run_cli_raw(
        root,
        &json!({ "action": "payment_record", "payload": { "session_id": session_id, "amount": 15_001 } }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "conflict");

    run_cli(
        root,
        json!({ "action": "payment_record", "payload": { "session_id": session_id, "amount": 15_000 } }),
    );
    let balance = run_cli(root, json!({ "action": "farmer_balance", "payload": { "farmer_id": farmer_id } }));
    assert_eq!(balance["data"]["total_owed"], 20_000);
    assert_eq!(balance["data"]["total_paid"], 20_000);
    assert_eq!(balance["data"]["outstanding"], 0);
    assert_eq!(balance["data"]["status"], "paid");

    let paid = run_cli(
        root,
        json!({ "action": "session_list", "payload": { "payment_status": "paid" } }),
    );
    assert_eq!(paid["meta"]["count"], 1);

    let payments = run_cli(
        root,
        json!({ "action": "payment_list", "payload": { "session_id": session_id } }),
    );
    assert_eq!(payments["meta"]["count"], 2);
}

#[test]
fn paid_sessions_cannot_shrink_or_disappear() {
    let (temp, farmer_id) = setup_session_ready();
    let root = temp.path();
    let session_id = create_session(root, farmer_id)["data"]["id"]
        .as_i64()
        .expect("session id");
    run_cli(
        root,
        json!({ "action": "payment_record", "payload": { "session_id": session_id, "amount": 18_000 } }),
    );

    let (ok, body) = run_cli_raw(
        root,
        &json!({ "action": "session_update", "payload": { "id": session_id, "price_per_kg": 150 } }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "conflict");

    let updated = run_cli(
        root,
        json!({ "action": "session_update", "payload": { "id": session_id, "oil_weight_kg": 25.0 } }),
    );
    assert_eq!(updated["data"]["oil_yield_percent"], 25.0);
    assert_eq!(updated["data"]["total_price"], 20_000);

    let (ok, body) = run_cli_raw(
        root,
        &json!({ "action": "session_delete", "payload": { "session_id": session_id } }),
    );
    assert!(!ok);
    assert_eq!(body["error"]["code"], "conflict");
}

#[test]
fn farmer_override_price_wins_over_tier() {
    let (temp, farmer_id) = setup_session_ready();
    let root = temp.path();
    run_cli(
        root,
        json!({ "action": "farmer_update", "payload": { "id": farmer_id, "price_per_kg": 150 } }),
    );
    let session = create_session(root, farmer_id);
    assert_eq!(session["data"]["price_per_kg"], 150);
    assert_eq!(session["data"]["total_price"], 15_000);
}
