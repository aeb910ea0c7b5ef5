use super::Services;
use crate::command::context::CommandContext;
use crate::command::domain::{
    classify_error, parse_payload, BatchItem, BatchItemResult, BatchOutput, BatchPayload,
    CommandAction, CommandOutcome, CommandStatus, InvalidRequest, RequestOptions, ResponseMeta,
    BATCH_VERSION,
};
use anyhow::Result;
use huilerie_batch_ref::resolve_batch_refs;
use huilerie_protocol::ErrorEnvelope;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::time::Instant;

pub(super) async fn run(
    services: &Services,
    payload: Value,
    options: &RequestOptions,
    ctx: &CommandContext,
) -> Result<CommandOutcome> {
    let BatchPayload {
        stop_on_error,
        items,
    } = parse_payload(payload)?;
    if items.is_empty() {
        return Err(InvalidRequest("batch needs at least one item".to_string()).into());
    }

    let mut runner = BatchRunner::new(stop_on_error);
    for item in items {
        if !runner.run_item(services, item, options, ctx).await {
            runner.output.stopped = true;
            break;
        }
    }

    let failed = runner
        .output
        .items
        .iter()
        .filter(|item| item.status == CommandStatus::Error)
        .count();
    log::debug!(
        "batch finished: {} items, {failed} failed, stopped={}",
        runner.output.items.len(),
        runner.output.stopped
    );

    let item_count = runner.output.items.len();
    let mut outcome = CommandOutcome::from_value(runner.output)?;
    outcome.meta.batch_items = Some(item_count);
    Ok(outcome)
}

struct BatchRunner {
    stop_on_error: bool,
    seen_ids: HashSet<String>,
    ref_context: Value,
    output: BatchOutput,
}

impl BatchRunner {
    fn new(stop_on_error: bool) -> Self {
        Self {
            stop_on_error,
            seen_ids: HashSet::new(),
            ref_context: json!({ "items": Value::Object(Map::new()) }),
            output: BatchOutput {
                version: BATCH_VERSION,
                items: Vec::new(),
                stopped: false,
            },
        }
    }

    /// Returns false when the batch must stop after this item.
    async fn run_item(
        &mut self,
        services: &Services,
        item: BatchItem,
        options: &RequestOptions,
        ctx: &CommandContext,
    ) -> bool {
        let id = item.id.trim().to_string();
        if id.is_empty() {
            return self.push_rejected(item.id, item.action, "Batch item id must not be empty");
        }
        if !self.seen_ids.insert(id.clone()) {
            let message = format!("Duplicate batch item id: '{id}'");
            return self.push_rejected(id, item.action, &message);
        }
        if item.action == CommandAction::Batch {
            return self.push_rejected(id, item.action, "batch items cannot contain another batch");
        }

        let payload = match resolve_batch_refs(item.payload, &self.ref_context) {
            Ok(value) => value,
            Err(err) => {
                let message = format!("Ref resolution error: {err}");
                return self.push_rejected(id, item.action, &message);
            }
        };

        let started = Instant::now();
        let result = services.route_item(item.action, payload, options, ctx).await;
        let duration_ms = Some(started.elapsed().as_millis() as u64);

        let processed = match result {
            Ok(outcome) => BatchItemResult {
                id,
                action: item.action,
                status: CommandStatus::Ok,
                message: None,
                error: None,
                data: outcome.data,
                meta: ResponseMeta {
                    duration_ms,
                    ..outcome.meta
                },
            },
            Err(err) => {
                let mut failed = error_item(id, item.action, &err);
                failed.meta.duration_ms = duration_ms;
                failed
            }
        };
        self.push(processed)
    }

    fn push_rejected(&mut self, id: String, action: CommandAction, message: &str) -> bool {
        let err = anyhow::Error::new(InvalidRequest(message.to_string()));
        self.push(error_item(id, action, &err))
    }

    fn push(&mut self, item: BatchItemResult) -> bool {
        let failed = item.status == CommandStatus::Error;
        if let Some(items) = self
            .ref_context
            .get_mut("items")
            .and_then(Value::as_object_mut)
        {
            items.insert(
                item.id.clone(),
                json!({
                    "action": item.action,
                    "status": item.status,
                    "message": item.message,
                    "data": item.data,
                }),
            );
        }
        self.output.items.push(item);
        !(self.stop_on_error && failed)
    }
}

fn error_item(id: String, action: CommandAction, err: &anyhow::Error) -> BatchItemResult {
    let message = format!("{err:#}");
    let classification = classify_error(err, Some(action));
    BatchItemResult {
        id,
        action,
        status: CommandStatus::Error,
        message: Some(message.clone()),
        error: Some(ErrorEnvelope {
            code: classification.code,
            message,
            details: classification.details,
            hint: classification.hint,
            next_actions: classification.next_actions,
        }),
        data: Value::Null,
        meta: ResponseMeta::default(),
    }
}
