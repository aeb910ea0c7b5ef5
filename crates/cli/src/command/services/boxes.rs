use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandAction, CommandOutcome, HintKind};
use anyhow::Result;
use huilerie_domain::{BoxKind, BulkAssignment, DomainError};
use huilerie_store::BoxFilter;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct SeedPayload {
    #[serde(default)]
    box_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BoxRef {
    box_id: u32,
}

#[derive(Debug, Deserialize)]
struct SetKindPayload {
    box_id: u32,
    kind: BoxKind,
}

#[derive(Debug, Deserialize)]
struct AssignPayload {
    farmer_id: i64,
    box_id: u32,
}

#[derive(Debug, Deserialize)]
struct WeighPayload {
    box_id: u32,
    weight_kg: f64,
}

#[derive(Debug, Deserialize)]
struct FarmerRef {
    farmer_id: i64,
}

pub(crate) struct BoxService;

impl BoxService {
    pub async fn seed(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let SeedPayload { box_count } = parse_payload(payload)?;
        let configured = ctx.config().inventory.box_count;
        let box_count = box_count.unwrap_or(configured);
        if box_count > configured {
            return Err(DomainError::validation(format!(
                "box_count {box_count} exceeds inventory.box_count {configured}"
            ))
            .into());
        }
        let (inserted, counts) = ctx
            .with_store(move |store| {
                let inserted = store.seed_inventory(box_count)?;
                Ok((inserted, store.box_counts()?))
            })
            .await?;
        CommandOutcome::from_value(json!({
            "box_count": box_count,
            "inserted": inserted,
            "counts": counts,
        }))
    }

    pub async fn list(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let filter: BoxFilter = parse_payload(payload)?;
        let boxes = ctx.with_store(move |store| store.list_boxes(&filter)).await?;
        CommandOutcome::from_list(boxes)
    }

    pub async fn get(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let BoxRef { box_id } = parse_payload(payload)?;
        let record = ctx.with_store(move |store| store.get_box(box_id)).await?;
        CommandOutcome::from_value(record)
    }

    pub async fn set_kind(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let SetKindPayload { box_id, kind } = parse_payload(payload)?;
        let record = ctx
            .with_store(move |store| store.set_box_kind(box_id, kind))
            .await?;
        CommandOutcome::from_value(record)
    }

    pub async fn assign(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let AssignPayload { farmer_id, box_id } = parse_payload(payload)?;
        let record = ctx
            .with_store(move |store| store.assign_box(farmer_id, box_id))
            .await?;
        Ok(CommandOutcome::from_value(record)?.with_next_action(
            CommandAction::BoxWeigh,
            json!({ "box_id": box_id }),
            "Record the weight once the box is filled: add weight_kg (kg, greater than zero).",
        ))
    }

    pub async fn assign_bulk(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let request: BulkAssignment = parse_payload(payload)?;
        let limits = ctx.config().assignment_limits();
        let outcome = ctx
            .with_store(move |store| store.assign_boxes_bulk(&request, limits))
            .await?;
        let assigned = outcome.assigned.len();
        let created = outcome.created_chkara.len();
        let mut result = CommandOutcome::from_value(outcome)?;
        result.meta.count = Some(assigned);
        if created > 0 {
            result = result.with_hint(
                HintKind::Info,
                format!("{created} new chkara sack(s) created above the inventory range"),
            );
        }
        Ok(result)
    }

    pub async fn weigh(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let WeighPayload { box_id, weight_kg } = parse_payload(payload)?;
        let record = ctx
            .with_store(move |store| store.weigh_box(box_id, weight_kg))
            .await?;
        CommandOutcome::from_value(record)
    }

    pub async fn release(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let BoxRef { box_id } = parse_payload(payload)?;
        let record = ctx.with_store(move |store| store.release_box(box_id)).await?;
        CommandOutcome::from_value(record)
    }

    pub async fn release_farmer(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let FarmerRef { farmer_id } = parse_payload(payload)?;
        let released = ctx
            .with_store(move |store| store.release_farmer_boxes(farmer_id))
            .await?;
        let count = released.len();
        let mut outcome = CommandOutcome::from_value(json!({
            "farmer_id": farmer_id,
            "released": released,
        }))?;
        outcome.meta.count = Some(count);
        Ok(outcome)
    }

    pub async fn delete(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let BoxRef { box_id } = parse_payload(payload)?;
        ctx.with_store(move |store| store.delete_box(box_id)).await?;
        CommandOutcome::from_value(json!({ "box_id": box_id, "deleted": true }))
    }
}
