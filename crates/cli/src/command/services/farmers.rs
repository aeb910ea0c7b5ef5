use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandAction, CommandOutcome};
use anyhow::Result;
use huilerie_store::{FarmerFilter, FarmerUpdate, NewFarmer};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct FarmerRef {
    farmer_id: i64,
}

pub(crate) struct FarmerService;

impl FarmerService {
    pub async fn create(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let new: NewFarmer = parse_payload(payload)?;
        let farmer = ctx.with_store(move |store| store.create_farmer(new)).await?;
        let farmer_id = farmer.id;
        Ok(CommandOutcome::from_value(farmer)?.with_next_action(
            CommandAction::BoxAssignBulk,
            json!({ "farmer_id": farmer_id }),
            "Hand out boxes to the new farmer: add box_ids, ranges or chkara_count.",
        ))
    }

    pub async fn update(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let update: FarmerUpdate = parse_payload(payload)?;
        let farmer = ctx.with_store(move |store| store.update_farmer(update)).await?;
        CommandOutcome::from_value(farmer)
    }

    pub async fn get(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let FarmerRef { farmer_id } = parse_payload(payload)?;
        let farmer = ctx.with_store(move |store| store.get_farmer(farmer_id)).await?;
        CommandOutcome::from_value(farmer)
    }

    pub async fn list(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let filter: FarmerFilter = parse_payload(payload)?;
        let farmers = ctx.with_store(move |store| store.list_farmers(&filter)).await?;
        CommandOutcome::from_list(farmers)
    }

    pub async fn delete(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let FarmerRef { farmer_id } = parse_payload(payload)?;
        ctx.with_store(move |store| store.delete_farmer(farmer_id)).await?;
        CommandOutcome::from_value(json!({ "farmer_id": farmer_id, "deleted": true }))
    }
}
