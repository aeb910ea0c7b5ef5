use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandOutcome};
use anyhow::Result;
use huilerie_domain::DateRange;
use huilerie_store::{CollectionFilter, NewCollectionEntry, NewCollector, NewGroup};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct CollectorListPayload {
    #[serde(default)]
    group_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    group_id: i64,
    #[serde(flatten)]
    range: DateRange,
}

/// Collector groups and their chakra/galba ledgers.
pub(crate) struct CollectorService;

impl CollectorService {
    pub async fn create_group(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let new: NewGroup = parse_payload(payload)?;
        let group = ctx.with_store(move |store| store.create_group(new)).await?;
        CommandOutcome::from_value(group)
    }

    pub async fn list_groups(&self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let groups = ctx.with_store(|store| store.list_groups()).await?;
        CommandOutcome::from_list(groups)
    }

    pub async fn create_collector(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let new: NewCollector = parse_payload(payload)?;
        let collector = ctx.with_store(move |store| store.create_collector(new)).await?;
        CommandOutcome::from_value(collector)
    }

    pub async fn list_collectors(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let CollectorListPayload { group_id } = parse_payload(payload)?;
        let collectors = ctx
            .with_store(move |store| store.list_collectors(group_id))
            .await?;
        CommandOutcome::from_list(collectors)
    }

    pub async fn record(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let new: NewCollectionEntry = parse_payload(payload)?;
        let entry = ctx.with_store(move |store| store.record_collection(new)).await?;
        CommandOutcome::from_value(entry)
    }

    pub async fn list_entries(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let filter: CollectionFilter = parse_payload(payload)?;
        let entries = ctx
            .with_store(move |store| store.list_collections(&filter))
            .await?;
        CommandOutcome::from_list(entries)
    }

    pub async fn summary(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let SummaryPayload { group_id, range } = parse_payload(payload)?;
        let summary = ctx
            .with_store(move |store| store.group_summary(group_id, range))
            .await?;
        CommandOutcome::from_value(summary)
    }
}
