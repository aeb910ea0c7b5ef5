use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandOutcome, HintKind, RequestOptions};
use anyhow::Result;
use huilerie_domain::DateRange;
use serde_json::Value;

pub(crate) struct DashboardService;

impl DashboardService {
    pub async fn run(
        &self,
        payload: Value,
        options: &RequestOptions,
        ctx: &CommandContext,
    ) -> Result<CommandOutcome> {
        let range: DateRange = parse_payload(payload)?;
        let range = range.validated()?;
        let key = range.cache_key();

        if !options.no_cache {
            if let Some(cached) = ctx.dashboard_cache().get(&key) {
                let mut outcome = CommandOutcome::from_value(cached)?
                    .with_hint(HintKind::Cache, "Served from the dashboard cache");
                outcome.meta.cache_hit = Some(true);
                return Ok(outcome);
            }
        }

        let generation = ctx.dashboard_cache().generation();
        let metrics = ctx.with_store(move |store| store.dashboard(range)).await?;
        let data = serde_json::to_value(&metrics)?;
        ctx.dashboard_cache().insert(&key, data.clone(), generation);

        let mut outcome = CommandOutcome::from_value(data)?;
        outcome.meta.cache_hit = Some(false);
        Ok(outcome)
    }
}
