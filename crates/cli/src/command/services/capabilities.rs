use crate::command::context::CommandContext;
use crate::command::domain::{CommandAction, CommandOutcome};
use anyhow::Result;
use huilerie_protocol::{
    error_envelope_schema, Capabilities, CapabilitiesServer, CapabilitiesVersions, DefaultLimits,
    NextAction, CAPABILITIES_SCHEMA_VERSION, COMMAND_API_VERSION,
};
use huilerie_store::DEFAULT_LIST_LIMIT;
use serde_json::json;

pub(crate) struct CapabilitiesService;

impl CapabilitiesService {
    pub fn run(&self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let config = ctx.config();
        let output = Capabilities {
            schema_version: CAPABILITIES_SCHEMA_VERSION,
            server: CapabilitiesServer {
                name: "huilerie".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            versions: CapabilitiesVersions {
                command_api: COMMAND_API_VERSION.to_string(),
                capabilities_schema: CAPABILITIES_SCHEMA_VERSION,
            },
            limits: DefaultLimits {
                box_count: config.inventory.box_count,
                max_bulk_boxes: config.inventory.max_bulk_boxes,
                list_limit: DEFAULT_LIST_LIMIT,
            },
            actions: CommandAction::ALL
                .iter()
                .map(|action| action.as_str().to_string())
                .collect(),
            start_route: NextAction {
                action: CommandAction::Dashboard.as_str().to_string(),
                args: json!({}),
                reason: "Overview of boxes, sessions and balances.".to_string(),
            },
        };

        let mut outcome = CommandOutcome::from_value(output)?;
        if let Some(data) = outcome.data.as_object_mut() {
            data.insert("error_schema".to_string(), error_envelope_schema()?);
        }
        Ok(outcome)
    }
}
