mod context;
pub mod domain;
mod services;

pub use context::CommandContext;
pub use domain::{
    classify_error, CommandAction, CommandRequest, CommandResponse, CommandStatus, ResponseMeta,
};

use domain::{CommandOutcome, RequestOptions};
use huilerie_protocol::ErrorEnvelope;
use services::Services;
use std::time::Instant;

pub struct CommandHandler {
    services: Services,
    ctx: CommandContext,
}

impl CommandHandler {
    pub fn new(ctx: CommandContext) -> Self {
        Self {
            services: Services::new(),
            ctx,
        }
    }

    pub async fn execute(&self, request: CommandRequest) -> CommandResponse {
        let started = Instant::now();
        let CommandRequest {
            action,
            payload,
            options,
        } = request;
        let options = options.unwrap_or_default();

        let outcome = self.run(action, payload, &options).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(mut outcome) => {
                outcome.meta.duration_ms = outcome.meta.duration_ms.or(Some(duration_ms));
                CommandResponse {
                    status: CommandStatus::Ok,
                    message: None,
                    error: None,
                    hints: outcome.hints,
                    next_actions: outcome.next_actions,
                    data: outcome.data,
                    meta: outcome.meta,
                }
            }
            Err(err) => {
                let message = format!("{err:#}");
                let classification = classify_error(&err, Some(action));
                log::debug!(
                    "{} failed ({}): {message}",
                    action.as_str(),
                    classification.code
                );
                let error = ErrorEnvelope {
                    code: classification.code,
                    message: message.clone(),
                    details: classification.details,
                    hint: classification.hint,
                    next_actions: classification.next_actions.clone(),
                };
                CommandResponse {
                    status: CommandStatus::Error,
                    message: Some(message),
                    error: Some(error),
                    hints: classification.hints,
                    next_actions: classification.next_actions,
                    data: serde_json::Value::Null,
                    meta: ResponseMeta {
                        duration_ms: Some(duration_ms),
                        ..Default::default()
                    },
                }
            }
        }
    }

    async fn run(
        &self,
        action: CommandAction,
        payload: serde_json::Value,
        options: &RequestOptions,
    ) -> anyhow::Result<CommandOutcome> {
        self.services.route(action, payload, options, &self.ctx).await
    }
}
