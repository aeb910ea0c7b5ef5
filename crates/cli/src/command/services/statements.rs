use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandOutcome};
use crate::report::{render_farmer_statement, render_session_receipt, FarmerStatement};
use anyhow::Result;
use chrono::NaiveDate;
use huilerie_domain::DateRange;
use huilerie_store::{PaymentFilter, SessionFilter};
use serde::Deserialize;
use serde_json::{json, Value};

// Statements cover a whole period, so the list cap sits well above the
// interactive default.
const STATEMENT_ROW_LIMIT: usize = 10_000;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatementPayload {
    farmer_id: i64,
    #[serde(default)]
    from: Option<NaiveDate>,
    #[serde(default)]
    to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct ReceiptPayload {
    session_id: i64,
}

/// Printable Markdown documents for farmers.
pub(crate) struct StatementService;

impl StatementService {
    pub async fn farmer(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let StatementPayload { farmer_id, from, to } = parse_payload(payload)?;
        let range = DateRange::new(from, to)?;
        let statement = ctx
            .with_store(move |store| {
                let farmer = store.get_farmer(farmer_id)?;
                let sessions = store.list_sessions(&SessionFilter {
                    farmer_id: Some(farmer_id),
                    range,
                    payment_status: None,
                    limit: Some(STATEMENT_ROW_LIMIT),
                })?;
                let payments = store.list_payments(&PaymentFilter {
                    farmer_id: Some(farmer_id),
                    session_id: None,
                    range,
                    limit: Some(STATEMENT_ROW_LIMIT),
                })?;
                let balance = store.farmer_balance(farmer_id)?;
                Ok(FarmerStatement {
                    farmer,
                    range,
                    sessions,
                    payments,
                    balance,
                })
            })
            .await?;

        let markdown = render_farmer_statement(&statement);
        CommandOutcome::from_value(json!({
            "farmer_id": farmer_id,
            "range": statement.range,
            "sessions": statement.sessions.len(),
            "payments": statement.payments.len(),
            "balance": statement.balance,
            "markdown": markdown,
        }))
    }

    pub async fn receipt(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let ReceiptPayload { session_id } = parse_payload(payload)?;
        let session = ctx.with_store(move |store| store.get_session(session_id)).await?;
        let markdown = render_session_receipt(&session);
        CommandOutcome::from_value(json!({
            "session_id": session_id,
            "farmer_id": session.farmer_id,
            "total_price": session.total_price,
            "outstanding": session.outstanding,
            "markdown": markdown,
        }))
    }
}
