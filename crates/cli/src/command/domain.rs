use anyhow::Result;
use huilerie_domain::DomainError;
use huilerie_protocol::{error_codes, ErrorEnvelope, NextAction};
use huilerie_store::StoreError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

pub const BATCH_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub action: CommandAction,
    #[serde(default = "empty_payload")]
    pub payload: Value,
    #[serde(default)]
    pub options: Option<RequestOptions>,
}

impl CommandRequest {
    pub fn new(action: CommandAction, payload: Value) -> Self {
        Self {
            action,
            payload,
            options: None,
        }
    }
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Capabilities,
    Batch,
    FarmerCreate,
    FarmerUpdate,
    FarmerGet,
    FarmerList,
    FarmerDelete,
    BoxSeed,
    BoxList,
    BoxGet,
    BoxSetKind,
    BoxAssign,
    BoxAssignBulk,
    BoxWeigh,
    BoxRelease,
    BoxReleaseFarmer,
    BoxDelete,
    SessionCreate,
    SessionGet,
    SessionList,
    SessionUpdate,
    SessionDelete,
    PaymentRecord,
    PaymentList,
    FarmerBalance,
    GroupCreate,
    GroupList,
    CollectorCreate,
    CollectorList,
    CollectionRecord,
    CollectionList,
    GroupSummary,
    EmployeeCreate,
    EmployeeList,
    EmployeeUpdate,
    AttendanceMark,
    AttendanceList,
    AdvanceRecord,
    Payroll,
    Dashboard,
    FarmerStatement,
    SessionReceipt,
}

impl CommandAction {
    pub const ALL: [CommandAction; 42] = [
        CommandAction::Capabilities,
        CommandAction::Batch,
        CommandAction::FarmerCreate,
        CommandAction::FarmerUpdate,
        CommandAction::FarmerGet,
        CommandAction::FarmerList,
        CommandAction::FarmerDelete,
        CommandAction::BoxSeed,
        CommandAction::BoxList,
        CommandAction::BoxGet,
        CommandAction::BoxSetKind,
        CommandAction::BoxAssign,
        CommandAction::BoxAssignBulk,
        CommandAction::BoxWeigh,
        CommandAction::BoxRelease,
        CommandAction::BoxReleaseFarmer,
        CommandAction::BoxDelete,
        CommandAction::SessionCreate,
        CommandAction::SessionGet,
        CommandAction::SessionList,
        CommandAction::SessionUpdate,
        CommandAction::SessionDelete,
        CommandAction::PaymentRecord,
        CommandAction::PaymentList,
        CommandAction::FarmerBalance,
        CommandAction::GroupCreate,
        CommandAction::GroupList,
        CommandAction::CollectorCreate,
        CommandAction::CollectorList,
        CommandAction::CollectionRecord,
        CommandAction::CollectionList,
        CommandAction::GroupSummary,
        CommandAction::EmployeeCreate,
        CommandAction::EmployeeList,
        CommandAction::EmployeeUpdate,
        CommandAction::AttendanceMark,
        CommandAction::AttendanceList,
        CommandAction::AdvanceRecord,
        CommandAction::Payroll,
        CommandAction::Dashboard,
        CommandAction::FarmerStatement,
        CommandAction::SessionReceipt,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CommandAction::Capabilities => "capabilities",
            CommandAction::Batch => "batch",
            CommandAction::FarmerCreate => "farmer_create",
            CommandAction::FarmerUpdate => "farmer_update",
            CommandAction::FarmerGet => "farmer_get",
            CommandAction::FarmerList => "farmer_list",
            CommandAction::FarmerDelete => "farmer_delete",
            CommandAction::BoxSeed => "box_seed",
            CommandAction::BoxList => "box_list",
            CommandAction::BoxGet => "box_get",
            CommandAction::BoxSetKind => "box_set_kind",
            CommandAction::BoxAssign => "box_assign",
            CommandAction::BoxAssignBulk => "box_assign_bulk",
            CommandAction::BoxWeigh => "box_weigh",
            CommandAction::BoxRelease => "box_release",
            CommandAction::BoxReleaseFarmer => "box_release_farmer",
            CommandAction::BoxDelete => "box_delete",
            CommandAction::SessionCreate => "session_create",
            CommandAction::SessionGet => "session_get",
            CommandAction::SessionList => "session_list",
            CommandAction::SessionUpdate => "session_update",
            CommandAction::SessionDelete => "session_delete",
            CommandAction::PaymentRecord => "payment_record",
            CommandAction::PaymentList => "payment_list",
            CommandAction::FarmerBalance => "farmer_balance",
            CommandAction::GroupCreate => "group_create",
            CommandAction::GroupList => "group_list",
            CommandAction::CollectorCreate => "collector_create",
            CommandAction::CollectorList => "collector_list",
            CommandAction::CollectionRecord => "collection_record",
            CommandAction::CollectionList => "collection_list",
            CommandAction::GroupSummary => "group_summary",
            CommandAction::EmployeeCreate => "employee_create",
            CommandAction::EmployeeList => "employee_list",
            CommandAction::EmployeeUpdate => "employee_update",
            CommandAction::AttendanceMark => "attendance_mark",
            CommandAction::AttendanceList => "attendance_list",
            CommandAction::AdvanceRecord => "advance_record",
            CommandAction::Payroll => "payroll",
            CommandAction::Dashboard => "dashboard",
            CommandAction::FarmerStatement => "farmer_statement",
            CommandAction::SessionReceipt => "session_receipt",
        }
    }

    /// Actions that write to the store. A successful one invalidates cached
    /// dashboard results.
    pub const fn is_mutating(self) -> bool {
        matches!(
            self,
            CommandAction::FarmerCreate
                | CommandAction::FarmerUpdate
                | CommandAction::FarmerDelete
                | CommandAction::BoxSeed
                | CommandAction::BoxSetKind
                | CommandAction::BoxAssign
                | CommandAction::BoxAssignBulk
                | CommandAction::BoxWeigh
                | CommandAction::BoxRelease
                | CommandAction::BoxReleaseFarmer
                | CommandAction::BoxDelete
                | CommandAction::SessionCreate
                | CommandAction::SessionUpdate
                | CommandAction::SessionDelete
                | CommandAction::PaymentRecord
                | CommandAction::GroupCreate
                | CommandAction::CollectorCreate
                | CommandAction::CollectionRecord
                | CommandAction::EmployeeCreate
                | CommandAction::EmployeeUpdate
                | CommandAction::AttendanceMark
                | CommandAction::AdvanceRecord
        )
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RequestOptions {
    /// Skip the dashboard cache for this request
    #[serde(default)]
    pub no_cache: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchPayload {
    #[serde(default)]
    pub stop_on_error: bool,
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Deserialize)]
pub struct BatchItem {
    pub id: String,
    pub action: CommandAction,
    #[serde(default = "empty_payload")]
    pub payload: Value,
}

#[derive(Debug, Serialize, Clone)]
pub struct BatchItemResult {
    pub id: String,
    pub action: CommandAction,
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize, Clone)]
pub struct BatchOutput {
    pub version: u32,
    pub items: Vec<BatchItemResult>,
    /// True when `stop_on_error` cut the batch short
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<NextAction>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: ResponseMeta,
}

impl CommandResponse {
    pub fn is_error(&self) -> bool {
        matches!(self.status, CommandStatus::Error)
    }

    /// Error response for a failure that happened before routing (bad JSON,
    /// unreadable input).
    pub fn from_error(err: &anyhow::Error, action: Option<CommandAction>) -> Self {
        let message = format!("{err:#}");
        let classification = classify_error(err, action);
        let hint = classification
            .hint
            .clone()
            .or_else(|| classification.hints.first().map(|h| h.text.clone()));
        CommandResponse {
            status: CommandStatus::Error,
            message: Some(message.clone()),
            error: Some(ErrorEnvelope {
                code: classification.code,
                message,
                details: classification.details,
                hint,
                next_actions: classification.next_actions.clone(),
            }),
            hints: classification.hints,
            next_actions: classification.next_actions,
            data: Value::Null,
            meta: ResponseMeta::default(),
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, Clone)]
pub struct Hint {
    #[serde(rename = "type")]
    pub kind: HintKind,
    pub text: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    Info,
    Cache,
    Action,
}

#[derive(Debug, Serialize, Default, Clone)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_items: Option<usize>,
}

pub struct CommandOutcome {
    pub data: Value,
    pub hints: Vec<Hint>,
    pub meta: ResponseMeta,
    pub next_actions: Vec<NextAction>,
}

impl CommandOutcome {
    pub fn from_value<T: Serialize>(value: T) -> Result<Self> {
        Ok(Self {
            data: serde_json::to_value(value)?,
            hints: Vec::new(),
            meta: ResponseMeta::default(),
            next_actions: Vec::new(),
        })
    }

    /// Wrap a list result and record its length in `meta.count`.
    pub fn from_list<T: Serialize>(items: Vec<T>) -> Result<Self> {
        let count = items.len();
        let mut outcome = Self::from_value(items)?;
        outcome.meta.count = Some(count);
        Ok(outcome)
    }

    pub fn with_hint(mut self, kind: HintKind, text: impl Into<String>) -> Self {
        self.hints.push(Hint {
            kind,
            text: text.into(),
        });
        self
    }

    pub fn with_next_action(mut self, action: CommandAction, args: Value, reason: &str) -> Self {
        self.next_actions.push(NextAction {
            action: action.as_str().to_string(),
            args,
            reason: reason.to_string(),
        });
        self
    }
}

/// Malformed request: bad payload shape, unsupported nesting, bad arguments.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct InvalidRequest(pub String);

pub fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|err| InvalidRequest(format!("Invalid payload: {err}")).into())
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub code: String,
    pub hint: Option<String>,
    pub hints: Vec<Hint>,
    pub details: Option<Value>,
    pub next_actions: Vec<NextAction>,
}

impl ErrorClassification {
    fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            hint: None,
            hints: Vec::new(),
            details: None,
            next_actions: Vec::new(),
        }
    }

    fn hint(mut self, text: &str) -> Self {
        self.hints.push(Hint {
            kind: HintKind::Action,
            text: text.to_string(),
        });
        self
    }

    fn next(mut self, action: CommandAction, args: Value, reason: &str) -> Self {
        self.next_actions.push(NextAction {
            action: action.as_str().to_string(),
            args,
            reason: reason.to_string(),
        });
        self
    }
}

/// Map an error to a stable code plus recovery hints.
pub fn classify_error(err: &anyhow::Error, action: Option<CommandAction>) -> ErrorClassification {
    let mut classification = if let Some(store) = err.chain().find_map(|e| e.downcast_ref::<StoreError>()) {
        classify_store_error(store)
    } else if let Some(domain) = err.chain().find_map(|e| e.downcast_ref::<DomainError>()) {
        classify_domain_error(domain)
    } else if err.chain().any(|e| {
        e.downcast_ref::<InvalidRequest>().is_some() || e.downcast_ref::<serde_json::Error>().is_some()
    }) {
        ErrorClassification::new(error_codes::INVALID_REQUEST)
            .hint("Check the request against the Command API schema (see action=capabilities).")
    } else {
        ErrorClassification::new(error_codes::INTERNAL)
    };

    if classification.code == error_codes::INVALID_REQUEST && action != Some(CommandAction::Capabilities) {
        classification = classification.next(
            CommandAction::Capabilities,
            json!({}),
            "List the supported actions.",
        );
    }

    classification.hint = classification.hints.first().map(|h| h.text.clone());
    classification
}

fn classify_store_error(err: &StoreError) -> ErrorClassification {
    match err {
        StoreError::Domain(domain) => classify_domain_error(domain),
        StoreError::NotFound { entity, id } => {
            let classification = ErrorClassification::new(error_codes::NOT_FOUND);
            let classification = ErrorClassification {
                details: Some(json!({ "entity": entity, "id": id })),
                ..classification
            };
            match *entity {
                "Farmer" => classification.next(
                    CommandAction::FarmerList,
                    json!({}),
                    "Look up the farmer id.",
                ),
                "Box" => classification.next(
                    CommandAction::BoxList,
                    json!({}),
                    "List known boxes.",
                ),
                "Session" => classification.next(
                    CommandAction::SessionList,
                    json!({}),
                    "Look up the session id.",
                ),
                _ => classification,
            }
        }
        StoreError::Conflict(_) => ErrorClassification::new(error_codes::CONFLICT),
        StoreError::Sqlite(_) | StoreError::Corrupt(_) | StoreError::Io(_) | StoreError::Poisoned => {
            ErrorClassification::new(error_codes::INTERNAL)
                .hint("Check the database path and file permissions (--db / HUILERIE_DB).")
        }
    }
}

fn classify_domain_error(err: &DomainError) -> ErrorClassification {
    if !err.is_conflict() {
        return ErrorClassification::new(error_codes::VALIDATION);
    }
    let classification = ErrorClassification::new(error_codes::CONFLICT);
    match err {
        DomainError::BoxesNotAvailable { ids } => ErrorClassification {
            details: Some(json!({ "box_ids": ids })),
            ..classification
        }
        .hint("Remove the listed boxes from the request or release them first.")
        .next(
            CommandAction::BoxList,
            json!({ "status": "AVAILABLE" }),
            "Pick from the available boxes.",
        ),
        DomainError::BoxNotAvailable(id) => classification.next(
            CommandAction::BoxGet,
            json!({ "box_id": id }),
            "See who holds the box.",
        ),
        DomainError::BoxNotInUse(id) => classification.next(
            CommandAction::BoxGet,
            json!({ "box_id": id }),
            "Check the box status.",
        ),
        DomainError::Overpayment { .. } => {
            classification.hint("Pay at most the outstanding amount of the session.")
        }
        _ => classification,
    }
}
