use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Acknowledgement that a flow instance started.
#[derive(Debug, Clone, Serialize)]
pub struct HeadRecord {
    pub id: Uuid,
    pub flow_name: String,
    pub version: String,
    pub report_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_flow_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_step_id: Option<i64>,
}

/// Terminal summary of a flow instance, emitted exactly once on flush.
#[derive(Debug, Clone, Serialize)]
pub struct FlowRecord {
    pub success: bool,
    pub flow_name: String,
    pub version: String,
    pub id: Uuid,
    pub report_time: u64,
    /// `(step index, duration ms)` pairs in execution order.
    pub steps: Vec<(i64, u64)>,
    /// Human readable failure reason, empty on success.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub err_msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_flow_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_step_id: Option<i64>,
}

/// Side-channel payload tied to an instance's current position.
#[derive(Debug, Clone, Serialize)]
pub struct DataRecord {
    pub id: Uuid,
    pub flow_name: String,
    pub version: String,
    pub last_step_id: i64,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub report_time: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LogRecord {
    Head(HeadRecord),
    Flow(FlowRecord),
    Data(DataRecord),
}

/// Milliseconds since the unix epoch, for `report_time` fields.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
