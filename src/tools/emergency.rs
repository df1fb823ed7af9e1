//! Emergency escalation signal

use super::{Tool, ToolContext, ToolOutput};
use crate::host::HostSignal;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct EmergencyProtocolTool;

#[async_trait]
impl Tool for EmergencyProtocolTool {
    type Input = ();

    fn name(&self) -> &'static str {
        "emergency_protocol"
    }

    fn description(&self) -> String {
        "Show emergency guidance and contacts. Use immediately for red-flag symptoms such as chest pain, difficulty breathing, stroke signs, severe bleeding or loss of consciousness.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn run(&self, _input: &(), ctx: ToolContext) -> ToolOutput {
        tracing::warn!(session_id = %ctx.session_id, "Emergency protocol triggered");
        ctx.signal(HostSignal::SurfaceEmergency);
        ToolOutput::success("Emergency guidance shown")
    }
}
