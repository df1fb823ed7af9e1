//! Booking form hand-off
//!
//! The tool only asks the host to open its booking form. Whatever the user
//! does with the form comes back later as a plain agent message.

use super::{Tool, ToolContext, ToolOutput};
use crate::host::{BookingPrefill, HostSignal};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct BookAppointmentTool;

#[async_trait]
impl Tool for BookAppointmentTool {
    type Input = BookingPrefill;

    fn name(&self) -> &'static str {
        "book_appointment"
    }

    fn description(&self) -> String {
        "Open the appointment booking form for the user, pre-filled with any details they have already shared.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "string"},
                "gender": {"type": "string"},
                "phone": {"type": "string"},
                "date": {"type": "string", "description": "Preferred date, YYYY-MM-DD"},
                "time": {"type": "string", "description": "Preferred time, HH:MM"},
                "reason": {"type": "string", "description": "Reason for the visit"}
            }
        })
    }

    async fn run(&self, prefill: &BookingPrefill, ctx: ToolContext) -> ToolOutput {
        let output = match &prefill.reason {
            Some(reason) => format!("Opened booking form for {reason}"),
            None => "Opened booking form".to_string(),
        };
        ctx.signal(HostSignal::OpenBookingForm {
            prefill: prefill.clone(),
        });
        ToolOutput::success(output)
    }
}
