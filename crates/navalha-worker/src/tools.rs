// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool calls the AI responder may request during a completion.
//!
//! The wire gives us a free-form (name, JSON input) pair; parsing it into
//! the [`ToolCall`] tagged union happens before anything executes, so an
//! unknown name or a bad argument shape is a typed error, never a silent
//! no-op. Execution goes through the injected [`SchedulingBackend`].

use serde::Deserialize;
use thiserror::Error;

use navalha_core::traits::{BookingRequest, SchedulingBackend, ToolSpec};
use navalha_core::NavalhaError;

/// Why a tool request could not be turned into a [`ToolCall`].
#[derive(Debug, Error)]
pub enum ToolError {
    /// The responder asked for a tool we never offered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The input did not match the tool's schema.
    #[error("invalid input for tool {tool}: {message}")]
    InvalidInput { tool: String, message: String },
}

/// A fully parsed, executable tool request.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    ListServices,
    CheckAvailability {
        date: String,
        service: String,
    },
    BookAppointment {
        date: String,
        time: String,
        service: String,
        customer_name: String,
    },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ListServicesInput {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckAvailabilityInput {
    date: String,
    service: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BookAppointmentInput {
    date: String,
    time: String,
    service: String,
    customer_name: String,
}

impl ToolCall {
    /// Parse a (name, input) pair from the responder into a tool call.
    pub fn parse(name: &str, input: &serde_json::Value) -> Result<Self, ToolError> {
        let invalid = |message: String| ToolError::InvalidInput {
            tool: name.to_string(),
            message,
        };

        match name {
            "list_services" => {
                let _: ListServicesInput =
                    serde_json::from_value(input.clone()).map_err(|e| invalid(e.to_string()))?;
                Ok(Self::ListServices)
            }
            "check_availability" => {
                let input: CheckAvailabilityInput =
                    serde_json::from_value(input.clone()).map_err(|e| invalid(e.to_string()))?;
                Ok(Self::CheckAvailability {
                    date: input.date,
                    service: input.service,
                })
            }
            "book_appointment" => {
                let input: BookAppointmentInput =
                    serde_json::from_value(input.clone()).map_err(|e| invalid(e.to_string()))?;
                Ok(Self::BookAppointment {
                    date: input.date,
                    time: input.time,
                    service: input.service,
                    customer_name: input.customer_name,
                })
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Execute against the scheduling backend, returning the JSON string
    /// fed back to the responder as the tool result.
    pub async fn execute(
        self,
        backend: &dyn SchedulingBackend,
        salon_id: i64,
        customer_phone: &str,
    ) -> Result<String, NavalhaError> {
        match self {
            Self::ListServices => {
                let services = backend.list_services(salon_id).await?;
                serde_json::to_string(&services)
                    .map_err(|e| NavalhaError::Internal(format!("tool result encoding: {e}")))
            }
            Self::CheckAvailability { date, service } => {
                let slots = backend.check_availability(salon_id, &date, &service).await?;
                serde_json::to_string(&slots)
                    .map_err(|e| NavalhaError::Internal(format!("tool result encoding: {e}")))
            }
            Self::BookAppointment {
                date,
                time,
                service,
                customer_name,
            } => {
                let confirmation = backend
                    .book_appointment(
                        salon_id,
                        BookingRequest {
                            date,
                            time,
                            service,
                            customer_name,
                            customer_phone: customer_phone.to_string(),
                        },
                    )
                    .await?;
                serde_json::to_string(&confirmation)
                    .map_err(|e| NavalhaError::Internal(format!("tool result encoding: {e}")))
            }
        }
    }
}

/// The tool schema advertised to the responder.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "list_services".to_string(),
            description: "Lista os serviços oferecidos pelo salão, com duração e preço."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolSpec {
            name: "check_availability".to_string(),
            description: "Consulta os horários livres para um serviço em uma data.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "date": { "type": "string", "description": "Data no formato AAAA-MM-DD" },
                    "service": { "type": "string", "description": "Nome do serviço" }
                },
                "required": ["date", "service"]
            }),
        },
        ToolSpec {
            name: "book_appointment".to_string(),
            description: "Agenda um horário para o cliente.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "date": { "type": "string", "description": "Data no formato AAAA-MM-DD" },
                    "time": { "type": "string", "description": "Horário, por exemplo 14:30" },
                    "service": { "type": "string", "description": "Nome do serviço" },
                    "customer_name": { "type": "string", "description": "Nome do cliente" }
                },
                "required": ["date", "time", "service", "customer_name"]
            }),
        },
    ]
}
