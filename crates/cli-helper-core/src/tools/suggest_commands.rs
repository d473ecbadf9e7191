//! The `suggest_commands` tool: schema sent to the model and decoder for its calls
//!
//! Arguments are checked against the same JSON schema the model was given before
//! they are decoded into a `SuggestResponse`, so a violation is reported field by
//! field instead of as a single serde message.

use std::sync::OnceLock;

use jsonschema::JSONSchema;
use serde_json::{json, Value};

use crate::core_types::SuggestResponse;
use crate::errors::AssistantError;
use crate::llm::ToolMetadata;

pub const SUGGEST_COMMANDS_TOOL: &str = "suggest_commands";

pub fn suggest_commands_metadata() -> ToolMetadata {
    ToolMetadata {
        name: SUGGEST_COMMANDS_TOOL.to_string(),
        description: "Suggest multiple bash commands to accomplish the task".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "commands": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "command": {
                                "type": "string",
                                "description": "The bash command to execute"
                            },
                            "description": {
                                "type": "string",
                                "description": "Brief description of what the command does"
                            },
                            "safety_level": {
                                "type": "string",
                                "enum": ["safe", "caution", "dangerous"],
                                "description": "Indicates the safety level of the command"
                            }
                        },
                        "required": ["command", "description", "safety_level"]
                    }
                },
                "needs_more_info": {
                    "type": "boolean",
                    "description": "Set to true if more information is needed from the user"
                },
                "follow_up_question": {
                    "type": "string",
                    "description": "Question to ask the user for additional information"
                }
            },
            "required": ["commands", "needs_more_info"]
        }),
    }
}

/// The tool schema, compiled on first use.
fn compiled_schema() -> Result<&'static JSONSchema, AssistantError> {
    static SCHEMA: OnceLock<Result<JSONSchema, String>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            let metadata = suggest_commands_metadata();
            let compiled = JSONSchema::compile(&metadata.input_schema).map_err(|e| e.to_string());
            compiled
        })
        .as_ref()
        .map_err(|e| {
            AssistantError::MalformedResponse(format!("tool schema failed to compile: {}", e))
        })
}

/// Decode the arguments of a tool call into a `SuggestResponse`.
///
/// Any other tool name, a schema violation or a type mismatch is a
/// `MalformedResponse`.
pub fn decode_suggest_response(
    tool_name: &str,
    arguments: &Value,
) -> Result<SuggestResponse, AssistantError> {
    if tool_name != SUGGEST_COMMANDS_TOOL {
        return Err(AssistantError::MalformedResponse(format!(
            "unknown tool '{}'",
            tool_name
        )));
    }

    let mut arguments = arguments.clone();
    // Some models send an explicit null for the optional question.
    if let Some(object) = arguments.as_object_mut() {
        if object.get("follow_up_question").is_some_and(Value::is_null) {
            object.remove("follow_up_question");
        }
    }

    let schema = compiled_schema()?;
    if let Err(errors) = schema.validate(&arguments) {
        let violations: Vec<String> = errors
            .map(|error| {
                let path = error.instance_path.to_string();
                if path.is_empty() {
                    error.to_string()
                } else {
                    format!("{}: {}", path, error)
                }
            })
            .collect();
        return Err(AssistantError::MalformedResponse(violations.join("; ")));
    }

    serde_json::from_value(arguments)
        .map_err(|e| AssistantError::MalformedResponse(e.to_string()))
}
