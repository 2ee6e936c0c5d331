use crate::ai_sdk::{ContentPart, FunctionCall, ProviderMessage, ToolCallParam};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message as sent by the `useChat` frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, rename = "experimental_attachments")]
    pub attachments: Option<Vec<ClientAttachment>>,
    #[serde(default)]
    pub tool_invocations: Option<Vec<ToolInvocation>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAttachment {
    #[serde(default)]
    pub name: Option<String>,
    pub content_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: serde_json::Value,
    /// Absent while the call is still pending on the client.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

pub(crate) fn convert_to_provider_messages(messages: &[ClientMessage]) -> Vec<ProviderMessage> {
    let mut converted = Vec::with_capacity(messages.len());

    for message in messages {
        let content = content_parts(message);

        match message.role {
            Role::System => converted.push(ProviderMessage::System { content }),
            Role::User => converted.push(ProviderMessage::User { content }),
            Role::Assistant => {
                let resolved: Vec<(&ToolInvocation, &serde_json::Value)> = message
                    .tool_invocations
                    .iter()
                    .flatten()
                    .filter_map(|invocation| {
                        invocation.result.as_ref().map(|result| (invocation, result))
                    })
                    .collect();

                let tool_calls = (!resolved.is_empty()).then(|| {
                    resolved
                        .iter()
                        .map(|(invocation, _)| ToolCallParam {
                            id: invocation.tool_call_id.clone(),
                            kind: "function".to_string(),
                            function: FunctionCall {
                                name: invocation.tool_name.clone(),
                                arguments: invocation.args.to_string(),
                            },
                        })
                        .collect()
                });
                converted.push(ProviderMessage::Assistant {
                    content,
                    tool_calls,
                });

                for (invocation, result) in resolved {
                    converted.push(ProviderMessage::Tool {
                        tool_call_id: invocation.tool_call_id.clone(),
                        content: result.to_string(),
                    });
                }
            }
        }
    }

    converted
}

fn content_parts(message: &ClientMessage) -> Vec<ContentPart> {
    let mut parts = vec![ContentPart::text(message.content.as_str())];

    for attachment in message.attachments.iter().flatten() {
        if attachment.content_type.starts_with("image") {
            parts.push(ContentPart::image(attachment.url.as_str()));
        } else if attachment.content_type.starts_with("text") {
            parts.push(ContentPart::text(attachment.url.as_str()));
        } else {
            tracing::debug!(
                content_type = %attachment.content_type,
                "dropping attachment with unsupported content type"
            );
        }
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn messages(value: serde_json::Value) -> Vec<ClientMessage> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn plain_messages_keep_order_and_roles() {
        let converted = convert_to_provider_messages(&messages(json!([
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello"}
        ])));

        assert_eq!(
            converted,
            vec![
                ProviderMessage::System {
                    content: vec![ContentPart::text("be brief")]
                },
                ProviderMessage::User {
                    content: vec![ContentPart::text("hi")]
                },
                ProviderMessage::Assistant {
                    content: vec![ContentPart::text("hello")],
                    tool_calls: None,
                },
            ]
        );
    }

    #[test]
    fn attachments_become_content_parts() {
        let converted = convert_to_provider_messages(&messages(json!([{
            "role": "user",
            "content": "what is this?",
            "experimental_attachments": [
                {"name": "cat.png", "contentType": "image/png", "url": "data:image/png;base64,AAAA"},
                {"name": "notes.txt", "contentType": "text/plain", "url": "some notes"},
                {"name": "doc.pdf", "contentType": "application/pdf", "url": "data:application/pdf;base64,BBBB"}
            ]
        }])));

        assert_eq!(
            converted,
            vec![ProviderMessage::User {
                content: vec![
                    ContentPart::text("what is this?"),
                    ContentPart::image("data:image/png;base64,AAAA"),
                    ContentPart::text("some notes"),
                ]
            }]
        );
    }

    #[test]
    fn resolved_tool_invocations_expand_into_tool_messages() {
        let converted = convert_to_provider_messages(&messages(json!([
            {"role": "user", "content": "weather in Berlin?"},
            {
                "role": "assistant",
                "content": "",
                "toolInvocations": [{
                    "state": "result",
                    "toolCallId": "call_1",
                    "toolName": "get_current_weather",
                    "args": {"latitude": 52.52},
                    "result": {"temp": 72}
                }]
            }
        ])));

        assert_eq!(converted.len(), 3);
        assert_eq!(
            converted[1],
            ProviderMessage::Assistant {
                content: vec![ContentPart::text("")],
                tool_calls: Some(vec![ToolCallParam {
                    id: "call_1".to_string(),
                    kind: "function".to_string(),
                    function: FunctionCall {
                        name: "get_current_weather".to_string(),
                        arguments: r#"{"latitude":52.52}"#.to_string(),
                    },
                }]),
            }
        );
        assert_eq!(
            converted[2],
            ProviderMessage::Tool {
                tool_call_id: "call_1".to_string(),
                content: r#"{"temp":72}"#.to_string(),
            }
        );
    }

    #[test]
    fn pending_tool_invocations_are_not_sent() {
        let converted = convert_to_provider_messages(&messages(json!([{
            "role": "assistant",
            "content": "",
            "toolInvocations": [{
                "state": "call",
                "toolCallId": "call_1",
                "toolName": "get_current_weather",
                "args": {}
            }]
        }])));

        assert_eq!(
            converted,
            vec![ProviderMessage::Assistant {
                content: vec![ContentPart::text("")],
                tool_calls: None,
            }]
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = serde_json::from_value::<Vec<ClientMessage>>(json!([
            {"role": "robot", "content": "beep"}
        ]));
        assert!(result.is_err());
    }
}
