//! Vendor adapters

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use chathub_core::chat::{ChatRole, Message};

/// Fold system messages into user turns for vendors without a native
/// system role.
///
/// System content lands at the beginning of the first user message,
/// separated by a blank line; when a system message arrives before any
/// user message, a user turn carrying the system text is synthesized.
/// The returned turns contain only `User` and `Assistant` roles.
pub(crate) fn fold_system_messages(messages: &[Message]) -> Vec<(ChatRole, String)> {
    let mut out: Vec<(ChatRole, String)> = Vec::new();
    let mut pending_system: Vec<String> = Vec::new();

    for msg in messages {
        match msg.role {
            ChatRole::System => {
                if let Some((_, content)) =
                    out.iter_mut().find(|(role, _)| *role == ChatRole::User)
                {
                    *content = format!("{}\n\n{}", msg.content, content);
                } else {
                    pending_system.push(msg.content.clone());
                }
            }
            ChatRole::User => {
                if pending_system.is_empty() {
                    out.push((ChatRole::User, msg.content.clone()));
                } else {
                    out.push((
                        ChatRole::User,
                        format!("{}\n\n{}", pending_system.join("\n\n"), msg.content),
                    ));
                    pending_system.clear();
                }
            }
            ChatRole::Assistant => {
                if !pending_system.is_empty() {
                    out.push((ChatRole::User, pending_system.join("\n\n")));
                    pending_system.clear();
                }
                out.push((ChatRole::Assistant, msg.content.clone()));
            }
        }
    }

    if !pending_system.is_empty() {
        out.push((ChatRole::User, pending_system.join("\n\n")));
    }

    out
}
