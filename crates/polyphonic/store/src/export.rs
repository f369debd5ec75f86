//! Export views for sharing conversations outside the store.
//!
//! Produces the flattened [`ShareableConversation`] form and a plain
//! markdown rendering. Nothing here talks to external services.

use polyphonic_types::{Conversation, MessageRole, ShareableConversation, SharedMessage};

/// Flatten a conversation into its export form.
pub fn to_shareable(conversation: &Conversation) -> ShareableConversation {
    let messages = conversation
        .messages
        .iter()
        .map(|message| match &message.role {
            MessageRole::User => SharedMessage {
                role: "user".to_string(),
                content: message.content.clone(),
                model: None,
            },
            MessageRole::Assistant { model } => SharedMessage {
                role: "assistant".to_string(),
                content: message.content.clone(),
                model: Some(model.clone()),
            },
            MessageRole::System => SharedMessage {
                role: "system".to_string(),
                content: message.content.clone(),
                model: None,
            },
        })
        .collect();

    ShareableConversation {
        id: conversation.id.clone(),
        title: conversation.title.clone(),
        messages,
        resonance: conversation.resonance,
        timestamp: conversation.updated_at,
    }
}

/// Render an export view as markdown.
pub fn render_markdown(shareable: &ShareableConversation) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", shareable.title));
    out.push_str(&format!(
        "Resonance: {:.2} (exported {})\n\n",
        shareable.resonance,
        shareable.timestamp.format("%Y-%m-%d %H:%M UTC")
    ));
    for message in &shareable.messages {
        let speaker = match &message.model {
            Some(model) => model.to_string(),
            None => message.role.clone(),
        };
        out.push_str(&format!("**{}**: {}\n\n", speaker, message.content));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyphonic_types::{default_models, Message, ModelId};

    fn sample_conversation() -> Conversation {
        let mut conversation = Conversation::new("Shared thoughts", default_models());
        conversation.add_message(Message::user("what do you think?"));
        conversation.add_message(Message::assistant(ModelId::new("gpt-4"), "I think yes"));
        conversation.resonance = 0.73;
        conversation
    }

    #[test]
    fn shareable_flattens_the_model_out_of_the_role() {
        let conversation = sample_conversation();
        let shareable = to_shareable(&conversation);

        assert_eq!(shareable.title, "Shared thoughts");
        assert_eq!(shareable.resonance, 0.73);
        assert_eq!(shareable.messages.len(), 2);
        assert_eq!(shareable.messages[0].role, "user");
        assert_eq!(shareable.messages[0].model, None);
        assert_eq!(shareable.messages[1].role, "assistant");
        assert_eq!(shareable.messages[1].model, Some(ModelId::new("gpt-4")));
    }

    #[test]
    fn markdown_names_the_model_as_speaker() {
        let shareable = to_shareable(&sample_conversation());
        let markdown = render_markdown(&shareable);

        assert!(markdown.starts_with("# Shared thoughts"));
        assert!(markdown.contains("Resonance: 0.73"));
        assert!(markdown.contains("**user**: what do you think?"));
        assert!(markdown.contains("**gpt-4**: I think yes"));
    }
}
