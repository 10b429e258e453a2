//! Merging recalled memories into the conversation.

use crate::types::{Message, Role};

/// System-prompt block presenting recalled memories to the model.
pub fn memory_context(memories: &[String]) -> String {
    let listed: Vec<String> = memories.iter().map(|m| format!("- {}", m)).collect();
    format!(
        "LONG-TERM MEMORY RETRIEVED:\n{}\n\nUse this information if it is relevant.",
        listed.join("\n")
    )
}

/// Put `memories` into the conversation's system prompt.
///
/// With no memories the messages are returned untouched. Otherwise the
/// context is appended to a leading system message, or a new system
/// message is inserted at the front, so the list grows by at most one.
pub fn augment_messages(mut messages: Vec<Message>, memories: &[String]) -> Vec<Message> {
    if memories.is_empty() {
        return messages;
    }

    let context = memory_context(memories);
    match messages.first_mut() {
        Some(first) if first.role == Role::System => {
            first.content.push_str("\n\n");
            first.content.push_str(&context);
        }
        _ => messages.insert(0, Message::system(context)),
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memories(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_no_memories_leaves_messages_unchanged() {
        let input = vec![
            Message::system("Be terse."),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("What is AION?"),
        ];
        assert_eq!(augment_messages(input.clone(), &[]), input);
    }

    #[test]
    fn test_inserts_system_message_when_missing() {
        let input = vec![Message::user("hi"), Message::assistant("hello"), Message::user("and?")];
        let out = augment_messages(input.clone(), &memories(&["likes rust", "lives in Lisbon"]));

        assert_eq!(out.len(), input.len() + 1);
        assert_eq!(out[0].role, Role::System);
        assert!(out[0].content.contains("likes rust"));
        assert!(out[0].content.contains("lives in Lisbon"));
        assert_eq!(&out[1..], input.as_slice());
    }

    #[test]
    fn test_appends_to_existing_system_message() {
        let input = vec![Message::system("Be terse."), Message::user("What is AION?")];
        let out = augment_messages(input.clone(), &memories(&["AION is a cognitive OS"]));

        assert_eq!(out.len(), input.len());
        assert_eq!(out[0].role, Role::System);
        assert!(out[0].content.starts_with("Be terse.\n\n"));
        assert!(out[0].content.contains("AION is a cognitive OS"));
        assert_eq!(out[1], input[1]);
    }

    #[test]
    fn test_exactly_one_system_message_at_front() {
        let out = augment_messages(vec![Message::user("q")], &memories(&["m"]));
        let systems = out.iter().filter(|m| m.role == Role::System).count();
        assert_eq!(systems, 1);
        assert_eq!(out[0].role, Role::System);
    }

    #[test]
    fn test_later_system_message_is_not_merged() {
        let input = vec![Message::user("q"), Message::system("late")];
        let out = augment_messages(input, &memories(&["m"]));
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].content, "late");
    }

    #[test]
    fn test_context_lists_every_memory() {
        let context = memory_context(&memories(&["one", "two", "three"]));
        assert!(context.contains("- one\n- two\n- three"));
        assert!(context.ends_with("Use this information if it is relevant."));
    }
}
