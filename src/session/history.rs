//! Shaping a transcript for the model.

use super::{Message, Role};
use crate::llm::{Content, ContentRole};

/// Separator placed between merged same-role turns.
pub const MERGE_SEPARATOR: &str = "\n\n";

/// Collapse a transcript into strictly alternating user/model entries.
///
/// The conversational API rejects two consecutive entries with the same role,
/// so runs of same-role turns are joined (in order, blank-line separated)
/// instead of dropped.
pub fn merge_history(messages: &[Message]) -> Vec<Content> {
    let mut merged: Vec<Content> = Vec::with_capacity(messages.len());

    for message in messages {
        let role = content_role(message.role);
        match merged.last_mut() {
            Some(last) if last.role == role => {
                last.text.push_str(MERGE_SEPARATOR);
                last.text.push_str(&message.content);
            }
            _ => merged.push(Content {
                role,
                text: message.content.clone(),
            }),
        }
    }

    merged
}

/// Flatten a transcript into `ROLE: content` lines for evaluation prompts.
pub fn flatten_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn content_role(role: Role) -> ContentRole {
    match role {
        Role::User => ContentRole::User,
        Role::Assistant => ContentRole::Model,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn transcript(turns: &[(Role, &str)]) -> Vec<Message> {
        turns
            .iter()
            .map(|(role, text)| match role {
                Role::User => Message::user(*text),
                Role::Assistant => Message::assistant(*text),
            })
            .collect()
    }

    #[test]
    fn test_empty_history() {
        assert!(merge_history(&[]).is_empty());
    }

    #[test]
    fn test_single_turn_unchanged() {
        let merged = merge_history(&transcript(&[(Role::Assistant, "Welcome")]));
        assert_eq!(merged, vec![Content::model("Welcome")]);
    }

    #[test]
    fn test_alternating_history_untouched() {
        let merged = merge_history(&transcript(&[
            (Role::User, "idea"),
            (Role::Assistant, "question"),
            (Role::User, "answer"),
        ]));
        assert_eq!(
            merged,
            vec![
                Content::user("idea"),
                Content::model("question"),
                Content::user("answer"),
            ]
        );
    }

    #[test]
    fn test_consecutive_turns_merged_in_order() {
        let merged = merge_history(&transcript(&[
            (Role::User, "a"),
            (Role::Assistant, "b"),
            (Role::Assistant, "c"),
            (Role::Assistant, "d"),
            (Role::User, "e"),
            (Role::User, "f"),
        ]));
        assert_eq!(
            merged,
            vec![
                Content::user("a"),
                Content::model("b\n\nc\n\nd"),
                Content::user("e\n\nf"),
            ]
        );
    }

    #[test]
    fn test_no_adjacent_roles_and_text_preserved() {
        let roles = [
            Role::User,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::Assistant,
            Role::User,
            Role::User,
            Role::User,
        ];
        let messages: Vec<Message> = roles
            .iter()
            .enumerate()
            .map(|(i, role)| match role {
                Role::User => Message::user(format!("u{}", i)),
                Role::Assistant => Message::assistant(format!("a{}", i)),
            })
            .collect();

        let merged = merge_history(&messages);

        for pair in merged.windows(2) {
            assert_ne!(pair[0].role, pair[1].role);
        }

        let input: String = messages.iter().map(|m| m.content.as_str()).collect();
        let output: String = merged
            .iter()
            .map(|c| c.text.replace(MERGE_SEPARATOR, ""))
            .collect();
        assert_eq!(input, output);
    }

    #[test]
    fn test_flatten_transcript() {
        let text = flatten_transcript(&transcript(&[
            (Role::User, "coffee shop"),
            (Role::Assistant, "Who are your customers?"),
        ]));
        assert_eq!(text, "USER: coffee shop\nASSISTANT: Who are your customers?");
    }
}
