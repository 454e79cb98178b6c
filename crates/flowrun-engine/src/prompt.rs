use flowrun_llm::Message;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// The system/user message pair sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Sections are always query, knowledge context, web context, in that order.
    /// Nothing is truncated here.
    pub fn build(system: Option<&str>, query: &str, knowledge: &str, web: &str) -> Self {
        let mut user = format!("User Query: {}", query);

        if !knowledge.is_empty() {
            user.push_str("\n\nContext from Knowledge Base:\n");
            user.push_str(knowledge);
        }

        if !web.is_empty() {
            user.push_str("\n\n");
            user.push_str(web);
        }

        Self {
            system: system.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string(),
            user,
        }
    }

    pub fn into_messages(self) -> Vec<Message> {
        vec![Message::system(self.system), Message::human(self.user)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_only() {
        let prompt = Prompt::build(None, "hi", "", "");
        assert_eq!(prompt.system, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(prompt.user, "User Query: hi");
    }

    #[test]
    fn test_sections_in_order() {
        let prompt = Prompt::build(
            Some("Be terse."),
            "what is x?",
            "x is 1",
            "\n\nWeb Search Results:\nTitle: X",
        );

        assert_eq!(prompt.system, "Be terse.");
        assert_eq!(
            prompt.user,
            "User Query: what is x?\n\nContext from Knowledge Base:\nx is 1\n\n\n\nWeb Search Results:\nTitle: X"
        );

        let q = prompt.user.find("what is x?").unwrap();
        let k = prompt.user.find("x is 1").unwrap();
        let w = prompt.user.find("Web Search Results").unwrap();
        assert!(q < k && k < w);
    }

    #[test]
    fn test_web_without_knowledge() {
        let prompt = Prompt::build(None, "q", "", "[Web Search Failed: No SERP API Key provided]");
        assert_eq!(
            prompt.user,
            "User Query: q\n\n[Web Search Failed: No SERP API Key provided]"
        );
    }

    #[test]
    fn test_messages_are_system_then_user() {
        let messages = Prompt::build(None, "q", "", "").into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role(), "system");
        assert_eq!(messages[1].role(), "user");
    }
}
