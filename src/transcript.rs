use crate::markup::Markup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Bot => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            content: content.into(),
        }
    }

    /// Bot text gets the inline markup transform; user text never does.
    pub fn markup(&self) -> Markup {
        match self.sender {
            Sender::User => Markup::plain(&self.content),
            Sender::Bot => Markup::parse(&self.content),
        }
    }

    /// `<strong>You:</strong> ...` with the body escaped.
    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"message {}\"><div class=\"message-content\"><strong>{}:</strong> {}</div></div>",
            match self.sender {
                Sender::User => "user",
                Sender::Bot => "bot",
            },
            self.sender.label(),
            self.markup().to_html()
        )
    }
}

/// Append-only, in display order.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
