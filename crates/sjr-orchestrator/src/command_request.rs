use std::fmt;

/// Slash-command payload decoded once per inbound call.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub token: String,
    pub command: String,
    pub text: String,
    pub user_name: String,
    pub channel_name: String,
    pub response_url: String,
}

impl CommandRequest {
    pub fn requester(&self) -> &str {
        &self.user_name
    }

    /// `user in channel`, used in logs.
    pub fn requester_with_channel(&self) -> String {
        format!("{} in {}", self.user_name, self.channel_name)
    }
}

impl fmt::Debug for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRequest")
            .field("token", &"<redacted>")
            .field("command", &self.command)
            .field("text", &self.text)
            .field("user_name", &self.user_name)
            .field("channel_name", &self.channel_name)
            .field("response_url", &self.response_url)
            .finish()
    }
}
