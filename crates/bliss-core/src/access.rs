use std::collections::HashSet;

use crate::config::BotConfig;
use crate::menu::ChatKind;

/// Operator allow-list and optional group/channel scoping.
#[derive(Clone, Debug, Default)]
pub struct Access {
    operators: HashSet<i64>,
    allowed_chats: HashSet<i64>,
}

impl Access {
    pub fn new(
        operators: impl IntoIterator<Item = i64>,
        allowed_chats: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            operators: operators.into_iter().collect(),
            allowed_chats: allowed_chats.into_iter().collect(),
        }
    }

    pub fn from_config(cfg: &BotConfig) -> Self {
        Self::new(
            cfg.authorized_ids.iter().copied(),
            cfg.allowed_chats.iter().copied(),
        )
    }

    pub fn is_operator(&self, user_id: i64) -> bool {
        self.operators.contains(&user_id)
    }

    /// Private chats are never scoped; groups and channels must be listed once the list is non-empty.
    pub fn permits_chat(&self, chat_id: i64, kind: ChatKind) -> bool {
        !kind.is_scoped() || self.allowed_chats.is_empty() || self.allowed_chats.contains(&chat_id)
    }
}
