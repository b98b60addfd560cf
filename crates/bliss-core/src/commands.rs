use std::sync::Arc;

use tracing::{info, warn};

use crate::access::Access;
use crate::builds::BuildResolver;
use crate::cache::{CatalogCache, RefreshOutcome};
use crate::config::BotConfig;
use crate::error::FetchError;
use crate::menu::{CallbackOutcome, ChatKind, Menu};
use crate::render::{self, Reply};

const START_TEXT: &str = "Hey there, I'm Bliss Bot!\n\nUse <code>/help</code> to check the list of available commands.\nType <code>/bliss</code> {codename} to get BlissROMs for your device.";
const HELP_TEXT: &str = "Available commands:\n\n<code>/bliss</code> {codename}: Check latest version available for your device.\n<code>/list</code>: Check the current list of officially supported devices.";
const USAGE_TEXT: &str =
    "Please mention the device codename after <code>/bliss</code>. Eg: <code>/bliss Z01R</code>";
const UNKNOWN_DEVICE_TEXT: &str = "Bliss ROM for the specified device does not exist!\nUse <code>/list</code> to check the supported device list";
const LIST_FAILED_TEXT: &str = "Sorry, the device list could not be fetched!";
const UNAUTHORIZED_TEXT: &str = "You are not authorized to use this command!";
const REFRESHED_TEXT: &str = "Refreshed devices successfully!";
const UP_TO_DATE_TEXT: &str = "Device list is already up to date.";
const REFRESH_FAILED_TEXT: &str = "Sorry, the device list could not be refreshed right now.";
const OUT_OF_SCOPE_TEXT: &str = "This bot is not available in this chat.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    List,
    Bliss { codename: Option<String> },
    Refresh,
}

impl Command {
    /// Parses `/name[@bot] [args]`. Anything else is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?.strip_prefix('/')?;
        let name = head.split_once('@').map_or(head, |(name, _)| name);
        let command = match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "list" => Command::List,
            "bliss" => Command::Bliss {
                codename: parts.next().map(str::to_string),
            },
            "refresh" => Command::Refresh,
            _ => return None,
        };
        Some(command)
    }
}

/// Who sent a message or pressed a button, and where.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub user_id: i64,
    pub chat_id: i64,
    pub chat: ChatKind,
}

/// Entry point for the chat transport: commands in, replies out.
#[derive(Clone)]
pub struct Assistant {
    cache: Arc<CatalogCache>,
    menu: Menu,
    access: Access,
}

impl Assistant {
    pub fn new(cache: Arc<CatalogCache>, resolver: BuildResolver, access: Access) -> Self {
        let menu = Menu::new(Arc::clone(&cache), resolver);
        Self {
            cache,
            menu,
            access,
        }
    }

    pub fn from_config(cfg: &BotConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            Arc::new(CatalogCache::from_config(cfg)?),
            BuildResolver::from_config(cfg)?,
            Access::from_config(cfg),
        ))
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    /// Returns `None` for text that is not a known command.
    pub async fn handle_message(&self, inv: &Invocation, text: &str) -> Option<Reply> {
        let command = Command::parse(text)?;
        if !self.access.permits_chat(inv.chat_id, inv.chat) {
            info!("Rejected {:?} from unlisted chat {}", command, inv.chat_id);
            return Some(Reply::plain(OUT_OF_SCOPE_TEXT));
        }
        Some(self.handle_command(inv, command).await)
    }

    pub async fn handle_command(&self, inv: &Invocation, command: Command) -> Reply {
        match command {
            Command::Start => Reply::html(START_TEXT),
            Command::Help => Reply::html(HELP_TEXT),
            Command::List => self.list().await,
            Command::Bliss { codename: None } => Reply::html(USAGE_TEXT),
            Command::Bliss {
                codename: Some(codename),
            } => self.lookup(&codename).await,
            Command::Refresh => self.refresh(inv.user_id).await,
        }
    }

    pub async fn handle_callback(&self, inv: &Invocation, token: &str) -> CallbackOutcome {
        if !self.access.permits_chat(inv.chat_id, inv.chat) {
            return CallbackOutcome::Ignore;
        }
        self.menu.press(token, inv.chat).await
    }

    async fn list(&self) -> Reply {
        match self.cache.load().await {
            Ok(catalog) => render::device_list(&catalog),
            Err(err) => {
                warn!("Device list unavailable: {}", err);
                Reply::plain(LIST_FAILED_TEXT)
            }
        }
    }

    async fn lookup(&self, codename: &str) -> Reply {
        let catalog = match self.cache.load().await {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!("Device list unavailable for '{}': {}", codename, err);
                return Reply::plain(LIST_FAILED_TEXT);
            }
        };
        match catalog.get(codename) {
            Some(entry) => self.menu.device_menu(entry).await,
            None => Reply::html(UNKNOWN_DEVICE_TEXT),
        }
    }

    async fn refresh(&self, user_id: i64) -> Reply {
        if !self.access.is_operator(user_id) {
            warn!("Refresh denied for user {}", user_id);
            return Reply::plain(UNAUTHORIZED_TEXT);
        }
        info!("Refresh requested by operator {}", user_id);
        match self.cache.refresh().await {
            Ok(RefreshOutcome::Replaced) => Reply::plain(REFRESHED_TEXT),
            Ok(RefreshOutcome::Unchanged) => Reply::plain(UP_TO_DATE_TEXT),
            Err(err) => {
                warn!("Operator refresh failed: {}", err);
                Reply::plain(REFRESH_FAILED_TEXT)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builds::tests::{resolver_for, Z01R_VANILLA};
    use crate::catalog::tests::SAMPLE_CATALOG;
    use crate::config::ChangeDetection;
    use crate::fetch::{http_client, CatalogFetcher};
    use crate::render::{ButtonAction, ParseMode};
    use crate::testing::{Route, StubServer};
    use std::time::Duration;
    use tempfile::TempDir;

    const OPERATOR: i64 = 7;
    const PRIVATE: Invocation = Invocation {
        user_id: 1,
        chat_id: 1,
        chat: ChatKind::Private,
    };

    async fn assistant(routes: Vec<Route>) -> (Assistant, StubServer, TempDir) {
        let server = StubServer::start(routes).await;
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CatalogFetcher::new(
            http_client("bliss-test", Duration::from_secs(5)).unwrap(),
            server.url("/devices.json"),
        );
        let cache = Arc::new(CatalogCache::new(
            fetcher,
            dir.path().join("devices.json"),
            ChangeDetection::Size,
        ));
        let assistant = Assistant::new(
            cache,
            resolver_for(&server),
            Access::new([OPERATOR], [-100]),
        );
        (assistant, server, dir)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help@BlissBot"), Some(Command::Help));
        assert_eq!(
            Command::parse("/bliss  Z01R extra"),
            Some(Command::Bliss {
                codename: Some("Z01R".into())
            })
        );
        assert_eq!(
            Command::parse("/bliss"),
            Some(Command::Bliss { codename: None })
        );
        assert_eq!(Command::parse("/LIST"), Some(Command::List));
        assert_eq!(Command::parse("/refresh"), Some(Command::Refresh));
        assert_eq!(Command::parse("bliss Z01R"), None);
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[tokio::test]
    async fn end_to_end_lookup_and_build_display() {
        let (assistant, _server, _dir) = assistant(vec![
            Route::ok("/devices.json", SAMPLE_CATALOG),
            Route::ok("/api/Z01R/vanilla/", Z01R_VANILLA),
        ])
        .await;

        let menu = assistant
            .handle_message(&PRIVATE, "/bliss Z01R")
            .await
            .unwrap();
        assert_eq!(menu.parse_mode, ParseMode::Html);
        assert!(menu.text.contains("<strong>Device:</strong> ASUS ZenFone"));
        assert!(menu.text.contains("<strong>Maintainer:</strong> alice"));
        assert!(menu.text.contains("<strong>Support:</strong> t.me/x"));
        let first = &menu.keyboard.as_ref().unwrap().rows[0][0];
        assert_eq!(first.label, "Vanilla Build");
        let ButtonAction::Callback(token) = &first.action else {
            panic!("expected callback button");
        };

        let CallbackOutcome::Edit(build) = assistant.handle_callback(&PRIVATE, token).await else {
            panic!("expected edit");
        };
        assert!(build.text.contains("<strong>Device:</strong> ASUS ZenFone"));
        assert!(build.text.contains("<strong>Build Date:</strong> 14-11-2023"));
        assert!(build.text.contains("<strong>Build Size:</strong> 2 GiB"));
        assert!(build.text.contains("<strong>Build Version:</strong> 21.0"));
        assert_eq!(
            build.keyboard.unwrap().rows[0][0].action,
            ButtonAction::Url("https://dl.example/Z01R-vanilla.zip".into())
        );
    }

    #[tokio::test]
    async fn lookup_edge_cases() {
        let (assistant, _server, _dir) =
            assistant(vec![Route::ok("/devices.json", SAMPLE_CATALOG)]).await;
        let usage = assistant.handle_message(&PRIVATE, "/bliss").await.unwrap();
        assert_eq!(usage.text, USAGE_TEXT);
        let unknown = assistant
            .handle_message(&PRIVATE, "/bliss z01r")
            .await
            .unwrap();
        assert_eq!(unknown.text, UNKNOWN_DEVICE_TEXT);
        assert!(assistant.handle_message(&PRIVATE, "hello").await.is_none());
    }

    #[tokio::test]
    async fn list_enumerates_catalog_or_apologises() {
        let (assistant, server, _dir) =
            assistant(vec![Route::new("/devices.json", 502, "")]).await;
        let failed = assistant.handle_message(&PRIVATE, "/list").await.unwrap();
        assert_eq!(failed.text, LIST_FAILED_TEXT);

        server.set_route(Route::ok("/devices.json", SAMPLE_CATALOG));
        let list = assistant.handle_message(&PRIVATE, "/list").await.unwrap();
        assert_eq!(
            list.text,
            "<strong>Device List:</strong>\n\nASUS ZenFone (<code>Z01R</code>)\nXiaomi POCO F1 (<code>beryllium</code>)\n"
        );
        assert_eq!(
            list.keyboard.unwrap().rows,
            vec![vec![crate::render::Button::callback(
                "Close",
                &crate::menu::MenuState::Closed
            )]]
        );
    }

    #[tokio::test]
    async fn refresh_requires_operator() {
        let (assistant, server, _dir) =
            assistant(vec![Route::ok("/devices.json", SAMPLE_CATALOG)]).await;
        let denied = assistant.handle_message(&PRIVATE, "/refresh").await.unwrap();
        assert_eq!(denied.text, UNAUTHORIZED_TEXT);
        assert_eq!(server.hits("/devices.json"), 0);

        let operator = Invocation {
            user_id: OPERATOR,
            ..PRIVATE
        };
        let first = assistant.handle_message(&operator, "/refresh").await.unwrap();
        assert_eq!(first.text, REFRESHED_TEXT);
        let second = assistant.handle_message(&operator, "/refresh").await.unwrap();
        assert_eq!(second.text, UP_TO_DATE_TEXT);

        server.set_route(Route::new("/devices.json", 500, ""));
        let failed = assistant.handle_message(&operator, "/refresh").await.unwrap();
        assert_eq!(failed.text, REFRESH_FAILED_TEXT);
    }

    #[tokio::test]
    async fn unlisted_groups_are_refused() {
        let (assistant, server, _dir) =
            assistant(vec![Route::ok("/devices.json", SAMPLE_CATALOG)]).await;
        let outsider = Invocation {
            user_id: 1,
            chat_id: -999,
            chat: ChatKind::Group,
        };
        let reply = assistant.handle_message(&outsider, "/list").await.unwrap();
        assert_eq!(reply.text, OUT_OF_SCOPE_TEXT);
        assert_eq!(
            assistant.handle_callback(&outsider, "close").await,
            CallbackOutcome::Ignore
        );
        assert_eq!(server.hits("/devices.json"), 0);

        let member = Invocation {
            chat_id: -100,
            ..outsider
        };
        let reply = assistant.handle_message(&member, "/list").await.unwrap();
        assert!(reply.text.starts_with("<strong>Device List:</strong>"));
    }
}
