//! Callback tokens and the navigation between device menu, build display and close.
//!
//! Token grammar (at most 64 bytes, the callback payload limit):
//!
//! ```text
//! token    = "close" | verb "#" codename
//! verb     = "back" | "vanilla" | "gapps" | "pixelgapps" | "foss"
//! codename = 1*(any char except "#" and whitespace)
//! ```
//!
//! `back#c` names the device menu of `c`; a variant verb names that variant's build display.

use std::{fmt, str::FromStr, sync::Arc};

use tracing::{debug, warn};

use crate::builds::{BuildResolver, Variant};
use crate::cache::CatalogCache;
use crate::catalog::DeviceEntry;
use crate::error::InvalidToken;
use crate::render::{self, Reply};

pub const MAX_TOKEN_LEN: usize = 64;
const BACK_VERB: &str = "back";
const CLOSE_TOKEN: &str = "close";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuState {
    DeviceMenu { codename: String },
    BuildDisplay { codename: String, variant: Variant },
    Closed,
}

impl MenuState {
    pub fn encode(&self) -> String {
        match self {
            MenuState::DeviceMenu { codename } => format!("{BACK_VERB}#{codename}"),
            MenuState::BuildDisplay { codename, variant } => {
                format!("{}#{}", variant.slug(), codename)
            }
            MenuState::Closed => CLOSE_TOKEN.to_string(),
        }
    }

    pub fn decode(token: &str) -> Result<Self, InvalidToken> {
        let invalid = || InvalidToken {
            token: token.to_string(),
        };
        if token.len() > MAX_TOKEN_LEN {
            return Err(invalid());
        }
        if token == CLOSE_TOKEN {
            return Ok(MenuState::Closed);
        }
        let (verb, codename) = token.split_once('#').ok_or_else(invalid)?;
        if !valid_codename(codename) {
            return Err(invalid());
        }
        let codename = codename.to_string();
        if verb == BACK_VERB {
            return Ok(MenuState::DeviceMenu { codename });
        }
        let variant = Variant::from_slug(verb).ok_or_else(invalid)?;
        Ok(MenuState::BuildDisplay { codename, variant })
    }

}

impl fmt::Display for MenuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for MenuState {
    type Err = InvalidToken;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        MenuState::decode(token)
    }
}

fn valid_codename(codename: &str) -> bool {
    !codename.is_empty() && !codename.chars().any(|c| c == '#' || c.is_whitespace())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

impl ChatKind {
    pub fn is_scoped(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Channel)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Replace the pressed message with this reply.
    Edit(Reply),
    /// Remove the pressed message. `origin` also asks for the command message that
    /// opened the menu; the transport checks it is allowed to before acting.
    Delete { origin: bool },
    /// Stale or malformed callback; leave the message as is.
    Ignore,
}

/// Computes the next screen for a callback from the cached catalog and fresh build lookups.
#[derive(Clone)]
pub struct Menu {
    cache: Arc<CatalogCache>,
    resolver: BuildResolver,
}

impl Menu {
    pub fn new(cache: Arc<CatalogCache>, resolver: BuildResolver) -> Self {
        Self { cache, resolver }
    }

    /// Device menu for an entry, offering only variants that currently have a build.
    pub async fn device_menu(&self, entry: &DeviceEntry) -> Reply {
        let builds = self.resolver.resolve_all(&entry.codename).await;
        render::device_menu(entry, &builds)
    }

    pub async fn press(&self, token: &str, chat: ChatKind) -> CallbackOutcome {
        match MenuState::decode(token) {
            Ok(state) => self.transition(state, chat).await,
            Err(err) => {
                debug!("Ignoring callback: {}", err);
                CallbackOutcome::Ignore
            }
        }
    }

    pub async fn transition(&self, state: MenuState, chat: ChatKind) -> CallbackOutcome {
        match state {
            MenuState::Closed => CallbackOutcome::Delete {
                origin: chat.is_scoped(),
            },
            MenuState::DeviceMenu { codename } => match self.cache.lookup(&codename).await {
                Some(entry) => CallbackOutcome::Edit(self.device_menu(&entry).await),
                None => vanished(&codename),
            },
            MenuState::BuildDisplay { codename, variant } => {
                let Some(entry) = self.cache.lookup(&codename).await else {
                    return vanished(&codename);
                };
                match self.resolver.resolve(&codename, variant).await {
                    Some(build) => {
                        CallbackOutcome::Edit(render::build_display(&entry, variant, &build))
                    }
                    None => CallbackOutcome::Edit(render::build_unavailable(&codename, variant)),
                }
            }
        }
    }
}

fn vanished(codename: &str) -> CallbackOutcome {
    warn!("Callback for '{}' no longer in catalog; dropping message", codename);
    CallbackOutcome::Delete { origin: false }
}
