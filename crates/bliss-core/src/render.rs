//! Transport-neutral replies. The chat transport maps these onto its own message types.

use crate::builds::{Build, BuildSet, Variant};
use crate::catalog::{DeviceCatalog, DeviceEntry};
use crate::format::escape_html;
use crate::menu::MenuState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    Plain,
    Html,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(label: impl Into<String>, state: &MenuState) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(state.encode()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    pub fn single(self, button: Button) -> Self {
        self.row(vec![button])
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub parse_mode: ParseMode,
    pub keyboard: Option<Keyboard>,
    pub disable_preview: bool,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: ParseMode::Plain,
            keyboard: None,
            disable_preview: false,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: ParseMode::Html,
            keyboard: None,
            disable_preview: true,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

fn close_button() -> Button {
    Button::callback("Close", &MenuState::Closed)
}

pub(crate) fn device_header(entry: &DeviceEntry) -> String {
    format!(
        "<strong>Device:</strong> {} {}\n<strong>Maintainer:</strong> {}\n<strong>Support:</strong> {}",
        escape_html(&entry.brand),
        escape_html(&entry.name),
        escape_html(&entry.maintainer),
        escape_html(&entry.support_thread),
    )
}

fn build_body(variant: Variant, build: &Build) -> String {
    format!(
        "<strong>Build Type:</strong> {}\n<strong>Build Date:</strong> {}\n<strong>Build Size:</strong> {}\n<strong>Build Version:</strong> {}",
        variant.label(),
        escape_html(&build.date),
        escape_html(&build.size),
        escape_html(&build.version),
    )
}

/// One button per variant with a current build, plus Close.
pub(crate) fn device_menu(entry: &DeviceEntry, builds: &BuildSet) -> Reply {
    let mut keyboard = Keyboard::default();
    for (variant, _) in builds.available() {
        keyboard = keyboard.single(Button::callback(
            format!("{} Build", variant.label()),
            &MenuState::BuildDisplay {
                codename: entry.codename.clone(),
                variant,
            },
        ));
    }
    keyboard = keyboard.single(close_button());

    let footer = if builds.is_empty() {
        format!(
            "Sorry, no builds are currently available for <code>{}</code>.",
            escape_html(&entry.codename)
        )
    } else {
        "Choose an option:".to_string()
    };
    Reply::html(format!("{}\n\n{}", device_header(entry), footer)).with_keyboard(keyboard)
}

pub(crate) fn build_display(entry: &DeviceEntry, variant: Variant, build: &Build) -> Reply {
    let codename = entry.codename.as_str();
    let toggles = Variant::ALL
        .into_iter()
        .filter(|other| *other != variant)
        .map(|other| {
            Button::callback(
                other.label(),
                &MenuState::BuildDisplay {
                    codename: codename.to_string(),
                    variant: other,
                },
            )
        })
        .collect();
    let keyboard = Keyboard::default()
        .single(Button::url(
            format!("Download {} ({})", variant.label(), codename),
            build.url.clone(),
        ))
        .row(toggles)
        .single(Button::callback(
            "Back",
            &MenuState::DeviceMenu {
                codename: codename.to_string(),
            },
        ));
    Reply::html(format!(
        "{}\n\n{}",
        device_header(entry),
        build_body(variant, build)
    ))
    .with_keyboard(keyboard)
}

pub(crate) fn build_unavailable(codename: &str, variant: Variant) -> Reply {
    Reply::plain(format!(
        "Sorry, could not fetch any {} build for {}\nIf you believe this is an error, please report this in our Telegram Chat!",
        variant.label(),
        codename
    ))
    .with_keyboard(
        Keyboard::default()
            .single(Button::callback(
                "Back",
                &MenuState::DeviceMenu {
                    codename: codename.to_string(),
                },
            ))
            .single(close_button()),
    )
}

pub(crate) fn device_list(catalog: &DeviceCatalog) -> Reply {
    let mut text = String::from("<strong>Device List:</strong>\n\n");
    for entry in catalog.iter() {
        text.push_str(&format!(
            "{} {} (<code>{}</code>)\n",
            escape_html(&entry.brand),
            escape_html(&entry.name),
            escape_html(&entry.codename)
        ));
    }
    Reply::html(text).with_keyboard(Keyboard::default().single(close_button()))
}
