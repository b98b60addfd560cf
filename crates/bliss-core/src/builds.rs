use futures_util::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::BotConfig;
use crate::error::{FetchError, ResolveError};
use crate::fetch::{get_ok, http_client};
use crate::format::{format_date, format_size};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    Vanilla,
    GApps,
    PixelGApps,
    Foss,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Vanilla,
        Variant::GApps,
        Variant::PixelGApps,
        Variant::Foss,
    ];

    /// Name used in build-index URLs and callback tokens.
    pub fn slug(self) -> &'static str {
        match self {
            Variant::Vanilla => "vanilla",
            Variant::GApps => "gapps",
            Variant::PixelGApps => "pixelgapps",
            Variant::Foss => "foss",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Variant::Vanilla => "Vanilla",
            Variant::GApps => "GApps",
            Variant::PixelGApps => "Pixel GApps",
            Variant::Foss => "FOSS",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Variant::ALL.into_iter().find(|variant| variant.slug() == slug)
    }
}

/// Latest build for one (codename, variant) pair, already formatted for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Build {
    pub date: String,
    pub size: String,
    pub version: String,
    pub url: String,
}

#[derive(Deserialize)]
struct BuildIndex {
    response: Vec<RawBuild>,
}

#[derive(Deserialize)]
struct RawBuild {
    datetime: Numeric,
    size: Numeric,
    version: Numeric,
    url: String,
}

/// Index fields arrive as numbers or numeric strings depending on the mirror.
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Numeric {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Numeric::Int(value) => Some(*value),
            Numeric::Float(value) if value.is_finite() => Some(*value as i64),
            Numeric::Float(_) => None,
            Numeric::Text(value) => value.trim().parse().ok(),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Numeric::Int(value) => value.to_string(),
            Numeric::Float(value) => value.to_string(),
            Numeric::Text(value) => value.clone(),
        }
    }
}

impl RawBuild {
    fn into_build(self) -> Result<Build, ResolveError> {
        let timestamp = self
            .datetime
            .as_i64()
            .ok_or_else(|| ResolveError::Decode("datetime is not a timestamp".into()))?;
        let date = format_date(timestamp)
            .ok_or_else(|| ResolveError::Decode(format!("datetime {timestamp} out of range")))?;
        let size = self
            .size
            .as_i64()
            .and_then(|value| u64::try_from(value).ok())
            .ok_or_else(|| ResolveError::Decode("size is not a byte count".into()))?;
        if self.url.trim().is_empty() {
            return Err(ResolveError::Decode("build url is empty".into()));
        }
        Ok(Build {
            date,
            size: format_size(size),
            version: self.version.as_text(),
            url: self.url,
        })
    }
}

/// Per-variant outcome of one fan-out, in `Variant::ALL` order.
#[derive(Clone, Debug, Default)]
pub struct BuildSet {
    builds: Vec<(Variant, Option<Build>)>,
}

impl BuildSet {
    pub fn get(&self, variant: Variant) -> Option<&Build> {
        self.builds
            .iter()
            .find(|(item, _)| *item == variant)
            .and_then(|(_, build)| build.as_ref())
    }

    pub fn available(&self) -> impl Iterator<Item = (Variant, &Build)> {
        self.builds
            .iter()
            .filter_map(|(variant, build)| build.as_ref().map(|build| (*variant, build)))
    }

    pub fn is_empty(&self) -> bool {
        self.available().next().is_none()
    }
}

/// Stateless lookup of the newest build per variant.
#[derive(Clone)]
pub struct BuildResolver {
    client: Client,
    url_template: String,
}

impl BuildResolver {
    pub fn new(client: Client, url_template: impl Into<String>) -> Self {
        Self {
            client,
            url_template: url_template.into(),
        }
    }

    pub fn from_config(cfg: &BotConfig) -> Result<Self, FetchError> {
        let client = http_client(cfg.user_agent(), cfg.http_timeout())?;
        Ok(Self::new(client, cfg.download_url_template.clone()))
    }

    /// Fills `{codename}` and `{variant}`; a template with bare `{}` slots takes them positionally.
    pub fn index_url(&self, codename: &str, variant: Variant) -> String {
        if self.url_template.contains("{codename}") || self.url_template.contains("{variant}") {
            self.url_template
                .replace("{codename}", codename)
                .replace("{variant}", variant.slug())
        } else {
            self.url_template
                .replacen("{}", codename, 1)
                .replacen("{}", variant.slug(), 1)
        }
    }

    /// Latest build for the variant, or `None` when upstream has nothing usable.
    pub async fn resolve(&self, codename: &str, variant: Variant) -> Option<Build> {
        match self.try_resolve(codename, variant).await {
            Ok(build) => build,
            Err(err) => {
                warn!(
                    "Build lookup for {}/{} failed: {}",
                    codename,
                    variant.slug(),
                    err
                );
                None
            }
        }
    }

    /// Resolves every variant concurrently; each outcome is independent of the others.
    pub async fn resolve_all(&self, codename: &str) -> BuildSet {
        let builds = join_all(
            Variant::ALL
                .into_iter()
                .map(|variant| async move { (variant, self.resolve(codename, variant).await) }),
        )
        .await;
        BuildSet { builds }
    }

    pub(crate) async fn try_resolve(
        &self,
        codename: &str,
        variant: Variant,
    ) -> Result<Option<Build>, ResolveError> {
        let url = self.index_url(codename, variant);
        let body = match get_ok(&self.client, &url).await {
            Ok(body) => body,
            Err(FetchError::Status(404)) => {
                debug!("No {} index for {}", variant.slug(), codename);
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let index: BuildIndex =
            serde_json::from_slice(&body).map_err(|e| ResolveError::Decode(e.to_string()))?;
        match index.response.into_iter().next() {
            Some(raw) => raw.into_build().map(Some),
            None => {
                debug!("Empty {} index for {}", variant.slug(), codename);
                Ok(None)
            }
        }
    }
}
