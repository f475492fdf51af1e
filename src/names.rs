use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

/// Source of random, human readable release names.
#[async_trait]
pub trait NameGenerator: Send + Sync {
    /// `None` on any failure, the caller falls back to a fixed name.
    async fn random_name(&self) -> Option<String>;
}

/// Fetches names from a plain text service such as the docker-names generator.
pub struct DockerNames {
    client: reqwest::Client,
    url: String,
}

/// Used when no generator can be built, every release gets the fixed name.
pub struct Offline;

#[async_trait]
impl NameGenerator for Offline {
    async fn random_name(&self) -> Option<String> {
        None
    }
}

impl DockerNames {
    pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(DockerNames {
            client,
            url: url.into(),
        })
    }

    async fn fetch(&self) -> reqwest::Result<String> {
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl NameGenerator for DockerNames {
    async fn random_name(&self) -> Option<String> {
        match self.fetch().await {
            Ok(body) => {
                let name = body.trim_end_matches(['\r', '\n']).to_string();
                (!name.trim().is_empty()).then_some(name)
            }
            Err(err) => {
                warn!(url = %self.url, %err, "Unable to get a random release name");
                None
            }
        }
    }
}

/// The explicit name if there is one, otherwise a random one, otherwise `"Release of <tag>"`.
/// Never fails.
pub async fn resolve_release_name(
    explicit: Option<&str>,
    tag: &str,
    generator: &dyn NameGenerator,
) -> String {
    if let Some(name) = explicit.filter(|name| !name.is_empty()) {
        return name.to_string();
    }
    info!("No release name given, fetching a random one");
    match generator.random_name().await {
        Some(name) => name,
        None => {
            let name = format!("Release of {tag}");
            info!(%name, "Falling back to a fixed release name");
            name
        }
    }
}
