use std::time::Duration;

use async_trait::async_trait;
use http::{header::ACCEPT, StatusCode};
use octocrab::{
    models::repos::{Object, Ref},
    params::repos::Reference,
    service::middleware::retry::RetryConfig,
    Octocrab,
};
use tracing::debug;

use crate::{
    error::{Error, Result},
    release::ReleaseRequest,
};

const GITHUB_V3_JSON: &str = "application/vnd.github.v3+json";

/// A git reference as GitHub reports it, reduced to what the release flow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceInfo {
    pub reference: String,
    pub commit_sha: String,
}

impl TryFrom<Ref> for ReferenceInfo {
    type Error = Error;

    fn try_from(reference: Ref) -> Result<Self> {
        #[allow(unreachable_patterns)]
        let commit_sha = match reference.object {
            Object::Commit { sha, .. } | Object::Tag { sha, .. } => sha,
            _ => {
                return Err(Error::UnexpectedObject {
                    reference: reference.ref_field,
                })
            }
        };
        Ok(ReferenceInfo {
            reference: reference.ref_field,
            commit_sha,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedRelease {
    pub html_url: Option<String>,
}

/// The GitHub operations a release run is built from. Every call is scoped to one
/// repository (`project`) of the owner the implementation was created for.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// `Ok(false)` only when GitHub answers 404.
    async fn branch_exists(&self, project: &str, branch: &str) -> Result<bool>;

    /// Whether a release was published for `tag`.
    async fn release_exists(&self, project: &str, tag: &str) -> Result<bool>;

    async fn tag_reference(&self, project: &str, tag: &str) -> Result<ReferenceInfo>;

    /// Creates `refs/heads/<branch>` pointing at `sha`.
    async fn create_branch(&self, project: &str, branch: &str, sha: &str)
        -> Result<ReferenceInfo>;

    async fn create_release(
        &self,
        project: &str,
        release: &ReleaseRequest,
    ) -> Result<CreatedRelease>;
}

pub fn create_octocrab(pat: &str, api_url: &str, timeout: Duration) -> Result<Octocrab> {
    Octocrab::builder()
        .personal_token(pat.to_string())
        .base_uri(api_url)
        .map_err(Error::Client)?
        .add_header(ACCEPT, GITHUB_V3_JSON.to_string())
        .add_retry_config(RetryConfig::None)
        .set_connect_timeout(Some(timeout))
        .set_read_timeout(Some(timeout))
        .set_write_timeout(Some(timeout))
        .build()
        .map_err(Error::Client)
}

pub struct OctocrabClient {
    octocrab: Octocrab,
    owner: String,
}

impl OctocrabClient {
    pub fn new(octocrab: Octocrab, owner: impl Into<String>) -> Self {
        OctocrabClient {
            octocrab,
            owner: owner.into(),
        }
    }
}

/// 404 becomes `Ok(false)`, any other failure stays fatal.
fn found<T>(response: octocrab::Result<T>, activity: impl FnOnce() -> String) -> Result<bool> {
    match response {
        Ok(_) => Ok(true),
        Err(err) if is_not_found(&err) => Ok(false),
        Err(err) => Err(Error::api(activity(), err)),
    }
}

fn is_not_found(err: &octocrab::Error) -> bool {
    matches!(err, octocrab::Error::GitHub { source, .. } if source.status_code == StatusCode::NOT_FOUND)
}

#[async_trait]
impl GitHubApi for OctocrabClient {
    async fn branch_exists(&self, project: &str, branch: &str) -> Result<bool> {
        // octocrab has no typed getter for a single branch.
        let route = format!("/repos/{}/{}/branches/{}", self.owner, project, branch);
        debug!(%route, "Calling GitHub");
        let response: octocrab::Result<serde_json::Value> =
            self.octocrab.get(&route, None::<&()>).await;
        found(response, || format!("checking branch {branch} of {project}"))
    }

    async fn release_exists(&self, project: &str, tag: &str) -> Result<bool> {
        debug!(project, tag, "Looking up release");
        let response = self
            .octocrab
            .repos(self.owner.as_str(), project)
            .releases()
            .get_by_tag(tag)
            .await;
        found(response, || format!("checking release tag {tag} of {project}"))
    }

    async fn tag_reference(&self, project: &str, tag: &str) -> Result<ReferenceInfo> {
        debug!(project, tag, "Reading tag reference");
        self.octocrab
            .repos(self.owner.as_str(), project)
            .get_ref(&Reference::Tag(tag.to_string()))
            .await
            .map_err(|err| Error::api(format!("reading tag {tag} of {project}"), err))?
            .try_into()
    }

    async fn create_branch(
        &self,
        project: &str,
        branch: &str,
        sha: &str,
    ) -> Result<ReferenceInfo> {
        debug!(project, branch, sha, "Creating branch");
        self.octocrab
            .repos(self.owner.as_str(), project)
            .create_ref(&Reference::Branch(branch.to_string()), sha)
            .await
            .map_err(|err| Error::api(format!("creating branch {branch} in {project}"), err))?
            .try_into()
    }

    async fn create_release(
        &self,
        project: &str,
        release: &ReleaseRequest,
    ) -> Result<CreatedRelease> {
        debug!(project, tag = %release.tag_name, "Creating release");
        let created = self
            .octocrab
            .repos(self.owner.as_str(), project)
            .releases()
            .create(&release.tag_name)
            .target_commitish(&release.target_commitish)
            .name(&release.name)
            .body(&release.body)
            .prerelease(release.prerelease)
            .send()
            .await
            .map_err(|err| {
                Error::api(
                    format!("creating release {} in {project}", release.tag_name),
                    err,
                )
            })?;
        Ok(CreatedRelease {
            html_url: Some(created.html_url.to_string()),
        })
    }
}
