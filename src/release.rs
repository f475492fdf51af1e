use std::io::Write;

use serde::Serialize;
use tracing::info;

use crate::{
    error::Result,
    github::{CreatedRelease, GitHubApi},
    parsing::RunConfig,
};

/// Body of the create-release call, built once per project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRequest {
    pub tag_name: String,
    pub target_commitish: String,
    pub name: String,
    pub body: String,
    pub prerelease: bool,
}

impl ReleaseRequest {
    pub fn new(config: &RunConfig, project: &str, branch: &str, name: &str) -> Self {
        ReleaseRequest {
            tag_name: config.tag.clone(),
            target_commitish: branch.to_string(),
            name: name.to_string(),
            body: compare_body(config, project, branch),
            prerelease: config.pre_release,
        }
    }
}

/// Link comparing the previous tag (or the branch when there is none) with the new tag.
pub fn compare_body(config: &RunConfig, project: &str, branch: &str) -> String {
    let from = config.previous_tag.as_deref().unwrap_or(branch);
    format!(
        "{}/{}/{}/compare/{}...{}",
        config.web_url, config.owner, project, from, config.tag
    )
}

/// Files the release for `project` against `branch`. The payload is echoed to `out` as
/// pretty JSON before it is sent.
pub async fn file_release(
    github: &dyn GitHubApi,
    config: &RunConfig,
    project: &str,
    branch: &str,
    name: &str,
    out: &mut (dyn Write + Send),
) -> Result<CreatedRelease> {
    let request = ReleaseRequest::new(config, project, branch, name);

    let payload = serde_json::to_string_pretty(&request)?;
    writeln!(out, "{payload}")?;

    let created = github.create_release(project, &request).await?;
    info!(
        project,
        tag = %request.tag_name,
        url = created.html_url.as_deref().unwrap_or("-"),
        "Release created"
    );
    Ok(created)
}
