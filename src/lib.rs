//! Creates GitHub releases, and support branches when needed, across a batch of repositories
//! owned by the same user or organization.

use std::io::Write;

use tracing::{error, info};

pub mod error;
pub mod github;
pub mod names;
pub mod parsing;
pub mod release;
pub mod resolver;

pub use error::{Error, Result};
use github::{CreatedRelease, GitHubApi};
use names::{resolve_release_name, NameGenerator};
use parsing::RunConfig;
use resolver::{resolve_branch, Resolution};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOutcome {
    pub project: String,
    pub resolution: Resolution,
    pub release: CreatedRelease,
}

/// Releases every project in order. Stops at the first error unless `keep_going` is set, in
/// which case failures are collected and reported together once all projects were tried.
/// Configuration errors always stop the run.
pub async fn run(
    github: &dyn GitHubApi,
    names: &dyn NameGenerator,
    config: &RunConfig,
    out: &mut (dyn Write + Send),
) -> Result<Vec<ProjectOutcome>> {
    let release_name = resolve_release_name(config.release_name.as_deref(), &config.tag, names).await;

    let mut outcomes = Vec::with_capacity(config.projects.len());
    let mut failures = Vec::new();
    for (index, project) in config.projects.iter().enumerate() {
        info!(
            "{:2} : Starting release {} for {} with tag {} on branch {} with fallback branch {} and possible support branch {}",
            index + 1,
            release_name,
            project,
            config.tag,
            config.source_ref,
            config.fallback_branch,
            config.support_branch_name.as_deref().unwrap_or("-"),
        );
        match release_project(github, config, project, &release_name, out).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) if config.keep_going && !err.is_configuration() => {
                error!(project, %err, "Release failed, continuing with the next project");
                failures.push((project.clone(), err.to_string()));
            }
            Err(err) => return Err(err),
        }
    }

    if !failures.is_empty() {
        return Err(Error::Failed { failures });
    }
    Ok(outcomes)
}

async fn release_project(
    github: &dyn GitHubApi,
    config: &RunConfig,
    project: &str,
    release_name: &str,
    out: &mut (dyn Write + Send),
) -> Result<ProjectOutcome> {
    let resolution = resolve_branch(github, config, project).await?;
    info!(project, branch = resolution.branch(), tag = %config.tag, "Selected branch");
    let release = release::file_release(
        github,
        config,
        project,
        resolution.branch(),
        release_name,
        out,
    )
    .await?;
    Ok(ProjectOutcome {
        project: project.to_string(),
        resolution,
        release,
    })
}
