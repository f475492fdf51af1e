use std::{ffi::OsString, time::Duration};

use clap::{ArgAction, CommandFactory, Parser};

use crate::error::{Error, Result};

pub const TOKEN_ENV: &str = "OAUTH_TOKEN";
pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_WEB_URL: &str = "https://github.com";
pub const DOCKER_NAMES_URL: &str = "https://frightanic.com/goodies_content/docker-names.php";

const EXAMPLES: &str = "\
Examples:
  multi-repo-release --owner comdotlinux --source master --tag v0.0.2 --previous-tag v0.0.1 java-design-patterns TasteOfJavaEE7
  multi-repo-release --owner comdotlinux --source support/v0.0.x --tag v0.0.3 --fallback-branch master --previous-tag v0.0.1 --release-name Duke --pre-release=false java-design-patterns TasteOfJavaEE7
  multi-repo-release --owner comdotlinux --source v0.0.1 --tag v0.0.2-RC.1 --support-branch-name support/v0.0.x --previous-tag v0.0.1 java-design-patterns TasteOfJavaEE7

When --source is a tag, --support-branch-name is mandatory.
The environment variable OAUTH_TOKEN is mandatory for all actions.";

/// CLI to create branches and releases on multiple repos with the same tag.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, after_help = EXAMPLES)]
pub struct Args {
    /// The user / owner of the repositories
    #[arg(long, visible_alias = "user")]
    owner: Option<String>,

    /// The source branch or tag to create the release from
    #[arg(long, default_value = "master")]
    source: String,

    /// The branch to release from if the source is neither a branch nor a tag
    #[arg(long, default_value = "master")]
    fallback_branch: String,

    /// Timeout in seconds for every GitHub API call
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// The support branch to create when the source is a tag
    #[arg(long)]
    support_branch_name: Option<String>,

    /// The tag to create
    #[arg(long)]
    tag: Option<String>,

    /// The name of the release, a random one is fetched if missing
    #[arg(long)]
    release_name: Option<String>,

    /// The previous tag to compare against in the release body
    #[arg(long)]
    previous_tag: Option<String>,

    /// Mark the releases as pre-releases, use --pre-release=false to change
    #[arg(
        long,
        default_value_t = true,
        default_missing_value = "true",
        num_args = 0..=1,
        require_equals = true,
        action = ArgAction::Set
    )]
    pre_release: bool,

    /// Continue with the remaining projects when one fails
    #[arg(long)]
    keep_going: bool,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "GITHUB_API_URL", default_value = GITHUB_API_URL)]
    api_url: String,

    /// Base URL used for the comparison link in the release body
    #[arg(long, default_value = GITHUB_WEB_URL)]
    web_url: String,

    /// Service returning a random plain text release name
    #[arg(long, default_value = DOCKER_NAMES_URL)]
    names_url: String,

    /// Repositories to release
    projects: Vec<String>,
}

/// Everything a run needs, validated and immutable for its whole duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub owner: String,
    pub source_ref: String,
    pub fallback_branch: String,
    pub support_branch_name: Option<String>,
    pub tag: String,
    pub previous_tag: Option<String>,
    pub release_name: Option<String>,
    pub pre_release: bool,
    pub timeout: Duration,
    pub keep_going: bool,
    pub web_url: String,
    pub projects: Vec<String>,
}

#[derive(Debug)]
pub struct ParsedArgs {
    pub config: RunConfig,
    pub api_url: String,
    pub names_url: String,
}

pub fn parse_args_from(args: impl IntoIterator<Item = OsString>) -> Args {
    Args::parse_from(args)
}

/// Whether the invocation only asks for help or the version, which need no token.
pub fn asks_for_info(args: &[OsString]) -> bool {
    args.iter()
        .skip(1)
        .take_while(|arg| *arg != "--")
        .any(|arg| matches!(arg.to_str(), Some("-h" | "--help" | "-V" | "--version")))
}

pub fn usage() -> String {
    Args::command().render_help().to_string()
}

/// Reads the GitHub token, an empty value counts as missing.
pub fn read_token() -> Result<String> {
    token_from(std::env::var(TOKEN_ENV).ok())
}

fn token_from(value: Option<String>) -> Result<String> {
    value
        .filter(|token| !token.trim().is_empty())
        .ok_or(Error::MissingToken)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

impl Args {
    /// Collects every problem with the arguments instead of stopping at the first.
    pub fn validate(self) -> Result<ParsedArgs> {
        let mut errors = Vec::new();

        let owner = non_empty(self.owner);
        if owner.is_none() {
            errors.push("User / Organization parameter is mandatory".to_string());
        }
        if self.source.is_empty() {
            errors.push(
                "source parameter is mandatory and must either be a branch OR an existing TAG on GitHub"
                    .to_string(),
            );
        }
        let tag = non_empty(self.tag);
        if tag.is_none() {
            errors.push("tag parameter is mandatory, otherwise what are we releasing?".to_string());
        }
        if self.projects.is_empty() {
            errors.push(
                "At least provide one project, otherwise where do we create the tag?".to_string(),
            );
        }
        if self.timeout == 0 {
            errors.push("timeout must be at least one second".to_string());
        }

        let (Some(owner), Some(tag), true) = (owner, tag, errors.is_empty()) else {
            return Err(Error::InvalidInput(errors));
        };

        Ok(ParsedArgs {
            config: RunConfig {
                owner,
                source_ref: self.source,
                fallback_branch: self.fallback_branch,
                support_branch_name: non_empty(self.support_branch_name),
                tag,
                previous_tag: non_empty(self.previous_tag),
                release_name: non_empty(self.release_name),
                pre_release: self.pre_release,
                timeout: Duration::from_secs(self.timeout),
                keep_going: self.keep_going,
                web_url: self.web_url.trim_end_matches('/').to_string(),
                projects: self.projects,
            },
            api_url: self.api_url,
            names_url: self.names_url,
        })
    }
}
