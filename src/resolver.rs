use tracing::info;

use crate::{
    error::{Error, Result},
    github::GitHubApi,
    parsing::RunConfig,
};

/// Used when neither the source nor the fallback branch can be found.
pub const DEFAULT_BRANCH: &str = "master";

const HEADS_PREFIX: &str = "refs/heads/";

/// The branch a release is attached to and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The source ref is an existing branch.
    Source(String),
    /// The source ref is a tag, a support branch was created from its commit.
    Created(String),
    /// The source ref is unknown, the fallback branch exists.
    Fallback(String),
    /// Nothing matched, [`DEFAULT_BRANCH`] is used as is.
    Default,
}

impl Resolution {
    pub fn branch(&self) -> &str {
        match self {
            Resolution::Source(branch)
            | Resolution::Created(branch)
            | Resolution::Fallback(branch) => branch,
            Resolution::Default => DEFAULT_BRANCH,
        }
    }
}

/// Decides which branch of `project` the release goes to. Checks, in order: the source ref as
/// a branch, the source ref as a released tag (creating the support branch from it), the
/// fallback branch, and finally [`DEFAULT_BRANCH`]. Creates at most one branch.
pub async fn resolve_branch(
    github: &dyn GitHubApi,
    config: &RunConfig,
    project: &str,
) -> Result<Resolution> {
    let source = &config.source_ref;

    if github.branch_exists(project, source).await? {
        info!(project, branch = %source, "Source branch exists, will be selected");
        return Ok(Resolution::Source(source.clone()));
    }

    info!(project, %source, "Checking if source is a tag");
    if github.release_exists(project, source).await? {
        let Some(support_branch) = config.support_branch_name.as_deref() else {
            return Err(Error::MissingSupportBranch {
                project: project.to_string(),
                source_ref: source.clone(),
            });
        };
        info!(project, tag = %source, branch = support_branch, "Source is a tag, creating support branch");

        let tag = github.tag_reference(project, source).await?;
        let created = github
            .create_branch(project, support_branch, &tag.commit_sha)
            .await?;
        let branch = created
            .reference
            .strip_prefix(HEADS_PREFIX)
            .unwrap_or(created.reference.as_str());
        info!(project, %branch, sha = %created.commit_sha, "Support branch created");
        return Ok(Resolution::Created(branch.to_string()));
    }

    let fallback = &config.fallback_branch;
    info!(project, %source, %fallback, "Source is neither a branch nor a tag, trying fallback branch");
    if github.branch_exists(project, fallback).await? {
        return Ok(Resolution::Fallback(fallback.clone()));
    }

    info!(project, branch = DEFAULT_BRANCH, "Source and fallback unavailable, using default branch");
    Ok(Resolution::Default)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::{HashMap, HashSet},
        sync::Mutex,
        time::Duration,
    };

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        github::{CreatedRelease, ReferenceInfo},
        parsing::GITHUB_WEB_URL,
        release::ReleaseRequest,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Branch(String),
        Release(String),
        TagRef(String),
        CreateBranch { branch: String, sha: String },
        CreateRelease(ReleaseRequest),
    }

    impl Call {
        fn is_write(&self) -> bool {
            matches!(self, Call::CreateBranch { .. } | Call::CreateRelease(_))
        }
    }

    /// In-memory repository that records every call made against it.
    #[derive(Default)]
    pub(crate) struct FakeGitHub {
        pub(crate) branches: HashSet<String>,
        pub(crate) tags: HashMap<String, String>,
        pub(crate) calls: Mutex<Vec<Call>>,
    }

    impl FakeGitHub {
        pub(crate) fn with_branches(branches: &[&str]) -> Self {
            FakeGitHub {
                branches: branches.iter().map(|b| b.to_string()).collect(),
                ..Default::default()
            }
        }

        pub(crate) fn tag(mut self, tag: &str, sha: &str) -> Self {
            self.tags.insert(tag.to_string(), sha.to_string());
            self
        }

        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl GitHubApi for FakeGitHub {
        async fn branch_exists(&self, _project: &str, branch: &str) -> Result<bool> {
            self.record(Call::Branch(branch.to_string()));
            Ok(self.branches.contains(branch))
        }

        async fn release_exists(&self, _project: &str, tag: &str) -> Result<bool> {
            self.record(Call::Release(tag.to_string()));
            Ok(self.tags.contains_key(tag))
        }

        async fn tag_reference(&self, _project: &str, tag: &str) -> Result<ReferenceInfo> {
            self.record(Call::TagRef(tag.to_string()));
            Ok(ReferenceInfo {
                reference: format!("refs/tags/{tag}"),
                commit_sha: self.tags[tag].clone(),
            })
        }

        async fn create_branch(
            &self,
            _project: &str,
            branch: &str,
            sha: &str,
        ) -> Result<ReferenceInfo> {
            self.record(Call::CreateBranch {
                branch: branch.to_string(),
                sha: sha.to_string(),
            });
            Ok(ReferenceInfo {
                reference: format!("refs/heads/{branch}"),
                commit_sha: sha.to_string(),
            })
        }

        async fn create_release(
            &self,
            _project: &str,
            release: &ReleaseRequest,
        ) -> Result<CreatedRelease> {
            self.record(Call::CreateRelease(release.clone()));
            Ok(CreatedRelease::default())
        }
    }

    pub(crate) fn config(source: &str, support_branch: Option<&str>) -> RunConfig {
        RunConfig {
            owner: "acme".into(),
            source_ref: source.into(),
            fallback_branch: "develop".into(),
            support_branch_name: support_branch.map(String::from),
            tag: "v1.1".into(),
            previous_tag: None,
            release_name: None,
            pre_release: true,
            timeout: Duration::from_secs(5),
            keep_going: false,
            web_url: GITHUB_WEB_URL.into(),
            projects: vec!["widget".into()],
        }
    }

    fn writes(github: &FakeGitHub) -> usize {
        github.calls().iter().filter(|call| call.is_write()).count()
    }

    #[tokio::test]
    async fn existing_source_branch_is_returned_unchanged() {
        let github = FakeGitHub::with_branches(&["release/1.x"]);
        let resolved = resolve_branch(&github, &config("release/1.x", None), "widget")
            .await
            .unwrap();
        assert_eq!(resolved, Resolution::Source("release/1.x".into()));
        assert_eq!(github.calls(), vec![Call::Branch("release/1.x".into())]);
        assert_eq!(writes(&github), 0);
    }

    #[tokio::test]
    async fn tag_without_support_branch_fails_before_writing() {
        let github = FakeGitHub::default().tag("v1.0", "abc123");
        let err = resolve_branch(&github, &config("v1.0", None), "widget")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingSupportBranch { .. }), "{err:?}");
        assert_eq!(writes(&github), 0);
    }

    #[tokio::test]
    async fn tag_creates_support_branch_from_its_commit() {
        let github = FakeGitHub::default().tag("v1.0", "abc123");
        let resolved = resolve_branch(&github, &config("v1.0", Some("support/v1.x")), "widget")
            .await
            .unwrap();
        assert_eq!(resolved, Resolution::Created("support/v1.x".into()));
        assert_eq!(resolved.branch(), "support/v1.x");
        assert_eq!(
            github.calls(),
            vec![
                Call::Branch("v1.0".into()),
                Call::Release("v1.0".into()),
                Call::TagRef("v1.0".into()),
                Call::CreateBranch {
                    branch: "support/v1.x".into(),
                    sha: "abc123".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn unknown_source_uses_existing_fallback() {
        let github = FakeGitHub::with_branches(&["develop"]);
        let resolved = resolve_branch(&github, &config("nope", Some("support/x")), "widget")
            .await
            .unwrap();
        assert_eq!(resolved, Resolution::Fallback("develop".into()));
        assert_eq!(
            github.calls(),
            vec![
                Call::Branch("nope".into()),
                Call::Release("nope".into()),
                Call::Branch("develop".into()),
            ]
        );
        assert_eq!(writes(&github), 0);
    }

    #[tokio::test]
    async fn nothing_found_defaults_to_master() {
        let github = FakeGitHub::default();
        let resolved = resolve_branch(&github, &config("nope", None), "widget")
            .await
            .unwrap();
        assert_eq!(resolved, Resolution::Default);
        assert_eq!(resolved.branch(), "master");
        assert_eq!(writes(&github), 0);
    }
}
