use thiserror::Error;

use crate::parsing::TOKEN_ENV;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Please set an environment variable named {} created on GitHub", TOKEN_ENV)]
    MissingToken,

    #[error("{}", numbered(.0))]
    InvalidInput(Vec<String>),

    #[error("{source_ref} is a tag in {project}, a support branch name is required to release from it")]
    MissingSupportBranch { project: String, source_ref: String },

    #[error("GitHub call failed while {activity}: {detail}")]
    Api {
        activity: String,
        detail: String,
        #[source]
        source: octocrab::Error,
    },

    #[error("{reference} does not point to a commit or tag object")]
    UnexpectedObject { reference: String },

    #[error("Could not build the GitHub client: {0}")]
    Client(#[source] octocrab::Error),

    #[error("Could not write the release payload: {0}")]
    Output(#[from] std::io::Error),

    #[error("Could not serialize the release payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("{} project(s) failed:\n{}", .failures.len(), summary(.failures))]
    Failed { failures: Vec<(String, String)> },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn api(activity: impl Into<String>, source: octocrab::Error) -> Self {
        Error::Api {
            activity: activity.into(),
            detail: describe(&source),
            source,
        }
    }

    /// Problems with the invocation itself, retrying other projects cannot help.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingToken | Error::InvalidInput(_) | Error::MissingSupportBranch { .. }
        )
    }
}

/// GitHub answers show their status and message. Other octocrab errors render a backtrace in
/// their own `Display`, so only their cause chain is kept.
fn describe(err: &octocrab::Error) -> String {
    if let octocrab::Error::GitHub { source, .. } = err {
        return format!("{}: {}", source.status_code, source.message);
    }
    let mut causes = Vec::new();
    let mut cause = std::error::Error::source(err);
    while let Some(inner) = cause {
        causes.push(inner.to_string());
        cause = std::error::Error::source(inner);
    }
    if causes.is_empty() {
        "request failed".to_string()
    } else {
        causes.join(": ")
    }
}

fn numbered(errors: &[String]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(index, err)| format!("{:2} : {}", index + 1, err))
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(project, err)| format!("  {project}: {err}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_numbered() {
        let err = Error::InvalidInput(vec!["first".into(), "second".into()]);
        assert_eq!(err.to_string(), " 1 : first\n 2 : second");
    }

    #[test]
    fn failure_summary_lists_projects() {
        let err = Error::Failed {
            failures: vec![("widget".into(), "boom".into())],
        };
        assert_eq!(err.to_string(), "1 project(s) failed:\n  widget: boom");
    }
}
