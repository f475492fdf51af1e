use std::{ffi::OsString, process::ExitCode};

use multi_repo_release::{
    github::{create_octocrab, OctocrabClient},
    names::{DockerNames, NameGenerator, Offline},
    parsing, run, Error,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE_EXIT_CODE: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<OsString> = std::env::args_os().collect();
    let token = if parsing::asks_for_info(&argv) {
        None
    } else {
        match parsing::read_token() {
            Ok(token) => Some(token),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
    };

    let args = parsing::parse_args_from(argv);
    match release(token, args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::InvalidInput(errors)) => {
            eprintln!("\n{}\n", Error::InvalidInput(errors));
            eprintln!("{}", parsing::usage());
            ExitCode::from(USAGE_EXIT_CODE)
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn release(token: Option<String>, args: parsing::Args) -> Result<(), Error> {
    let token = token.ok_or(Error::MissingToken)?;
    let parsing::ParsedArgs {
        config,
        api_url,
        names_url,
    } = args.validate()?;

    let octocrab = create_octocrab(&token, &api_url, config.timeout)?;
    let github = OctocrabClient::new(octocrab, config.owner.clone());
    let names: Box<dyn NameGenerator> = match DockerNames::new(names_url, config.timeout) {
        Ok(names) => Box::new(names),
        Err(err) => {
            warn!(%err, "Could not build the release name client");
            Box::new(Offline)
        }
    };

    let outcomes = run(&github, names.as_ref(), &config, &mut std::io::stdout()).await?;
    for outcome in &outcomes {
        info!(
            project = %outcome.project,
            branch = outcome.resolution.branch(),
            url = outcome.release.html_url.as_deref().unwrap_or("-"),
            "Released"
        );
    }
    Ok(())
}
