// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod analytics;
mod api;
mod auth;
mod clock;
mod command;
mod error;
mod metadata;
mod notify;
mod password;
mod referral;
mod storage;
#[cfg(test)]
mod testing;
mod transport;

use std::{path::PathBuf, process, sync::Arc};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use futures_util::lock::Mutex;
use log::{error, warn};
use url::Url;

const DATA_LAYER_FILE: &str = "datalayer.jsonl";

#[derive(Debug, Subcommand)]
enum Command {
    Capture(command::capture::Command),
    Referral(command::referral::Command),
    Lead(command::lead::Command),
    Login(command::login::Command),
    Logout(command::logout::Command),
    Status(command::status::Command),
    Password(command::password::Command),
    Profile(command::profile::Command),
    Session(command::session::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, ctx: command::Context) -> Result<()> {
        match self {
            Self::Capture(cmd) => cmd.execute(ctx).await,
            Self::Referral(cmd) => cmd.execute(ctx).await,
            Self::Lead(cmd) => cmd.execute(ctx).await,
            Self::Login(cmd) => cmd.execute(ctx).await,
            Self::Logout(cmd) => cmd.execute(ctx).await,
            Self::Status(cmd) => cmd.execute(ctx).await,
            Self::Password(cmd) => cmd.execute(ctx).await,
            Self::Profile(cmd) => cmd.execute(ctx).await,
            Self::Session(cmd) => cmd.execute(ctx).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the venue API.
    #[arg(long, env = "WHITEBARN_API_URL", default_value = "http://localhost:5000/api", value_parser = Url::parse)]
    api_url: Url,

    /// The directory holding stored referrals, the admin token and the
    /// analytics data layer. Defaults to the platform data directory.
    #[arg(long, env = "WHITEBARN_DATA_DIR", value_hint = clap::ValueHint::DirPath)]
    data_dir: Option<PathBuf>,

    /// Keep everything in memory for this invocation only.
    #[arg(long, conflicts_with = "data_dir")]
    ephemeral: bool,

    /// Do not print success and failure notices.
    #[arg(long, short)]
    quiet: bool,

    /// The path to the Pinentry program to use when asking for passwords.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

fn get_storage(args: &Args) -> Box<dyn storage::Storage> {
    if !args.ephemeral {
        if let Some(dir) = args.data_dir.as_ref() {
            return Box::new(storage::File::in_dir(dir));
        }

        if let Some(file_storage) = storage::File::new() {
            return Box::new(file_storage);
        }

        warn!(
            "We need to fall back to in-memory storage because {}",
            error::Storage::NoDataDir
        );
    }

    Box::new(storage::Memory::new())
}

fn get_sink(args: &Args) -> Vec<Box<dyn analytics::Sink>> {
    let mut sinks: Vec<Box<dyn analytics::Sink>> = vec![Box::new(analytics::Log)];
    if !args.ephemeral {
        let dir = args.data_dir.clone().or_else(|| {
            metadata::PROJECT_DIRS
                .as_ref()
                .map(|dirs| dirs.data_dir().to_owned())
        });
        if let Some(dir) = dir {
            sinks.push(Box::new(analytics::DataLayer::new(dir.join(DATA_LAYER_FILE))));
        }
    }
    sinks
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(password::PinentryPrompt::new(args.pinentry_program.clone())),
        Box::new(password::RpasswordPrompt),
    ];

    let notifier: Arc<dyn notify::Notifier> = if args.quiet {
        Arc::new(notify::Silent)
    } else {
        Arc::new(notify::Console)
    };

    let ctx = command::Context {
        storage: Arc::new(Mutex::new(get_storage(&args))),
        transport: Arc::new(transport::Http::new(args.api_url.clone())?),
        sink: Arc::new(get_sink(&args)),
        notifier,
        clock: Arc::new(clock::System),
        prompt: Arc::new(prompt),
    };

    command::Command::execute(args.command, ctx).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("WHITEBARN_LOG", "warn")
        .write_style("WHITEBARN_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn ephemeral_runs_keep_no_data_layer() {
        let args = Args::parse_from(["whitebarn", "--ephemeral", "session", "end"]);
        assert_eq!(get_sink(&args).len(), 1);

        let args = Args::parse_from([
            "whitebarn",
            "--data-dir",
            "/tmp/whitebarn-test",
            "referral",
            "show",
        ]);
        assert_eq!(get_sink(&args).len(), 2);
        assert_eq!(args.api_url.as_str(), "http://localhost:5000/api");
    }
}
