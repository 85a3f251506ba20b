use std::{io::Write, path::Path, process::ExitCode};

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{error, info, span, Level};
use tracing_subscriber::EnvFilter;

mod adapters;
mod attachments;
mod cache;
mod commands;
mod config;
mod model;
mod settings;
mod transfer;
mod uploads;
mod util;

use crate::{
    adapters::cached::CachedClient,
    attachments::ManifestLibrary,
    cache::{MetadataCache, MokaStore},
    config::Config,
    model::error::{Error, Result},
    settings::SettingsFile,
    transfer::{TransferOptions, DEFAULT_CONCURRENCY},
    uploads::Uploads,
};

fn cli() -> Command {
    Command::new("r2-uploads")
        .about("Manage media uploads stored in an S3-compatible bucket")
        .version(clap::crate_version!())
        .subcommand_required(true)
        .arg(
            Arg::new("settings")
                .long("settings")
                .env("R2_UPLOADS_SETTINGS")
                .default_value("r2-uploads.json")
                .global(true),
        )
        .arg(
            Arg::new("attachments")
                .long("attachments")
                .env("R2_UPLOADS_ATTACHMENTS")
                .default_value("attachments.json")
                .global(true),
        )
        .subcommand(
            Command::new("verify")
                .about("Verify the configured keys can write to and delete from the bucket"),
        )
        .subcommand(
            Command::new("ls")
                .about("List files in the bucket")
                .arg(Arg::new("path").index(1)),
        )
        .subcommand(
            Command::new("cp")
                .about("Copy files to / from the bucket. Use s3://bucket/location for remote paths")
                .arg(Arg::new("from").required(true).index(1))
                .arg(Arg::new("to").required(true).index(2))
                .arg(
                    Arg::new("best-effort")
                        .long("best-effort")
                        .action(ArgAction::SetTrue)
                        .help("Report success even when individual files fail to copy"),
                ),
        )
        .subcommand(
            Command::new("upload-directory")
                .about("Upload a local directory to the bucket")
                .arg(Arg::new("from").required(true).index(1))
                .arg(Arg::new("to").index(2).default_value(""))
                .arg(
                    Arg::new("concurrency")
                        .long("concurrency")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    Arg::new("verbose")
                        .long("verbose")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete files from the bucket")
                .arg(Arg::new("path").required(true).index(1))
                .arg(Arg::new("regex").long("regex")),
        )
        .subcommand(Command::new("enable").about("Enable rewriting of media URLs to the bucket"))
        .subcommand(Command::new("disable").about("Disable rewriting of media URLs to the bucket"))
        .subcommand(
            Command::new("get-attachment-files")
                .about("List all files for a given attachment")
                .arg(
                    Arg::new("attachment-id")
                        .required(true)
                        .index(1)
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("set-attachment-acl")
                .about("Update the ACL of all files for an attachment")
                .arg(
                    Arg::new("attachment-id")
                        .required(true)
                        .index(1)
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("acl")
                        .required(true)
                        .index(2)
                        .value_parser(["public-read", "private"]),
                ),
        )
}

/// Builds the SDK client once and wires it behind the metadata cache.
fn connect(config: &Config) -> Uploads {
    let credentials = Credentials::new(
        &config.access_key,
        &config.secret_key,
        None,
        None,
        "r2-uploads",
    );

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .credentials_provider(credentials);
    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = util::poll::poll_until_ready(loader.load());
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.endpoint.is_some())
        .build();
    let client = aws_sdk_s3::Client::from_conf(s3_config);

    let cached = CachedClient::new(client, MetadataCache::new(MokaStore::new()));
    Uploads::new(Box::new(cached), config.bucket.clone(), config.object_acl)
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

/// Dispatches one command. Bucket commands read their settings through
/// `lookup` and only call `connect` once every required one is present.
fn run<W, L, C>(matches: &ArgMatches, lookup: L, connect: C, out: &mut W) -> Result<()>
where
    W: Write + Send,
    L: Fn(&str) -> Option<String>,
    C: FnOnce(&Config) -> Uploads,
{
    let settings = SettingsFile::new(arg(matches, "settings"));

    let (name, sub) = match matches.subcommand() {
        Some(("enable", _)) => return commands::enable(&settings, out),
        Some(("disable", _)) => return commands::disable(&settings, out),
        Some((name, sub)) => (name, sub),
        None => return Err(Error::Failed("no command given".to_string())),
    };

    let config = Config::from_lookup(lookup)?;
    let uploads = connect(&config);
    info!(command = name, bucket = %config.bucket.name, "connected");

    match name {
        "verify" => uploads.verify(out),
        "ls" => uploads.ls(sub.get_one::<String>("path").map(String::as_str), out),
        "cp" => uploads.cp(
            arg(sub, "from"),
            arg(sub, "to"),
            sub.get_flag("best-effort"),
            out,
        ),
        "upload-directory" => {
            let options = TransferOptions {
                concurrency: sub
                    .get_one::<usize>("concurrency")
                    .copied()
                    .unwrap_or(DEFAULT_CONCURRENCY),
                verbose: sub.get_flag("verbose"),
            };
            uploads.upload_directory(Path::new(arg(sub, "from")), arg(sub, "to"), &options, out)
        }
        "rm" => uploads.rm(
            arg(sub, "path"),
            sub.get_one::<String>("regex").map(String::as_str),
            out,
        ),
        "get-attachment-files" | "set-attachment-acl" => {
            let library = ManifestLibrary::new(arg(matches, "attachments"));
            let id = sub.get_one::<u64>("attachment-id").copied().unwrap_or_default();

            if name == "get-attachment-files" {
                uploads.get_attachment_files(&library, id, out)
            } else {
                uploads.set_attachment_acl(&library, id, arg(sub, "acl"), out)
            }
        }
        other => Err(Error::Failed(format!("unknown command: {}", other))),
    }
}

fn report(err: &Error) {
    match err {
        Error::MissingConfig(missing) => {
            for constant in missing {
                eprintln!("Error: The required constant {} is not defined.", constant);
            }
        }
        err => eprintln!("Error: {}", err),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let span = span!(Level::INFO, "main", context = "main");
    let _e = span.enter();
    info!("called");

    let matches = cli().get_matches();
    let mut stdout = std::io::stdout();

    match run(&matches, config::env_var, connect, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error_message=%err, error_group="command");
            report(&err);
            ExitCode::FAILURE
        }
    }
}
