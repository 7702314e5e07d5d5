use anyhow::{anyhow, bail, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;
use yarrienet::config::{Config, DEFAULT_FILE_NAME};
use yarrienet::feed::RssMetadata;
use yarrienet::insert::rfc3339;
use yarrienet::microblog::{back_fill_dates, generate_rss, list_posts, new_post};

mod util;

use crate::util::{datetime, default_post_id, expand_path};

fn app() -> App<'static, 'static> {
    let file = Arg::with_name("FILE")
        .index(1)
        .help("The microblog HTML file (default: `microblog_html_file` from the config)");
    let output = Arg::with_name("OUTPUT")
        .index(2)
        .help("Where to write the result (default: standard output)");
    let date = Arg::with_name("date")
        .long("date")
        .takes_value(true)
        .value_name("RFC3339")
        .help("The post date (default: now)");

    App::new("yarrienet")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tools for maintaining a hand-written HTML microblog")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .long("config")
                .short("c")
                .takes_value(true)
                .value_name("FILE")
                .global(true)
                .help("The configuration file (default: ./yarrienet.conf)"),
        )
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .short("v")
                .global(true)
                .help("Log debug output"),
        )
        .subcommand(
            SubCommand::with_name("microblog")
                .about("Work with the microblog HTML file")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("new")
                        .about("Insert an empty post into the microblog HTML source code")
                        .arg(file.clone())
                        .arg(output.clone())
                        .arg(date.clone())
                        .arg(
                            Arg::with_name("id")
                                .long("id")
                                .takes_value(true)
                                .help("The post id (default: derived from the date)"),
                        ),
                )
                .subcommand(
                    SubCommand::with_name("genrss")
                        .about("Generate an RSS feed using the microblog file")
                        .arg(file.clone())
                        .arg(Arg::with_name("OUTPUT").index(2).help(
                            "Where to write the feed (default: `microblog_rss_file` from the config, then standard output)",
                        ))
                        .arg(metadata_arg("url", "The public URL of the microblog page"))
                        .arg(metadata_arg("title", "The feed title"))
                        .arg(metadata_arg("author", "The feed author"))
                        .arg(metadata_arg("description", "The feed description")),
                )
                .subcommand(
                    SubCommand::with_name("list")
                        .about("List the posts in the microblog file")
                        .arg(file.clone()),
                )
                .subcommand(
                    SubCommand::with_name("insertdates")
                        .about("Wrap undated date captions in time elements")
                        .arg(file)
                        .arg(output)
                        .arg(date),
                ),
        )
}

fn metadata_arg(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name).long(name).takes_value(true).help(help)
}

// Global arguments end up on whichever subcommand they were passed after.
fn leaf<'a, 'b>(matches: &'b ArgMatches<'a>) -> &'b ArgMatches<'a> {
    match matches.subcommand() {
        (_, Some(sub)) => leaf(sub),
        _ => matches,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(explicit: Option<&str>) -> Result<Config> {
    match explicit {
        Some(raw) => {
            let path = expand_path(raw);
            Config::from_file(&path)
                .with_context(|| format!("Loading configuration `{}`", path.display()))
        }
        None => {
            let path = Path::new(DEFAULT_FILE_NAME);
            if !path.exists() {
                debug!("no {} in the working directory, using defaults", DEFAULT_FILE_NAME);
                return Ok(Config::default());
            }
            debug!(path = %path.display(), "loading configuration");
            Config::from_file(path)
                .with_context(|| format!("Loading configuration `{}`", path.display()))
        }
    }
}

fn source_path(matches: &ArgMatches, config: &Config) -> Result<PathBuf> {
    matches
        .value_of("FILE")
        .or_else(|| config.microblog_html_file.as_deref())
        .map(expand_path)
        .ok_or_else(|| {
            anyhow!(
                "No microblog file given; pass FILE or set `microblog_html_file` in {}",
                DEFAULT_FILE_NAME
            )
        })
}

fn cmd_new(matches: &ArgMatches, config: &Config) -> Result<()> {
    let source = source_path(matches, config)?;
    let output = matches.value_of("OUTPUT").map(expand_path);
    let datetime = datetime(matches.value_of("date"))?;
    let id = match matches.value_of("id") {
        Some(id) => id.to_owned(),
        None => default_post_id(&datetime),
    };

    if new_post(&source, output.as_deref(), &id, &datetime)? {
        info!(post = %id, date = %rfc3339(&datetime), "inserted post");
    }
    Ok(())
}

fn cmd_insert_dates(matches: &ArgMatches, config: &Config) -> Result<()> {
    let source = source_path(matches, config)?;
    let output = matches.value_of("OUTPUT").map(expand_path);
    let datetime = datetime(matches.value_of("date"))?;
    let count = back_fill_dates(&source, output.as_deref(), &datetime)?;
    info!(count, "back-filled dates");
    Ok(())
}

fn cmd_genrss(matches: &ArgMatches, config: &Config) -> Result<()> {
    let source = source_path(matches, config)?;
    let output = matches
        .value_of("OUTPUT")
        .or_else(|| config.microblog_rss_file.as_deref())
        .map(expand_path);

    let setting = |flag: &str, configured: &Option<String>| -> String {
        matches
            .value_of(flag)
            .map(str::to_owned)
            .or_else(|| configured.clone())
            .unwrap_or_default()
    };
    let metadata = RssMetadata {
        title: setting("title", &config.rss_title),
        author: setting("author", &config.rss_author),
        description: setting("description", &config.rss_description),
        base_url: setting("url", &config.rss_base_url),
    };

    if metadata.base_url.is_empty() {
        warn!("no base URL set (--url or `rss_base_url`), item links will be bare fragments");
    } else {
        Url::parse(&metadata.base_url)
            .with_context(|| format!("Invalid base URL `{}`", metadata.base_url))?;
    }

    let items = generate_rss(&source, output.as_deref(), &metadata)?;
    info!(items, "generated feed");
    Ok(())
}

fn cmd_list(matches: &ArgMatches, config: &Config) -> Result<()> {
    for post in list_posts(&source_path(matches, config)?)? {
        println!("{} {}", post.id, rfc3339(&post.date_posted));
    }
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<()> {
    let microblog = match matches.subcommand() {
        ("microblog", Some(microblog)) => microblog,
        (name, _) => bail!("Unknown command `{}`", name),
    };

    let leaf = leaf(matches);
    let config = load_config(leaf.value_of("config").or_else(|| matches.value_of("config")))?;

    match microblog.subcommand() {
        ("new", Some(m)) => cmd_new(m, &config),
        ("genrss", Some(m)) => cmd_genrss(m, &config),
        ("list", Some(m)) => cmd_list(m, &config),
        ("insertdates", Some(m)) => cmd_insert_dates(m, &config),
        (name, _) => bail!("Unknown microblog subcommand `{}`", name),
    }
}

fn main() {
    let matches = app().get_matches();
    init_logging(leaf(&matches).is_present("verbose") || matches.is_present("verbose"));

    if let Err(err) = run(&matches) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
