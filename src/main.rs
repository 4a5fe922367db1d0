use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use skald::build::build_site;
use skald::cli;
use skald::config::{Config, Source};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let matches = App::new("skald")
        .version(crate_version!())
        .about("Builds a static blog from numbered posts on a static host")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Logs more detail (-v for debug, -vv for dependencies too)"),
        )
        .arg(
            Arg::with_name("project")
                .long("project")
                .short("p")
                .takes_value(true)
                .global(true)
                .help("The directory to search for skald.yaml (default: current directory)"),
        )
        .subcommand(
            SubCommand::with_name("build")
                .about("Fetches every post and renders the site")
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .short("o")
                        .takes_value(true)
                        .default_value("_output")
                        .help("The directory to write the site into"),
                ),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Discovers posts and prints their metadata as JSON lines"),
        )
        .subcommand(
            SubCommand::with_name("show")
                .about("Fetches a single post and prints it as JSON")
                .arg(
                    Arg::with_name("id")
                        .required(true)
                        .index(1)
                        .help("The post's numeric ID"),
                ),
        )
        .get_matches();

    if let Err(e) = run(&matches).await {
        eprintln!("error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}

async fn run(matches: &ArgMatches<'_>) -> Result<(), Box<dyn Error>> {
    let (name, sub) = match matches.subcommand() {
        (name, Some(sub)) => (name, sub),
        _ => return Err("a subcommand is required".into()),
    };
    init_logging(sub.occurrences_of("verbose"));

    let project = match sub.value_of("project") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    let stdout = std::io::stdout();
    match name {
        "build" => {
            let output = Path::new(sub.value_of("output").unwrap_or("_output"));
            build_site(Config::from_directory(&project, output)?).await?
        }
        "list" => cli::list(&Source::from_directory(&project)?, &mut stdout.lock()).await?,
        "show" => {
            let id = sub.value_of("id").unwrap_or_default();
            cli::show(&Source::from_directory(&project)?, id, &mut stdout.lock()).await?
        }
        _ => return Err(format!("unknown subcommand `{}`", name).into()),
    }
    Ok(())
}

// `RUST_LOG` wins over `-v`. Logs go to stderr so `list` and `show` output
// stays parseable.
fn init_logging(verbosity: u64) {
    let default = match verbosity {
        0 => "skald=info",
        1 => "skald=debug",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
