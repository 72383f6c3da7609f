//! Serves one request from a site on disk and prints the response.
//!
//! ```text
//! folio --content site/content --templates site/templates /docs/setup
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use folio::{App, Response};

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Render a page of a flat-file site")]
struct Cli {
    /// Directory of content pages
    #[arg(long, value_name = "DIR")]
    content: PathBuf,

    /// Directory of templates
    #[arg(long, value_name = "DIR")]
    templates: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Site base URL (overrides the config file)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Log pipeline activity to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Request path, optionally with a query
    #[arg(default_value = "/")]
    path: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(response) if response.status().is_server_error() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<Response> {
    folio::logging::init(if cli.verbose { "folio=debug,folio_dispatch=debug" } else { "warn" })?;

    let mut builder = App::builder().content_dir(&cli.content);
    if let Some(dir) = &cli.templates {
        builder = builder.templates_dir(dir);
    }
    if let Some(file) = &cli.config {
        builder = builder.config_file(file);
    }
    if let Some(base_url) = cli.base_url {
        builder = builder.config(folio::folio_dispatch::BASE_URL, base_url);
    }
    let mut app = builder
        .build()
        .with_context(|| format!("failed to load site from {}", cli.content.display()))?;

    let response = app.get(&cli.path);
    print_response(&response);
    Ok(response)
}

fn print_response(response: &Response) {
    println!("{:?} {}", response.version(), response.status());
    for (name, value) in response.headers() {
        println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    println!();
    print!("{}", response.body());
}
