use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use instatrace::commands::scan_profile;
use instatrace::config::{Config, DEFAULT_BASE_URL, DEFAULT_STARTUP_DELAY_MS, DEFAULT_TIMEOUT_SECS};
use instatrace::error_utils::format_error_chain;
use instatrace::session::{run_until_interrupted, SessionEnd};
use instatrace::status::{paint, print_banner, print_status, Tone};
use std::io::BufReader;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "instatrace",
    version,
    about = "Check a public profile page for an exposed timeline and save its image URLs",
    long_about = "Fetches a public profile page, looks for the embedded timeline data and saves \
                  every image URL it contains, grouped by post. The username is asked for \
                  interactively. Use it only on accounts you own or have permission to test."
)]
struct Cli {
    /// Directory the <username>_urls.txt report is written to
    #[arg(short, long = "output-dir", env = "INSTATRACE_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Site the profile path is appended to
    #[arg(long, env = "INSTATRACE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Profile request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Pause before the profile request, in milliseconds
    #[arg(long, default_value_t = DEFAULT_STARTUP_DELAY_MS)]
    startup_delay_ms: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load environment variables from .env file
    dotenv().ok();

    // Usage errors and --help both print and end the run
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return;
        }
    };

    init_logging(args.verbose);
    debug!("Parsed arguments: {args:?}");

    print_banner();

    match run_until_interrupted(run(&args), tokio::signal::ctrl_c()).await {
        SessionEnd::Completed => {}
        SessionEnd::Interrupted => println!("\n{}", paint("Stopped.", Tone::Warning)),
        SessionEnd::Failed(e) => println!(
            "{}",
            paint(&format!("Error: {}", format_error_chain(&e)), Tone::Error)
        ),
    }
}

fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(args: &Cli) -> Result<()> {
    let config = Config::from_cli(
        &args.base_url,
        args.timeout,
        args.startup_delay_ms,
        args.output_dir.clone(),
    )?;

    let stdin = BufReader::new(std::io::stdin());
    let Some(username) = scan_profile::prompt_username(stdin).await? else {
        print_status("Username required", Tone::Error);
        return Ok(());
    };

    let outcome = scan_profile::execute(&username, &config).await?;
    debug!("Scan of @{username} finished: {outcome:?}");

    if outcome.reached_verdict() {
        println!();
        print_status("Done.", Tone::Success);
    }

    Ok(())
}
