mod cli;
mod commands;
mod config;
mod error;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    error::Result,
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use std::process;
use tracing::{Level, debug, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {}", e);
        }
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet)?;

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(timeout) = args.timeout {
        config.request_timeout = timeout;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if args.proxy.is_some() {
        config.proxy = args.proxy;
    }
    if args.proxy_username.is_some() {
        config.proxy_username = args.proxy_username;
    }
    if args.proxy_password.is_some() {
        config.proxy_password = args.proxy_password;
    }
    debug!("Starting refscan with config: {:?}", config);

    match args.command {
        Commands::Scan {
            input,
            base_url,
            page_url,
            candidates,
            output,
            output_file,
        } => {
            let executor = CommandExecutor::new(config)?;
            let format = output.unwrap_or_else(|| executor.default_output_format());
            executor.scan(
                &input,
                base_url.as_deref(),
                page_url.as_deref(),
                candidates,
                &format,
                output_file.as_deref(),
            )?;
        }

        Commands::Extract {
            url,
            referer,
            output,
            output_file,
        } => {
            let executor = CommandExecutor::new(config)?;
            let format = output.unwrap_or_else(|| executor.default_output_format());
            executor
                .extract(&url, referer.as_deref(), &format, output_file.as_deref())
                .await?;
        }

        Commands::Page {
            url,
            referer,
            output,
            output_file,
        } => {
            let executor = CommandExecutor::new(config)?;
            let format = output.unwrap_or_else(|| executor.default_output_format());
            executor
                .page(&url, referer.as_deref(), &format, output_file.as_deref())
                .await?;
        }

        Commands::Batch {
            input,
            output_dir,
            output_format,
            max_concurrent,
            referer,
        } => {
            CommandExecutor::new(config)?
                .batch_process(
                    &input,
                    output_dir.as_deref(),
                    &output_format,
                    max_concurrent,
                    referer,
                )
                .await?;
        }

        Commands::Crawl {
            site,
            max_pages,
            output_file,
            max_concurrent,
        } => {
            CommandExecutor::new(config)?
                .crawl(site, max_pages, output_file, max_concurrent)
                .await?;
        }

        Commands::Series {
            site,
            max_series,
            output_dir,
            master_file,
            max_concurrent,
        } => {
            CommandExecutor::new(config)?
                .series(site, max_series, output_dir, master_file, max_concurrent)
                .await?;
        }

        Commands::Probe {
            url,
            referer,
            output,
        } => {
            let executor = CommandExecutor::new(config)?;
            let format = output.unwrap_or_else(|| executor.default_output_format());
            executor.probe(&url, referer.as_deref(), &format).await?;
        }

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Commands::Config { show, reset } => {
            if reset {
                AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults");
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .with(filter)
        .init();

    Ok(())
}
