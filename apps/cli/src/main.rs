//! # Shoplink CLI
//!
//! Operator surface for the marketplace catalog sync engine.
//!
//! ## Typical Session
//! ```text
//! export SHOPLINK_SECRET_KEY=$(shoplink keygen)
//! shoplink configure --app-key 6abc... --app-secret ...
//! shoplink authorize <code from the marketplace redirect>
//! shoplink select-shop
//! shoplink preview --page-size 20 --dry-run
//! shoplink import --max-products 500
//! shoplink history --limit 5
//! ```
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - `RUST_LOG=shoplink_sync=trace` - Trace the engine only
//! - Default: INFO level, written to stderr

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shoplink_core::{BulkImportRequest, PageRequest};
use shoplink_sync::{SecretCipher, SyncConfig, SyncService};

#[derive(Parser, Debug)]
#[command(name = "shoplink", version, about = "Marketplace catalog sync")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Store the marketplace app key and secret (secret is encrypted)
    Configure {
        /// App key; falls back to [provider].app_key
        #[arg(long)]
        app_key: Option<String>,
        /// App secret; falls back to SHOPLINK_APP_SECRET
        #[arg(long)]
        app_secret: Option<String>,
    },
    /// Exchange an authorization code for tokens
    Authorize {
        /// One-time code from the marketplace redirect
        code: String,
    },
    /// Show credential state, bound shop and token expiry
    Status,
    /// List shops authorized for the current credentials
    Shops,
    /// Bind catalog calls to a shop
    SelectShop {
        /// Shop cipher, id or code; defaults to the current or first shop
        #[arg(long)]
        shop: Option<String>,
    },
    /// Fetch and reconcile a single page
    Preview {
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        page_token: Option<String>,
        /// Report what would change without writing
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Import many pages under page and product budgets
    Import {
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        max_pages: Option<u32>,
        #[arg(long)]
        max_products: Option<u32>,
        /// Resume from a previous run's next page token
        #[arg(long)]
        page_token: Option<String>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Show recent sync runs, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Forget tokens and shop binding, keep app configuration
    Disconnect,
    /// Print a fresh base64 secret key for SHOPLINK_SECRET_KEY
    Keygen,
    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long, default_value_t = false)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen => {
            println!("{}", SecretCipher::generate_key());
            return Ok(());
        }
        Commands::Config { save } => {
            let config = SyncConfig::load(cli.config.clone()).context("loading config")?;
            if save {
                let path = config.save(cli.config.clone())?;
                info!(path = %path.display(), "Config written");
            }
            print!("{}", toml::to_string_pretty(&config)?);
            return Ok(());
        }
        _ => {}
    }

    let config = SyncConfig::load(cli.config.clone()).context("loading config")?;
    let service = SyncService::open(config)
        .await
        .context("opening sync service")?;
    info!(provider = service.provider_name(), "Service opened");

    match cli.command {
        Commands::Configure {
            app_key,
            app_secret,
        } => {
            let secret = app_secret
                .or_else(|| std::env::var("SHOPLINK_APP_SECRET").ok())
                .context("--app-secret or SHOPLINK_APP_SECRET is required")?;
            service.configure_app(app_key.as_deref(), &secret).await?;
            print_json(&service.auth_status().await?)?;
        }
        Commands::Authorize { code } => {
            print_json(&service.authorize(&code).await?)?;
        }
        Commands::Status => {
            print_json(&service.auth_status().await?)?;
        }
        Commands::Shops => {
            print_json(&service.list_shops().await?)?;
        }
        Commands::SelectShop { shop } => {
            print_json(&service.select_shop(shop.as_deref()).await?)?;
        }
        Commands::Preview {
            page_size,
            page_token,
            dry_run,
        } => {
            let result = service
                .preview_page(PageRequest {
                    page_size,
                    page_token,
                    dry_run,
                })
                .await;
            print_json(&result)?;
            if let Some(err) = result.error {
                bail!("preview failed: {}", err);
            }
        }
        Commands::Import {
            page_size,
            max_pages,
            max_products,
            page_token,
            dry_run,
        } => {
            let result = service
                .bulk_import(BulkImportRequest {
                    page_size,
                    max_pages,
                    max_products,
                    page_token,
                    dry_run,
                })
                .await;
            print_json(&result)?;
            if let Some(err) = result.error {
                bail!("import failed: {}", err);
            }
        }
        Commands::History { limit } => {
            print_json(&service.run_history(limit).await?)?;
        }
        Commands::Disconnect => {
            service.disconnect().await?;
            print_json(&service.auth_status().await?)?;
        }
        Commands::Keygen | Commands::Config { .. } => {}
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_import() {
        let cli = Cli::parse_from([
            "shoplink",
            "import",
            "--max-products",
            "5",
            "--page-token",
            "t1",
            "--dry-run",
        ]);
        match cli.command {
            Commands::Import {
                max_products,
                page_token,
                dry_run,
                page_size,
                ..
            } => {
                assert_eq!(max_products, Some(5));
                assert_eq!(page_token.as_deref(), Some("t1"));
                assert!(dry_run);
                assert_eq!(page_size, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_config_and_select_shop() {
        let cli = Cli::parse_from([
            "shoplink",
            "select-shop",
            "--shop",
            "c1",
            "--config",
            "/tmp/x.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
        assert!(matches!(cli.command, Commands::SelectShop { shop: Some(ref s) } if s == "c1"));
    }
}
