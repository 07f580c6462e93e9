use clap::{Parser, Subcommand};
use respimg::{config, manifest, output, preview};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "respimg")]
#[command(about = "Resolve responsive image variants for placeholder manifests")]
#[command(long_about = "\
Resolve responsive image variants for placeholder manifests

Placeholders declare a URL template (data-src) and an expected render
width (data-width); the engine serves each one the asset resolution its
width and display density call for.

Manifest structure (JSON):

  {
    \"viewport\": {
      \"device_pixel_ratio\": 2.0,      // defaults to 1.0
      \"high_density_media\": false    // high-density media queries match
    },
    \"placeholders\": [
      { \"src\": \"/image/1/800/600/photos/dawn.jpg\", \"width\": 300 },
      { \"src\": \"/image/2/800/600/1/photos/dusk.jpg\", \"width\": 700 }
    ]
  }

URL template scheme:

  /image/<mode:0-4>/<width>/<height>[/<crop>[/<background>]]/<path>

  mode 0      passthrough, never resized
  mode 1, 4   fixed-aspect resize, height computed server-side
  mode 2, 3   crop to box, height rescaled from the template dimensions

Run 'respimg gen-config' to generate a documented respimg.toml.")]
#[command(version)]
struct Cli {
    /// Engine configuration file
    #[arg(long, default_value = "respimg.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a placeholder manifest into concrete asset URLs
    Resolve {
        /// Placeholder manifest (JSON)
        #[arg(long)]
        manifest: PathBuf,
        /// Write the resolve report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        /// Write an HTML preview of the resolved variants
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Validate config and manifest without resolving
    Check {
        /// Placeholder manifest (JSON)
        #[arg(long)]
        manifest: PathBuf,
    },
    /// Print a stock respimg.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Resolve {
            manifest: manifest_path,
            report,
            preview: preview_path,
        } => {
            let config = config::load_config(&cli.config)?;
            let page = manifest::load_manifest(&manifest_path)?;
            let resolved = manifest::run_resolve(&page, &config)?;

            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&resolved)?;
                std::fs::write(&path, json)?;
            }
            if let Some(path) = preview_path {
                std::fs::write(&path, preview::render_preview(&resolved))?;
            }
            output::print_resolve_output(&resolved);
        }
        Command::Check {
            manifest: manifest_path,
        } => {
            let config = config::load_config(&cli.config)?;
            let page = manifest::load_manifest(&manifest_path)?;
            println!(
                "Config OK ({} candidate widths)",
                config.available_widths.len()
            );
            println!("Manifest OK ({} placeholders)", page.placeholders.len());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
