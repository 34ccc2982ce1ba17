use clap::{Parser, Subcommand};
use folio::cms::{Cms, CmsClient};
use folio::config::{self, SiteConfig};
use folio::enrich::EnrichOptions;
use folio::media::Mode;
use folio::{blocks, cache, content, enrich, export, generate, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that talk to the CMS.
#[derive(clap::Args, Clone)]
struct CmsArgs {
    /// CMS origin, overriding `[cms] base_url`
    #[arg(long, env = "CMS_BASE_URL")]
    cms_url: Option<String>,
}

/// Shared flags for commands that load content.
#[derive(clap::Args, Clone)]
struct LoadArgs {
    /// Read the live CMS and serve media from it (falls back to the snapshot)
    #[arg(long)]
    dev: bool,

    #[command(flatten)]
    cms: CmsArgs,
}

/// Release version on a tagged commit, `dev@<hash>[+dirty]` otherwise.
fn version_string() -> &'static str {
    if env!("ON_RELEASE_TAG") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match (env!("GIT_HASH"), env!("GIT_DIRTY") == "true") {
        ("", _) => "dev@unknown",
        // Leaked once at startup
        (hash, dirty) => &*Box::leak(
            format!("dev@{hash}{}", if dirty { "+dirty" } else { "" }).into_boxed_str(),
        ),
    }
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Static renderer for a CMS-backed portfolio")]
#[command(long_about = "\
Static renderer for a CMS-backed portfolio

Pages, content blocks and site settings are edited in a headless CMS. folio
snapshots them to disk and renders a static HTML site with responsive
images, justified galleries, video embeds and a fullscreen lightbox.

Project layout:

  ./
  ├── config.toml                  # Optional, merged over stock defaults
  ├── .image-cache.json            # Written by the image optimizer
  ├── data/
  │   ├── pages.json               # Snapshot written by `folio export`
  │   └── site.json
  ├── public/images/               # Downloaded originals
  │   └── optimized/               # Optimizer output (dawn-640w.jpg, ...)
  └── dist/                        # `folio build` output

Typical deploy:
  folio export            # CMS → data/ + public/images/
  <optimizer>             # public/images/ → optimized/ + .image-cache.json
  folio enrich            # attach srcset/sizes to the snapshot
  folio build             # snapshot → dist/

Run 'folio gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Project root (holds config.toml)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Snapshot directory [default: <root>/data]
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Downloaded images directory [default: <root>/public/images]
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Output directory [default: <root>/dist]
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Optimizer manifest [default: <root>/.image-cache.json]
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn dir(&self, flag: &Option<PathBuf>, default: &str) -> PathBuf {
        flag.clone().unwrap_or_else(|| self.root.join(default))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Fetch CMS content into the static snapshot and download images
    Export(CmsArgs),
    /// Attach responsive variants from the optimizer manifest
    Enrich,
    /// Render the static site
    Build(LoadArgs),
    /// Load and validate content, print the inventory
    Check(LoadArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = cli.dir(&cli.data, "data");
    let images_dir = cli.dir(&cli.images, "public/images");

    match &cli.command {
        Command::Export(cms_args) => {
            let site_config = load_config(&cli.root, cms_args, false)?;
            let client = CmsClient::from_config(&site_config.cms);
            println!("==> Exporting from {}", client.base_url());
            let summary = export::export(&client, &data_dir, &images_dir)?;
            output::print_export(&summary);
        }
        Command::Enrich => {
            let site_config = config::load_config(&cli.root)?;
            let cache_path = cli.dir(&cli.cache, cache::CACHE_FILENAME);
            println!("==> Enriching {}", data_dir.display());
            let options = EnrichOptions {
                optimized_path: site_config.media.optimized_path.clone(),
                sizes_hint: site_config.media.sizes_hint.clone(),
            };
            let summary = enrich::run(&data_dir, &images_dir, &cache_path, &options)?;
            output::print_enrich(&summary);
        }
        Command::Build(args) => {
            let site_config = load_config(&cli.root, &args.cms, args.dev)?;
            let loaded = load(&site_config, &data_dir)?;
            let output_dir = cli.dir(&cli.output, "dist");
            println!("==> Generating HTML → {}", output_dir.display());
            let summary = generate::build(
                &loaded,
                &site_config,
                &site_config.media_policy(),
                &images_dir,
                &output_dir,
            )?;
            output::print_build(&summary);
            println!("==> Build complete: {}", output_dir.display());
        }
        Command::Check(args) => {
            let site_config = load_config(&cli.root, &args.cms, args.dev)?;
            let loaded = load(&site_config, &data_dir)?;
            let ctx = generate::render_context(&site_config, &site_config.media_policy());
            let stats: Vec<_> = loaded
                .pages
                .iter()
                .map(|page| generate::page_stats(page, &blocks::render(&page.content, &ctx)))
                .collect();
            output::print_check(loaded.origin, &stats);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `config.toml` and apply command-line overrides.
fn load_config(root: &Path, cms: &CmsArgs, dev: bool) -> Result<SiteConfig, config::ConfigError> {
    let mut site_config = config::load_config(root)?;
    if let Some(url) = &cms.cms_url {
        site_config.cms.base_url = url.trim_end_matches('/').to_string();
    }
    if dev {
        site_config.media.mode = Mode::Dev;
    }
    site_config.validate()?;
    Ok(site_config)
}

/// Live CMS in dev mode, snapshot otherwise.
fn load(site_config: &SiteConfig, data_dir: &Path) -> Result<content::Content, content::ContentError> {
    let client = CmsClient::from_config(&site_config.cms);
    let cms: Option<&dyn Cms> = match site_config.media.mode {
        Mode::Dev => Some(&client),
        Mode::Prod => None,
    };
    content::load_content(data_dir, site_config.media.mode, cms)
}
