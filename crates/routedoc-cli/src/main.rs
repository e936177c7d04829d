use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::info;

use routedoc_core::config::{self, CONFIG_FILE_NAME, GeneratorConfig, OutputFormat};
use routedoc_core::manifest::{self, Manifest};
use routedoc_core::Generator;

#[derive(Parser)]
#[command(name = "routedoc", about = "OpenAPI documents from route manifests", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an OpenAPI document from a route manifest
    Generate {
        /// Path to the route manifest (YAML or JSON)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Target OpenAPI version (2.0, 3.0, 3.1)
        #[arg(short = 's', long = "spec-version")]
        spec_version: Option<String>,

        /// Output file, `-` for stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long)]
        format: Option<FormatArg>,
    },

    /// List the supported OpenAPI versions
    Versions,

    /// Initialize a new routedoc configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Yaml,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Yaml => OutputFormat::Yaml,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            spec_version,
            output,
            format,
        } => cmd_generate(input, spec_version, output, format),

        Commands::Versions => cmd_versions(),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "routedoc", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Try to load the project config file from the current directory.
fn try_load_config() -> Result<Option<GeneratorConfig>> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    config::load_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");

    let manifest = match ext {
        "json" => manifest::from_json(&content),
        _ => manifest::from_yaml(&content),
    }
    .with_context(|| format!("invalid manifest {}", path.display()))?;
    Ok(manifest)
}

fn render(document: &serde_json::Value, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(document)?;
            json.push('\n');
            json
        }
        OutputFormat::Yaml => serde_yaml_ng::to_string(document)?,
    };
    Ok(rendered)
}

fn cmd_generate(
    input: Option<PathBuf>,
    spec_version: Option<String>,
    output: Option<PathBuf>,
    format: Option<FormatArg>,
) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let input = input.unwrap_or_else(|| PathBuf::from(&cfg.input));
    let output = output.unwrap_or_else(|| PathBuf::from(&cfg.output));
    let version = spec_version.unwrap_or_else(|| cfg.target.clone());
    let format = format.map(OutputFormat::from).unwrap_or(cfg.format);

    let mut manifest = load_manifest(&input)?;
    let mut generator = Generator::new(cfg);
    manifest.register_entities(&mut generator);

    let document = generator
        .generate(&manifest.routes, &version)
        .with_context(|| format!("failed to generate OpenAPI {version} document"))?;
    let rendered = render(&document, format)?;

    if output.as_os_str() == "-" {
        print!("{rendered}");
        return Ok(());
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(&output, rendered).with_context(|| format!("failed to write {}", output.display()))?;
    info!("{} routes rendered", manifest.routes.len());
    eprintln!("Wrote {} (OpenAPI {version})", output.display());
    Ok(())
}

fn cmd_versions() -> Result<()> {
    let generator = Generator::default();
    for version in generator.exporters().versions() {
        let exporter = generator.exporters().for_version(version)?;
        println!("{version}\t{}", exporter.version());
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
