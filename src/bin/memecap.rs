use std::{
    fs::File,
    io::{BufReader, Write as _},
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "memecap", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flatten a template image and text layers into a PNG.
    Export(ExportArgs),
    /// Run the caption-assist gateway HTTP server.
    Serve(ServeArgs),
    /// Ask the assistant for one caption per template.
    Assist(AssistArgs),
    /// Refine every row of a caption CSV.
    BatchRefine(BatchArgs),
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Template image: path, http(s) URL or data: URL.
    #[arg(long)]
    image: String,

    /// JSON file holding the layer array.
    #[arg(long)]
    layers: PathBuf,

    /// Output width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Socket address to bind, overriding the configuration.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[derive(Parser, Debug)]
struct AssistArgs {
    /// Study topic.
    #[arg(long)]
    topic: String,

    /// Template as `<id>=<image path>`; repeatable.
    #[arg(long = "template", value_parser = parse_template_arg, required = true)]
    templates: Vec<(String, PathBuf)>,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Input CSV.
    #[arg(long)]
    csv: PathBuf,

    /// Directory holding template images.
    #[arg(long)]
    assets: PathBuf,

    /// Output CSV; defaults to rewriting the input.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the output file instead of printing it.
    #[arg(long)]
    apply: bool,
}

fn parse_template_arg(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((id, path)) if !id.trim().is_empty() && !path.trim().is_empty() => {
            Ok((id.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("expected <id>=<path>, got '{s}'")),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = memecap::AppConfig::load(cli.config.as_deref()).context("load configuration")?;
    match cli.cmd {
        Command::Export(args) => cmd_export(&config, args),
        Command::Serve(args) => runtime()?.block_on(cmd_serve(&config, args)),
        Command::Assist(args) => runtime()?.block_on(cmd_assist(&config, args)),
        Command::BatchRefine(args) => runtime()?.block_on(cmd_batch(&config, args)),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")
}

fn read_layers(path: &Path) -> anyhow::Result<Vec<memecap::TextLayer>> {
    let f = File::open(path).with_context(|| format!("open layers '{}'", path.display()))?;
    let layers: Vec<memecap::TextLayer> =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse layers JSON")?;
    Ok(layers)
}

fn cmd_export(config: &memecap::AppConfig, args: ExportArgs) -> anyhow::Result<()> {
    let request = memecap::ExportRequest {
        image_url: args.image,
        layers: read_layers(&args.layers)?,
        output_width: args.width,
    };
    let mut compositor = memecap::Compositor::new(config.compositor.clone());
    let image = compositor.export(&request)?;

    let dir = args
        .out
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let filename = args
        .out
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("output path '{}' has no file name", args.out.display()))?;
    let path = image.save(dir, filename)?;

    eprintln!("wrote {} ({}x{})", path.display(), image.width, image.height);
    Ok(())
}

fn upstream(config: &memecap::AppConfig) -> anyhow::Result<memecap::OpenAiUpstream> {
    if config.upstream.api_key().is_none() {
        tracing::warn!(
            var = %config.upstream.api_key_env,
            "no API key in environment; upstream calls will fail"
        );
    }
    Ok(memecap::OpenAiUpstream::from_config(&config.upstream)?)
}

async fn cmd_serve(config: &memecap::AppConfig, args: ServeArgs) -> anyhow::Result<()> {
    let addr = match args.bind {
        Some(addr) => addr,
        None => config
            .gateway
            .bind
            .parse()
            .with_context(|| format!("parse bind address '{}'", config.gateway.bind))?,
    };
    let gateway = Arc::new(memecap::Gateway::new(upstream(config)?));
    memecap::gateway::server::serve(addr, gateway).await?;
    Ok(())
}

async fn cmd_assist(config: &memecap::AppConfig, args: AssistArgs) -> anyhow::Result<()> {
    let mut hints = Vec::with_capacity(args.templates.len());
    for (id, path) in args.templates {
        let image = memecap::InlineImage::from_path(&path)?;
        hints.push(memecap::TemplateHint {
            template_id: id,
            description: None,
            image: Some(image),
        });
    }

    let assistant = memecap::CaptionAssistant::new(upstream(config)?);
    let outcome = assistant.generate_memes_ai(&args.topic, &hints).await?;
    if let memecap::AssistSource::Fallback { reason } = &outcome.source {
        eprintln!("using local fallback ideas: {reason}");
    }
    let json = serde_json::to_string_pretty(&outcome.value).context("encode ideas")?;
    println!("{json}");
    Ok(())
}

async fn cmd_batch(config: &memecap::AppConfig, args: BatchArgs) -> anyhow::Result<()> {
    let gateway = memecap::Gateway::new(upstream(config)?);
    let opts = memecap::batch::BatchOptions {
        csv: args.csv,
        assets: args.assets,
        out: args.out,
        apply: args.apply,
    };
    let report = memecap::batch::refine_csv(&gateway, &opts).await?;

    match &report.written {
        Some(path) => eprintln!("wrote {}", path.display()),
        None => {
            std::io::stdout()
                .write_all(&report.output)
                .context("write CSV to stdout")?;
            eprintln!("dry run; pass --apply to write the file");
        }
    }
    eprintln!(
        "rows={} refined={} failed={}",
        report.rows, report.refined, report.failed
    );
    Ok(())
}
