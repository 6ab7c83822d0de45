use clap::{Parser, Subcommand};
use imagevault::config::{self, ServiceConfig};
use imagevault::fetch::{HttpPool, TransferLimits};
use imagevault::imaging::{PixelBudget, ResizeFactor, ResizeParams, RustBackend};
use imagevault::logging::{self, LogFormat};
use imagevault::request::FetchRequest;
use imagevault::server::{self, AppState};
use imagevault::{output, render};
use std::path::PathBuf;
use std::sync::Arc;

fn version_string() -> &'static str {
    let hash = env!("GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{}@{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "imagevault")]
#[command(about = "Fetch remote images and return them as raw RGB pixels")]
#[command(long_about = "\
Fetch remote images and return them as raw RGB pixels

A URL goes in; a width, a height and width*height*3 bytes of row-major RGB
come out. Downloads are bounded by a hard byte ceiling, retried on transient
failures, and fall back through scheme-swapped and query-stripped variants of
the URL. The decoded image is shrunk by an integer factor and then, if still
too large, proportionally to fit a pixel budget.

  imagevault serve                     # POST {\"url\": ...} to /render
  imagevault render URL --out a.rgb    # one-shot, raw bytes to a file

Run 'imagevault gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (TOML); stock defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Listen address (overrides config)
    #[arg(long)]
    bind: Option<String>,

    /// Listen port (overrides config and PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Image URL
    url: String,

    /// Integer shrink factor applied to both sides
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    resize_factor: Option<u32>,

    /// Maximum output pixel count
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    max_pixels: Option<u64>,

    /// Write the raw RGB buffer here
    #[arg(long)]
    out: Option<PathBuf>,

    /// Skip the HEAD probe before each download
    #[arg(long)]
    no_probe: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// Render one URL and print a summary
    Render(RenderArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Serve(args) => {
            logging::init_logging(cli.log_format)?;
            let config = config::load_config(cli.config.as_deref())?;
            run_serve(config, args)?;
        }
        Command::Render(args) => {
            logging::init_logging(cli.log_format)?;
            let config = config::load_config(cli.config.as_deref())?;
            run_render(config, args)?;
        }
    }

    Ok(())
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

fn run_serve(mut config: ServiceConfig, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    config
        .server
        .override_port(std::env::var("PORT").ok().as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let (bind, port) = (config.server.bind.clone(), config.server.port);
    let state = AppState::from_config(config)?;
    runtime()?.block_on(server::serve(state, &bind, port))?;
    Ok(())
}

fn run_render(config: ServiceConfig, args: RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let resize = ResizeParams {
        factor: ResizeFactor::new(
            args.resize_factor
                .unwrap_or(config.render.default_resize_factor),
        ),
        max_pixels: PixelBudget::new(args.max_pixels.unwrap_or(config.render.default_max_pixels)),
    };
    let request = FetchRequest::new(&args.url, TransferLimits::from(&config.fetch), resize)?;
    let pool = HttpPool::new(&config.fetch)?;
    let backend = Arc::new(RustBackend::with_max_decode_alloc(
        config.render.max_decode_alloc,
    ));
    let probe = config.fetch.probe && !args.no_probe;

    let rendered = runtime()?.block_on(render::render(&pool, backend, &request, probe))?;
    if let Some(path) = &args.out {
        std::fs::write(path, &rendered.image.data)?;
    }
    output::print_render_summary(request.locator.as_str(), &rendered, args.out.as_deref());
    Ok(())
}
