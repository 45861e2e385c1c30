use clap::{Parser, Subcommand};
use imgflow::batch::{self, OutputNaming};
use imgflow::url::{self, UrlOptions};
use imgflow::{FilterChainConfig, ImageHandler, SourceRegistry, chain, config, logging, output};
use serde_json::{Map, Value};
use std::error::Error;
use std::path::PathBuf;

/// Flags that build a shorthand filter chain.
#[derive(clap::Args, Clone, Default)]
struct ChainArgs {
    /// Target width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// With both sides: fill the box and center-crop to it
    #[arg(long)]
    crop: bool,

    /// Clockwise rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    rotate: Option<f64>,

    /// Extra filter, as NAME or NAME=JSON (e.g. --filter grayscale --filter blur=2.5)
    #[arg(long = "filter", value_name = "NAME[=JSON]")]
    filters: Vec<String>,

    /// Preset from the config file
    #[arg(long = "preset", value_name = "NAME")]
    presets: Vec<String>,
}

impl ChainArgs {
    fn to_config(&self) -> FilterChainConfig {
        let mut options = Map::new();
        for preset in &self.presets {
            options.insert(preset.clone(), Value::Bool(true));
        }
        if let Some(width) = self.width {
            options.insert("width".into(), Value::from(width));
        }
        if let Some(height) = self.height {
            options.insert("height".into(), Value::from(height));
        }
        if self.crop {
            options.insert("crop".into(), Value::Bool(true));
        }
        if let Some(angle) = self.rotate {
            let angle = if angle.fract() == 0.0 {
                Value::from(angle as i64)
            } else {
                Value::from(angle)
            };
            options.insert("rotate".into(), angle);
        }
        for filter in &self.filters {
            let (name, params) = parse_filter_arg(filter);
            options.insert(name, params);
        }
        FilterChainConfig::Shorthand(options)
    }
}

/// `grayscale` → true, `blur=2.5` → 2.5, `colorize=#ff0000` → "#ff0000".
fn parse_filter_arg(arg: &str) -> (String, Value) {
    match arg.split_once('=') {
        None => (arg.to_string(), Value::Bool(true)),
        Some((name, raw)) => {
            let params =
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            (name.to_string(), params)
        }
    }
}

#[derive(Parser)]
#[command(name = "imgflow")]
#[command(about = "Image manipulation pipeline: sources, filter chains, formats")]
#[command(long_about = "\
Image manipulation pipeline: sources, filter chains, formats

Images are addressed by logical paths inside a source (by default the
\"public\" directory). A filter chain is given with flags, or encoded in the
file name:

  imgflow make image.jpg --width 100 --height 90 --crop --rotate 90 -o small.png
  imgflow url 'image-filters(100x90-crop-rotate(90)).jpg' -o small.png
  imgflow batch a.jpg b.jpg --preset thumbnail

Shorthand steps run geometry first (resize, crop), then rotate, then
cosmetic filters (grayscale, negative, blur, gamma, colorize).

Run 'imgflow gen-config' to generate a documented imgflow.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Source to read from and write to (overrides default_source)
    #[arg(long, global = true)]
    source: Option<String>,

    /// Root directory of the selected source
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON log lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a filter chain on one image
    Make {
        path: String,
        /// Save the result here (format from the extension)
        #[arg(short, long)]
        output: Option<String>,
        #[command(flatten)]
        chain: ChainArgs,
    },
    /// Run the filter chain encoded in a file name
    Url {
        url: String,
        /// Save the result here (format from the extension)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Run a filter chain over many images in parallel and save each result
    Batch {
        #[arg(required = true)]
        paths: Vec<String>,
        #[command(flatten)]
        chain: ChainArgs,
        /// Write results under this directory instead of encoding the chain
        /// into each output name
        #[arg(long)]
        out_dir: Option<String>,
    },
    /// Print the format implied by a path's extension
    Format { path: String },
    /// List the registered filters
    Filters,
    /// Print a stock imgflow.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    logging::init_from_config(&config.logging, cli.verbose, cli.json_logs);
    let handler = build_handler(&cli, &config)?;

    match cli.command {
        Command::Make {
            path,
            output,
            chain,
        } => {
            run_make(&handler, &path, &chain.to_config(), output.as_deref())?;
        }
        Command::Url { url, output } => {
            let parsed = url::parse(&url, &UrlOptions::from(&config.url))?;
            run_make(&handler, &parsed.path, &parsed.config, output.as_deref())?;
        }
        Command::Batch {
            paths,
            chain,
            out_dir,
        } => {
            init_thread_pool(&config.processing);
            let naming = match out_dir {
                Some(dir) => OutputNaming::Directory(dir),
                None => OutputNaming::FilterUrl(UrlOptions::from(&config.url)),
            };
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for (index, event) in rx.into_iter().enumerate() {
                    for line in output::format_batch_event(index + 1, &event) {
                        println!("{}", line);
                    }
                }
            });
            let summary = batch::run_batch(&handler, &paths, &chain.to_config(), &naming, Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            println!();
            output::print_batch_summary(&summary);
            if !summary.is_success() {
                return Err(format!(
                    "{} of {} images failed",
                    summary.failures.len(),
                    summary.total
                )
                .into());
            }
        }
        Command::Format { path } => {
            println!("{}", handler.format(&path)?);
        }
        Command::Filters => {
            output::print_filters(handler.filters());
        }
        Command::GenConfig => unreachable!("handled before loading config"),
    }

    Ok(())
}

/// Bind the handler to the configured source, applying `--source`/`--root`.
fn build_handler(cli: &Cli, config: &config::Config) -> Result<ImageHandler, Box<dyn Error>> {
    let mut config = config.clone();
    if let Some(name) = &cli.source {
        config.default_source = name.clone();
    }
    if let Some(root) = &cli.root {
        config
            .sources
            .entry(config.default_source.clone())
            .or_default()
            .root = root.clone();
    }
    let sources = SourceRegistry::from_config(&config.sources)?;
    Ok(ImageHandler::from_config(&config, &sources)?)
}

fn run_make(
    handler: &ImageHandler,
    path: &str,
    config: &FilterChainConfig,
    save_to: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let steps = chain::normalize(config, handler.filters(), handler.presets())?;
    let opened = handler.open(path)?;
    let result = handler.apply_filters(
        opened.clone(),
        &FilterChainConfig::Explicit(steps.clone()),
    )?;
    if let Some(output) = save_to {
        handler.save(&result, output)?;
    }
    output::print_make(path, &opened, &steps, &result, save_to);
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
