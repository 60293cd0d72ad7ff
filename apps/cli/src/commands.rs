//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use texquiz_core::{
    RenderJob, RenderProgress, RenderReport, RenderTarget, RenderWorker, Session, SourceDocument,
};
use texquiz_render::{ExternalToolchain, locate_artifact, missing_assets, probe_toolchain};
use texquiz_shared::{
    AppConfig, ChoiceLayout, Margins, PagePreset, QuestionRecord, QuestionSet, RenderResult,
    TexquizError, config_dir, expand_home, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// texquiz: one image per quiz question.
#[derive(Parser)]
#[command(
    name = "texquiz",
    version,
    about = "Extract quiz questions from a LaTeX document and render each one to an image.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// List the questions of a document.
    List {
        /// Source document (.tex).
        input: PathBuf,

        /// Print the records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one question and the state of its image.
    Show {
        /// Source document (.tex).
        input: PathBuf,

        /// Question name.
        name: String,
    },

    /// Render questions to images (all of them unless --name is given).
    Generate {
        /// Source document (.tex).
        input: PathBuf,

        /// Question to render (repeatable).
        #[arg(short, long = "name")]
        names: Vec<String>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Write a new question beside a document and render it.
    Add {
        /// Source document (.tex) the question belongs to.
        input: PathBuf,

        /// Question name (the file becomes tex-<name>.tex).
        #[arg(short, long)]
        name: String,

        /// Question text.
        #[arg(short, long)]
        prompt: String,

        /// A choice (repeatable, in order).
        #[arg(short, long = "choice", required = true)]
        choices: Vec<String>,

        /// 0-based index of the correct choice.
        #[arg(long)]
        correct: Option<usize>,

        /// Only write the document, do not render it.
        #[arg(long)]
        no_render: bool,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Print the generated preamble.
    Preamble {
        #[command(flatten)]
        style: StyleArgs,
    },

    /// Check the external tools and the icon assets.
    Tools {
        /// Directory holding the art/ icons.
        #[arg(long, value_name = "DIR")]
        assets: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Style overrides, applied on top of the config file.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct StyleArgs {
    /// Page preset: default, a4 or custom.
    #[arg(long)]
    pub page: Option<PagePreset>,

    /// Custom page size (selects the custom preset).
    #[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"])]
    pub size: Option<Vec<String>>,

    /// Margins in left, right, top, bottom order.
    #[arg(long, num_args = 4, value_names = ["LEFT", "RIGHT", "TOP", "BOTTOM"])]
    pub margins: Option<Vec<String>>,

    /// Choice layout: enumerate or tabbed.
    #[arg(long)]
    pub layout: Option<ChoiceLayout>,

    /// Extra package to load (repeatable).
    #[arg(long = "package", value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Crop the typeset page to its content.
    #[arg(long)]
    pub crop: bool,

    /// Rasterization density.
    #[arg(long)]
    pub density: Option<u32>,

    /// Take the preamble from another document's preamble envelope.
    #[arg(long, value_name = "FILE")]
    pub preamble_from: Option<PathBuf>,

    /// Directory holding the art/ icons.
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "texquiz=info",
        1 => "texquiz=debug",
        _ => "texquiz=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `list --json` output stays clean.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::List { input, json } => cmd_list(&input, json),
        Command::Show { input, name } => cmd_show(&input, &name),
        Command::Generate {
            input,
            names,
            style,
        } => cmd_generate(&input, names, &style).await,
        Command::Add {
            input,
            name,
            prompt,
            choices,
            correct,
            no_render,
            style,
        } => cmd_add(&input, name, prompt, choices, correct, no_render, &style).await,
        Command::Preamble { style } => cmd_preamble(&style),
        Command::Tools { assets } => cmd_tools(assets.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Session setup
// ---------------------------------------------------------------------------

/// Icon directory: flag, then config file, then the config directory.
fn resolve_assets(config: &AppConfig, flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(expand_home(&dir.to_string_lossy()));
    }
    if let Some(dir) = &config.defaults.assets_dir {
        return Ok(expand_home(dir));
    }
    Ok(config_dir()?)
}

/// Build a session from the config file and the style flags.
fn build_session(config: &AppConfig, args: &StyleArgs) -> Result<Session> {
    let assets = resolve_assets(config, args.assets.as_deref())?;
    let toolchain = Arc::new(ExternalToolchain::new(config.toolchain.clone()));
    let mut session = Session::new(config.style.clone(), assets, toolchain);

    if let Some(page) = args.page {
        session.set_page(page);
    }
    if let Some([width, height]) = args.size.as_deref() {
        session.set_custom_size(width.as_str(), height.as_str());
        if args.page.is_none() {
            session.set_page(PagePreset::Custom);
        }
    }
    if let Some([left, right, top, bottom]) = args.margins.as_deref() {
        session.set_margins(Margins {
            left: left.clone(),
            right: right.clone(),
            top: top.clone(),
            bottom: bottom.clone(),
        });
    }
    if let Some(layout) = args.layout {
        session.set_layout(layout);
    }
    if !args.packages.is_empty() {
        session.set_extra_packages(args.packages.clone());
    }
    if args.crop {
        session.set_crop(true);
    }
    if let Some(density) = args.density {
        session.set_density(density);
    }
    if let Some(path) = &args.preamble_from {
        if !session.load_preamble_from(path)? {
            eprintln!(
                "  warning: no preamble envelope in {}, using the generated preamble",
                path.display()
            );
        }
    }
    Ok(session)
}

/// Load and extract a document, turning "no blocks" into a user-facing error.
fn load_questions(input: &Path) -> Result<(SourceDocument, QuestionSet)> {
    let document = SourceDocument::open(input)?;
    match texquiz_extract::extract(document.content()) {
        Ok(set) => Ok((document, set)),
        Err(TexquizError::NoQuestions) => Err(eyre!(
            "questions were not found in {}, check the document format",
            input.display()
        )),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_list(input: &Path, json: bool) -> Result<()> {
    let (document, set) = load_questions(input)?;
    info!(path = %document.path().display(), count = set.len(), "listing questions");

    if json {
        let records: Vec<&QuestionRecord> = set.iter().collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if set.is_empty() {
        println!("  No questions in {}", document.path().display());
        return Ok(());
    }
    for record in set.iter() {
        let correct = record
            .correct_index
            .map_or_else(|| "-".to_string(), |k| k.to_string());
        println!(
            "  {:<24} {:<32} choices: {}  correct: {correct}",
            record.name,
            record.title,
            record.choices.len()
        );
    }
    Ok(())
}

fn cmd_show(input: &Path, name: &str) -> Result<()> {
    let (document, set) = load_questions(input)?;
    let record = set
        .get(name)
        .ok_or_else(|| eyre!("no question named '{name}' in {}", input.display()))?;

    println!();
    println!("  Name:    {}", record.name);
    println!("  Title:   {}", record.title);
    println!("  Prompt:");
    for line in record.prompt.lines() {
        println!("    {line}");
    }
    println!("  Choices:");
    for (k, choice) in record.choices.iter().enumerate() {
        let mark = if record.correct_index == Some(k) { '*' } else { ' ' };
        println!("   {mark}{k}. {choice}");
    }
    println!(
        "  Image:   {}",
        describe(&locate_artifact(&document.raster_dir(), name))
    );
    println!();
    Ok(())
}

async fn cmd_generate(input: &Path, names: Vec<String>, style: &StyleArgs) -> Result<()> {
    let config = load_config()?;
    let mut session = build_session(&config, style)?;

    match session.open(input) {
        Ok(_) => {}
        Err(TexquizError::NoQuestions) => {
            return Err(eyre!(
                "questions were not found in {}, check the document format",
                input.display()
            ));
        }
        Err(e) => return Err(e.into()),
    }

    let job = if names.is_empty() {
        session.prepare_job(RenderTarget::All)?
    } else {
        let mut names = names.into_iter();
        let mut job = match names.next() {
            Some(first) => session.prepare_job(RenderTarget::Named(first))?,
            None => return Err(eyre!("no question to render")),
        };
        for name in names {
            job.items
                .extend(session.prepare_job(RenderTarget::Named(name))?.items);
        }
        job
    };

    info!(count = job.items.len(), "generating images");
    let report = run_worker(job).await?;
    print_report(&report);
    Ok(())
}

async fn cmd_add(
    input: &Path,
    name: String,
    prompt: String,
    choices: Vec<String>,
    correct: Option<usize>,
    no_render: bool,
    style: &StyleArgs,
) -> Result<()> {
    let config = load_config()?;
    let mut session = build_session(&config, style)?;

    // The document only anchors the output directory; it may hold no
    // questions yet.
    match session.open(input) {
        Ok(_) | Err(TexquizError::NoQuestions) => {}
        Err(e) => return Err(e.into()),
    }

    let mut record = QuestionRecord::new(name, prompt, choices);
    if let Some(k) = correct {
        record.mark_correct(k)?;
    }
    if session.questions().contains(&record.name) {
        warn!(name = %record.name, "a question with this name exists, its document will be replaced");
    }
    session.upsert(record)?;

    let job = session.prepare_job(RenderTarget::Selected)?;
    let item = job
        .items
        .first()
        .cloned()
        .ok_or_else(|| eyre!("nothing was written"))?;
    println!("  Written: {}", item.source_path().display());

    if !no_render {
        let report = run_worker(job).await?;
        print_report(&report);
    }

    // Confirm the written document parses back to the same question.
    let written = SourceDocument::open(item.source_path())?;
    let reread = texquiz_extract::extract(written.content())?;
    if !reread.contains(&item.name) {
        return Err(eyre!(
            "{} does not contain question '{}' after writing",
            item.source_path().display(),
            item.name
        ));
    }
    info!(name = %item.name, "written document verified");
    Ok(())
}

fn cmd_preamble(style: &StyleArgs) -> Result<()> {
    let config = load_config()?;
    let mut session = build_session(&config, style)?;
    print!("{}", session.preamble());
    Ok(())
}

fn cmd_tools(assets: Option<&Path>) -> Result<()> {
    let config = load_config()?;

    println!();
    for tool in probe_toolchain(&config.toolchain) {
        match &tool.resolved {
            Some(path) => println!("  {:<11} {:<10} {}", tool.role, tool.command, path.display()),
            None => println!("  {:<11} {:<10} not found on PATH", tool.role, tool.command),
        }
    }

    let assets = resolve_assets(&config, assets)?;
    let missing = missing_assets(&assets);
    if missing.is_empty() {
        println!("  {:<11} {}", "icons", assets.display());
    } else {
        for path in missing {
            println!("  {:<11} missing {}", "icons", path.display());
        }
    }
    println!();
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Background rendering
// ---------------------------------------------------------------------------

/// Spinner messages driven by the worker.
struct CliProgress {
    spinner: ProgressBar,
}

impl RenderProgress for CliProgress {
    fn started(&self, name: &str, index: usize, total: usize) {
        self.spinner
            .set_message(format!("Rendering [{}/{total}] {name}", index + 1));
    }

    fn finished(&self, name: &str, result: &RenderResult) {
        if result.is_multi_page() {
            self.spinner
                .println(format!("  warning: {name} does not fit on one page"));
        }
    }
}

/// Run `job` on the background worker, pulsing a spinner while polling it.
async fn run_worker(job: RenderJob) -> Result<RenderReport> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message("Rendering");

    let worker = RenderWorker::spawn(
        job,
        Arc::new(CliProgress {
            spinner: spinner.clone(),
        }),
    );

    let mut poll = tokio::time::interval(Duration::from_millis(80));
    while !worker.is_finished() {
        poll.tick().await;
        spinner.tick();
    }
    let report = worker.join().await;
    spinner.finish_and_clear();
    Ok(report?)
}

fn describe(result: &RenderResult) -> String {
    match result {
        RenderResult::Single { image } => image.display().to_string(),
        RenderResult::MultiPage { base, pages } => {
            format!("{}-*.png ({} pages)", base.display(), pages.len())
        }
        RenderResult::Missing => "not generated".to_string(),
    }
}

fn print_report(report: &RenderReport) {
    println!();
    for (name, result) in &report.results {
        let mark = match result {
            RenderResult::Single { .. } => "ok",
            RenderResult::MultiPage { .. } => "!!",
            RenderResult::Missing => "--",
        };
        println!("  {mark} {name:<24} {}", describe(result));
    }
    let multi = report.multi_page();
    if !multi.is_empty() {
        println!();
        println!("  {} question(s) span several pages: {}", multi.len(), multi.join(", "));
    }
    let missing = report.missing();
    if !missing.is_empty() {
        println!();
        println!(
            "  {} image(s) were not produced; run `texquiz tools` to check the toolchain",
            missing.len()
        );
    }
    println!();
}
