use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use context_protocol::{flatten_fragments, ContextFragment, ContextMessage, IgnoreFilter};
use context_retrieval::{
    AssembleRequest, AssemblerConfig, ContextAssembler, LocalWorkspace, Workspace,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "context")]
#[command(about = "Assemble editor context for chat requests", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Workspace root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Repository name used for ignore rules and provenance
    #[arg(long, global = true, default_value = "local")]
    repo: String,

    /// TOML file with assembler budgets
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Current file, its tests and directory siblings
    Assemble(AssembleArgs),

    /// Fragments for the files of one directory
    Dir(DirArgs),

    /// Fragments for the tests of a file
    Tests(TestsArgs),

    /// Report which paths the ignore rules exclude
    #[command(name = "check-ignore")]
    CheckIgnore(CheckIgnoreArgs),
}

#[derive(Args)]
struct AssembleArgs {
    /// Target file
    file: PathBuf,

    /// Leave e2e/integration tests out of the test search
    #[arg(long)]
    unit_test_only: bool,

    /// Skip the directory scan
    #[arg(long)]
    no_directory: bool,

    /// Treat these files as open in the editor
    #[arg(long = "open")]
    open: Vec<PathBuf>,
}

#[derive(Args)]
struct DirArgs {
    /// Directory to scan
    dir: PathBuf,

    /// File the scan is done for (excluded, enables the companion early exit)
    #[arg(long)]
    target: Option<PathBuf>,

    /// Maximum fragment pairs (default from config)
    #[arg(long)]
    max_files: Option<usize>,
}

#[derive(Args)]
struct TestsArgs {
    /// Source file whose tests are wanted
    file: PathBuf,

    /// Leave e2e/integration tests out of the search
    #[arg(long)]
    unit_test_only: bool,

    /// Treat these files as open in the editor
    #[arg(long = "open")]
    open: Vec<PathBuf>,
}

#[derive(Args)]
struct CheckIgnoreArgs {
    /// Paths to check
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Serialize)]
struct ContextOutput {
    fragments: usize,
    context: Vec<ContextMessage>,
}

impl ContextOutput {
    fn new(fragments: Vec<ContextFragment>) -> Self {
        Self {
            fragments: fragments.len(),
            context: flatten_fragments(fragments),
        }
    }
}

#[derive(Serialize)]
struct IgnoreVerdict {
    path: String,
    ignored: bool,
}

struct Session {
    root: PathBuf,
    workspace: Arc<LocalWorkspace>,
    ignore: Arc<IgnoreFilter>,
    config: AssemblerConfig,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let root = std::fs::canonicalize(&cli.root)
            .with_context(|| format!("Invalid workspace root {}", cli.root.display()))?;
        let config = match &cli.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                AssemblerConfig::from_toml_str(&raw)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => AssemblerConfig::default(),
        }
        .with_env_overrides();
        let ignore = IgnoreFilter::from_workspace_root(&cli.repo, &root)
            .context("Failed to load ignore rules")?;
        let workspace = LocalWorkspace::new(&root).with_repo_name(&cli.repo);
        Ok(Self {
            root,
            workspace: Arc::new(workspace),
            ignore: Arc::new(ignore),
            config,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    async fn mark_open(&self, paths: &[PathBuf]) {
        for path in paths.iter().rev() {
            self.workspace.open(self.resolve(path)).await;
        }
    }

    fn assembler(&self) -> ContextAssembler {
        let workspace: Arc<dyn Workspace> = self.workspace.clone();
        ContextAssembler::new(workspace, self.config.clone())
            .with_ignore_filter(Arc::clone(&self.ignore))
    }
}

fn render<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.context("Failed to serialize output")
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let session = Session::open(&cli)?;
    let output = match &cli.command {
        Commands::Assemble(args) => {
            session.mark_open(&args.open).await;
            let request = AssembleRequest::new(session.resolve(&args.file))
                .unit_test_only(args.unit_test_only)
                .include_directory(!args.no_directory);
            let fragments = session.assembler().assemble(&request).await;
            render(&ContextOutput::new(fragments), cli.pretty)?
        }
        Commands::Dir(args) => {
            let dir = session.resolve(&args.dir);
            let target = args.target.as_deref().map(|t| session.resolve(t));
            let max = args
                .max_files
                .unwrap_or(session.config.max_directory_fragments);
            let fragments = session
                .assembler()
                .build_directory_context(&dir, target.as_deref(), max)
                .await;
            render(&ContextOutput::new(fragments), cli.pretty)?
        }
        Commands::Tests(args) => {
            session.mark_open(&args.open).await;
            let file = session.resolve(&args.file);
            let fragments = session
                .assembler()
                .build_test_file_context(&file, args.unit_test_only)
                .await;
            render(&ContextOutput::new(fragments), cli.pretty)?
        }
        Commands::CheckIgnore(args) => {
            let verdicts: Vec<IgnoreVerdict> = args
                .paths
                .iter()
                .map(|path| IgnoreVerdict {
                    path: path.display().to_string(),
                    ignored: session.ignore.is_ignored(&session.resolve(path)),
                })
                .collect();
            render(&verdicts, cli.pretty)?
        }
    };
    print_stdout(&output)
}
