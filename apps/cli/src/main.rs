use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use runpad_core::{
    LanguageCatalog, LanguageProfile, RunStatus, Session, SwitchOutcome, TerminalView,
    TextBuffer, Workbench, UNSAVED_CHANGES_PROMPT,
};
use runpad_runexec::{ExecutionClient, HttpExecutionClient};
use runpad_settings::ServiceConfig;
use tokio::runtime::Runtime;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_FAILED: i32 = 1;
const EXIT_UNREACHABLE: i32 = 2;

#[derive(Parser)]
#[command(
    name = "runpad-cli",
    about = "Write short programs and run them on a remote execution service",
    author,
    version
)]
struct Cli {
    /// 執行服務的基底網址；預設讀取 RUNPAD_API_URL。 / Execution service base URL (defaults to RUNPAD_API_URL).
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出支援的語言。 / List supported languages.
    Languages(LanguagesArgs),
    /// 顯示解析後的服務設定。 / Print the resolved service configuration.
    Config,
    /// 執行單一檔案（或標準輸入）並輸出結果。 / Run one file (or stdin) and print the terminal output.
    Run(RunArgs),
    /// 互動式編輯與執行。 / Interactive edit-and-run session.
    Repl(ReplArgs),
}

#[derive(Args)]
struct LanguagesArgs {
    /// 以 JSON 格式輸出。 / Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RunArgs {
    /// 原始碼檔案；省略時讀取標準輸入。 / Source file; reads stdin when omitted.
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// 語言（識別碼、服務名稱或副檔名）。 / Language id, service name or extension.
    #[arg(long, short)]
    language: Option<String>,
}

#[derive(Args)]
struct ReplArgs {
    /// 起始語言。 / Language to start with.
    #[arg(long, short)]
    language: Option<String>,

    /// 切換語言時不再確認。 / Discard edits on language switch without asking.
    #[arg(long)]
    yes: bool,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(EXIT_FAILED);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<i32> {
    let Cli { api_url, command } = Cli::parse();
    let catalog = LanguageCatalog::builtin();
    match command {
        Commands::Languages(args) => execute_languages(&catalog, args),
        Commands::Config => {
            let config = resolve_config(api_url.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(0)
        }
        Commands::Run(args) => {
            let config = resolve_config(api_url.as_deref())?;
            execute_run(catalog, &config, args)
        }
        Commands::Repl(args) => {
            let config = resolve_config(api_url.as_deref())?;
            execute_repl(catalog, &config, args)
        }
    }
}

fn resolve_config(api_url: Option<&str>) -> Result<ServiceConfig> {
    let config = ServiceConfig::from_env()
        .context("invalid execution service URL in environment")?
        .with_override(api_url)
        .context("invalid --api-url")?;
    debug!(base_url = %config.base_url, "resolved service configuration");
    Ok(config)
}

fn execute_languages(catalog: &LanguageCatalog, args: LanguagesArgs) -> Result<i32> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(catalog.profiles())?);
        return Ok(0);
    }
    for profile in catalog.profiles() {
        println!(
            "{:<8} {:<12} {:<10} {}",
            profile.id,
            profile.display_label,
            profile.service_identifier,
            profile.file_name()
        );
    }
    Ok(0)
}

fn build_workbench(
    catalog: LanguageCatalog,
    config: &ServiceConfig,
    runtime: &Runtime,
) -> Result<Workbench<TextBuffer>> {
    let client: Arc<dyn ExecutionClient> = Arc::new(
        HttpExecutionClient::new(&config.base_url).context("failed to create HTTP client")?,
    );
    Ok(Workbench::new(
        Session::new(catalog),
        TextBuffer::default(),
        client,
        runtime.handle().clone(),
    ))
}

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn infer_language<'a>(
    catalog: &'a LanguageCatalog,
    explicit: Option<&str>,
    input: Option<&Path>,
) -> Result<&'a str> {
    if let Some(query) = explicit {
        return Ok(catalog.resolve_loose(query)?.id.as_str());
    }
    if let Some(extension) = input.and_then(Path::extension).and_then(|ext| ext.to_str()) {
        if let Ok(profile) = catalog.resolve_loose(extension) {
            return Ok(profile.id.as_str());
        }
    }
    Ok(catalog.first().id.as_str())
}

fn execute_run(catalog: LanguageCatalog, config: &ServiceConfig, args: RunArgs) -> Result<i32> {
    let language = infer_language(&catalog, args.language.as_deref(), args.input.as_deref())?
        .to_string();
    let source = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read source from stdin")?;
            buffer
        }
    };

    let runtime = build_runtime()?;
    let mut bench = build_workbench(catalog, config, &runtime)?;
    // Fresh session: the buffer still holds the template, so no prompt is needed.
    bench.select_language(&language, true)?;
    bench.edit_source(source);
    if !bench.run() {
        bail!("a run is already pending");
    }
    runtime.block_on(bench.settle());

    let session = bench.session();
    if !session.status().is_terminal() {
        bail!("run ended without a result");
    }
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", session.transcript().trim_end_matches('\n'))?;
    Ok(exit_code(session.status()))
}

fn exit_code(status: &RunStatus) -> i32 {
    match status {
        RunStatus::Failed(_) => EXIT_FAILED,
        RunStatus::Unreachable => EXIT_UNREACHABLE,
        _ => 0,
    }
}

fn execute_repl(catalog: LanguageCatalog, config: &ServiceConfig, args: ReplArgs) -> Result<i32> {
    let runtime = build_runtime()?;
    let mut bench = build_workbench(catalog, config, &runtime)?;
    if let Some(query) = args.language.as_deref() {
        let id = bench.session().catalog().resolve_loose(query)?.id.to_string();
        bench.select_language(&id, true)?;
    }
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut repl = Repl {
        input: stdin.lock(),
        output: stdout.lock(),
        bench,
        view: TerminalView::default(),
        runtime,
        auto_confirm: args.yes,
    };
    repl.run()?;
    Ok(0)
}

struct Repl<R, W> {
    input: R,
    output: W,
    bench: Workbench<TextBuffer>,
    view: TerminalView,
    runtime: Runtime,
    auto_confirm: bool,
}

enum Flow {
    Continue,
    Quit,
}

impl<R: BufRead, W: Write> Repl<R, W> {
    fn run(&mut self) -> Result<()> {
        self.print_header()?;
        self.print_terminal()?;
        while let Some(line) = self.read_line()? {
            match self.handle(&line) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(err) => writeln!(self.output, "! {err:#}")?,
            }
            self.print_terminal()?;
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn handle(&mut self, line: &str) -> Result<Flow> {
        let Some(command) = line.strip_prefix(':') else {
            self.bench.editor_mut().push_line(line);
            return Ok(Flow::Continue);
        };
        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        match name {
            "q" | "quit" | "exit" => return Ok(Flow::Quit),
            "help" => self.print_help()?,
            "langs" => {
                let active = self.bench.session().active_language().id.clone();
                for profile in self.bench.session().catalog().profiles() {
                    let marker = if profile.id == active { '*' } else { ' ' };
                    writeln!(self.output, "{marker} {} ({})", profile.id, profile.display_label)?;
                }
            }
            "lang" => self.switch_language(argument)?,
            "run" => self.run_buffer()?,
            "clear" => self.bench.clear_output(),
            "show" => {
                let profile = self.bench.session().active_language();
                writeln!(self.output, "--- {} ---", profile.file_name())?;
                writeln!(self.output, "{}", self.bench.session().source())?;
            }
            "edit" => {
                let mut text = Vec::new();
                while let Some(line) = self.read_line()? {
                    if line == "." {
                        break;
                    }
                    text.push(line);
                }
                self.bench.edit_source(text.join("\n"));
            }
            "load" => {
                if argument.is_empty() {
                    bail!("usage: :load <file>");
                }
                let source = fs::read_to_string(argument)
                    .with_context(|| format!("failed to read {argument}"))?;
                self.bench.edit_source(source);
            }
            "status" => {
                let status = self.bench.session().status().clone();
                writeln!(self.output, "status: {}", describe_status(&status))?;
            }
            other => bail!("unknown command `:{other}` (try :help)"),
        }
        Ok(Flow::Continue)
    }

    fn switch_language(&mut self, query: &str) -> Result<()> {
        if query.is_empty() {
            bail!("usage: :lang <language>");
        }
        let id = self
            .bench
            .session()
            .catalog()
            .resolve_loose(query)?
            .id
            .to_string();
        let auto_confirm = self.auto_confirm;
        let input = &mut self.input;
        let output = &mut self.output;
        let confirm = |_: &LanguageProfile, _: &LanguageProfile| {
            auto_confirm || ask_yes_no(input, output, UNSAVED_CHANGES_PROMPT)
        };
        let outcome = self.bench.select_language(&id, confirm)?;
        match outcome {
            SwitchOutcome::Switched => self.print_header()?,
            SwitchOutcome::Declined => writeln!(self.output, "staying on current language")?,
            SwitchOutcome::Unchanged => {}
        }
        Ok(())
    }

    fn run_buffer(&mut self) -> Result<()> {
        if !self.bench.run() {
            writeln!(self.output, "a run is already pending")?;
            return Ok(());
        }
        self.print_terminal()?;
        self.runtime.block_on(self.bench.wait_for_completion());
        Ok(())
    }

    fn print_header(&mut self) -> io::Result<()> {
        let profile = self.bench.session().active_language().clone();
        writeln!(
            self.output,
            "== {} == Active Session: {} == {}",
            profile.compiler_title(),
            profile.runtime_session_label(),
            profile.file_name()
        )
    }

    fn print_terminal(&mut self) -> io::Result<()> {
        if !self.view.sync(self.bench.session()) {
            return Ok(());
        }
        for line in self.view.visible_lines(self.bench.session()) {
            writeln!(self.output, "{line}")?;
        }
        self.output.flush()
    }

    fn print_help(&mut self) -> io::Result<()> {
        writeln!(
            self.output,
            "lines without ':' are appended to the editor\n\
             :edit          replace the editor contents (end with a single '.')\n\
             :load <file>   replace the editor contents with a file\n\
             :show          print the editor contents\n\
             :run           run the editor contents\n\
             :clear         clear the terminal\n\
             :lang <id>     switch language\n\
             :langs         list languages\n\
             :status        show the run status\n\
             :quit          leave"
        )
    }
}

fn ask_yes_no<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> bool {
    if write!(output, "{question} [y/N] ").and_then(|_| output.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn describe_status(status: &RunStatus) -> &'static str {
    match status {
        RunStatus::Idle => "idle",
        RunStatus::Pending => "pending",
        RunStatus::Succeeded(_) => "succeeded",
        RunStatus::Failed(_) => "failed",
        RunStatus::Unreachable => "unreachable",
    }
}
