// tvmtty: tree bytecode VM with time-travel memory visualization

use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tvmtty::config::{VmConfig, DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_DEPTH};
use tvmtty::host::console::Console;
use tvmtty::host::stdlib::StandardHost;
use tvmtty::host::timers;
use tvmtty::interpreter::scheduler::Paced;
use tvmtty::interpreter::Vm;
use tvmtty::memory::DEFAULT_CAPACITY;
use tvmtty::program::load_file;
use tvmtty::snapshot::History;
use tvmtty::ui::App;

#[derive(Parser, Debug)]
#[command(name = "tvmtty")]
#[command(about = "Run tree bytecode programs and step through their memory", long_about = None)]
struct Args {
    /// Program to run (JSON)
    program: PathBuf,

    /// Print program output instead of opening the TUI
    #[arg(long)]
    headless: bool,

    /// Read program input from this file, one value per line
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Seed for the random capability
    #[arg(long)]
    seed: Option<u64>,

    /// Pause this many milliseconds before every instruction
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Number of cells in the address space
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    memory: usize,

    /// Maximum nesting of blocks and calls
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Skip unknown host calls with a warning instead of stopping
    #[arg(long)]
    lenient: bool,

    /// Maximum number of recorded memory events
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,
}

impl Args {
    fn config(&self) -> VmConfig {
        VmConfig {
            memory_size: self.memory,
            max_depth: self.max_depth,
            lenient_host_calls: self.lenient,
            history_limit: self.history_limit,
            seed: self.seed,
            ..VmConfig::default()
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let args = Args::parse();
    let config = args.config();

    let program = match load_file(&args.program) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let console = match &args.input {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Console::scripted(text.lines().map(str::to_string).collect::<Vec<_>>())
        }
        None => Console::interactive(),
    };
    let host = StandardHost::new(console);
    let capabilities = host.capabilities(config.seed);
    let timer_budget = config.timer_budget;
    let history_limit = config.history_limit;

    let mut vm = Vm::new(program.clone(), config, capabilities)?;
    if args.delay_ms > 0 {
        vm.set_scheduler(Box::new(Paced::new(Duration::from_millis(args.delay_ms))));
    }

    let history = if args.headless {
        None
    } else {
        let history = History::new(vm.machine(), history_limit)
            .with_console(Rc::clone(&host.console));
        let history = Rc::new(RefCell::new(history));
        vm.set_observer(Box::new(Rc::clone(&history)));
        Some(history)
    };

    let outcome = vm
        .run()
        .and_then(|result| timers::drain(&mut vm, &host.timers, timer_budget).map(|_| result));
    match &outcome {
        Ok(result) => info!(result, "program finished"),
        Err(e) => error!(error = %e, "program stopped"),
    }

    let Some(history) = history else {
        print!("{}", host.output());
        io::stdout().flush()?;
        if let Err(e) = outcome {
            eprintln!("Runtime error: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    };

    drop(vm.take_observer());
    let history = Rc::try_unwrap(history)
        .map_err(|_| "execution history is still in use")?
        .into_inner();
    let replay = history.into_replay(host.output());
    let run_error = outcome.err().map(|e| e.to_string());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(replay, program, run_error);
    let res = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
