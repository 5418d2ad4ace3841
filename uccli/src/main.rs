use clap::Parser;
use console::style;
use liburl_storm::{
    CancelFlag, Outcome, ProbeConfig, Prober, ReportSink, StatusClass, ThrottleConfig,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashSet},
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

#[derive(Debug, Default, Deserialize, Serialize)]
struct Config {
    #[serde(default)]
    defaults: DefaultsConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct DefaultsConfig {
    threads: Option<usize>,
    timeout: Option<u64>,
    user_agent: Option<String>,
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("uc").join("config.toml"))
}

fn load_config() -> Config {
    let path = match config_path() {
        Some(path) => path,
        None => return Config::default(),
    };
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    match toml::from_str(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Ignoring malformed config {}: {}", path.display(), err);
            Config::default()
        }
    }
}

fn get_default_config_toml() -> String {
    r#"# URL Check (uc) Configuration

[defaults]
# Number of concurrent worker threads
# threads = 10

# Per-request timeout in seconds
# timeout = 10

# User-Agent header sent with every request
# user_agent = "urlstorm/0.1"
"#
    .to_string()
}

fn parse_status_codes(raw: &str) -> Result<BTreeSet<u16>, String> {
    let mut codes = BTreeSet::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.parse::<u16>() {
            Ok(code) => {
                codes.insert(code);
            }
            Err(_) => return Err(part.to_string()),
        }
    }
    Ok(codes)
}

fn load_wordlist(path: &Path) -> io::Result<HashSet<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[derive(Parser, Debug)]
#[command(name = "uc")]
#[command(about = "URL Check - bulk endpoint availability probing", long_about = None)]
struct Args {
    /// The target URL or domain
    #[arg(long, short = 'u')]
    url: Option<String>,

    /// Path to a wordlist of targets, one per line
    #[arg(long, short = 'w')]
    wordlist: Option<PathBuf>,

    /// Number of concurrent worker threads
    #[arg(long, short = 't')]
    threads: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Comma-separated positive status codes
    #[arg(long, short = 's', default_value = "200,204,301,302,307")]
    status_codes: String,

    /// Follow redirects instead of reporting them
    #[arg(long, short = 'r')]
    follow_redirects: bool,

    /// Skip SSL certificate verification
    #[arg(long, short = 'k')]
    insecure: bool,

    /// Measure and report response lengths
    #[arg(long, short = 'l')]
    include_length: bool,

    /// Cookie header to send with every request
    #[arg(long, short = 'c')]
    cookie: Option<String>,

    /// Pause dispatching after every throttle interval
    #[arg(long)]
    throttle: bool,

    /// Number of dispatches between throttle pauses
    #[arg(long, default_value_t = 100)]
    throttle_interval: u32,

    /// Throttle pause length in seconds
    #[arg(long, default_value_t = 5)]
    throttle_pause: u64,

    /// Output file to write results to (defaults to stdout)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Verbose output (banner, options, interrupt notices)
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Output results as NDJSON stream (one JSON object per line)
    #[arg(long, short = 'j')]
    ndjson: bool,

    /// Print the default config to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    /// Write the default config to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

struct Settings {
    probe: ProbeConfig,
    targets: HashSet<String>,
    status_codes: BTreeSet<u16>,
    output: Option<PathBuf>,
    verbose: bool,
    ndjson: bool,
}

/// Merges flags over config-file defaults over built-ins and validates the
/// result. Every rejection happens here, before anything touches the network.
fn resolve_settings(args: Args, config: Config) -> Result<Settings, String> {
    let threads = args.threads.or(config.defaults.threads).unwrap_or(10);
    if threads == 0 {
        return Err(format!("Invalid number of threads (-t) {}", threads));
    }

    let timeout = args.timeout.or(config.defaults.timeout).unwrap_or(10);
    if timeout == 0 {
        return Err(format!("Invalid timeout (--timeout) {}", timeout));
    }

    let status_codes = parse_status_codes(&args.status_codes)
        .map_err(|bad| format!("Invalid status code (-s) {}", bad))?;

    // A wordlist takes precedence over a single URL when both are given.
    let targets = if let Some(path) = args.wordlist.as_ref() {
        let targets = load_wordlist(path)
            .map_err(|err| format!("Unable to open wordlist {}: {}", path.display(), err))?;
        if targets.is_empty() {
            return Err(format!("Wordlist {} contains no targets", path.display()));
        }
        targets
    } else if let Some(url) = args.url.as_ref() {
        HashSet::from([url.clone()])
    } else {
        return Err("Unable to start checking, both URL (-u) and wordlist (-w) are missing".into());
    };

    let throttle = if args.throttle {
        Some(ThrottleConfig {
            every: args.throttle_interval,
            pause: Duration::from_secs(args.throttle_pause),
        })
    } else {
        None
    };

    Ok(Settings {
        probe: ProbeConfig {
            workers: threads,
            timeout: Duration::from_secs(timeout),
            follow_redirects: args.follow_redirects,
            insecure_ssl: args.insecure,
            include_length: args.include_length,
            cookie: args.cookie,
            user_agent: config.defaults.user_agent,
            throttle,
        },
        targets,
        status_codes,
        output: args.output,
        verbose: args.verbose,
        ndjson: args.ndjson,
    })
}

enum Reporter {
    Console,
    Ndjson,
}

impl ReportSink for Reporter {
    fn report(&mut self, outcome: &Outcome, class: StatusClass) {
        match self {
            Reporter::Console => {
                let line = match outcome.length {
                    Some(length) => {
                        format!("{} {} (length: {})", outcome.url, outcome.status, length)
                    }
                    None => format!("{} {}", outcome.url, outcome.status),
                };
                let styled = match class {
                    StatusClass::ServerError => style(format!("[!] {}", line)).red(),
                    StatusClass::ClientError => style(format!("[+] {}", line)).magenta(),
                    StatusClass::Redirect => style(format!("[+] {}", line)).yellow(),
                    StatusClass::Success => style(format!("[+] {}", line)).green(),
                };
                println!("{}", styled);
            }
            Reporter::Ndjson => {
                if let Ok(json) = serde_json::to_string(outcome) {
                    println!("{}", json);
                    let _ = io::stdout().flush();
                }
            }
        }
    }
}

fn print_banner(settings: &Settings) {
    let separator = "--------------------------------------------------------------";
    println!("{}", style(separator).cyan());
    print_options(settings);
    println!();
    println!(
        "{}",
        style("URL Storm: https://github.com/mikalv/urlstorm").cyan()
    );
    println!("{}", style(separator).cyan());
    println!();
}

fn print_options(settings: &Settings) {
    println!(
        "{}",
        style(format!("[+] Number of threads: {}", settings.probe.workers)).cyan()
    );
    println!(
        "{}",
        style(format!("[+] Timeout: {}s", settings.probe.timeout.as_secs())).cyan()
    );

    if let Some(output) = &settings.output {
        println!(
            "{}",
            style(format!("[+] Output file: {}", output.display())).cyan()
        );
    }

    if !settings.status_codes.is_empty() {
        let joined = settings
            .status_codes
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",");
        println!("{}", style(format!("[+] StatusCodes: {}", joined)).cyan());
    }

    if let Some(throttle) = &settings.probe.throttle {
        println!(
            "{}",
            style(format!(
                "[+] Throttle: pause {}s after every {} dispatches",
                throttle.pause.as_secs(),
                throttle.every
            ))
            .cyan()
        );
    }
}

/// Writes one `<status> <url>` line per outcome. Failures warn and leave the
/// console output as the result of record.
fn write_output(path: &Path, outcomes: &HashSet<Outcome>) {
    let mut file = match File::create(path) {
        Ok(file) => file,
        Err(_) => {
            eprintln!(
                "{}",
                style(format!(
                    "[!] Unable to write to {}, falling back to stdout.",
                    path.display()
                ))
                .red()
            );
            return;
        }
    };

    for outcome in outcomes {
        if let Err(err) = writeln!(file, "{} {}", outcome.status, outcome.url) {
            eprintln!("{}", style(format!("Error writing file {}", err)).red());
        }
    }
    let _ = file.sync_all();
}

fn spawn_interrupt_watcher(cancel: CancelFlag, verbose: bool) {
    tokio::spawn(async move {
        let mut notified = false;
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                break;
            }
            cancel.cancel();
            if verbose && !notified {
                eprintln!(
                    "{}",
                    style("[!] Keyboard interrupt detected, terminating.").cyan()
                );
                notified = true;
            }
        }
    });
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let level = if verbose { "debug" } else { "warn" };
    // External crates stay at warn so probe failures do not drown in
    // connection-level noise.
    let filter_str = format!("liburl_storm={level},uccli={level},reqwest=warn,hyper=warn");
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", get_default_config_toml());
        return Ok(());
    }

    if args.write_default_config {
        if let Some(path) = config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, get_default_config_toml())?;
            println!("Default config written to: {}", path.display());
        } else {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
        return Ok(());
    }

    init_tracing(args.verbose);

    let config = load_config();
    let settings = match resolve_settings(args, config) {
        Ok(settings) => settings,
        Err(message) => {
            eprintln!("{}", style(format!("[!] {}", message)).red());
            std::process::exit(1);
        }
    };
    let ndjson = settings.ndjson;

    let start = Instant::now();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(settings))?;

    if !ndjson {
        println!();
        println!(
            "{}",
            style(format!("Total runtime: {:?}", start.elapsed()))
                .magenta()
                .bright()
        );
    }
    Ok(())
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let prober = match Prober::with_config(settings.probe.clone()) {
        Ok(prober) => prober,
        Err(err) => {
            eprintln!("{}", style(format!("[!] {}", err)).red());
            std::process::exit(1);
        }
    };

    if settings.verbose && !settings.ndjson {
        print_banner(&settings);
    }

    let cancel = CancelFlag::new();
    spawn_interrupt_watcher(cancel.clone(), settings.verbose);

    let reporter = if settings.ndjson {
        Reporter::Ndjson
    } else {
        Reporter::Console
    };

    let outcomes = prober.run(settings.targets, cancel, reporter).await;

    if let Some(path) = &settings.output {
        write_output(path, &outcomes);
    }

    Ok(())
}
