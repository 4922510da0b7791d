use std::future::Future;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use kit_store::Store;
use kit_sync::{Attempts, CancelToken, DelaySequencer};
use kit_util::SecretGenerator;

use crate::cli::*;
use crate::config::KitConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = KitConfig::load(&cli.config)?;
    let format = cli.format;
    match cli.command {
        Command::Snapshot(args) => cmd_snapshot(args, format),
        Command::Secret(args) => cmd_secret(args, &config, format),
        Command::Sniff(args) => cmd_sniff(args, format),
        Command::Wait(args) => cmd_wait(args, &config, format),
        Command::Backoff(args) => cmd_backoff(args, &config, format),
    }
}

fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

fn read_input(file: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match file {
        Some(path) => std::fs::read(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buffer = Vec::new();
            std::io::stdin().read_to_end(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn cmd_snapshot(args: SnapshotArgs, format: OutputFormat) -> anyhow::Result<()> {
    match args.action {
        SnapshotAction::Encode { file } => {
            let input = read_input(file.as_deref())?;
            let snapshot = encode_json(&input)?;
            match format {
                OutputFormat::Text => println!("{snapshot}"),
                OutputFormat::Json => println!("{}", json!({ "snapshot": snapshot })),
            }
        }
        SnapshotAction::Decode { file } => {
            let input = read_input(file.as_deref())?;
            let store = Store::<String>::from_snapshot(&input)?;
            let value = store.to_json();
            match format {
                OutputFormat::Text => println!("{}", serde_json::to_string_pretty(&value)?),
                OutputFormat::Json => println!("{value}"),
            }
        }
    }
    Ok(())
}

fn encode_json(input: &[u8]) -> anyhow::Result<String> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(input).context("input must be a JSON object")?;
    let store = Store::from_json_object(object)?;
    Ok(String::from_utf8(store.encode()?)?)
}

fn cmd_secret(args: SecretArgs, config: &KitConfig, format: OutputFormat) -> anyhow::Result<()> {
    let len = args.len.unwrap_or(config.secret.length);
    let mut generator = SecretGenerator::new();
    let secret = match &args.alphabet {
        Some(alphabet) => generator.random_string_from(len, alphabet)?,
        None => generator.random_string(len),
    };
    match format {
        OutputFormat::Text => println!("{secret}"),
        OutputFormat::Json => println!("{}", json!({ "secret": secret })),
    }
    Ok(())
}

fn cmd_sniff(args: SniffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let cancel = CancelToken::new();
    let mime = block_on(kit_fs::content_type_of_file(&cancel, &args.file))??;
    match format {
        OutputFormat::Text => println!("{}: {}", args.file.display(), mime.cyan()),
        OutputFormat::Json => println!(
            "{}",
            json!({ "path": args.file.display().to_string(), "content_type": mime })
        ),
    }
    Ok(())
}

fn cmd_wait(args: WaitArgs, config: &KitConfig, format: OutputFormat) -> anyhow::Result<()> {
    let timeout = args.timeout.unwrap_or(config.fs.wait_timeout_secs);
    let poll_interval = config.fs.poll_interval();

    let found = block_on(async {
        let cancel = match timeout {
            0 => CancelToken::new(),
            secs => CancelToken::new().with_timeout(Duration::from_secs(secs)),
        };
        kit_fs::wait_until_file_exists(&cancel, &args.path, poll_interval).await
    })?;

    match (found, format) {
        (Ok(()), OutputFormat::Text) => {
            println!("{} {} exists", "✓".green().bold(), args.path.display());
            Ok(())
        }
        (Ok(()), OutputFormat::Json) => {
            println!("{}", json!({ "path": args.path.display().to_string(), "exists": true }));
            Ok(())
        }
        (Err(err), _) => Err(err).with_context(|| format!("waiting for {}", args.path.display())),
    }
}

/// The first `steps` outcomes of `sequencer`; `None` marks exhaustion.
///
/// Finite sequencers stop at the first exhaustion.
fn backoff_schedule(sequencer: &mut DelaySequencer, steps: usize) -> Vec<Option<Duration>> {
    let mut schedule = Vec::new();
    for _ in 0..steps {
        let delay = sequencer.get_delay();
        schedule.push(delay);
        if delay.is_none() {
            break;
        }
    }
    schedule
}

fn cmd_backoff(args: BackoffArgs, config: &KitConfig, format: OutputFormat) -> anyhow::Result<()> {
    let mut settings = config.backoff.clone();
    if let Some(attempts) = args.attempts {
        settings.attempts = attempts;
        settings.infinite = false;
    }
    if args.infinite {
        settings.infinite = true;
    }
    if let Some(wrap_around) = args.wrap_around {
        settings.wrap_around = wrap_around;
    }

    let mut sequencer = DelaySequencer::from_config(&settings);
    let steps = args.steps.unwrap_or(match sequencer.attempts() {
        Attempts::Finite(n) => n as usize + 1,
        Attempts::Infinite => sequencer.wrap_around() as usize + 1,
    });
    let schedule = backoff_schedule(&mut sequencer, steps);

    match format {
        OutputFormat::Text => {
            for (index, delay) in schedule.iter().enumerate() {
                match delay {
                    Some(d) => println!("  attempt {:>3}: {}s", index + 1, d.as_secs().to_string().bold()),
                    None => println!("  {}", "exhausted".yellow()),
                }
            }
        }
        OutputFormat::Json => {
            let delays: Vec<_> = schedule.iter().map(|d| d.map(|d| d.as_secs())).collect();
            println!("{}", json!({ "delays_secs": delays }));
        }
    }
    Ok(())
}
