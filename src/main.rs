use clap::Parser;
use color_eyre::Result;
use datask::error_display::user_message_from_report;
use datask::{
    load_dataset, render, AppConfig, Args, CacheManager, ConfigManager, Dataset, ExecutionPlan,
    OpenOptions, Orchestrator, OutputFormat, QueryHistory, APP_NAME,
};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(APP_NAME) {
            Ok(manager) => match manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Configuration file written to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing config: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    if args.clear_cache {
        match CacheManager::new(APP_NAME) {
            Ok(cache) => {
                if let Err(e) = cache.clear_all() {
                    eprintln!("Error clearing cache: {}", e);
                    std::process::exit(1);
                }
                println!("Cache cleared successfully");
                return Ok(Some(()));
            }
            Err(_e) => {
                println!("No cache to clear");
                return Ok(Some(()));
            }
        }
    }

    Ok(None)
}

/// RUST_LOG wins; otherwise warnings only, or debug output for this crate.
fn init_tracing(debug: bool) {
    let default_filter = if debug { "datask=debug" } else { "datask=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_blocks(out: &mut impl Write, blocks: &[datask::ResponseBlock], format: OutputFormat) -> Result<()> {
    let rendered = render::render(blocks, format)?;
    writeln!(out, "{}", rendered.trim_end())?;
    Ok(())
}

/// Answer one question and print it. Returns false when the reasoning engine failed.
fn answer(
    orchestrator: &Orchestrator,
    dataset: &Dataset,
    question: &str,
    reference: Option<&str>,
    format: OutputFormat,
    show_question: bool,
) -> Result<bool> {
    let mut out = io::stdout().lock();
    match orchestrator.ask(question, dataset, reference) {
        Ok(answer) => {
            tracing::debug!(
                source = ?answer.source,
                blocks = answer.blocks.len(),
                kinds = ?answer.blocks.iter().map(|b| b.kind_name()).collect::<Vec<_>>(),
                "answered"
            );
            if show_question && format == OutputFormat::Text {
                writeln!(out, "> {}", question.trim())?;
            }
            print_blocks(&mut out, &answer.blocks, format)?;
            if show_question && format == OutputFormat::Text {
                writeln!(out)?;
            }
            Ok(true)
        }
        Err(e) => {
            eprintln!("Error answering \"{}\": {}", question.trim(), e);
            Ok(false)
        }
    }
}

fn run(args: &Args, config: &AppConfig, path: &Path) -> Result<bool> {
    let opts = OpenOptions::from_args_and_config(args, config);
    let dataset = match load_dataset(path, &opts) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("Error: {}", user_message_from_report(&e, Some(path)));
            return Ok(false);
        }
    };

    let orchestrator = Orchestrator::from_config(config)?;
    if config.reasoning.is_enabled() && !orchestrator.has_engine() {
        tracing::warn!(
            provider = %config.reasoning.provider,
            "no reasoning engine available for this provider; only built-in questions are answered"
        );
        if config.reasoning.api_key().is_none() {
            tracing::warn!(
                api_key_env = %config.reasoning.api_key_env,
                "reasoning provider is set but its API key variable is unset"
            );
        }
    }

    if let Some(plan_path) = &args.plan {
        let plan = ExecutionPlan::from_json(&std::fs::read_to_string(plan_path)?)?;
        let blocks = orchestrator.run_plan(&plan, &dataset);
        print_blocks(&mut io::stdout().lock(), &blocks, args.output)?;
        return Ok(true);
    }

    let reference = match &args.reference {
        Some(p) => Some(std::fs::read_to_string(p)?),
        None => None,
    };

    let mut history = config.query.enable_history.then(|| {
        CacheManager::new(APP_NAME)
            .map(|cache| QueryHistory::load(cache, config.query.history_limit))
    });
    let mut ok = true;

    let mut ask = |question: &str, show_question: bool| -> Result<()> {
        if question.trim().is_empty() {
            return Ok(());
        }
        if let Some(Ok(history)) = history.as_mut() {
            history.add(question);
        }
        ok &= answer(
            &orchestrator,
            &dataset,
            question,
            reference.as_deref(),
            args.output,
            show_question,
        )?;
        Ok(())
    };

    if args.questions.is_empty() {
        for line in io::stdin().lock().lines() {
            ask(&line?, true)?;
        }
    } else {
        let show_question = args.questions.len() > 1;
        for question in &args.questions {
            ask(question, show_question)?;
        }
    }

    if let Some(Ok(history)) = &history {
        if let Err(e) = history.save() {
            tracing::warn!("Could not save question history: {}", e);
        }
    }
    Ok(ok)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;

    let config = match AppConfig::load(APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(args.debug || config.debug.enabled);

    let Some(path) = args.path.as_deref() else {
        return Err(color_eyre::eyre::eyre!("A data file path is required"));
    };
    if !run(&args, &config, path)? {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_to_open_options() {
        let args = Args::parse_from([
            "datask",
            "returns.tsv",
            "--skip-rows",
            "2",
            "--no-header",
            "true",
            "--ask",
            "distribution of carrier",
        ]);
        let opts: OpenOptions = (&args).into();
        assert_eq!(opts.skip_rows, Some(2));
        assert_eq!(opts.has_header, Some(false));
        assert_eq!(args.questions, vec!["distribution of carrier".to_string()]);
    }
}
