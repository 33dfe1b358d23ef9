use anyhow::Context;
use clap::Parser;
use drilling_etl::adapters::atomic;
use drilling_etl::utils::logger;
use drilling_etl::{CliConfig, EtlEngine, EtlError, LocalStorage, RunConfig};

fn report_fatal(e: &EtlError) -> ! {
    tracing::error!("❌ {}", e.cause_chain());
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌；guard 必須活到程式結束
    let _guard = if cli.json_logs {
        logger::init_json_logger(cli.verbose);
        None
    } else {
        logger::init_cli_logger(cli.verbose, cli.log_dir.as_deref()).unwrap_or_else(|e| report_fatal(&e))
    };

    tracing::info!("Starting drilling-etl");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = RunConfig::from_cli(&cli).unwrap_or_else(|e| report_fatal(&e));
    let engine = EtlEngine::new(LocalStorage::new(), config).unwrap_or_else(|e| report_fatal(&e));

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No files will be read or written");
        let files = engine.dry_run().unwrap_or_else(|e| report_fatal(&e));
        println!("Pipeline: {}", engine.pipeline().step_names().join(" -> "));
        println!("{} file(s) would be processed:", files.len());
        for file in &files {
            println!("  {}", file.display());
        }
        return Ok(());
    }

    let report = engine.run().unwrap_or_else(|e| report_fatal(&e));

    if let Some(path) = &cli.summary_json {
        let body = serde_json::to_vec_pretty(&report.metrics.to_json())?;
        atomic::write_atomic(path, &body)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        tracing::info!("📁 Summary saved to: {}", path.display());
    }

    println!("{}", report.metrics);
    for failure in &report.failures {
        eprintln!("❌ {}: {}", failure.file.display(), failure.cause);
    }

    let exit_code = report.exit_code();
    if exit_code > 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
