use clap::Parser;
use std::process::ExitCode;
use survey_etl::core::ConfigProvider;
use survey_etl::utils::{logger, validation::Validate};
use survey_etl::{CliConfig, EtlEngine, LocalStorage, SurveyPipeline, TomlConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(args.log_filter());

    tracing::info!("Starting survey-etl");
    if args.verbose {
        tracing::debug!("CLI config: {:?}", args);
    }

    match args.config.clone() {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let config = match TomlConfig::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    return ExitCode::FAILURE;
                }
            };
            let monitor = args.monitor || config.monitoring_enabled();
            run(config, monitor).await
        }
        None => {
            let monitor = args.monitor;
            run(args, monitor).await
        }
    }
}

async fn run<C: ConfigProvider + Validate>(config: C, monitor_enabled: bool) -> ExitCode {
    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        return ExitCode::FAILURE;
    }

    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = match SurveyPipeline::from_config(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("❌ Could not load variables file: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        "Loaded {} datasets from the variables file",
        pipeline.registry().len()
    );

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            ExitCode::FAILURE
        }
    }
}
