use clap::{Args, Parser};
use config::Config;
use std::path::PathBuf;
use std::process;

mod config;
mod logging;
mod statsd;

#[derive(Parser)]
enum CliCommand {
    /// Serve the affiliate query gateway
    Serve(ConfigArgs),
    /// Load and validate a config file, then exit
    CheckConfig(ConfigArgs),
    /// Print every metric the gateway emits
    ListMetrics,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, default_value = "gateway.yaml")]
    config_file_path: PathBuf,
}

fn load_config(args: &ConfigArgs) -> Config {
    match Config::load(&args.config_file_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Failed to load config {}: {e}",
                args.config_file_path.display()
            );
            process::exit(1);
        }
    }
}

fn main() {
    let cli = CliCommand::parse();

    match &cli {
        CliCommand::Serve(args) => serve(load_config(args)),
        CliCommand::CheckConfig(args) => {
            let config = load_config(args);
            println!("Config is valid");
            if !config.proxy.credentials.is_complete() {
                println!("Warning: API credentials are incomplete");
            }
        }
        CliCommand::ListMetrics => {
            for def in affiliate_proxy::metrics_defs::ALL_METRICS {
                println!(
                    "{:<24} {:<10} {}",
                    def.name,
                    def.metric_type.as_str(),
                    def.description
                );
            }
        }
    }
}

fn serve(config: Config) {
    let _sentry = logging::init(config.common.logging.as_ref());

    if let Some(metrics_config) = &config.common.metrics
        && let Err(e) = statsd::init(metrics_config)
    {
        tracing::error!(error = %e, "Metrics disabled");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start runtime");
            process::exit(1);
        }
    };

    tracing::info!("Starting affiliate gateway");
    if let Err(e) = rt.block_on(affiliate_proxy::run(config.proxy)) {
        tracing::error!(error = %e, "Gateway stopped");
        process::exit(1);
    }
}
