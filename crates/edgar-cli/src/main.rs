//! Command-line interface for edgar-analyst
//!
//! Every subcommand prints pretty JSON to stdout; `serve` starts the HTTP API.

mod server;

use clap::{Parser, Subcommand, ValueEnum};
use edgar_analyst::service::{Analyze10kRequest, AskRequest, DEFAULT_XBRL_YEARS, MetricsMode};
use edgar_analyst::{AnalystConfig, AnalystService};
use edgar_utils::LogFormat;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "edgar")]
#[command(about = "SEC filing metrics and AI analyst reports", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Csv,
    Xbrl,
}

impl From<Mode> for MetricsMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Csv => Self::Csv,
            Mode::Xbrl => Self::Xbrl,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,

        /// Refuse to start without a cloud AI credential
        #[arg(long)]
        require_ai: bool,
    },
    /// Yearly XBRL metrics
    Metrics {
        ticker: String,
        #[arg(long, default_value_t = DEFAULT_XBRL_YEARS)]
        years: usize,
    },
    /// Plain text of the latest annual report
    Filing { ticker: String },
    /// Ask a question about a company
    Ask {
        ticker: String,
        question: String,
        #[arg(long)]
        no_ai: bool,
        #[arg(long, value_enum, default_value = "csv")]
        mode: Mode,
    },
    /// Analyse the latest annual report
    #[command(name = "analyze-10k")]
    Analyze10k {
        ticker: String,
        /// Run the local model first
        #[arg(long)]
        local_llm: bool,
        /// Score risk factor sentiment
        #[arg(long)]
        sentiment: bool,
        #[arg(long)]
        no_ai: bool,
    },
    /// Report built from XBRL metrics
    #[command(name = "analyze-xbrl")]
    AnalyzeXbrl {
        ticker: String,
        #[arg(long, default_value_t = DEFAULT_XBRL_YEARS)]
        years: usize,
        #[arg(long)]
        lang: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    edgar_utils::init_tracing(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let service = AnalystService::from_config(AnalystConfig::from_env()?)?;

    match cli.command {
        Command::Serve { addr, require_ai } => {
            if require_ai {
                service.require_cloud()?;
            }
            info!("Starting edgar API");
            server::serve(Arc::new(service), addr).await?;
        }
        Command::Metrics { ticker, years } => {
            print_json(&service.xbrl_metrics(&ticker, years).await?)?;
        }
        Command::Filing { ticker } => {
            print_json(&service.latest_filing_text(&ticker).await?)?;
        }
        Command::Ask {
            ticker,
            question,
            no_ai,
            mode,
        } => {
            let request = AskRequest {
                ticker,
                question,
                mode: mode.into(),
                use_ai: !no_ai,
            };
            print_json(&service.ask(request).await?)?;
        }
        Command::Analyze10k {
            ticker,
            local_llm,
            sentiment,
            no_ai,
        } => {
            let mut request = Analyze10kRequest::new(ticker);
            request.use_llm = local_llm;
            request.use_finbert = sentiment;
            request.use_ai = !no_ai;
            print_json(&service.analyze_10k(request).await?)?;
        }
        Command::AnalyzeXbrl { ticker, years, lang } => {
            print_json(&service.analyze_xbrl(&ticker, years, lang.as_deref()).await?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from(["edgar", "ask", "AAPL", "How is growth?", "--no-ai", "--mode", "xbrl"]);
        match cli.command {
            Command::Ask { ticker, no_ai, mode, .. } => {
                assert_eq!(ticker, "AAPL");
                assert!(no_ai);
                assert!(matches!(mode, Mode::Xbrl));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["edgar", "serve", "--log-json"]);
        assert!(cli.log_json);
        match cli.command {
            Command::Serve { addr, require_ai } => {
                assert_eq!(addr.port(), 8000);
                assert!(!require_ai);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
