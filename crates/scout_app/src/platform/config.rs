use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use scout_engine::SearchSettings;

use super::logging::LogDestination;

/// Search GitHub repositories and print the ranked results page by page.
#[derive(Parser, Debug)]
#[command(name = "reposcout", version, about)]
pub struct Cli {
    /// Search words; joined with spaces into one query.
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Fetches to run, counting the session start. The first "load more"
    /// requests page 1 again, so results from page 1 show up twice.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: u32,

    /// Base URL of the search API.
    #[arg(long, env = "REPOSCOUT_API_URL")]
    pub api_url: Option<String>,

    /// Items requested per page.
    #[arg(long, env = "REPOSCOUT_PAGE_SIZE", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub page_size: Option<u32>,

    /// Where log output goes.
    #[arg(long, env = "REPOSCOUT_LOG", value_enum, default_value_t = LogDestination::Terminal)]
    pub log: LogDestination,

    /// Minimum level written to the log.
    #[arg(long, env = "REPOSCOUT_LOG_LEVEL", default_value_t = LevelFilter::Warn, value_parser = parse_level)]
    pub log_level: LevelFilter,

    /// Log file used by the `file` and `both` destinations.
    #[arg(long, env = "REPOSCOUT_LOG_FILE", default_value = "./reposcout.log")]
    pub log_file: PathBuf,
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse()
        .map_err(|_| format!("unknown log level {value:?}"))
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub query: String,
    pub pages: u32,
    pub settings: SearchSettings,
    pub log_destination: LogDestination,
    pub log_level: LevelFilter,
    pub log_path: PathBuf,
}

impl From<Cli> for AppConfig {
    fn from(cli: Cli) -> Self {
        let mut settings = SearchSettings::default();
        if let Some(url) = cli.api_url {
            settings.base_url = url;
        }
        if let Some(size) = cli.page_size {
            settings.page_size = size;
        }
        Self {
            query: cli.query.join(" "),
            pages: cli.pages,
            settings,
            log_destination: cli.log,
            log_level: cli.log_level,
            log_path: cli.log_file,
        }
    }
}
