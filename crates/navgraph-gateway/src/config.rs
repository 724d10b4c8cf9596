//! Gateway configuration.

use std::path::PathBuf;

use clap::Parser;
use navgraph_core::{EngineConfig, Error};

/// navgraph HTTP/JSON gateway command line arguments.
#[derive(Debug, Parser)]
#[command(name = "navgraph-gateway")]
#[command(about = "HTTP/JSON query gateway for navgraph")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Engine configuration file (JSON).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Default batch size, overriding the configuration file.
    #[arg(short, long)]
    pub batch_size: Option<usize>,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to listen on for HTTP requests.
    pub listen_addr: String,
    /// Engine configuration file. The built-in defaults apply when unset.
    pub engine_config: Option<PathBuf>,
    /// Batch size override for every query.
    pub batch_size: Option<usize>,
}

impl GatewayConfig {
    /// Load the engine configuration this gateway points at.
    pub fn load_engine_config(&self) -> Result<EngineConfig, Error> {
        let config = match &self.engine_config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        Ok(match self.batch_size {
            Some(batch_size) => config.with_batch_size(batch_size),
            None => config,
        })
    }
}

impl From<&Args> for GatewayConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            engine_config: args.config.clone(),
            batch_size: args.batch_size,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            engine_config: None,
            batch_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_into_config() {
        let args = Args::parse_from(["navgraph-gateway", "--listen", "127.0.0.1:9090", "-b", "25"]);
        let config = GatewayConfig::from(&args);
        assert_eq!(config.listen_addr, "127.0.0.1:9090");
        assert_eq!(config.engine_config, None);

        let engine = config.load_engine_config().unwrap();
        assert_eq!(engine.batch_size, 25);
    }

    #[test]
    fn test_missing_config_file() {
        let config = GatewayConfig {
            engine_config: Some(PathBuf::from("/nonexistent/navgraph.json")),
            ..GatewayConfig::default()
        };
        assert!(matches!(config.load_engine_config(), Err(Error::Io(_))));
    }
}
