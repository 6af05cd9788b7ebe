use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::efficiency;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PanelDataConfig {
    /// Hourly solar performance CSV, header:
    /// panel_id,hour,irradiance_w_per_m2,temperature_c,power_kw
    pub csv_path: PathBuf,
    #[serde(default = "default_panel_area_m2")]
    pub panel_area_m2: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardiacDataConfig {
    /// Cardiac risk CSV, header: paciente,idade,colesterol,pressao,risco
    pub csv_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub panel_data: PanelDataConfig,
    pub cardiac_data: CardiacDataConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    pub metrics: Option<MetricsConfig>,
}

fn default_panel_area_m2() -> f64 {
    efficiency::DEFAULT_PANEL_AREA_M2
}

fn default_batch_size() -> usize {
    500
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    250
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("ANALYTICS_CONFIG").unwrap_or_else(|_| "analytics-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        let cfg: AppConfig = toml::from_str(&contents)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let toml = r#"
            [database]
            uri = "postgres://localhost/datasets"
            max_connections = 8

            [panel_data]
            csv_path = "data/painel_solar.csv"
            panel_area_m2 = 12.5

            [cardiac_data]
            csv_path = "data/risco_cardiaco.csv"

            [api]
            bind_addr = "127.0.0.1:8080"

            [sink]
            batch_size = 100
            max_retries = 5
            retry_backoff_ms = 50

            [metrics]
            bind_addr = "127.0.0.1:9102"
        "#;

        let cfg: AppConfig = toml::from_str(toml).expect("config should parse");
        assert_eq!(cfg.database.max_connections, 8);
        assert_eq!(cfg.panel_data.panel_area_m2, 12.5);
        assert_eq!(cfg.sink.batch_size, 100);
        assert!(cfg.metrics.is_some());
    }

    #[test]
    fn panel_area_and_sink_default_when_omitted() {
        let toml = r#"
            [database]
            uri = "postgres://localhost/datasets"
            max_connections = 4

            [panel_data]
            csv_path = "data/painel_solar.csv"

            [cardiac_data]
            csv_path = "data/risco_cardiaco.csv"

            [api]
            bind_addr = "127.0.0.1:8080"
        "#;

        let cfg: AppConfig = toml::from_str(toml).expect("config should parse");
        assert_eq!(cfg.panel_data.panel_area_m2, efficiency::DEFAULT_PANEL_AREA_M2);
        assert_eq!(cfg.sink.batch_size, 500);
        assert_eq!(cfg.sink.max_retries, 3);
        assert!(cfg.metrics.is_none());
    }
}
