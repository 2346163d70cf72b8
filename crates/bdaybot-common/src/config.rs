use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_database_url")]
    pub database_url: String,
    #[serde(default = "Config::default_database_max_connections")]
    pub database_max_connections: u32,

    #[serde(default)]
    pub otel_enabled: bool,
    #[serde(default = "Config::default_otel_exporter_endpoint")]
    pub otel_exporter_endpoint: String,
    #[serde(default)]
    pub otel_exporter: OtelExporter,
    #[serde(default = "Config::default_otel_sample_rate")]
    pub otel_sample_rate: f64,
}

#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OtelExporter {
    #[default]
    OtlpGrpc,
    OtlpHttp,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: Self::default_database_url(),
            database_max_connections: Self::default_database_max_connections(),
            otel_enabled: false,
            otel_exporter_endpoint: Self::default_otel_exporter_endpoint(),
            otel_exporter: OtelExporter::default(),
            otel_sample_rate: Self::default_otel_sample_rate(),
        }
    }
}

impl Config {
    pub fn new() -> envy::Result<Self> {
        let config = envy::from_env::<Config>()?;
        Ok(config)
    }

    fn default_database_url() -> String {
        "sqlite://data/birthday_bot.db?mode=rwc".into()
    }

    fn default_database_max_connections() -> u32 {
        5
    }

    fn default_otel_exporter_endpoint() -> String {
        "http://localhost:4317".into()
    }

    fn default_otel_sample_rate() -> f64 {
        1.0
    }
}
