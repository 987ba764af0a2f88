use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "field-telemetry-rs",
    version,
    about = "Field device telemetry API (readings, hourly profiles, device status)"
)]
pub struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(long, default_value_t = false)]
    pub print_openapi: bool,
    /// Apply the SQL migrations before serving.
    #[arg(long, default_value_t = false)]
    pub migrate: bool,
    #[arg(long, default_value = "migrations")]
    pub migrations_dir: PathBuf,
}
