//! Server constants and CLI/env configuration.

use std::path::PathBuf;

use clap::Parser;

use crate::error::ServerError;

/// Default listen port when `PORT` is unset.
pub const N_PORT_DEFAULT: u16 = 5000;
/// Default bind address.
pub const C_HOST_DEFAULT: &str = "0.0.0.0";
/// Default output directory, relative to the working directory.
pub const C_DIR_OUTPUT_DEFAULT: &str = "outputs";
/// Extension of every exported file.
pub const C_EXT_OUTPUT: &str = "xlsx";
/// Worksheet name of every exported file.
pub const C_SHEET_NAME: &str = "Sheet1";
/// Route prefix of the download endpoint.
pub const C_ROUTE_DOWNLOAD: &str = "/download";

/// Flatten a JSON report into an .xlsx file and serve it for download
#[derive(Parser, Debug, Clone)]
#[command(
    name = "reportkit",
    version,
    about = "Flatten a JSON report into an .xlsx file and serve it for download",
    after_help = "EXAMPLES:\n    \
        reportkit\n    \
        PORT=8080 reportkit --dir-output /var/lib/reportkit\n    \
        reportkit --url-base https://reports.example.com -v"
)]
pub struct CliArgs {
    /// Listen port
    #[arg(long, env = "PORT", default_value_t = N_PORT_DEFAULT)]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "REPORTKIT_HOST", default_value = C_HOST_DEFAULT)]
    pub host: String,

    /// Directory exported files are written to (created if absent)
    #[arg(long, env = "REPORTKIT_DIR_OUTPUT", default_value = C_DIR_OUTPUT_DEFAULT, value_name = "DIR")]
    pub dir_output: PathBuf,

    /// Public base URL for download links; defaults to the request Host header
    #[arg(long, env = "REPORTKIT_URL_BASE", value_name = "URL")]
    pub url_base: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecServerConfig {
    pub host: String,
    pub port: u16,
    pub dir_output: PathBuf,
    /// Without trailing slash
    pub url_base: Option<String>,
}

impl SpecServerConfig {
    /// Build from parsed CLI arguments.
    pub fn from_args(args: &CliArgs) -> Result<Self, ServerError> {
        let url_base = match &args.url_base {
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                return Err(ServerError::InvalidConfig(format!(
                    "url_base must start with http:// or https://, got '{url}'"
                )));
            }
            Some(url) => Some(url.trim_end_matches('/').to_string()),
            None => None,
        };

        if args.dir_output.as_os_str().is_empty() {
            return Err(ServerError::InvalidConfig(
                "dir_output must not be empty".to_string(),
            ));
        }

        Ok(Self {
            host: args.host.clone(),
            port: args.port,
            dir_output: args.dir_output.clone(),
            url_base,
        })
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
