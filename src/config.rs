use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use schedlog_errors::{SchedlogError, SchedlogResult};

/// CLI应用配置：默认值 -> 可选TOML文件 -> SCHEDLOG_*环境变量
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 默认日志级别，可被命令行参数覆盖
    pub log_level: String,
    /// 默认日志格式（json或pretty），可被命令行参数覆盖
    pub log_format: String,
}

impl AppConfig {
    pub fn load(path: Option<&str>) -> SchedlogResult<Self> {
        let mut builder = Config::builder()
            .set_default("log_level", "info")
            .map_err(|e| SchedlogError::config_error(e.to_string()))?
            .set_default("log_format", "pretty")
            .map_err(|e| SchedlogError::config_error(e.to_string()))?;

        if let Some(path) = path {
            builder = builder.add_source(
                File::with_name(path)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(Environment::with_prefix("SCHEDLOG"));

        builder
            .build()
            .map_err(|e| SchedlogError::config_error(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SchedlogError::config_error(e.to_string()))
    }
}
