use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod config;

use config::AppConfig;

fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("schedlog")
        .version("1.0.0")
        .about("调度实验事件日志重建与统计工具")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径")
                .default_value("config/schedlog.toml")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .global(true),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .global(true),
        )
        .subcommand(
            Command::new("stat")
                .about("查询事件日志的一个命名统计项")
                .arg(Arg::new("logfile").value_name("LOGFILE").required(true))
                .arg(
                    Arg::new("metric")
                        .value_name("METRIC")
                        .help("makespan | mintime | maxtime | events | length | real_length")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("summary")
                .about("重建事件日志并打印模型概要")
                .arg(Arg::new("logfile").value_name("LOGFILE").required(true)),
        )
        .subcommand(
            Command::new("wrap")
                .about("重建包装进程日志并打印应用列表")
                .arg(Arg::new("logfile").value_name("LOGFILE").required(true)),
        )
        .get_matches();

    // 加载配置，命令行参数优先于配置文件
    let config_path = matches.get_one::<String>("config").unwrap();
    let config = AppConfig::load(Some(config_path))
        .with_context(|| format!("加载配置文件失败: {config_path}"))?;

    let log_level = matches
        .get_one::<String>("log-level")
        .unwrap_or(&config.log_level);
    let log_format = matches
        .get_one::<String>("log-format")
        .unwrap_or(&config.log_format);

    // 初始化日志系统
    init_logging(log_level, log_format)?;

    match matches.subcommand() {
        Some(("stat", sub)) => {
            let (logfile, metric) = stat_args(sub);
            app::run_stat(logfile, metric)
        }
        Some(("summary", sub)) => {
            let logfile = sub.get_one::<String>("logfile").unwrap();
            info!("重建事件日志: {logfile}");
            app::run_summary(logfile)
        }
        Some(("wrap", sub)) => {
            let logfile = sub.get_one::<String>("logfile").unwrap();
            info!("重建包装日志: {logfile}");
            app::run_wrap(logfile)
        }
        _ => unreachable!("subcommand_required保证存在子命令"),
    }
}

fn stat_args(sub: &ArgMatches) -> (&String, &String) {
    (
        sub.get_one::<String>("logfile").unwrap(),
        sub.get_one::<String>("metric").unwrap(),
    )
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}
