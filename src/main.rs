use clap::Parser;
use tracing_subscriber::EnvFilter;

use java_precheck::cli::{self, Command};
use java_precheck::error::exit_code_for;
use java_precheck::report;

/// Java Pre-Submission Checker
///
/// 风格规则、测试质量、覆盖率核对。报告写到 stdout，日志写到 stderr。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log filter (`info`, `debug`, `java_precheck=trace`); RUST_LOG wins when set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// 输出 JSON 格式 (默认输出人类可读文本)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let args = Args::parse();

    // 初始化日志 (只写 stderr)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let json = args.json;
    let code = match cli::handle_command(args.command, json) {
        Ok(code) => code,
        Err(e) => {
            if json {
                println!("{}", report::render_json_error(&e));
            } else {
                eprintln!("{} {e:#}", report::FAIL_MARK);
            }
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
