// ==========================================
// 主数据 ETL - 命令行入口
// ==========================================
// 用法: mft-etl <FILE> [--db PATH] [--no-truncate] [--cleanup] [--json]
// 退出码: 装载成功 0，失败 1，运行错误 2
// ==========================================

use clap::Parser;
use mft_etl::config::EtlConfig;
use mft_etl::pipeline::{self, PipelineReport};
use mft_etl::logging;
use std::path::PathBuf;
use std::process::ExitCode;

/// 汽车制造主数据 ETL: 宽表 -> 关系型主数据库
#[derive(Parser, Debug)]
#[command(name = "mft-etl", version)]
#[command(about = "Load a denormalised master-data sheet into the relational schema")]
struct Args {
    /// 源文件（.xlsx / .xls / .csv）
    file: PathBuf,

    /// SQLite 数据库路径（覆盖 MFT_DB_PATH）
    #[arg(long)]
    db: Option<PathBuf>,

    /// 追加写入，不清空目标表
    #[arg(long)]
    no_truncate: bool,

    /// 装载成功后删除源文件
    #[arg(long)]
    cleanup: bool,

    /// 以 JSON 输出报告（日志同时切换为 JSON）
    #[arg(long)]
    json: bool,
}

fn print_summary(report: &PipelineReport) {
    let load = &report.load;
    println!("==================================================");
    println!("主数据 ETL - {}", report.source);
    println!("==================================================");
    println!(
        "抽取: {} 行, {} 列, 实体 {} 个",
        report.extract.rows,
        report.extract.columns,
        report.extract.entities.len()
    );
    for (entity, columns) in &report.extract.missing {
        println!("  跳过实体 {}: 缺少 {}", entity, columns.join(", "));
    }
    let total = &report.transform.total;
    println!(
        "转换: 成功 {} 列, 失败 {} 列, 跳过 {} 列",
        total.applied, total.failed, total.skipped
    );
    println!("装载:");
    for (table, count) in &load.record_counts {
        match load.table_errors.get(table) {
            Some(err) => println!("  {:<20} {:>8}  ({})", table, count, err),
            None => println!("  {:<20} {:>8}", table, count),
        }
    }
    if let Some(n) = load.foreign_key_violations.filter(|n| *n > 0) {
        println!("悬空外键引用: {}", n);
    }
    if let Some(err) = &load.error {
        println!("错误: {}", err);
    }
    println!("结果: {}", if load.success { "成功" } else { "失败" });
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.json {
        logging::init_json();
    } else {
        logging::init();
    }

    let mut config = match EtlConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("配置错误: {}", e);
            return ExitCode::from(2);
        }
    };
    if let Some(db) = args.db {
        config.db_path = db;
    }
    if args.no_truncate {
        config.truncate_before_load = false;
    }
    if args.cleanup {
        config.cleanup_source = true;
    }

    match pipeline::run(&config, &args.file).await {
        Ok(report) => {
            if args.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("报告序列化失败: {}", e),
                }
            } else {
                print_summary(&report);
            }
            if report.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!(error = ?e, "ETL 运行失败");
            eprintln!("运行失败: {:#}", e);
            ExitCode::from(2)
        }
    }
}
