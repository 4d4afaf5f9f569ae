// ==========================================
// 毛利表生成系统 - 命令行入口
// ==========================================
// 用法:
//   profit-table [输入文件] [输出文件]
//       默认 导入数据.xlsx → 毛利表.xlsx
//   profit-table reconcile <原始数据> <改价毛利表> [输出文件]
//       默认输出 改价后原始数据.xlsx
// 退出码: 任一致命错误返回 1
// ==========================================

use anyhow::{bail, Context};
use profit_table::domain::ProcessingResult;
use profit_table::{logging, PipelineConfig, ProfitTableService};
use std::process::ExitCode;

const USAGE: &str = "用法:
  profit-table [输入文件] [输出文件]
  profit-table reconcile <原始数据> <改价毛利表> [输出文件]";

fn main() -> ExitCode {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", profit_table::APP_NAME, profit_table::VERSION);
    tracing::info!("==================================================");

    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("错误: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(args: Vec<String>) -> anyhow::Result<()> {
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = PipelineConfig::load().context("加载配置失败")?;
    let mut service = ProfitTableService::new(&config).context("初始化服务失败")?;

    match args.first().map(String::as_str) {
        Some("reconcile") => {
            let (original, edited) = match (args.get(1), args.get(2)) {
                (Some(original), Some(edited)) => (original, edited),
                _ => bail!("reconcile 需要原始数据与改价毛利表两个参数\n{}", USAGE),
            };
            let output = args.get(3).unwrap_or(&config.updated_output_file);
            reconcile(&mut service, original, edited, output)
        }
        _ => {
            let input = args.first().unwrap_or(&config.input_file);
            let output = args.get(1).unwrap_or(&config.output_file);
            generate(&mut service, input, output)
        }
    }
}

/// 导入 → 解析 → 筛选 → 生成 → 导出
fn generate(service: &mut ProfitTableService, input: &str, output: &str) -> anyhow::Result<()> {
    let imported = checked(service.import_data(input))?;
    println!("{}", imported.message);

    let generated = checked(service.process_and_generate())?;
    println!("{}", generated.message);

    let exported = checked(service.export_profit_table(output))?;
    println!("{}", exported.message);

    let summary = service.summary();
    println!(
        "原始数据 {} 行，处理后 {} 行，毛利表 {} 行",
        summary.original_count, summary.processed_count, summary.profit_table_count
    );
    Ok(())
}

/// 导入原始数据 → 导入改价毛利表 → 回填 → 导出
fn reconcile(
    service: &mut ProfitTableService,
    original: &str,
    edited: &str,
    output: &str,
) -> anyhow::Result<()> {
    let imported = checked(service.import_data(original))?;
    println!("{}", imported.message);

    let reconciled = checked(service.import_edited_table_and_reconcile(edited))?;
    println!("{}", reconciled.message);
    if let Some(report) = &reconciled.data {
        if !report.duplicate_keys.is_empty() {
            println!("改价表中存在重复键（后行覆盖前行）: {}", report.duplicate_keys.join(", "));
        }
    }

    let exported = checked(service.export_updated_data(output))?;
    println!("{}", exported.message);
    Ok(())
}

fn checked<T>(result: ProcessingResult<T>) -> anyhow::Result<ProcessingResult<T>> {
    if result.success {
        Ok(result)
    } else {
        bail!(result.message)
    }
}
