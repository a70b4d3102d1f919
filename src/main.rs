// ==========================================
// 质检DPU跟踪系统 - CLI 主入口
// ==========================================
// 用法:
//   dpu-tracker import <文件>          导入CSV/JSON并整体替换
//   dpu-tracker export <文件>          导出宽表CSV
//   dpu-tracker report                 输出看板报表(JSON)
//   dpu-tracker seed-year <年份>       播种新年份
//   dpu-tracker recalc-totals          汇总口径维护重算
// 环境变量:
//   DPU_TRACKER_DB  数据库路径（默认: 数据目录下 dpu_tracker.db）
// ==========================================

use std::process::ExitCode;

use dpu_tracker::app::{get_default_db_path, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    dpu_tracker::logging::init();

    tracing::info!("==================================================");
    tracing::info!("质检DPU跟踪系统 - 决策支持系统");
    tracing::info!("系统版本: {}", dpu_tracker::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::var("DPU_TRACKER_DB").unwrap_or_else(|_| get_default_db_path());
    tracing::info!("使用数据库: {}", db_path);

    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("无法初始化应用状态: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&state, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("命令执行失败: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &AppState, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    match args.first().map(|s| s.as_str()) {
        Some("import") => {
            let path = args.get(1).ok_or("用法: import <文件>")?;
            let raw = std::fs::read_to_string(path)?;
            let response = state.import_api.import_text(&raw).await?;
            if response.success {
                tracing::info!(
                    months = response.months_processed,
                    warnings = response.warnings.len(),
                    "导入成功"
                );
                for warning in &response.warnings {
                    tracing::warn!("{}", warning);
                }
            } else {
                for error in &response.errors {
                    tracing::error!("{}", error);
                }
                return Err("导入失败".into());
            }
        }
        Some("export") => {
            let path = args.get(1).ok_or("用法: export <文件>")?;
            let csv = state.import_api.export_csv().await?;
            std::fs::write(path, csv)?;
            tracing::info!("已导出: {}", path);
        }
        Some("report") => {
            let report = state.dashboard_api.build_report()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some("seed-year") => {
            let year: i32 = args.get(1).ok_or("用法: seed-year <年份>")?.parse()?;
            let months = state.inspection_api.seed_year(year)?;
            tracing::info!(year, months = months.len(), "播种完成");
        }
        Some("recalc-totals") => {
            let summary = state.inspection_api.recalculate_totals()?;
            tracing::info!(
                checked = summary.months_checked,
                corrected = summary.months_corrected,
                "汇总重算完成"
            );
        }
        _ => {
            eprintln!("用法: dpu-tracker <import|export|report|seed-year|recalc-totals> [参数]");
            return Err("未知命令".into());
        }
    }
    Ok(())
}
