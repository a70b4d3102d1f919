// ==========================================
// 质检DPU跟踪系统 - 宽表CSV导出
// ==========================================
// 与宽表解码器互为逆操作: 导出后再导入应得到相同的工序集合
// （名称/计数一致, 汇总按口径规则重算）
// 列布局: DATE + 每工序三列 + 三组汇总列 + SIGNOUT VOLUME
// ==========================================

use crate::domain::inspection::MonthlyInspection;
use crate::importer::error::{ImportError, ImportResult};
use csv::WriterBuilder;

/// 导出月度聚合为宽表CSV文本
///
/// 工序列取所有月份工序名的并集, 按首次出现序排列;
/// 某月缺某工序时该三列输出 0
pub fn export_wide_csv(months: &[MonthlyInspection]) -> ImportResult<String> {
    // 工序名并集（首次出现序）
    let mut stage_names: Vec<String> = Vec::new();
    for month in months {
        for stage in month.stages_in_display_order() {
            if !stage_names.iter().any(|n| n.eq_ignore_ascii_case(&stage.name)) {
                stage_names.push(stage.name.clone());
            }
        }
    }

    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    // 表头
    let mut header = vec!["DATE".to_string()];
    for name in &stage_names {
        header.push(format!("{} INSPECTED", name));
        header.push(format!("{} FAULTS", name));
        header.push(format!("{} DPU", name));
    }
    for prefix in ["PRODUCTION TOTAL", "DPDI TOTAL", "COMBINED"] {
        header.push(format!("{} INSPECTED", prefix));
        header.push(format!("{} FAULTS", prefix));
        header.push(format!("{} DPU", prefix));
    }
    header.push("SIGNOUT VOLUME".to_string());
    writer
        .write_record(&header)
        .map_err(|e| ImportError::CsvExportError(e.to_string()))?;

    // 数据行
    for month in months {
        let mut row = vec![month.date.clone()];
        for name in &stage_names {
            match month.find_stage(name) {
                Some(stage) => {
                    row.push(stage.inspected.to_string());
                    row.push(stage.faults.to_string());
                    row.push(format!("{:.2}", stage.dpu));
                }
                None => {
                    row.push("0".to_string());
                    row.push("0".to_string());
                    row.push("0.00".to_string());
                }
            }
        }
        for (inspections, faults, dpu) in [
            (
                month.production_inspections,
                month.production_faults,
                month.production_dpu,
            ),
            (month.dpdi_inspections, month.dpdi_faults, month.dpdi_dpu),
            (month.total_inspections, month.total_faults, month.total_dpu),
        ] {
            row.push(inspections.to_string());
            row.push(faults.to_string());
            row.push(format!("{:.2}", dpu));
        }
        row.push(month.signout_volume.to_string());
        writer
            .write_record(&row)
            .map_err(|e| ImportError::CsvExportError(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ImportError::CsvExportError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ImportError::CsvExportError(e.to_string()))
}
