// ==========================================
// 质检DPU跟踪系统 - JSON备份解码器
// ==========================================
// 支持的输入形态:
// 1. 月对象数组: [ {date, year, stages, ...}, ... ]
// 2. 信封包装: { "data": [...], "metadata": {...} }
// 3. 历史导出原生格式: 每条记录带数据库分配的 _id 包装
// 容错: 缺失数值字段按 0; 无 stages 的月份回退默认工序清单,
//       仅此时信任源文件提供的汇总值（作为兜底）
// ==========================================

use crate::domain::inspection::{
    parse_year_from_label, MonthlyInspection, StageRecord, DEFAULT_STAGE_NAMES,
};
use crate::engine::dpu::recompute_month;
use crate::importer::error::{ImportError, ImportResult};
use serde_json::Value;

/// 解码JSON备份文本
pub fn decode_json_backup(
    raw: &str,
    warnings: &mut Vec<String>,
) -> ImportResult<Vec<MonthlyInspection>> {
    let value: Value = serde_json::from_str(raw)?;
    let records = unwrap_envelope(value)?;

    let mut months = Vec::new();
    for (idx, record) in records.into_iter().enumerate() {
        match decode_month_record(&record, idx, warnings) {
            Some(month) => months.push(month),
            None => warnings.push(format!("第 {} 条记录: 缺少月份标签, 已排除", idx + 1)),
        }
    }
    Ok(months)
}

/// 解开信封: 顶层数组直接使用, {data: [...]} 取 data 数组
fn unwrap_envelope(value: Value) -> ImportResult<Vec<Value>> {
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(ImportError::structural(
                "JSON备份结构无法识别: 顶层既不是数组也不含 data 数组",
            )),
        },
        _ => Err(ImportError::structural(
            "JSON备份结构无法识别: 顶层既不是数组也不是对象",
        )),
    }
}

/// 解码单条月记录; 缺月份标签返回 None
fn decode_month_record(
    record: &Value,
    idx: usize,
    warnings: &mut Vec<String>,
) -> Option<MonthlyInspection> {
    let obj = record.as_object()?;
    // 历史导出的 _id 包装仅是数据库分配标识, 丢弃即可, 无需其余处理

    let date_label = get_str(record, &["date", "month", "label"])?;
    let year = get_i64(record, &["year"])
        .map(|y| y as i32)
        .or_else(|| parse_year_from_label(&date_label))
        .unwrap_or_else(|| {
            warnings.push(format!(
                "第 {} 条记录 \"{}\": 无法确定年份, 按 0 处理",
                idx + 1,
                date_label
            ));
            0
        });

    let mut month = MonthlyInspection::empty(&date_label, year);

    match obj.get("stages").and_then(|s| s.as_array()) {
        Some(stage_values) if !stage_values.is_empty() => {
            for (pos, stage_value) in stage_values.iter().enumerate() {
                match decode_stage_record(stage_value, pos) {
                    Some(stage) => month.stages.push(stage),
                    None => warnings.push(format!(
                        "第 {} 条记录 \"{}\" 工序 #{}: 缺少工序名, 已跳过",
                        idx + 1,
                        date_label,
                        pos + 1
                    )),
                }
            }
            recompute_month(&mut month);
        }
        _ => {
            // 无工序明细: 回退默认工序清单（计数归零）,
            // 源文件自带的汇总值仅在此路径作为兜底保留
            warnings.push(format!(
                "第 {} 条记录 \"{}\": 无工序明细, 回退默认工序清单",
                idx + 1,
                date_label
            ));
            month.stages = DEFAULT_STAGE_NAMES
                .iter()
                .map(|name| StageRecord::zeroed(name))
                .collect();
            recompute_month(&mut month);

            if let Some(v) = get_i64(record, &["totalInspections", "total_inspections"]) {
                month.total_inspections = v;
            }
            if let Some(v) = get_i64(record, &["totalFaults", "total_faults"]) {
                month.total_faults = v;
            }
            if let Some(v) = get_f64(record, &["totalDpu", "total_dpu"]) {
                month.total_dpu = v;
            }
            if let Some(v) = get_f64(record, &["productionTotalDpu", "production_dpu"]) {
                month.production_dpu = v;
            }
            if let Some(v) = get_f64(record, &["dpdiTotalDpu", "dpdi_dpu"]) {
                month.dpdi_dpu = v;
            }
            if let Some(v) = get_i64(record, &["signoutVolume", "signout_volume"]) {
                month.signout_volume = v;
            }
        }
    }

    Some(month)
}

/// 解码单条工序记录; 缺工序名返回 None
///
/// dpu 不信任源值, 一律由计数重算
fn decode_stage_record(value: &Value, pos: usize) -> Option<StageRecord> {
    let name = get_str(value, &["name", "stageName", "stage_name"])?;
    let inspected = get_i64(value, &["inspected", "inspections"]).unwrap_or(0);
    let faults = get_i64(value, &["faults", "defects"]).unwrap_or(0);
    let order = get_i64(value, &["order"])
        .map(|o| o as i32)
        .unwrap_or(pos as i32);
    Some(StageRecord::with_order(&name, inspected, faults, order))
}

// ==========================================
// 宽松取值辅助
// ==========================================

fn get_str(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(k))
        .find_map(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn get_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().filter_map(|k| value.get(k)).find_map(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
    })
}

fn get_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|k| value.get(k)).find_map(|v| {
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
    })
}
