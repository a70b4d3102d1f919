// ==========================================
// 质检DPU跟踪系统 - 宽表CSV解码器
// ==========================================
// 格式: 一行一个月, 每工序三列 "{工序} INSPECTED/FAULTS/DPU",
//       另有可选汇总列 (PRODUCTION TOTAL * / DPDI TOTAL * /
//       COMBINED * / SIGNOUT VOLUME)
// 流程: 表头扫描一次建立工序→列号映射, 数据行按映射取值
// 容错: 非数值单元格按 0 处理; CSV 自带 dpu 列仅做一致性抽查,
//       偏差超容差记 warning, 不拒绝该行
// ==========================================

use crate::domain::inspection::{MonthlyInspection, StageRecord};
use crate::domain::parse_year_from_label;
use crate::engine::dpu::{compute_stage_dpu, recompute_month};
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::collections::HashMap;

/// 工序列映射: 工序名 → (inspected列, faults列, dpu列)
#[derive(Debug, Clone)]
pub struct StageColumnMap {
    pub date_col: usize,
    pub stages: Vec<(String, StageColumns)>, // 保持表头出现序
}

#[derive(Debug, Clone, Copy)]
pub struct StageColumns {
    pub inspected: usize,
    pub faults: Option<usize>,
    pub dpu: Option<usize>,
}

/// 汇总列名前缀（不计入工序映射）
const AGGREGATE_PREFIXES: [&str; 4] = ["PRODUCTION TOTAL", "DPDI TOTAL", "COMBINED", "TOTAL"];

/// 扫描表头建立列映射
///
/// 工序名 = 以 "INSPECTED" 结尾的表头去掉该后缀;
/// 命中汇总前缀的列不计入工序
pub fn build_column_map(headers: &[String]) -> ImportResult<StageColumnMap> {
    let upper: Vec<String> = headers.iter().map(|h| h.trim().to_uppercase()).collect();

    let date_col = upper
        .iter()
        .position(|h| h.starts_with("DATE"))
        .ok_or_else(|| ImportError::structural("缺少 DATE 列: 表头中未找到以 DATE 开头的列"))?;

    let index_of: HashMap<&str, usize> = upper
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let mut stages = Vec::new();
    for (col, header) in upper.iter().enumerate() {
        let Some(raw_name) = header.strip_suffix("INSPECTED") else {
            continue;
        };
        let name = raw_name.trim();
        if name.is_empty() || AGGREGATE_PREFIXES.iter().any(|p| name.starts_with(p)) {
            continue;
        }
        let faults = index_of.get(format!("{} FAULTS", name).as_str()).copied();
        let dpu = index_of.get(format!("{} DPU", name).as_str()).copied();
        stages.push((
            name.to_string(),
            StageColumns {
                inspected: col,
                faults,
                dpu,
            },
        ));
    }

    if stages.is_empty() {
        return Err(ImportError::structural(
            "未识别到任何工序列: 表头中没有 \"{工序} INSPECTED\" 形式的列",
        ));
    }

    Ok(StageColumnMap { date_col, stages })
}

/// 解码单个数据行
///
/// # 返回
/// - Ok(Some(month)): 行有效
/// - Ok(None): DATE 单元格为空, 按规则跳过
pub fn decode_row(
    map: &StageColumnMap,
    cells: &[String],
    row_no: usize,
    dpu_tolerance: f64,
    warnings: &mut Vec<String>,
) -> ImportResult<Option<MonthlyInspection>> {
    let date_label = cells.get(map.date_col).map(|c| c.trim()).unwrap_or("");
    if date_label.is_empty() {
        return Ok(None);
    }

    let year = match parse_year_from_label(date_label) {
        Some(y) => y,
        None => {
            warnings.push(format!(
                "第 {} 行: 无法从月份标签 \"{}\" 解析年份, 按 0 处理",
                row_no, date_label
            ));
            0
        }
    };

    let mut month = MonthlyInspection::empty(date_label, year);
    for (order, (name, cols)) in map.stages.iter().enumerate() {
        let inspected = parse_count(cells.get(cols.inspected));
        let faults = cols.faults.map(|c| parse_count(cells.get(c))).unwrap_or(0);

        // CSV 自带 dpu 列与计数口径抽查
        if let Some(reported) = cols.dpu.and_then(|c| parse_float(cells.get(c))) {
            let computed = compute_stage_dpu(inspected, faults);
            if (reported - computed).abs() > dpu_tolerance {
                warnings.push(format!(
                    "第 {} 行 工序 {}: CSV 报告 dpu={} 与计数口径 {} 偏差超过 {}",
                    row_no, name, reported, computed, dpu_tolerance
                ));
            }
        }

        month
            .stages
            .push(StageRecord::with_order(name, inspected, faults, order as i32));
    }

    recompute_month(&mut month);
    Ok(Some(month))
}

/// 解码完整宽表CSV文本
pub fn decode_wide_csv(
    raw: &str,
    dpu_tolerance: f64,
    warnings: &mut Vec<String>,
) -> ImportResult<Vec<MonthlyInspection>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // 允许行长度不一致
        .from_reader(raw.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let map = build_column_map(&headers)?;

    let mut months = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
        // 跳过完全空白的行
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        // 表头占第 1 行, 数据行从第 2 行计数
        if let Some(month) = decode_row(&map, &cells, idx + 2, dpu_tolerance, warnings)? {
            months.push(month);
        }
    }

    Ok(months)
}

/// 宽松整数解析: 去千分位逗号, 失败按 0
fn parse_count(cell: Option<&String>) -> i64 {
    cell.map(|c| c.replace(',', ""))
        .and_then(|c| c.trim().parse::<f64>().ok())
        .map(|v| v as i64)
        .unwrap_or(0)
}

/// 宽松浮点解析: 失败返回 None（dpu 抽查列缺失不告警）
fn parse_float(cell: Option<&String>) -> Option<f64> {
    cell.and_then(|c| c.replace(',', "").trim().parse::<f64>().ok())
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
DATE,SIP1 INSPECTED,SIP1 FAULTS,SIP1 DPU,SIGN INSPECTED,SIGN FAULTS,SIGN DPU,COMBINED INSPECTED,COMBINED FAULTS,COMBINED DPU
Jan-25,1000,700,0.70,1384,12630,9.13,2384,13330,9.83
Feb-25,900,450,0.50,1200,1200,1.00,2100,1650,1.50
";

    #[test]
    fn test_表头映射_排除汇总列() {
        let headers: Vec<String> = CSV
            .lines()
            .next()
            .unwrap()
            .split(',')
            .map(|s| s.to_string())
            .collect();
        let map = build_column_map(&headers).unwrap();
        assert_eq!(map.date_col, 0);
        assert_eq!(map.stages.len(), 2);
        assert_eq!(map.stages[0].0, "SIP1");
        assert_eq!(map.stages[1].0, "SIGN");
    }

    #[test]
    fn test_解码_正常数据() {
        let mut warnings = Vec::new();
        let months = decode_wide_csv(CSV, 0.1, &mut warnings).unwrap();
        assert_eq!(months.len(), 2);
        assert!(warnings.is_empty());

        let jan = &months[0];
        assert_eq!(jan.date, "Jan-25");
        assert_eq!(jan.year, 2025);
        assert_eq!(jan.id, "month-jan-25");
        assert_eq!(jan.stages.len(), 2);
        assert_eq!(jan.stages[1].dpu, 9.13);
        // 汇总为重算值, 不信任 CSV 的 COMBINED 列
        assert_eq!(jan.total_dpu, 9.83);
        assert_eq!(jan.signout_volume, 1384);
    }

    #[test]
    fn test_解码_缺少DATE列为结构错误() {
        let csv = "MONTH,SIP1 INSPECTED\nJan-25,100\n";
        let mut warnings = Vec::new();
        let err = decode_wide_csv(csv, 0.1, &mut warnings).unwrap_err();
        let errors = err.error_strings();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("DATE"));
    }

    #[test]
    fn test_解码_无工序列为结构错误() {
        let csv = "DATE,COMBINED INSPECTED\nJan-25,100\n";
        let mut warnings = Vec::new();
        assert!(decode_wide_csv(csv, 0.1, &mut warnings).is_err());
    }

    #[test]
    fn test_解码_空DATE行跳过_非数值按零() {
        let csv = "\
DATE,SIP1 INSPECTED,SIP1 FAULTS,SIP1 DPU
Jan-25,abc,50,
,100,100,1.0
Feb-25,200,100,0.5
";
        let mut warnings = Vec::new();
        let months = decode_wide_csv(csv, 0.1, &mut warnings).unwrap();
        assert_eq!(months.len(), 2);
        // 非数值 inspected 按 0 => dpu 0
        assert_eq!(months[0].stages[0].inspected, 0);
        assert_eq!(months[0].stages[0].dpu, 0.0);
    }

    #[test]
    fn test_解码_dpu偏差记警告不拒绝() {
        let csv = "\
DATE,SIP1 INSPECTED,SIP1 FAULTS,SIP1 DPU
Jan-25,100,50,2.00
";
        let mut warnings = Vec::new();
        let months = decode_wide_csv(csv, 0.1, &mut warnings).unwrap();
        assert_eq!(months.len(), 1);
        assert_eq!(warnings.len(), 1);
        // 落库值始终为重算口径
        assert_eq!(months[0].stages[0].dpu, 0.5);
    }

    #[test]
    fn test_解码_千分位逗号() {
        let csv = "\
DATE,SIP1 INSPECTED,SIP1 FAULTS,SIP1 DPU
Jan-25,\"24,446\",\"28,460\",1.16
";
        let mut warnings = Vec::new();
        let months = decode_wide_csv(csv, 0.1, &mut warnings).unwrap();
        assert_eq!(months[0].stages[0].inspected, 24446);
        assert_eq!(months[0].stages[0].faults, 28460);
    }
}
