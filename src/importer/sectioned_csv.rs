// ==========================================
// 质检DPU跟踪系统 - 分节CSV解码器
// ==========================================
// 格式: 多节导出文件, 以 "DETAILED STAGE DATA" 标记行定位明细节,
//       下一行为表头, 遇终止关键字行或空行停止消费
// 实现: 抽取明细节文本后复用宽表解码器
// ==========================================

use crate::domain::inspection::MonthlyInspection;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::wide_csv::decode_wide_csv;

/// 明细节标记行
pub const SECTION_MARKER: &str = "DETAILED STAGE DATA";

/// 明细节终止关键字（命中任一即停止）
pub const SECTION_TERMINATORS: [&str; 3] = ["STAGE ANALYSIS", "METADATA", "SUMMARY"];

/// 判断文本是否为分节CSV
pub fn is_sectioned(raw: &str) -> bool {
    raw.lines()
        .any(|line| line.to_uppercase().contains(SECTION_MARKER))
}

/// 抽取明细节文本（表头行 + 数据行）
///
/// # 规则
/// - 标记行之后的第一行为表头
/// - 首个含终止关键字的行或空行之前为数据行
fn extract_section(raw: &str) -> ImportResult<String> {
    let mut lines = raw.lines();

    // 定位标记行
    for line in lines.by_ref() {
        if line.to_uppercase().contains(SECTION_MARKER) {
            break;
        }
    }

    let header = lines.next().ok_or_else(|| {
        ImportError::structural("分节CSV: DETAILED STAGE DATA 标记之后没有表头行")
    })?;

    let mut section = vec![header.to_string()];
    for line in lines {
        let upper = line.to_uppercase();
        if line.trim().is_empty() || SECTION_TERMINATORS.iter().any(|t| upper.contains(t)) {
            break;
        }
        section.push(line.to_string());
    }

    Ok(section.join("\n"))
}

/// 解码分节CSV文本
///
/// 缺月份值的行由宽表解码器的 DATE 空值规则排除
pub fn decode_sectioned_csv(
    raw: &str,
    dpu_tolerance: f64,
    warnings: &mut Vec<String>,
) -> ImportResult<Vec<MonthlyInspection>> {
    let section = extract_section(raw)?;
    decode_wide_csv(&section, dpu_tolerance, warnings)
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    const SECTIONED: &str = "\
DPU EXPORT,v2,,
SUMMARY TOTALS,,,
Year,2025,,

DETAILED STAGE DATA,,,
DATE,SIP1 INSPECTED,SIP1 FAULTS,SIP1 DPU
Jan-25,100,70,0.70
Feb-25,200,100,0.50
STAGE ANALYSIS,,,
SIP1,improving,,
";

    #[test]
    fn test_识别分节格式() {
        assert!(is_sectioned(SECTIONED));
        assert!(!is_sectioned("DATE,SIP1 INSPECTED\nJan-25,1\n"));
    }

    #[test]
    fn test_抽取明细节并解码() {
        let mut warnings = Vec::new();
        let months = decode_sectioned_csv(SECTIONED, 0.1, &mut warnings).unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].date, "Jan-25");
        assert_eq!(months[1].stages[0].dpu, 0.5);
    }

    #[test]
    fn test_空行终止() {
        let raw = "\
DETAILED STAGE DATA
DATE,SIP1 INSPECTED,SIP1 FAULTS,SIP1 DPU
Jan-25,100,70,0.70

Feb-25,200,100,0.50
";
        let mut warnings = Vec::new();
        let months = decode_sectioned_csv(raw, 0.1, &mut warnings).unwrap();
        assert_eq!(months.len(), 1, "空行之后的数据不应被消费");
    }

    #[test]
    fn test_标记后无表头为结构错误() {
        let raw = "DETAILED STAGE DATA";
        let mut warnings = Vec::new();
        assert!(decode_sectioned_csv(raw, 0.1, &mut warnings).is_err());
    }
}
