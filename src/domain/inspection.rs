// ==========================================
// 质检DPU跟踪系统 - 质检领域模型
// ==========================================
// StageRecord: 单工序单月质检记录（叶子数据单元）
// MonthlyInspection: 单月全工序聚合（聚合根）
// 红线: dpu / 各 total 字段均为派生值, 只能由引擎重算, 禁止手工维护
// ==========================================

use crate::domain::types::StageType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// 固定工序集合
// ==========================================

/// 交付前检查工序集合（命中即归类为 Dpdi, 其余为 Production）
pub const DPDI_STAGE_NAMES: [&str; 3] = ["DPDI", "DVAL", "DCONF"];

/// 签出工序名（成品吞吐量口径, SIGN 或 SIGNOUT）
pub const SIGNOUT_STAGE_NAMES: [&str; 2] = ["SIGN", "SIGNOUT"];

/// 默认工序清单（新开年份播种 / 无工序明细的备份回退时使用）
pub const DEFAULT_STAGE_NAMES: [&str; 11] = [
    "SIP1", "SIP2", "SIP3", "SIP4", "SIP5", "SIP6", "CAB", "SIGN", "DPDI", "DVAL", "DCONF",
];

// ==========================================
// StageRecord - 工序质检记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    // ===== 标识 =====
    pub id: String,   // 稳定标识: 工序名小写并去除非字母数字字符, 月内唯一
    pub name: String, // 显示名（惯例全大写, 不强制）

    // ===== 原始计数 =====
    pub inspected: i64, // 检查台数（非负）
    pub faults: i64,    // 故障数（非负）

    // ===== 派生值 =====
    pub dpu: f64, // faults / inspected, 两位小数; inspected == 0 时为 0

    // ===== 分类与排序 =====
    pub stage_type: StageType,  // 工序类型（按固定集合判定）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,     // 导入源的原始列序, 仅用于显示排序
}

impl StageRecord {
    /// 由工序名派生稳定标识: 小写化并去除非字母数字字符
    pub fn derive_id(name: &str) -> String {
        name.to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    }

    /// 由工序名判定工序类型
    pub fn classify(name: &str) -> StageType {
        let upper = name.trim().to_uppercase();
        if DPDI_STAGE_NAMES.contains(&upper.as_str()) {
            StageType::Dpdi
        } else {
            StageType::Production
        }
    }

    /// 是否签出工序（成品吞吐量口径）
    pub fn is_signout(name: &str) -> bool {
        let upper = name.trim().to_uppercase();
        SIGNOUT_STAGE_NAMES.contains(&upper.as_str())
    }

    /// 创建记录（dpu 由计数派生, 不接受外部传入）
    pub fn new(name: &str, inspected: i64, faults: i64) -> Self {
        Self {
            id: Self::derive_id(name),
            name: name.trim().to_string(),
            inspected,
            faults,
            dpu: crate::engine::dpu::compute_stage_dpu(inspected, faults),
            stage_type: Self::classify(name),
            order: None,
        }
    }

    /// 创建带列序的记录（导入路径）
    pub fn with_order(name: &str, inspected: i64, faults: i64, order: i32) -> Self {
        let mut record = Self::new(name, inspected, faults);
        record.order = Some(order);
        record
    }

    /// 创建计数归零的记录（播种路径）
    pub fn zeroed(name: &str) -> Self {
        Self::new(name, 0, 0)
    }
}

// ==========================================
// MonthTotals - 月度汇总（引擎输出）
// ==========================================
// 红线: total_dpu 为各工序 dpu 之和（保留两位小数）,
//       不是 total_faults / total_inspections 的合并口径 —— 这是刻意的领域规则
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthTotals {
    pub total_inspections: i64, // Σ inspected
    pub total_faults: i64,      // Σ faults
    pub total_dpu: f64,         // round2(Σ dpu)
}

// ==========================================
// MonthlyInspection - 月度质检聚合
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyInspection {
    // ===== 标识 =====
    pub id: String,   // month-<标签规范化>, 例: month-jan-25
    pub date: String, // 显示标签, 例: "Jan-25"
    pub year: i32,    // 年份

    // ===== 工序明细（名称月内唯一, 顺序有意义）=====
    pub stages: Vec<StageRecord>,

    // ===== 全口径汇总（派生）=====
    pub total_inspections: i64,
    pub total_faults: i64,
    pub total_dpu: f64,

    // ===== 生产工序口径（派生）=====
    pub production_inspections: i64,
    pub production_faults: i64,
    pub production_dpu: f64,

    // ===== 交检工序口径（派生）=====
    pub dpdi_inspections: i64,
    pub dpdi_faults: i64,
    pub dpdi_dpu: f64,

    // ===== 签出量（派生: SIGN/SIGNOUT 工序的 inspected）=====
    pub signout_volume: i64,

    // ===== 审计字段 =====
    pub updated_at: DateTime<Utc>,
}

impl MonthlyInspection {
    /// 由月份标签派生聚合标识
    ///
    /// 例: "Jan-25" -> "month-jan-25"
    pub fn derive_id(date_label: &str) -> String {
        let normalized: String = date_label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        format!("month-{}", normalized.trim_matches('-'))
    }

    /// 创建空月份（汇总全零, 由调用方填充 stages 后重算）
    pub fn empty(date_label: &str, year: i32) -> Self {
        Self {
            id: Self::derive_id(date_label),
            date: date_label.trim().to_string(),
            year,
            stages: Vec::new(),
            total_inspections: 0,
            total_faults: 0,
            total_dpu: 0.0,
            production_inspections: 0,
            production_faults: 0,
            production_dpu: 0.0,
            dpdi_inspections: 0,
            dpdi_faults: 0,
            dpdi_dpu: 0.0,
            signout_volume: 0,
            updated_at: Utc::now(),
        }
    }

    /// 按显示序返回工序: 有 order 的升序在前, 无 order 的按出现序在后
    pub fn stages_in_display_order(&self) -> Vec<&StageRecord> {
        let mut ordered: Vec<&StageRecord> =
            self.stages.iter().filter(|s| s.order.is_some()).collect();
        ordered.sort_by_key(|s| s.order);
        ordered.extend(self.stages.iter().filter(|s| s.order.is_none()));
        ordered
    }

    /// 按工序名查找（忽略大小写）
    pub fn find_stage(&self, name: &str) -> Option<&StageRecord> {
        let upper = name.trim().to_uppercase();
        self.stages.iter().find(|s| s.name.to_uppercase() == upper)
    }
}

// ==========================================
// 月份标签解析
// ==========================================

/// 从 "Jan-25" / "JAN-25" 形式的标签解析年份
///
/// 支持两位年（2000 基准）与四位年; 解析失败返回 None
pub fn parse_year_from_label(label: &str) -> Option<i32> {
    let trimmed = label.trim();
    let (_, year_part) = trimmed.rsplit_once('-')?;
    let digits: String = year_part.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        2 => digits.parse::<i32>().ok().map(|y| 2000 + y),
        4 => digits.parse::<i32>().ok(),
        _ => None,
    }
}

/// 从标签解析月序（1-12）, 用于同年内排序; 无法识别返回 None
pub fn parse_month_from_label(label: &str) -> Option<u32> {
    let prefix = label.trim().split('-').next()?.to_uppercase();
    match prefix.as_str() {
        "JAN" => Some(1),
        "FEB" => Some(2),
        "MAR" => Some(3),
        "APR" => Some(4),
        "MAY" => Some(5),
        "JUN" => Some(6),
        "JUL" => Some(7),
        "AUG" => Some(8),
        "SEP" => Some(9),
        "OCT" => Some(10),
        "NOV" => Some(11),
        "DEC" => Some(12),
        _ => None,
    }
}

/// 月份时间序排序键: (year, month), 无法识别的月序排在年内末尾
pub fn month_sort_key(m: &MonthlyInspection) -> (i32, u32) {
    (m.year, parse_month_from_label(&m.date).unwrap_or(13))
}
