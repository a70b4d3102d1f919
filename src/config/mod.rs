// ==========================================
// 质检DPU跟踪系统 - 配置层
// ==========================================

pub mod config_manager;

pub use config_manager::ConfigManager;
