// ==========================================
// 珠宝维修定价系统 - 操作日志数据仓储
// ==========================================
// 红线: 所有定价写入必须记录
// ==========================================

mod core;
mod queries;


pub use core::ActionLogRepository;
