//! 生成器模块
//!
//! 按全局序号生成合成记录。

pub mod record;

pub use record::{RecordGenerator, ServiceNowFields, SyntheticRecord, generate};
