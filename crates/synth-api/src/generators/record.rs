//! 合成记录生成器
//!
//! 记录只由全局序号（从 1 开始）决定，与交付方式无关：
//! 分页第 2 页（每页 100）与流式第 101-200 条完全相同（时间戳除外）。

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scenarios::ServiceNowConfig;

/// 合成记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticRecord {
    pub id: u64,
    pub value: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub servicenow: Option<ServiceNowFields>,
}

/// ServiceNow 风格附加字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceNowFields {
    /// 32 位十六进制标识
    pub sys_id: String,
    /// 前缀 + 7 位零填充序号，如 `INC0000042`
    pub number: String,
    pub state: String,
    /// 仅在场景显式配置 `record_types` 时输出
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sys_class_name: Option<String>,
}

/// 记录生成器
///
/// 同一请求内共享，`generate` 为纯函数（时间戳除外）。
#[derive(Debug, Clone, Default)]
pub struct RecordGenerator {
    record_mode: bool,
    servicenow: ServiceNowConfig,
}

impl RecordGenerator {
    pub fn new(record_mode: bool, servicenow: ServiceNowConfig) -> Self {
        Self {
            record_mode,
            servicenow,
        }
    }

    pub fn record_mode(&self) -> bool {
        self.record_mode
    }

    pub fn generate(&self, index: u64) -> SyntheticRecord {
        SyntheticRecord {
            id: index,
            value: format!("value_{}", index),
            timestamp: Utc::now(),
            servicenow: self
                .record_mode
                .then(|| servicenow_fields(index, &self.servicenow)),
        }
    }
}

/// 使用默认 ServiceNow 配置生成记录
pub fn generate(index: u64, record_mode: bool) -> SyntheticRecord {
    RecordGenerator::new(record_mode, ServiceNowConfig::default()).generate(index)
}

fn servicenow_fields(index: u64, config: &ServiceNowConfig) -> ServiceNowFields {
    let record_type = match config.record_types.len() {
        0 => None,
        n => Some(config.record_types[(index % n as u64) as usize].clone()),
    };

    ServiceNowFields {
        sys_id: sys_id(index),
        number: format!("{}{:07}", config.number_prefix, index),
        state: config.state_cycle[(index % 4) as usize].clone(),
        sys_class_name: record_type,
    }
}

/// 由序号派生的 128 位十六进制标识
fn sys_id(index: u64) -> String {
    let high = splitmix64(index);
    let low = splitmix64(high ^ index.rotate_left(32));
    format!("{:016x}{:016x}", high, low)
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_timestamp(mut record: SyntheticRecord) -> SyntheticRecord {
        record.timestamp = DateTime::<Utc>::UNIX_EPOCH;
        record
    }

    #[test]
    fn test_plain_record() {
        let record = generate(42, false);
        assert_eq!(record.id, 42);
        assert_eq!(record.value, "value_42");
        assert!(record.servicenow.is_none());

        let json = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 3);
        assert!(json.get("sys_id").is_none());
    }

    #[test]
    fn test_servicenow_record() {
        let record = generate(42, true);
        let fields = record.servicenow.as_ref().unwrap();
        assert_eq!(fields.number, "INC0000042");
        assert_eq!(fields.state, "On Hold");
        assert_eq!(fields.sys_id.len(), 32);
        assert!(fields.sys_id.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(fields.sys_class_name, None);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["number"], "INC0000042");
        assert_eq!(json["id"], 42);
        // 默认形态只有 id/value/timestamp 与 sys_id/number/state
        assert_eq!(json.as_object().unwrap().len(), 6);
        assert!(json.get("sys_class_name").is_none());
    }

    #[test]
    fn test_state_cycles_by_index() {
        let states: Vec<String> = (1..=4)
            .map(|i| generate(i, true).servicenow.unwrap().state)
            .collect();
        assert_eq!(states, vec!["In Progress", "On Hold", "Resolved", "New"]);
    }

    #[test]
    fn test_generation_is_pure_in_index() {
        for index in [1, 2, 101, 999_999] {
            assert_eq!(
                without_timestamp(generate(index, true)),
                without_timestamp(generate(index, true))
            );
        }
        assert_ne!(
            generate(1, true).servicenow.unwrap().sys_id,
            generate(2, true).servicenow.unwrap().sys_id
        );
    }

    #[test]
    fn test_custom_servicenow_config() {
        let generator = RecordGenerator::new(
            true,
            ServiceNowConfig {
                record_types: vec!["change_request".into(), "problem".into()],
                number_prefix: "CHG".into(),
                state_cycle: ["A".into(), "B".into(), "C".into(), "D".into()],
            },
        );
        let fields = generator.generate(7).servicenow.unwrap();
        assert_eq!(fields.number, "CHG0000007");
        assert_eq!(fields.state, "D");
        assert_eq!(fields.sys_class_name.as_deref(), Some("problem"));
    }
}
