//! 场景注册表
//!
//! 启动时构建一次：先加载内置场景，再叠加用户目录中的 `*.json`，
//! 同一 `scenario_type` 以后加载者为准。构建完成后只读，通过 `Arc` 在请求间共享。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use synth_shared::config::LimitsConfig;

use super::builtin::BUILTIN_SCENARIOS;
use super::model::{Scenario, ScenarioFile, ScenarioSource};
use super::validation::{ScenarioError, check_compatibility, current_version, load_scenario_file, validate};

/// 请求处理所需的场景参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub batch_size: usize,
    pub record_mode: bool,
    pub max_count: u64,
    pub default_count: u64,
}

/// 被跳过的场景文件
#[derive(Debug)]
pub struct SkippedScenario {
    pub origin: String,
    pub error: ScenarioError,
}

/// 加载结果汇总
#[derive(Debug, Default)]
pub struct LoadReport {
    pub builtin: usize,
    pub user: usize,
    /// 用户场景覆盖的类型
    pub overridden: Vec<String>,
    pub skipped: Vec<SkippedScenario>,
}

/// 只读场景注册表
#[derive(Debug)]
pub struct ScenarioRegistry {
    scenarios: HashMap<String, Arc<Scenario>>,
    fallback: ScenarioConfig,
}

impl ScenarioRegistry {
    /// 仅包含内置场景
    pub fn builtin(limits: &LimitsConfig) -> Self {
        Self::load(None, limits).0
    }

    /// 加载内置场景并叠加用户目录
    ///
    /// 目录不存在视为空目录；单个文件失败只记录告警，不影响其他文件。
    pub fn load(user_dir: Option<&Path>, limits: &LimitsConfig) -> (Self, LoadReport) {
        let mut registry = Self {
            scenarios: HashMap::new(),
            fallback: ScenarioConfig {
                batch_size: limits.default_batch_size,
                record_mode: false,
                max_count: limits.max_count,
                default_count: limits.default_count,
            },
        };
        let mut report = LoadReport::default();
        let current = current_version();

        for (file_name, json) in BUILTIN_SCENARIOS {
            let result = ScenarioFile::from_json(json)
                .map_err(|source| ScenarioError::Parse {
                    path: PathBuf::from(file_name),
                    source,
                })
                .and_then(|file| validate(file, ScenarioSource::Builtin))
                .and_then(|scenario| {
                    check_compatibility(scenario.metadata.min_version.as_deref(), &current)?;
                    Ok(scenario)
                });

            match result {
                Ok(scenario) => {
                    registry.insert(scenario);
                    report.builtin += 1;
                }
                Err(error) => {
                    warn!(file = %file_name, error = %error, "内置场景无效，已跳过");
                    report.skipped.push(SkippedScenario {
                        origin: file_name.to_string(),
                        error,
                    });
                }
            }
        }

        if let Some(dir) = user_dir {
            for path in scenario_files(dir) {
                match load_scenario_file(&path) {
                    Ok(scenario) => {
                        let scenario_type = scenario.scenario_type.clone();
                        if registry.insert(scenario).is_some() {
                            info!(scenario_type = %scenario_type, path = %path.display(), "用户场景覆盖已有场景");
                            report.overridden.push(scenario_type);
                        }
                        report.user += 1;
                    }
                    Err(error) => {
                        warn!(path = %path.display(), error = %error, "场景文件无效，已跳过");
                        report.skipped.push(SkippedScenario {
                            origin: path.display().to_string(),
                            error,
                        });
                    }
                }
            }
        }

        info!(
            total = registry.len(),
            builtin = report.builtin,
            user = report.user,
            skipped = report.skipped.len(),
            "场景注册表已加载"
        );

        (registry, report)
    }

    fn insert(&mut self, scenario: Scenario) -> Option<Arc<Scenario>> {
        self.scenarios
            .insert(scenario.scenario_type.clone(), Arc::new(scenario))
    }

    /// 按类型查找场景
    pub fn resolve(&self, scenario_type: &str) -> Option<Arc<Scenario>> {
        self.scenarios.get(scenario_type).cloned()
    }

    /// 已知场景类型（按字母排序）
    pub fn list(&self) -> Vec<String> {
        let mut types: Vec<String> = self.scenarios.keys().cloned().collect();
        types.sort();
        types
    }

    /// 全部场景（按类型排序）
    pub fn scenarios(&self) -> Vec<Arc<Scenario>> {
        let mut all: Vec<Arc<Scenario>> = self.scenarios.values().cloned().collect();
        all.sort_by(|a, b| a.scenario_type.cmp(&b.scenario_type));
        all
    }

    /// 请求参数：未知类型使用全局默认值
    pub fn config_for(&self, scenario_type: &str) -> ScenarioConfig {
        self.resolve(scenario_type)
            .map(|s| ScenarioConfig {
                batch_size: s.batch_size,
                record_mode: s.record_mode,
                max_count: s.limits.max_count,
                default_count: s.limits.default_count,
            })
            .unwrap_or(self.fallback)
    }

    /// 未指定场景时的参数
    pub fn default_config(&self) -> ScenarioConfig {
        self.fallback
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// 目录下的 `*.json` 文件，按文件名排序以保证覆盖顺序稳定
fn scenario_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "场景目录不可读，仅使用内置场景");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == "json")
        })
        .collect();
    files.sort();
    files
}
