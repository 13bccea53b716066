//! 延迟引擎
//!
//! 根据 (策略, 基础延迟, 命名行为, 记录序号) 计算每条记录前的等待时长，
//! 并提供可被客户端断开打断的等待。

use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::sync::watch;

use crate::scenarios::{DelayStrategy, Scenario, ScenarioBehavior};

const PEAK_HOURS_DELAY: Duration = Duration::from_millis(200);
const MAINTENANCE_DELAY: Duration = Duration::from_millis(500);
const MAINTENANCE_SPIKE: Duration = Duration::from_secs(2);
const MAINTENANCE_SPIKE_EVERY: u64 = 500;
const NETWORK_GLITCH_PROBABILITY: f64 = 0.1;
const NETWORK_GLITCH_MAX: Duration = Duration::from_secs(3);
const DATABASE_LOAD_STEP_ITEMS: u64 = 100;
const STEP_MILLIS: u64 = 10;
const BURST_EVERY: u64 = 100;
const BURST_FACTOR: u32 = 10;
const BURST_MIN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DelayError {
    #[error("请求已取消")]
    Cancelled,
}

// ============================================================================
// 取消信号
// ============================================================================

/// 请求取消信号（只读端）
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// 请求取消句柄（写端）
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// 创建一对取消句柄与信号
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// 转为释放时自动取消的守卫
    ///
    /// handler future 被丢弃（客户端断开）时，守卫随之释放并触发取消。
    pub fn drop_guard(self) -> CancelGuard {
        CancelGuard { handle: self }
    }
}

/// 释放时触发取消
#[derive(Debug)]
pub struct CancelGuard {
    handle: CancelHandle,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待取消；写端已释放且未取消时永远挂起
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ============================================================================
// 延迟计划
// ============================================================================

/// 单个请求的延迟计划
///
/// 命名行为优先于通用策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPlan {
    pub strategy: DelayStrategy,
    pub base: Duration,
    pub behavior: Option<ScenarioBehavior>,
}

impl DelayPlan {
    pub fn new(strategy: DelayStrategy, base: Duration, behavior: Option<ScenarioBehavior>) -> Self {
        Self {
            strategy,
            base,
            behavior,
        }
    }

    /// 无任何等待
    pub fn none() -> Self {
        Self::new(DelayStrategy::None, Duration::ZERO, None)
    }

    pub fn from_scenario(scenario: &Scenario) -> Self {
        Self::new(scenario.delay_strategy, scenario.base_delay, scenario.behavior)
    }

    /// 计算第 `index` 条记录前的等待时长
    pub fn compute(&self, index: u64) -> Duration {
        self.compute_with(index, &mut rand::rng())
    }

    pub fn compute_with<R: Rng + ?Sized>(&self, index: u64, rng: &mut R) -> Duration {
        if let Some(behavior) = self.behavior {
            return match behavior {
                ScenarioBehavior::PeakHours => PEAK_HOURS_DELAY,
                ScenarioBehavior::Maintenance => {
                    if index % MAINTENANCE_SPIKE_EVERY == 0 {
                        MAINTENANCE_SPIKE
                    } else {
                        MAINTENANCE_DELAY
                    }
                }
                ScenarioBehavior::NetworkIssues => {
                    if rng.random_bool(NETWORK_GLITCH_PROBABILITY) {
                        uniform_up_to(NETWORK_GLITCH_MAX, rng)
                    } else {
                        self.base
                    }
                }
                ScenarioBehavior::DatabaseLoad => self
                    .base
                    .saturating_add(step_delay(index / DATABASE_LOAD_STEP_ITEMS)),
            };
        }

        match self.strategy {
            DelayStrategy::None => Duration::ZERO,
            DelayStrategy::Fixed => self.base,
            DelayStrategy::Random => uniform_up_to(self.base, rng),
            DelayStrategy::Progressive => self.base.saturating_add(step_delay(index)),
            DelayStrategy::Burst => {
                if index % BURST_EVERY == 0 {
                    self.base.saturating_mul(BURST_FACTOR).max(BURST_MIN)
                } else {
                    self.base
                }
            }
        }
    }
}

fn step_delay(steps: u64) -> Duration {
    Duration::from_millis(steps.saturating_mul(STEP_MILLIS))
}

fn uniform_up_to<R: Rng + ?Sized>(max: Duration, rng: &mut R) -> Duration {
    let max_nanos = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
    if max_nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rng.random_range(0..=max_nanos))
}

// ============================================================================
// 可中断等待
// ============================================================================

/// 等待指定时长，期间取消则立即返回 [`DelayError::Cancelled`]
pub async fn wait(duration: Duration, cancel: &CancelSignal) -> Result<(), DelayError> {
    if cancel.is_cancelled() {
        return Err(DelayError::Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }

    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(DelayError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// 计算并执行第 `index` 条记录的延迟，返回实际等待时长
pub async fn delay(
    plan: &DelayPlan,
    index: u64,
    cancel: &CancelSignal,
) -> Result<Duration, DelayError> {
    let duration = plan.compute(index);
    wait(duration, cancel).await?;
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tokio::time::Instant;

    fn named(behavior: ScenarioBehavior, base_ms: u64) -> DelayPlan {
        DelayPlan::new(
            DelayStrategy::Fixed,
            Duration::from_millis(base_ms),
            Some(behavior),
        )
    }

    fn strategy(strategy: DelayStrategy, base_ms: u64) -> DelayPlan {
        DelayPlan::new(strategy, Duration::from_millis(base_ms), None)
    }

    #[test]
    fn test_named_behavior_overrides_strategy() {
        let plan = DelayPlan::new(
            DelayStrategy::None,
            Duration::from_secs(5),
            Some(ScenarioBehavior::PeakHours),
        );
        assert_eq!(plan.compute(1), Duration::from_millis(200));
        assert_eq!(plan.compute(1_000_000), Duration::from_millis(200));
    }

    #[test]
    fn test_maintenance_spikes() {
        let plan = named(ScenarioBehavior::Maintenance, 0);
        assert_eq!(plan.compute(0), Duration::from_secs(2));
        assert_eq!(plan.compute(500), Duration::from_secs(2));
        assert_eq!(plan.compute(999), Duration::from_millis(500));
        assert_eq!(plan.compute(1000), Duration::from_secs(2));
    }

    #[test]
    fn test_database_load_monotonic() {
        let plan = named(ScenarioBehavior::DatabaseLoad, 50);
        assert_eq!(plan.compute(99), Duration::from_millis(50));
        assert_eq!(plan.compute(100), Duration::from_millis(60));
        assert_eq!(plan.compute(1234), Duration::from_millis(170));

        let mut previous = Duration::ZERO;
        for index in 0..5_000 {
            let current = plan.compute(index);
            assert!(current >= previous, "index {index} 延迟下降");
            previous = current;
        }
    }

    #[test]
    fn test_network_issues_bounded() {
        let plan = named(ScenarioBehavior::NetworkIssues, 100);
        let mut rng = StdRng::seed_from_u64(7);
        let mut glitches = 0;
        for index in 0..2_000 {
            let d = plan.compute_with(index, &mut rng);
            assert!(d <= Duration::from_secs(3));
            if d != Duration::from_millis(100) {
                glitches += 1;
            }
        }
        // 约 10% 的概率，允许较大浮动
        assert!(glitches > 50 && glitches < 400, "glitches = {glitches}");
    }

    #[test]
    fn test_generic_strategies() {
        assert_eq!(strategy(DelayStrategy::None, 300).compute(3), Duration::ZERO);
        assert_eq!(
            strategy(DelayStrategy::Fixed, 300).compute(3),
            Duration::from_millis(300)
        );
        assert_eq!(
            strategy(DelayStrategy::Progressive, 100).compute(5),
            Duration::from_millis(150)
        );

        let burst = strategy(DelayStrategy::Burst, 20);
        assert_eq!(burst.compute(99), Duration::from_millis(20));
        assert_eq!(burst.compute(100), Duration::from_secs(1));
        assert_eq!(
            strategy(DelayStrategy::Burst, 300).compute(200),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_random_within_base() {
        let plan = strategy(DelayStrategy::Random, 40);
        let mut rng = StdRng::seed_from_u64(42);
        for index in 0..1_000 {
            assert!(plan.compute_with(index, &mut rng) <= Duration::from_millis(40));
        }
        assert_eq!(strategy(DelayStrategy::Random, 0).compute(1), Duration::ZERO);
    }

    #[test]
    fn test_progressive_saturates() {
        let plan = DelayPlan::new(DelayStrategy::Progressive, Duration::MAX, None);
        assert_eq!(plan.compute(u64::MAX), Duration::MAX);
    }

    #[tokio::test]
    async fn test_zero_wait_returns_immediately() {
        let (_handle, signal) = cancel_pair();
        assert_eq!(wait(Duration::ZERO, &signal).await, Ok(()));
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        assert_eq!(wait(Duration::ZERO, &signal).await, Err(DelayError::Cancelled));
        assert_eq!(
            wait(Duration::from_secs(60), &signal).await,
            Err(DelayError::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_wait() {
        let (handle, signal) = cancel_pair();
        let started = Instant::now();
        let task = tokio::spawn(async move { wait(Duration::from_secs(10), &signal).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();

        assert_eq!(task.await.unwrap(), Err(DelayError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_uncancelled_signal_completes_wait() {
        let (_handle, signal) = cancel_pair();
        let started = Instant::now();
        assert_eq!(wait(Duration::from_millis(250), &signal).await, Ok(()));
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_returns_waited_duration() {
        let plan = named(ScenarioBehavior::PeakHours, 0);
        let (_handle, signal) = cancel_pair();
        let waited = delay(&plan, 1, &signal).await.unwrap();
        assert_eq!(waited, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_guard_cancels_pending_wait() {
        let (handle, signal) = cancel_pair();
        let guard = handle.drop_guard();
        let started = Instant::now();
        let task = tokio::spawn(async move { wait(Duration::from_secs(10), &signal).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(guard);

        assert_eq!(task.await.unwrap(), Err(DelayError::Cancelled));
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
