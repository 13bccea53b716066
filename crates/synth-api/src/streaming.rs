//! 流式输出
//!
//! 以分块传输逐条输出一个 JSON 数组，不在内存中物化完整结果集。
//!
//! 生产端运行在独立任务中，通过有界 channel 把分块交给响应体；
//! 响应体被丢弃（客户端断开）时 channel 关闭，生产端在当前等待处立即停止。

use std::io;
use std::time::Duration;

use axum::body::Body;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use synth_shared::observability::metrics;

use crate::delay::{self, CancelSignal, DelayError, DelayPlan, cancel_pair};
use crate::generators::RecordGenerator;

/// channel 中最多缓存的分块数
const CHANNEL_CAPACITY: usize = 16;

pub type Chunk = Result<Bytes, io::Error>;

/// 单次流式请求的执行计划
#[derive(Debug, Clone)]
pub struct StreamPlan {
    /// 场景标签（日志与指标）
    pub scenario: String,
    pub count: u64,
    pub batch_size: usize,
    pub delay: DelayPlan,
    pub generator: RecordGenerator,
    /// 启用性能监控时的进度日志间隔
    pub monitor_interval: Option<Duration>,
}

/// 流式输出结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { items: u64 },
    Cancelled { items: u64 },
    Failed { items: u64, error: String },
}

impl StreamOutcome {
    pub fn items(&self) -> u64 {
        match self {
            Self::Completed { items } | Self::Cancelled { items } | Self::Failed { items, .. } => {
                *items
            }
        }
    }
}

/// 启动生产任务并返回 axum 响应体
pub fn into_body(plan: StreamPlan) -> Body {
    let (rx, _task) = spawn_stream(plan);
    Body::from_stream(ReceiverStream::new(rx))
}

/// 启动生产任务，返回分块接收端与任务句柄
pub fn spawn_stream(plan: StreamPlan) -> (mpsc::Receiver<Chunk>, JoinHandle<StreamOutcome>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(async move { run(plan, tx).await });
    (rx, task)
}

async fn run(plan: StreamPlan, tx: mpsc::Sender<Chunk>) -> StreamOutcome {
    let (handle, signal) = cancel_pair();
    let started = Instant::now();

    let outcome = {
        let emitting = emit(&plan, &tx, &signal);
        tokio::pin!(emitting);

        tokio::select! {
            biased;

            outcome = &mut emitting => outcome,
            _ = tx.closed() => {
                handle.cancel();
                emitting.await
            }
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    metrics::record_stream_items(&plan.scenario, outcome.items());
    match &outcome {
        StreamOutcome::Completed { items } => {
            info!(
                scenario = %plan.scenario,
                items = items,
                elapsed_ms = elapsed_ms,
                "流式响应完成"
            );
        }
        StreamOutcome::Cancelled { items } => {
            metrics::record_stream_cancelled(&plan.scenario);
            debug!(
                scenario = %plan.scenario,
                items = items,
                requested = plan.count,
                elapsed_ms = elapsed_ms,
                "客户端断开，流式响应已停止"
            );
        }
        StreamOutcome::Failed { items, error } => {
            warn!(
                scenario = %plan.scenario,
                items = items,
                error = %error,
                "流式响应异常中止"
            );
        }
    }

    outcome
}

/// 逐条生成并发送数组元素
///
/// 每 `batch_size` 条刷新一次缓冲区；发送失败或收到取消信号时立即停止。
pub async fn emit(
    plan: &StreamPlan,
    tx: &mpsc::Sender<Chunk>,
    cancel: &CancelSignal,
) -> StreamOutcome {
    let batch_size = plan.batch_size.max(1) as u64;
    let mut emitted: u64 = 0;
    let mut buffer: Vec<u8> = Vec::with_capacity(256);
    let mut monitor = plan.monitor_interval.map(ProgressMonitor::new);

    if tx.send(Ok(Bytes::from_static(b"["))).await.is_err() {
        return StreamOutcome::Cancelled { items: 0 };
    }

    for index in 1..=plan.count {
        if let Err(DelayError::Cancelled) = delay::delay(&plan.delay, index, cancel).await {
            return StreamOutcome::Cancelled { items: emitted };
        }

        let record = plan.generator.generate(index);
        if index > 1 {
            buffer.push(b',');
        }
        if let Err(e) = serde_json::to_writer(&mut buffer, &record) {
            let error = e.to_string();
            let _ = tx
                .send(Err(io::Error::new(io::ErrorKind::InvalidData, e)))
                .await;
            return StreamOutcome::Failed {
                items: emitted,
                error,
            };
        }
        emitted += 1;

        if emitted % batch_size == 0 && emitted < plan.count {
            debug!(scenario = %plan.scenario, items = emitted, "刷新批次");
            if tx.send(Ok(Bytes::from(std::mem::take(&mut buffer)))).await.is_err() {
                return StreamOutcome::Cancelled { items: emitted };
            }
        }

        if let Some(monitor) = monitor.as_mut() {
            monitor.tick(&plan.scenario, emitted);
        }
    }

    buffer.push(b']');
    if tx.send(Ok(Bytes::from(buffer))).await.is_err() {
        return StreamOutcome::Cancelled { items: emitted };
    }

    StreamOutcome::Completed { items: emitted }
}

/// 性能监控：按间隔输出进度日志
struct ProgressMonitor {
    interval: Duration,
    started: Instant,
    last_report: Instant,
}

impl ProgressMonitor {
    fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            started: now,
            last_report: now,
        }
    }

    /// 距上次输出满一个间隔时记录进度，返回是否输出
    fn tick(&mut self, scenario: &str, items: u64) -> bool {
        if self.last_report.elapsed() < self.interval {
            return false;
        }
        self.last_report = Instant::now();

        let elapsed = self.started.elapsed();
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { items as f64 / secs } else { 0.0 };
        info!(
            scenario = %scenario,
            items = items,
            elapsed_ms = elapsed.as_millis() as u64,
            items_per_sec = format!("{:.1}", rate),
            "流式输出进度"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::DelayStrategy;

    fn plan(count: u64, batch_size: usize, delay: DelayPlan) -> StreamPlan {
        StreamPlan {
            scenario: "test".to_string(),
            count,
            batch_size,
            delay,
            generator: RecordGenerator::default(),
            monitor_interval: None,
        }
    }

    async fn collect(mut rx: mpsc::Receiver<Chunk>) -> Vec<String> {
        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(String::from_utf8(chunk.unwrap().to_vec()).unwrap());
        }
        chunks
    }

    #[tokio::test]
    async fn test_single_item_array() {
        let (rx, task) = spawn_stream(plan(1, 100, DelayPlan::none()));
        let body = collect(rx).await.concat();

        let items: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], 1);
        assert_eq!(task.await.unwrap(), StreamOutcome::Completed { items: 1 });
    }

    #[tokio::test]
    async fn test_flushes_every_batch() {
        let (rx, task) = spawn_stream(plan(5, 2, DelayPlan::none()));
        let chunks = collect(rx).await;

        // "[" + 两个完整批次 + 剩余一条与结尾
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], "[");
        assert!(!chunks[1].starts_with(','));
        assert!(chunks[2].starts_with(','));
        assert!(chunks[3].ends_with(']'));

        let items: Vec<serde_json::Value> = serde_json::from_str(&chunks.concat()).unwrap();
        let ids: Vec<u64> = items.iter().map(|v| v["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(task.await.unwrap(), StreamOutcome::Completed { items: 5 });
    }

    #[tokio::test]
    async fn test_exact_batch_multiple_has_no_empty_chunk() {
        let (rx, _task) = spawn_stream(plan(4, 2, DelayPlan::none()));
        let chunks = collect(rx).await;
        assert!(chunks.iter().all(|c| !c.is_empty()));
        let items: Vec<serde_json::Value> = serde_json::from_str(&chunks.concat()).unwrap();
        assert_eq!(items.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_promptly() {
        let delay = DelayPlan::new(DelayStrategy::Fixed, Duration::from_millis(100), None);
        let (mut rx, task) = spawn_stream(plan(1_000, 1, delay));

        assert_eq!(rx.recv().await.unwrap().unwrap(), Bytes::from_static(b"["));
        rx.recv().await.unwrap().unwrap();
        rx.recv().await.unwrap().unwrap();
        let disconnected = Instant::now();
        drop(rx);

        match task.await.unwrap() {
            StreamOutcome::Cancelled { items } => assert!(items <= 3, "items = {items}"),
            other => panic!("预期取消，实际为 {other:?}"),
        }
        // 断开后最多再经过一个延迟间隔
        let stopped_after = disconnected.elapsed();
        assert!(stopped_after <= Duration::from_millis(100), "{stopped_after:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_signal_interrupts_emit() {
        let delay = DelayPlan::new(DelayStrategy::Fixed, Duration::from_secs(30), None);
        let stream_plan = plan(10, 1, delay);
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (handle, signal) = cancel_pair();

        let task = tokio::spawn(async move { emit(&stream_plan, &tx, &signal).await });
        rx.recv().await.unwrap().unwrap();
        handle.cancel();

        assert_eq!(task.await.unwrap(), StreamOutcome::Cancelled { items: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_monitor_reports_once_per_interval() {
        let mut monitor = ProgressMonitor::new(Duration::from_secs(1));
        assert!(!monitor.tick("test", 1));

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!monitor.tick("test", 5));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(monitor.tick("test", 10));
        assert!(!monitor.tick("test", 11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_with_monitoring_enabled() {
        let delay = DelayPlan::new(DelayStrategy::Fixed, Duration::from_millis(600), None);
        let mut stream_plan = plan(3, 1, delay);
        stream_plan.monitor_interval = Some(Duration::from_secs(1));
        let (rx, task) = spawn_stream(stream_plan);

        let items: Vec<serde_json::Value> =
            serde_json::from_str(&collect(rx).await.concat()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(task.await.unwrap(), StreamOutcome::Completed { items: 3 });
    }

    #[tokio::test]
    async fn test_servicenow_records_in_stream() {
        let mut stream_plan = plan(3, 10, DelayPlan::none());
        stream_plan.generator =
            RecordGenerator::new(true, crate::scenarios::ServiceNowConfig::default());
        let (rx, _task) = spawn_stream(stream_plan);

        let items: Vec<serde_json::Value> =
            serde_json::from_str(&collect(rx).await.concat()).unwrap();
        assert_eq!(items[2]["number"], "INC0000003");
    }
}
