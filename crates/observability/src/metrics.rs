//! 缓冲区指标收集模块
//!
//! 基于 `FlushReport` 收集和统计批处理缓冲区的运行指标。

use std::collections::BTreeMap;

use contracts::FlushReport;
use metrics::{counter, gauge, histogram};

/// 从 FlushReport 记录指标
///
/// 每个批次处理完成后调用一次。
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use contracts::{FlushOutcome, FlushReason, FlushReport};
/// use observability::metrics::record_flush_metrics;
///
/// let report = FlushReport {
///     label: "orders".to_string(),
///     batch_seq: 1,
///     reason: FlushReason::Capacity,
///     items: 32,
///     weight: 4096,
///     latency: Duration::from_millis(8),
///     outcome: FlushOutcome::Success,
/// };
/// record_flush_metrics(&report);
/// ```
pub fn record_flush_metrics(report: &FlushReport) {
    let buffer = report.label.clone();

    counter!(
        "buffered_batches_total",
        "buffer" => buffer.clone(),
        "reason" => report.reason.as_str(),
        "outcome" => report.outcome.as_str()
    )
    .increment(1);

    if report.outcome.is_success() {
        counter!("buffered_items_flushed_total", "buffer" => buffer.clone())
            .increment(report.items as u64);
    } else {
        counter!("buffered_items_failed_total", "buffer" => buffer.clone())
            .increment(report.items as u64);
    }

    histogram!("buffered_batch_size", "buffer" => buffer.clone()).record(report.items as f64);
    histogram!("buffered_batch_weight", "buffer" => buffer.clone()).record(report.weight as f64);
    histogram!("buffered_flush_latency_ms", "buffer" => buffer)
        .record(report.latency.as_secs_f64() * 1000.0);
}

/// 记录一次成功提交
pub fn record_item_submitted(label: &str) {
    counter!("buffered_items_submitted_total", "buffer" => label.to_string()).increment(1);
}

/// 记录队列深度（条数与累计权重）
pub fn record_queue_depth(label: &str, len: usize, weight: usize) {
    gauge!("buffered_queue_len", "buffer" => label.to_string()).set(len as f64);
    gauge!("buffered_queue_weight", "buffer" => label.to_string()).set(weight as f64);
}

/// 批次指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FlushStatsAggregator {
    /// 总批次数
    pub total_batches: u64,

    /// 总条目数
    pub total_items: u64,

    /// 失败批次数
    pub failed_batches: u64,

    /// 失败条目数
    pub failed_items: u64,

    /// 各触发原因的批次数
    pub by_reason: BTreeMap<String, u64>,

    /// 批大小统计
    pub batch_size_stats: RunningStats,

    /// 批权重统计
    pub batch_weight_stats: RunningStats,

    /// 处理延迟统计 (毫秒)
    pub latency_stats: RunningStats,
}

impl FlushStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, report: &FlushReport) {
        self.total_batches += 1;
        self.total_items += report.items as u64;

        if !report.outcome.is_success() {
            self.failed_batches += 1;
            self.failed_items += report.items as u64;
        }

        *self
            .by_reason
            .entry(report.reason.as_str().to_string())
            .or_insert(0) += 1;

        self.batch_size_stats.push(report.items as f64);
        self.batch_weight_stats.push(report.weight as f64);
        self.latency_stats
            .push(report.latency.as_secs_f64() * 1000.0);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> FlushSummary {
        FlushSummary {
            total_batches: self.total_batches,
            total_items: self.total_items,
            failed_batches: self.failed_batches,
            failed_items: self.failed_items,
            failure_rate: if self.total_batches > 0 {
                self.failed_batches as f64 / self.total_batches as f64 * 100.0
            } else {
                0.0
            },
            by_reason: self.by_reason.clone(),
            batch_size: StatsSummary::from(&self.batch_size_stats),
            batch_weight: StatsSummary::from(&self.batch_weight_stats),
            flush_latency_ms: StatsSummary::from(&self.latency_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct FlushSummary {
    pub total_batches: u64,
    pub total_items: u64,
    pub failed_batches: u64,
    pub failed_items: u64,
    pub failure_rate: f64,
    pub by_reason: BTreeMap<String, u64>,
    pub batch_size: StatsSummary,
    pub batch_weight: StatsSummary,
    pub flush_latency_ms: StatsSummary,
}

impl std::fmt::Display for FlushSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Flush Summary ===")?;
        writeln!(f, "Total batches: {}", self.total_batches)?;
        writeln!(f, "Total items: {}", self.total_items)?;
        writeln!(
            f,
            "Failed batches: {} ({:.2}%)",
            self.failed_batches, self.failure_rate
        )?;
        writeln!(f, "Failed items: {}", self.failed_items)?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        writeln!(f, "Batch weight: {}", self.batch_weight)?;
        writeln!(f, "Flush latency (ms): {}", self.flush_latency_ms)?;

        if !self.by_reason.is_empty() {
            writeln!(f, "Batches by reason:")?;
            for (reason, count) in &self.by_reason {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
