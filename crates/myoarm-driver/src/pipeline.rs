//! 接收循环与节拍循环
//!
//! 设备端的接收中断在这里是后台线程：每收到一个字节喂一次解析器，
//! 字节在单条链路内严格按到达顺序处理；跨链路（ADC 节拍、舵机总线、
//! 陀螺仪）之间没有顺序保证 —— 正确性依赖每个状态机自含、可复位，
//! 而不是全局时序。
//!
//! 节拍循环用 `spin_sleep` 维持基准周期，三路定时从同一基准分频。

use crate::sampler::{AdcSource, SampleDispatcher, TimerId};
use crate::state::{ArmContext, SharedGyroParser, SharedServoParser};
use myoarm_serial::SerialAdapter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{trace, warn};

/// 节拍配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickConfig {
    /// 基准节拍周期（模拟量采样，2 kHz）
    pub analog_period: Duration,
    /// 舵机清理分频（100 Hz = 基准 / 20）
    pub servo_clear_divisor: u32,
    /// 运动量分频（20 Hz = 基准 / 100）
    pub motion_divisor: u32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            analog_period: Duration::from_micros(500),
            servo_clear_divisor: 20,
            motion_divisor: 100,
        }
    }
}

/// 空总线时接收循环的退避间隔，避免 mock/无数据场景空转
const RX_IDLE_BACKOFF: Duration = Duration::from_micros(200);

/// 舵机总线接收循环
///
/// 单字节读取，逐字节喂给共享解析器。超时是安静总线的正常瞬态；
/// 其他传输错误记录后退出循环。
pub fn servo_rx_loop(
    mut adapter: impl SerialAdapter,
    parser: SharedServoParser,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Acquire) {
        match adapter.try_recv_byte() {
            Ok(Some(byte)) => {
                let feed = parser.lock().feed_byte(byte);
                trace!(byte, ?feed, "servo rx byte");
            }
            Ok(None) => spin_sleep::sleep(RX_IDLE_BACKOFF),
            Err(e) => {
                warn!(error = %e, "servo rx loop terminated");
                break;
            }
        }
    }
}

/// 陀螺仪接收循环
pub fn gyro_rx_loop(
    mut adapter: impl SerialAdapter,
    parser: SharedGyroParser,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Acquire) {
        match adapter.try_recv_byte() {
            Ok(Some(byte)) => {
                parser.lock().feed_byte(byte);
            }
            Ok(None) => spin_sleep::sleep(RX_IDLE_BACKOFF),
            Err(e) => {
                warn!(error = %e, "gyro rx loop terminated");
                break;
            }
        }
    }
}

/// 上位机方向接收循环（虚拟串口应答通道）
pub fn host_rx_loop(
    mut adapter: impl SerialAdapter,
    ctx: Arc<ArmContext>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Acquire) {
        match adapter.try_recv_byte() {
            Ok(Some(byte)) => crate::host_link::handle_host_byte(&ctx, byte),
            Ok(None) => spin_sleep::sleep(RX_IDLE_BACKOFF),
            Err(e) => {
                warn!(error = %e, "host rx loop terminated");
                break;
            }
        }
    }
}

/// 节拍循环
///
/// 每个基准周期触发一次模拟量节拍，按分频触发舵机清理与运动量节拍。
/// 单次节拍失败记录后继续 —— 节拍循环不因瞬时错误退出。
pub fn tick_loop<S: AdcSource, H: SerialAdapter>(
    mut dispatcher: SampleDispatcher<S, H>,
    config: TickConfig,
    running: Arc<AtomicBool>,
) {
    let mut tick: u64 = 0;

    while running.load(Ordering::Acquire) {
        tick = tick.wrapping_add(1);

        if let Err(e) = dispatcher.on_tick(TimerId::AnalogSample) {
            warn!(error = %e, "analog tick failed");
        }
        if tick % config.servo_clear_divisor as u64 == 0
            && let Err(e) = dispatcher.on_tick(TimerId::ServoRxClear)
        {
            warn!(error = %e, "servo clear tick failed");
        }
        if tick % config.motion_divisor as u64 == 0
            && let Err(e) = dispatcher.on_tick(TimerId::MotionSample)
        {
            warn!(error = %e, "motion tick failed");
        }

        spin_sleep::sleep(config.analog_period);
    }
}
