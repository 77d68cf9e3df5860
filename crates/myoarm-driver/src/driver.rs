//! 驱动生命周期管理
//!
//! `ArmDriver` 拥有三条接收线程与一条节拍线程，封装共享解析器和
//! 状态上下文。停机顺序：置位停机标志 → 各循环在下一次轮询点退出 →
//! join。线程句柄不对外暴露。

use crate::host_link::HostLink;
use crate::pipeline::{TickConfig, gyro_rx_loop, host_rx_loop, servo_rx_loop, tick_loop};
use crate::sampler::{AdcSource, SampleDispatcher, TelemetryEvent};
use crate::state::{ArmContext, SharedGyroParser, SharedServoParser};
use crossbeam_channel::{Receiver, unbounded};
use myoarm_protocol::{GyroFrameParser, ServoFrameParser};
use myoarm_serial::SerialAdapter;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tracing::{info, warn};

/// 驱动装配件：四条串行链路端点 + ADC 数据源
///
/// 收发同一物理口的两个端点由调用方负责克隆（`PortAdapter::try_clone` /
/// `MockSerialAdapter::clone`）。
pub struct ArmDriverParts {
    /// 舵机总线接收端
    pub servo_rx: Box<dyn SerialAdapter + Send>,
    /// 陀螺仪接收端
    pub gyro_rx: Box<dyn SerialAdapter + Send>,
    /// 上位机应答接收端（虚拟串口）
    pub host_rx: Box<dyn SerialAdapter + Send>,
    /// 上位机遥测发送端
    pub host_tx: Box<dyn SerialAdapter + Send>,
    /// ADC 采集源
    pub adc: Box<dyn AdcSource + Send>,
}

/// 驱动句柄
pub struct ArmDriver {
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    ctx: Arc<ArmContext>,
    servo_parser: SharedServoParser,
    gyro_parser: SharedGyroParser,
    events: Receiver<TelemetryEvent>,
}

impl ArmDriver {
    /// 装配并启动全部后台线程
    pub fn spawn(parts: ArmDriverParts, tick_config: TickConfig) -> Self {
        let ctx = ArmContext::new();
        let servo_parser: SharedServoParser = Arc::new(Mutex::new(ServoFrameParser::new()));
        let gyro_parser: SharedGyroParser = Arc::new(Mutex::new(GyroFrameParser::new()));
        let running = Arc::new(AtomicBool::new(true));

        let (event_tx, event_rx) = unbounded();

        let mut dispatcher = SampleDispatcher::new(
            parts.adc,
            HostLink::new(parts.host_tx, ctx.clone()),
            ctx.clone(),
            gyro_parser.clone(),
            servo_parser.clone(),
        );
        dispatcher.set_event_sender(event_tx);

        // 会话开始即发起握手；应答到达前遥测发送自动跳过
        if let Err(e) = dispatcher.start_handshake() {
            warn!(error = %e, "host handshake initiation failed");
        }

        let mut threads = Vec::with_capacity(4);
        {
            let parser = servo_parser.clone();
            let running = running.clone();
            let adapter = parts.servo_rx;
            threads.push(std::thread::spawn(move || {
                servo_rx_loop(adapter, parser, running)
            }));
        }
        {
            let parser = gyro_parser.clone();
            let running = running.clone();
            let adapter = parts.gyro_rx;
            threads.push(std::thread::spawn(move || {
                gyro_rx_loop(adapter, parser, running)
            }));
        }
        {
            let ctx = ctx.clone();
            let running = running.clone();
            let adapter = parts.host_rx;
            threads.push(std::thread::spawn(move || {
                host_rx_loop(adapter, ctx, running)
            }));
        }
        {
            let running = running.clone();
            threads.push(std::thread::spawn(move || {
                tick_loop(dispatcher, tick_config, running)
            }));
        }

        info!("arm driver spawned (3 rx loops + tick loop)");
        Self {
            running,
            threads,
            ctx,
            servo_parser,
            gyro_parser,
            events: event_rx,
        }
    }

    /// 共享状态上下文
    pub fn context(&self) -> Arc<ArmContext> {
        self.ctx.clone()
    }

    /// 舵机解析器共享句柄（交给 `ServoBus` 构造）
    pub fn servo_parser(&self) -> SharedServoParser {
        self.servo_parser.clone()
    }

    /// 陀螺仪解析器共享句柄（交给 `GyroLink` 构造）
    pub fn gyro_parser(&self) -> SharedGyroParser {
        self.gyro_parser.clone()
    }

    /// 遥测事件接收端
    pub fn events(&self) -> Receiver<TelemetryEvent> {
        self.events.clone()
    }

    /// 停机并等待全部线程退出
    pub fn stop(mut self) {
        self.running.store(false, Ordering::Release);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        info!("arm driver stopped");
    }
}

impl Drop for ArmDriver {
    fn drop(&mut self) {
        // stop() 已消费自身时 threads 为空，这里只兜底置位
        self.running.store(false, Ordering::Release);
    }
}
