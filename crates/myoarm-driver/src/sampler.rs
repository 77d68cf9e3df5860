//! 周期采样调度
//!
//! 三路定时节拍以显式枚举标识分发（不比较硬件句柄指针）：
//! - `AnalogSample` (2 kHz)：触发一次 ADC 采集，均值滤波后交上位机链路发送
//! - `MotionSample` (20 Hz)：汇集 6 路陀螺仪轴数据，均值滤波后暂存并发送
//! - `ServoRxClear` (100 Hz)：周期复位舵机解析器瞬态，防止残缺半帧卡死总线
//!
//! 硬件初始化完成之前所有节拍都是空操作。ADC 采集是带完成标志的异步
//! 能力：转换未完成时该节拍跳过而不阻塞。

use crate::error::DriverError;
use crate::filter::{MeanFilterF32, MeanFilterU16};
use crate::host_link::HostLink;
use crate::state::{AnalogSnapshot, ArmContext, MotionSnapshot, SharedGyroParser, SharedServoParser};
use crossbeam_channel::Sender;
use myoarm_serial::SerialAdapter;
use std::sync::Arc;
use tracing::trace;

/// 定时器标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    /// ADC 多通道定时采集（2 kHz）
    AnalogSample,
    /// 陀螺仪运动数据定时汇集（20 Hz）
    MotionSample,
    /// 舵机接收状态周期清理（100 Hz）
    ServoRxClear,
}

/// 一次 ADC 采集的原始结果（4 路肌电传感器 + 基准电压）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdcReading {
    pub sensors: [u16; 4],
    pub vref: u16,
}

/// ADC 采集能力（ADC/DMA 细节是外部协作者，不在本层范围内）
pub trait AdcSource {
    /// 非阻塞获取一次转换结果：未完成返回 `None`，该节拍跳过
    fn try_acquire(&mut self) -> Result<Option<AdcReading>, DriverError>;
}

/// 对 Box<dyn AdcSource> 的透传实现，方便运行期选择数据源
impl<T: AdcSource + ?Sized> AdcSource for Box<T> {
    fn try_acquire(&mut self) -> Result<Option<AdcReading>, DriverError> {
        (**self).try_acquire()
    }
}

/// 遥测事件（监控消费端经通道订阅）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    Analog(AnalogSnapshot),
    Motion(MotionSnapshot),
}

/// 采样调度器
///
/// 每个节拍由 [`SampleDispatcher::on_tick`] 驱动一次；
/// 节拍间不持有任何采样数据所有权（快照整体换入上下文）。
pub struct SampleDispatcher<S: AdcSource, H: SerialAdapter> {
    adc: S,
    host: HostLink<H>,
    ctx: Arc<ArmContext>,
    gyro_parser: SharedGyroParser,
    servo_parser: SharedServoParser,

    sensor_filters: [MeanFilterU16; 4],
    vref_filter: MeanFilterU16,
    angle_filters: [MeanFilterF32; 3],
    rate_filters: [MeanFilterF32; 3],

    events: Option<Sender<TelemetryEvent>>,
}

impl<S: AdcSource, H: SerialAdapter> SampleDispatcher<S, H> {
    pub fn new(
        adc: S,
        host: HostLink<H>,
        ctx: Arc<ArmContext>,
        gyro_parser: SharedGyroParser,
        servo_parser: SharedServoParser,
    ) -> Self {
        Self {
            adc,
            host,
            ctx,
            gyro_parser,
            servo_parser,
            sensor_filters: Default::default(),
            vref_filter: MeanFilterU16::new(),
            angle_filters: Default::default(),
            rate_filters: Default::default(),
            events: None,
        }
    }

    /// 订阅遥测事件
    pub fn set_event_sender(&mut self, sender: Sender<TelemetryEvent>) {
        self.events = Some(sender);
    }

    /// 发起与上位机的同步握手（每会话一次，发送同步字节 0x56）
    ///
    /// 应答由上位机方向的接收回调置位，见 [`crate::host_link::handle_host_byte`]。
    pub fn start_handshake(&mut self) -> Result<(), DriverError> {
        self.host.send_sync()
    }

    /// 单次节拍入口
    pub fn on_tick(&mut self, timer: TimerId) -> Result<(), DriverError> {
        if !self.ctx.is_hardware_ready() {
            return Ok(());
        }

        match timer {
            TimerId::AnalogSample => self.on_analog_tick(),
            TimerId::MotionSample => self.on_motion_tick(),
            TimerId::ServoRxClear => {
                self.servo_parser.lock().reset();
                Ok(())
            }
        }
    }

    fn on_analog_tick(&mut self) -> Result<(), DriverError> {
        // 转换未完成：本节拍空操作，不阻塞等待
        let Some(reading) = self.adc.try_acquire()? else {
            trace!("adc conversion not complete, tick skipped");
            return Ok(());
        };

        let mut sensors = [0u16; 4];
        for (i, filter) in self.sensor_filters.iter_mut().enumerate() {
            sensors[i] = filter.push(reading.sensors[i]);
        }
        let vref = self.vref_filter.push(reading.vref);

        let snapshot = AnalogSnapshot { sensors, vref };
        self.ctx.store_analog(snapshot);
        self.host.send_analog(sensors)?;
        self.emit(TelemetryEvent::Analog(snapshot));
        Ok(())
    }

    fn on_motion_tick(&mut self) -> Result<(), DriverError> {
        let (angle_raw, rate_raw) = {
            let parser = self.gyro_parser.lock();
            (
                parser.angle().to_degrees(),
                parser.angular_rate().to_deg_per_sec(),
            )
        };

        let mut angle_deg = [0f32; 3];
        let mut rate_dps = [0f32; 3];
        for i in 0..3 {
            angle_deg[i] = self.angle_filters[i].push(angle_raw[i]);
            rate_dps[i] = self.rate_filters[i].push(rate_raw[i]);
        }

        let snapshot = MotionSnapshot { angle_deg, rate_dps };
        self.ctx.store_motion(snapshot);
        // 遥测帧携带 4 个通道：X/Y 角度 + X/Y 角速度
        self.host
            .send_motion([angle_deg[0], angle_deg[1], rate_dps[0], rate_dps[1]])?;
        self.emit(TelemetryEvent::Motion(snapshot));
        Ok(())
    }

    fn emit(&self, event: TelemetryEvent) {
        if let Some(tx) = &self.events {
            // 消费端退出不算故障，静默丢弃
            let _ = tx.send(event);
        }
    }
}

/// 确定性 Mock ADC 源（测试与 `--mock` 运行模式）
///
/// 每 `ready_every` 次调用产出一次数据，其余调用模拟 "转换未完成"。
#[derive(Debug, Clone)]
pub struct MockAdcSource {
    reading: AdcReading,
    ready_every: u32,
    calls: u32,
}

impl MockAdcSource {
    pub fn new(reading: AdcReading) -> Self {
        Self {
            reading,
            ready_every: 1,
            calls: 0,
        }
    }

    /// 每 n 次调用才完成一次转换
    pub fn ready_every(mut self, n: u32) -> Self {
        self.ready_every = n.max(1);
        self
    }
}

impl AdcSource for MockAdcSource {
    fn try_acquire(&mut self) -> Result<Option<AdcReading>, DriverError> {
        self.calls += 1;
        if self.calls % self.ready_every == 0 {
            Ok(Some(self.reading))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myoarm_protocol::{GyroFrameParser, ServoFrameParser};
    use myoarm_serial::MockSerialAdapter;
    use parking_lot::Mutex;

    fn dispatcher(
        adc: MockAdcSource,
    ) -> (
        SampleDispatcher<MockAdcSource, MockSerialAdapter>,
        MockSerialAdapter,
        Arc<ArmContext>,
        SharedGyroParser,
        SharedServoParser,
    ) {
        let ctx = ArmContext::new();
        let host_mock = MockSerialAdapter::new();
        let gyro_parser: SharedGyroParser = Arc::new(Mutex::new(GyroFrameParser::new()));
        let servo_parser: SharedServoParser = Arc::new(Mutex::new(ServoFrameParser::new()));
        let host = HostLink::new(host_mock.clone(), ctx.clone());
        let d = SampleDispatcher::new(
            adc,
            host,
            ctx.clone(),
            gyro_parser.clone(),
            servo_parser.clone(),
        );
        (d, host_mock, ctx, gyro_parser, servo_parser)
    }

    #[test]
    fn test_noop_before_hardware_ready() {
        let adc = MockAdcSource::new(AdcReading {
            sensors: [100; 4],
            vref: 800,
        });
        let (mut d, host_mock, ctx, _, _) = dispatcher(adc);

        d.on_tick(TimerId::AnalogSample).unwrap();
        assert!(host_mock.take_tx().is_empty());
        assert_eq!(ctx.analog().sensors, [0; 4]);
    }

    #[test]
    fn test_analog_tick_filters_and_publishes() {
        let adc = MockAdcSource::new(AdcReading {
            sensors: [300, 600, 900, 0],
            vref: 300,
        });
        let (mut d, _host_mock, ctx, _, _) = dispatcher(adc);
        ctx.set_hardware_ready(true);

        d.on_tick(TimerId::AnalogSample).unwrap();
        // 窗口零填充，首拍输出 = 采样值 / 3
        assert_eq!(ctx.analog().sensors, [100, 200, 300, 0]);
        assert_eq!(ctx.analog().vref, 100);
    }

    #[test]
    fn test_conversion_not_ready_skips_tick() {
        let adc = MockAdcSource::new(AdcReading {
            sensors: [300; 4],
            vref: 300,
        })
        .ready_every(2);
        let (mut d, _host_mock, ctx, _, _) = dispatcher(adc);
        ctx.set_hardware_ready(true);

        d.on_tick(TimerId::AnalogSample).unwrap();
        assert_eq!(ctx.analog().sensors, [0; 4]); // 第 1 拍跳过
        d.on_tick(TimerId::AnalogSample).unwrap();
        assert_eq!(ctx.analog().sensors, [100; 4]); // 第 2 拍出数
    }

    #[test]
    fn test_transmission_gated_by_host_ack() {
        let adc = MockAdcSource::new(AdcReading {
            sensors: [300; 4],
            vref: 300,
        });
        let (mut d, host_mock, ctx, _, _) = dispatcher(adc);
        ctx.set_hardware_ready(true);

        d.on_tick(TimerId::AnalogSample).unwrap();
        // 未应答：快照照常更新，发送被跳过
        assert_eq!(ctx.analog().sensors, [100; 4]);
        assert!(host_mock.take_tx().is_empty());

        ctx.set_host_acked();
        d.on_tick(TimerId::AnalogSample).unwrap();
        assert_eq!(host_mock.take_tx().len(), 13);
    }

    #[test]
    fn test_motion_tick_reads_gyro_records() {
        let adc = MockAdcSource::new(AdcReading::default());
        let (mut d, host_mock, ctx, gyro_parser, _) = dispatcher(adc);
        ctx.set_hardware_ready(true);
        ctx.set_host_acked();

        // 角度包：X=90°(16384), Y=-45°(-8192), Z=0
        {
            let mut frame = [0u8; 11];
            frame[0] = 0x55;
            frame[1] = 0x53;
            frame[2..4].copy_from_slice(&16384i16.to_le_bytes());
            frame[4..6].copy_from_slice(&(-8192i16).to_le_bytes());
            let mut p = gyro_parser.lock();
            for &b in &frame {
                p.feed_byte(b);
            }
        }

        d.on_tick(TimerId::MotionSample).unwrap();
        let motion = ctx.motion();
        // 首拍均值 = 原始值 / 3
        assert!((motion.angle_deg[0] - 30.0).abs() < 1e-3);
        assert!((motion.angle_deg[1] + 15.0).abs() < 1e-3);

        let tx = host_mock.take_tx();
        assert_eq!(tx.len(), 13);
        assert_eq!(tx[2], 1); // 运动量类型
        // 负的 Y 角度在编码端被钳到 0
        assert_eq!(tx[5], 0);
        assert_eq!(tx[6], 0);
        // X 角度 30.0° → 3000 = 0x0BB8
        assert_eq!(tx[3], 0x0B);
        assert_eq!(tx[4], 0xB8);
    }

    #[test]
    fn test_servo_rx_clear_resets_partial_frame() {
        let adc = MockAdcSource::new(AdcReading::default());
        let (mut d, _host_mock, ctx, _, servo_parser) = dispatcher(adc);
        ctx.set_hardware_ready(true);

        {
            let mut p = servo_parser.lock();
            for &b in &[0x55u8, 0x55, 1, 7, 1] {
                p.feed_byte(b);
            }
        }
        d.on_tick(TimerId::ServoRxClear).unwrap();

        // 清理后一个完整帧必须从头正确解析
        {
            let mut p = servo_parser.lock();
            let bytes = [0x55u8, 0x55, 2, 3, 28, !(2u8 + 3 + 28)];
            for &b in &bytes {
                p.feed_byte(b);
            }
            assert_eq!(p.take_frame().unwrap().id, 2);
        }
    }
}
