//! 陀螺仪链路指令层
//!
//! 出站指令是固定 3 字节序列，经阻塞发送原语写出；
//! 入站数据由接收循环喂给共享解析器，本层只读解析器状态。

use crate::error::DriverError;
use crate::state::SharedGyroParser;
use myoarm_protocol::gyro::GyroCommand;
use myoarm_serial::SerialAdapter;
use std::time::Duration;
use tracing::{debug, info};

/// 校准配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GyroLinkConfig {
    /// 校准后等待新鲜帧的轮询预算
    pub retry_budget: u32,
    /// 轮询间隔
    pub poll_interval: Duration,
    /// 判定数据流存活所需的新鲜帧数
    pub fresh_frames: u64,
}

impl Default for GyroLinkConfig {
    fn default() -> Self {
        Self {
            retry_budget: 500,
            poll_interval: Duration::from_millis(1),
            fresh_frames: 3,
        }
    }
}

/// 陀螺仪链路
pub struct GyroLink<A: SerialAdapter> {
    adapter: A,
    parser: SharedGyroParser,
    config: GyroLinkConfig,
}

impl<A: SerialAdapter> GyroLink<A> {
    pub fn new(adapter: A, parser: SharedGyroParser) -> Self {
        Self::with_config(adapter, parser, GyroLinkConfig::default())
    }

    pub fn with_config(adapter: A, parser: SharedGyroParser, config: GyroLinkConfig) -> Self {
        Self {
            adapter,
            parser,
            config,
        }
    }

    /// Z 轴角度归零
    pub fn zero_yaw(&mut self) -> Result<(), DriverError> {
        self.send_command(GyroCommand::ZeroYaw)
    }

    /// 加速度校准
    pub fn calibrate_acceleration(&mut self) -> Result<(), DriverError> {
        self.send_command(GyroCommand::CalibrateAcceleration)
    }

    /// 休眠/工作模式切换
    pub fn toggle_sleep(&mut self) -> Result<(), DriverError> {
        self.send_command(GyroCommand::ToggleSleep)
    }

    /// 设置串口输出模式
    pub fn set_uart_mode(&mut self) -> Result<(), DriverError> {
        self.send_command(GyroCommand::UartMode)
    }

    /// 设置 IIC 输出模式
    pub fn set_i2c_mode(&mut self) -> Result<(), DriverError> {
        self.send_command(GyroCommand::I2cMode)
    }

    /// 上电校准：加速度校准 + Z 轴归零，随后轮询确认数据流存活
    ///
    /// 以有限预算轮询解码帧计数，集齐设定数量的新鲜帧即成功；
    /// 预算耗尽报 [`DriverError::ReceiveTimeout`]。
    pub fn calibrate(&mut self) -> Result<(), DriverError> {
        let baseline = self.parser.lock().frames_decoded();

        self.calibrate_acceleration()?;
        self.zero_yaw()?;
        debug!("calibration commands issued, waiting for fresh frames");

        let mut budget = self.config.retry_budget;
        loop {
            let decoded = self.parser.lock().frames_decoded();
            if decoded >= baseline + self.config.fresh_frames {
                info!(frames = decoded - baseline, "gyroscope stream alive");
                return Ok(());
            }

            if budget == 0 {
                return Err(DriverError::ReceiveTimeout);
            }
            budget -= 1;
            spin_sleep::sleep(self.config.poll_interval);
        }
    }

    fn send_command(&mut self, command: GyroCommand) -> Result<(), DriverError> {
        self.adapter.send_all(&command.encode())?;
        Ok(())
    }
}
