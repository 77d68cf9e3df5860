//! 舵机总线指令层
//!
//! 为每条支持的指令构建帧、计算校验和、序列化后经阻塞发送原语写出。
//! 读指令随后进入带重试预算的轮询等待：预算耗尽报超时，回包校验
//! 失败报校验错误，两者是不同的失败。等待从不无限阻塞，也不支持取消
//! —— 进入等待后要么完成要么耗尽预算。
//!
//! 回包解析由接收循环喂给共享解析器完成，本层只轮询一次性
//! "帧就绪" 锁存并认领邮箱，不触碰接收字节流。

use crate::error::DriverError;
use crate::state::SharedServoParser;
use myoarm_protocol::servo::{ServoCommand, ServoFrame, ServoRejection};
use myoarm_serial::SerialAdapter;
use std::time::Duration;
use tracing::{debug, trace};

/// 舵机位置值的合法范围 0~1000，对应 0~240 度
pub const SERVO_POSITION_MAX: i16 = 1000;

/// 转动时间上限（毫秒）
pub const SERVO_MOVE_TIME_MAX: u16 = 30_000;

/// 总线配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoBusConfig {
    /// 回包轮询重试预算（设备端实现为 500 次计数循环）
    pub retry_budget: u32,
    /// 相邻两次轮询的间隔
    pub poll_interval: Duration,
}

impl Default for ServoBusConfig {
    fn default() -> Self {
        Self {
            retry_budget: 500,
            poll_interval: Duration::from_micros(100),
        }
    }
}

/// 舵机总线指令构建与收发
pub struct ServoBus<A: SerialAdapter> {
    adapter: A,
    parser: SharedServoParser,
    config: ServoBusConfig,
}

impl<A: SerialAdapter> ServoBus<A> {
    pub fn new(adapter: A, parser: SharedServoParser) -> Self {
        Self::with_config(adapter, parser, ServoBusConfig::default())
    }

    pub fn with_config(adapter: A, parser: SharedServoParser, config: ServoBusConfig) -> Self {
        Self {
            adapter,
            parser,
            config,
        }
    }

    /// 写入角度与转动时间，立即生效
    ///
    /// 角度 0~1000 对应 0~240 度（0.24 度分辨率），时间 0~30000 毫秒。
    /// 参数低字节在前。
    pub fn move_immediately(
        &mut self,
        id: u8,
        position: i16,
        time_ms: u16,
    ) -> Result<(), DriverError> {
        let [pos_lo, pos_hi] = position.to_le_bytes();
        let [time_lo, time_hi] = time_ms.to_le_bytes();
        self.issue(ServoFrame::new(
            id,
            ServoCommand::MoveTimeWrite,
            &[pos_lo, pos_hi, time_lo, time_hi],
        ))
    }

    /// 重写舵机 ID，掉电保存
    pub fn set_id(&mut self, old_id: u8, new_id: u8) -> Result<(), DriverError> {
        self.issue(ServoFrame::new(old_id, ServoCommand::IdWrite, &[new_id]))
    }

    /// 加载电机：有力矩输出
    pub fn load(&mut self, id: u8) -> Result<(), DriverError> {
        self.issue(ServoFrame::new(id, ServoCommand::LoadOrUnloadWrite, &[1]))
    }

    /// 卸载电机：断电无力矩输出
    pub fn unload(&mut self, id: u8) -> Result<(), DriverError> {
        self.issue(ServoFrame::new(id, ServoCommand::LoadOrUnloadWrite, &[0]))
    }

    /// 读取当前实际角度位置
    ///
    /// 发出读指令后以有限预算轮询共享解析器：
    /// - 预算耗尽 → [`DriverError::ReceiveTimeout`]
    /// - 回包校验失败 → [`DriverError::ChecksumMismatch`]
    /// - 其他指令的回包被消费后继续等待
    ///
    /// 角度可能为负，按有符号 16 位解读，参数低字节在前。
    pub fn read_position(&mut self, id: u8) -> Result<i16, DriverError> {
        // 清掉上一轮残留的锁存与邮箱，避免把旧回包当成本次应答
        {
            let mut parser = self.parser.lock();
            parser.take_frame();
            parser.take_checksum_error();
        }

        self.issue(ServoFrame::new(id, ServoCommand::PosRead, &[]))?;

        let mut budget = self.config.retry_budget;
        loop {
            {
                let mut parser = self.parser.lock();

                if let Some(ServoRejection::ChecksumMismatch { expected, actual }) =
                    parser.take_checksum_error()
                {
                    return Err(DriverError::ChecksumMismatch { expected, actual });
                }

                if parser.is_frame_ready() {
                    if let Some(frame) = parser.take_frame() {
                        if frame.command == ServoCommand::PosRead as u8 && frame.param_len >= 2 {
                            let position =
                                i16::from_le_bytes([frame.params[0], frame.params[1]]);
                            trace!(id, position, "position reply");
                            return Ok(position);
                        }
                        // 不是本次读指令的回包，丢弃后继续等待
                        debug!(command = frame.command, "unexpected reply, keep waiting");
                    }
                }
            }

            if budget == 0 {
                return Err(DriverError::ReceiveTimeout);
            }
            budget -= 1;
            spin_sleep::sleep(self.config.poll_interval);
        }
    }

    /// 上电归位：0~6 号舵机依次回到零位
    pub fn move_all_home(&mut self) -> Result<(), DriverError> {
        for id in 0..=6 {
            self.move_immediately(id, 0, 300)?;
            spin_sleep::sleep(Duration::from_millis(50));
        }
        Ok(())
    }

    /// 序列化并阻塞发送一帧
    fn issue(&mut self, frame: ServoFrame) -> Result<(), DriverError> {
        let bytes = frame.encode();
        trace!(id = frame.id, command = frame.command, "issue frame");
        self.adapter.send_all(bytes.as_slice())?;
        Ok(())
    }
}
