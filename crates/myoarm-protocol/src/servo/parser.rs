//! 舵机总线逐字节解析状态机
//!
//! 由接收中断/接收线程每到一个字节调用一次 [`ServoFrameParser::feed_byte`]，
//! 从任意字节边界重建变长帧。字段越界（ID、长度、指令码）直接放弃当前帧
//! 回到帧头搜索，解析器本身从不上抛错误 —— 这是字节层的恢复策略，
//! 指令层（读位置等）才向调用方报告失败。
//!
//! 完成帧经单槽邮箱交付：完成不等于消费，新帧覆盖旧帧（最新值胜出），
//! 消费方通过 [`ServoFrameParser::take_frame`] 认领。

use super::{
    MAX_PARAMS, SERVO_FRAME_HEADER, ServoFrame, is_valid_command_code, is_valid_data_length,
    is_valid_servo_id,
};

/// 解析状态
///
/// 两个帧头计数折叠为两个显式状态；零参数指令从 ReadCommand 直接进入
/// ReadChecksum。完成后立即回到 AwaitHeader1，无独立的 DONE 驻留状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitHeader1,
    AwaitHeader2,
    ReadId,
    ReadLength,
    ReadCommand,
    ReadParams,
    ReadChecksum,
}

/// 单字节喂入的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoFeed {
    /// 数据尚不完整，继续等待后续字节（正常瞬态，不是错误）
    Incomplete,
    /// 当前帧被放弃，状态机已回到帧头搜索
    Rejected(ServoRejection),
    /// 一帧完成并已发布到邮箱
    Complete,
}

/// 放弃当前帧的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoRejection {
    /// ID 超出 0~254
    BadId(u8),
    /// 数据长度字段超出 [3, 7]
    BadLength(u8),
    /// 指令码超出 [1, 0x36]
    BadCommand(u8),
    /// 尾部校验和不匹配
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// 舵机总线帧解析器
///
/// 单写者（接收侧）单读者（主线）约定下工作：`feed_byte` 只由接收侧调用，
/// 查询/认领方法只由主线调用。
#[derive(Debug)]
pub struct ServoFrameParser {
    state: State,

    // 累积中的帧字段
    id: u8,
    data_length: u8,
    command: u8,
    params: [u8; MAX_PARAMS],
    param_count: u8,
    /// 校验和增量累加（ID + LEN + CMD + 参数），u16 截断口径见 checksum 模块
    running_sum: u16,

    /// 单槽邮箱：最近一个校验通过的完成帧
    mailbox: Option<ServoFrame>,
    /// 一次性 "帧就绪" 锁存
    frame_ready: bool,
    /// 一次性校验和失败锁存，供指令层区分超时与校验失败
    checksum_error: Option<ServoRejection>,
}

impl ServoFrameParser {
    pub fn new() -> Self {
        Self {
            state: State::AwaitHeader1,
            id: 0,
            data_length: 0,
            command: 0,
            params: [0; MAX_PARAMS],
            param_count: 0,
            running_sum: 0,
            mailbox: None,
            frame_ready: false,
            checksum_error: None,
        }
    }

    /// 喂入一个接收字节
    ///
    /// 每个接收字节恰好调用一次，不可批量。
    pub fn feed_byte(&mut self, byte: u8) -> ServoFeed {
        match self.state {
            State::AwaitHeader1 => {
                if byte == SERVO_FRAME_HEADER {
                    self.state = State::AwaitHeader2;
                }
                ServoFeed::Incomplete
            }
            State::AwaitHeader2 => {
                if byte == SERVO_FRAME_HEADER {
                    self.state = State::ReadId;
                } else {
                    self.state = State::AwaitHeader1;
                }
                ServoFeed::Incomplete
            }
            State::ReadId => {
                if !is_valid_servo_id(byte) {
                    self.abort();
                    return ServoFeed::Rejected(ServoRejection::BadId(byte));
                }
                self.id = byte;
                self.running_sum = byte as u16;
                self.state = State::ReadLength;
                ServoFeed::Incomplete
            }
            State::ReadLength => {
                if !is_valid_data_length(byte) {
                    self.abort();
                    return ServoFeed::Rejected(ServoRejection::BadLength(byte));
                }
                self.data_length = byte;
                self.running_sum = self.running_sum.wrapping_add(byte as u16);
                self.state = State::ReadCommand;
                ServoFeed::Incomplete
            }
            State::ReadCommand => {
                if !is_valid_command_code(byte) {
                    self.abort();
                    return ServoFeed::Rejected(ServoRejection::BadCommand(byte));
                }
                self.command = byte;
                self.running_sum = self.running_sum.wrapping_add(byte as u16);
                // 数据长度 3 的帧没有参数字节，下一个字节即校验和
                self.state = if self.data_length > 3 {
                    State::ReadParams
                } else {
                    State::ReadChecksum
                };
                ServoFeed::Incomplete
            }
            State::ReadParams => {
                self.params[self.param_count as usize] = byte;
                self.param_count += 1;
                self.running_sum = self.running_sum.wrapping_add(byte as u16);
                if self.param_count == self.data_length - 3 {
                    self.state = State::ReadChecksum;
                }
                ServoFeed::Incomplete
            }
            State::ReadChecksum => {
                let expected = !(self.running_sum as u8);
                if byte != expected {
                    let rejection = ServoRejection::ChecksumMismatch {
                        expected,
                        actual: byte,
                    };
                    self.checksum_error = Some(rejection);
                    self.abort();
                    return ServoFeed::Rejected(rejection);
                }

                let frame = ServoFrame {
                    id: self.id,
                    command: self.command,
                    params: self.params,
                    param_len: self.param_count,
                };
                // 发布到邮箱后立即复位全部瞬态计数，下一字节即可开始新帧
                self.mailbox = Some(frame);
                self.frame_ready = true;
                self.abort();
                ServoFeed::Complete
            }
        }
    }

    /// 一次性 "帧就绪" 查询：读取并清除锁存
    ///
    /// 轮询消费方（带重试预算的阻塞读）以此判断回包到达。
    pub fn is_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    /// 认领邮箱中的完成帧
    ///
    /// 单槽，最新值胜出；认领后槽位清空。
    pub fn take_frame(&mut self) -> Option<ServoFrame> {
        self.frame_ready = false;
        self.mailbox.take()
    }

    /// 读取并清除一次性校验和失败锁存
    pub fn take_checksum_error(&mut self) -> Option<ServoRejection> {
        self.checksum_error.take()
    }

    /// 复位累积中的瞬态状态（不清邮箱）
    ///
    /// 由周期定时器调用，防止残缺半帧卡死后续指令的回包解析。
    pub fn reset(&mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        self.state = State::AwaitHeader1;
        self.id = 0;
        self.data_length = 0;
        self.command = 0;
        self.params = [0; MAX_PARAMS];
        self.param_count = 0;
        self.running_sum = 0;
    }
}

impl Default for ServoFrameParser {
    fn default() -> Self {
        Self::new()
    }
}
