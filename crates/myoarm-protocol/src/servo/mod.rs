//! 舵机总线帧定义
//!
//! 通信协议格式：
//!
//! ```text
//! | 帧头 0x55 | 帧头 0x55 | ID | 数据长度 | 指令 | 参数 1 ... 参数 N | 校验和 |
//! ```
//!
//! - ID：0~253，254 (0xFE) 为广播 ID。广播指令所有舵机接收但不回包
//!   （读 ID 指令除外），避免总线冲突。
//! - 数据长度：等于待发送数据的长度（含长度字节本身），即数据长度加 3
//!   等于从帧头到校验和的整包长度。
//! - 指令：`_WRITE` 后缀为写指令，`_READ` 后缀为读指令。舵机收到读指令后
//!   立即回包，回包指令值与读指令相同且带参数，上位机发出读指令后应立刻
//!   转入接收状态。
//! - 校验和：见 [`crate::checksum`]。

pub mod parser;

pub use parser::{ServoFeed, ServoFrameParser, ServoRejection};

use crate::ProtocolError;
use crate::checksum::checksum;

/// 帧头字节，连续两个表示数据到达
pub const SERVO_FRAME_HEADER: u8 = 0x55;

/// 广播 ID：所有舵机接收，不回包
pub const BROADCAST_ID: u8 = 254;

/// 数据长度字段的合法范围
pub const MIN_DATA_LENGTH: u8 = 3;
pub const MAX_DATA_LENGTH: u8 = 7;

/// 参数字节数上限（数据长度 7 - 3）
pub const MAX_PARAMS: usize = (MAX_DATA_LENGTH - MIN_DATA_LENGTH) as usize;

/// 整包字节数上限（数据长度 + 两个帧头 + 校验和）
pub const MAX_FRAME_LEN: usize = MAX_DATA_LENGTH as usize + 3;

/// 指令码的合法范围（入站校验按数值范围，不限于已知指令表）
pub fn is_valid_command_code(code: u8) -> bool {
    (1..=0x36).contains(&code)
}

/// ID 合法性：0~253 或广播 254
pub fn is_valid_servo_id(id: u8) -> bool {
    id <= BROADCAST_ID
}

/// 数据长度字段合法性
pub fn is_valid_data_length(len: u8) -> bool {
    (MIN_DATA_LENGTH..=MAX_DATA_LENGTH).contains(&len)
}

/// 舵机指令表
///
/// 每条指令的参数个数固定，由数据长度字段体现（数据长度 = 3 + 参数个数）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServoCommand {
    /// 写入角度与转动时间，立即生效，舵机在设定时间内匀速转到设定角度
    MoveTimeWrite = 1,
    /// 读取 MoveTimeWrite 下发的角度与时间值
    MoveTimeRead = 2,
    /// 预设角度与时间，收到 MoveStart 后才转动
    MoveTimeWaitWrite = 7,
    /// 读取预设的角度与时间
    MoveTimeWaitRead = 8,
    /// 配合 MoveTimeWaitWrite 使用，触发转动
    MoveStart = 11,
    /// 舵机转动中收到此指令立即停止
    MoveStop = 12,
    /// 重写 ID 值，掉电保存
    IdWrite = 13,
    /// 读取舵机 ID 值
    IdRead = 14,
    /// 偏差调整，立即转动，偏差值不掉电保存
    AngleOffsetAdjust = 17,
    /// 保存偏差值，掉电保存
    AngleOffsetWrite = 18,
    /// 读取设定的偏差值
    AngleOffsetRead = 19,
    /// 角度限位，限位值掉电保存
    AngleLimitWrite = 20,
    /// 读取角度限位值
    AngleLimitRead = 21,
    /// 输入电压限制，越限时卸载电机并（若设置）LED 闪烁告警
    VinLimitWrite = 22,
    /// 读取输入电压限制值
    VinLimitRead = 23,
    /// 内部最高温度限制，50~100 摄氏度，默认 85
    TempMaxLimitWrite = 24,
    /// 读取内部最高温度限制
    TempMaxLimitRead = 25,
    /// 读取内部实时温度
    TempRead = 26,
    /// 读取当前输入电压
    VinRead = 27,
    /// 读取当前实际角度位置
    PosRead = 28,
    /// 工作模式：0 位置控制，1 电机控制，默认 0
    OrMotorModeWrite = 29,
    /// 读取工作模式相关参数
    OrMotorModeRead = 30,
    /// 电机加载/卸载：0 卸载断电无力矩输出，1 加载有力矩输出，默认 0
    LoadOrUnloadWrite = 31,
    /// 读取电机加载/卸载状态
    LoadOrUnloadRead = 32,
    /// LED 常亮/常灭，默认常亮
    LedCtrlWrite = 33,
    /// 读取 LED 状态
    LedCtrlRead = 34,
    /// 故障 LED 闪烁告警值，0~7
    LedErrorWrite = 35,
    /// 读取故障告警值
    LedErrorRead = 36,
}

impl ServoCommand {
    /// 指令对应的数据长度字段值（3 + 参数个数）
    pub fn data_length(self) -> u8 {
        match self {
            ServoCommand::MoveTimeWrite
            | ServoCommand::MoveTimeWaitWrite
            | ServoCommand::AngleLimitWrite
            | ServoCommand::VinLimitWrite
            | ServoCommand::OrMotorModeWrite => 7,
            ServoCommand::IdWrite
            | ServoCommand::AngleOffsetAdjust
            | ServoCommand::TempMaxLimitWrite
            | ServoCommand::LoadOrUnloadWrite
            | ServoCommand::LedCtrlWrite
            | ServoCommand::LedErrorWrite => 4,
            _ => 3,
        }
    }

    /// 指令的参数个数
    pub fn param_count(self) -> usize {
        (self.data_length() - MIN_DATA_LENGTH) as usize
    }
}

impl TryFrom<u8> for ServoCommand {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ServoCommand::MoveTimeWrite),
            2 => Ok(ServoCommand::MoveTimeRead),
            7 => Ok(ServoCommand::MoveTimeWaitWrite),
            8 => Ok(ServoCommand::MoveTimeWaitRead),
            11 => Ok(ServoCommand::MoveStart),
            12 => Ok(ServoCommand::MoveStop),
            13 => Ok(ServoCommand::IdWrite),
            14 => Ok(ServoCommand::IdRead),
            17 => Ok(ServoCommand::AngleOffsetAdjust),
            18 => Ok(ServoCommand::AngleOffsetWrite),
            19 => Ok(ServoCommand::AngleOffsetRead),
            20 => Ok(ServoCommand::AngleLimitWrite),
            21 => Ok(ServoCommand::AngleLimitRead),
            22 => Ok(ServoCommand::VinLimitWrite),
            23 => Ok(ServoCommand::VinLimitRead),
            24 => Ok(ServoCommand::TempMaxLimitWrite),
            25 => Ok(ServoCommand::TempMaxLimitRead),
            26 => Ok(ServoCommand::TempRead),
            27 => Ok(ServoCommand::VinRead),
            28 => Ok(ServoCommand::PosRead),
            29 => Ok(ServoCommand::OrMotorModeWrite),
            30 => Ok(ServoCommand::OrMotorModeRead),
            31 => Ok(ServoCommand::LoadOrUnloadWrite),
            32 => Ok(ServoCommand::LoadOrUnloadRead),
            33 => Ok(ServoCommand::LedCtrlWrite),
            34 => Ok(ServoCommand::LedCtrlRead),
            35 => Ok(ServoCommand::LedErrorWrite),
            36 => Ok(ServoCommand::LedErrorRead),
            _ => Err(ProtocolError::InvalidValue {
                field: "servo_command",
                value,
            }),
        }
    }
}

/// 舵机总线帧
///
/// 出站帧由指令构建方法同步构建，栈上短生命周期值；
/// 入站帧由 [`ServoFrameParser`] 逐字节累积后经单槽邮箱交付。
///
/// 固定 4 字节参数区 + 有效长度，避免堆分配（高频总线场景）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoFrame {
    /// 舵机 ID（0~253，254 广播）
    pub id: u8,
    /// 指令码（入站帧保留原始字节，合法范围 1~0x36）
    pub command: u8,
    /// 参数区（固定 4 字节，未使用部分为 0）
    pub params: [u8; MAX_PARAMS],
    /// 有效参数个数 (0-4)
    pub param_len: u8,
}

impl ServoFrame {
    /// 构建出站指令帧
    ///
    /// 参数个数取 `command.param_count()` 与 `params.len()` 的较小者，
    /// 多余的入参被截断 —— 指令表决定线上格式。
    pub fn new(id: u8, command: ServoCommand, params: &[u8]) -> Self {
        let mut fixed = [0u8; MAX_PARAMS];
        let len = params.len().min(command.param_count());
        fixed[..len].copy_from_slice(&params[..len]);

        Self {
            id,
            command: command as u8,
            params: fixed,
            param_len: len as u8,
        }
    }

    /// 数据长度字段值（长度字节 + 指令 + 参数 + 校验和 的计数口径）
    pub fn data_length(&self) -> u8 {
        MIN_DATA_LENGTH + self.param_len
    }

    /// 有效参数切片
    pub fn params(&self) -> &[u8] {
        &self.params[..self.param_len as usize]
    }

    /// 已知指令码的枚举视图
    pub fn command(&self) -> Result<ServoCommand, ProtocolError> {
        ServoCommand::try_from(self.command)
    }

    /// 序列化为线上字节（含帧头与计算好的校验和）
    pub fn encode(&self) -> EncodedServoFrame {
        let mut buf = [0u8; MAX_FRAME_LEN];
        buf[0] = SERVO_FRAME_HEADER;
        buf[1] = SERVO_FRAME_HEADER;
        buf[2] = self.id;
        buf[3] = self.data_length();
        buf[4] = self.command;

        let n = self.param_len as usize;
        buf[5..5 + n].copy_from_slice(self.params());

        let total = self.data_length() as usize + 3;
        buf[total - 1] = checksum(&buf);

        EncodedServoFrame { buf, len: total }
    }
}

/// 序列化后的帧字节（栈上定长缓冲 + 有效长度）
#[derive(Debug, Clone, Copy)]
pub struct EncodedServoFrame {
    buf: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl EncodedServoFrame {
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl AsRef<[u8]> for EncodedServoFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::validate_checksum;

    #[test]
    fn test_encode_pos_read() {
        let frame = ServoFrame::new(1, ServoCommand::PosRead, &[]);
        let bytes = frame.encode();
        assert_eq!(bytes.as_slice(), &[0x55, 0x55, 1, 3, 28, !(1u8 + 3 + 28)]);
    }

    #[test]
    fn test_encode_move_time_write() {
        // position=500 (0x01F4), time=1000ms (0x03E8)，参数低字节在前
        let frame = ServoFrame::new(
            2,
            ServoCommand::MoveTimeWrite,
            &[0xF4, 0x01, 0xE8, 0x03],
        );
        let bytes = frame.encode();
        assert_eq!(bytes.as_slice().len(), 10);
        assert_eq!(&bytes.as_slice()[..9], &[0x55, 0x55, 2, 7, 1, 0xF4, 0x01, 0xE8, 0x03]);
        assert!(validate_checksum(bytes.as_slice()).is_ok());
    }

    #[test]
    fn test_builder_roundtrip_always_validates() {
        for id in [0u8, 7, 253, BROADCAST_ID] {
            for (cmd, params) in [
                (ServoCommand::IdWrite, &[9u8][..]),
                (ServoCommand::LoadOrUnloadWrite, &[1][..]),
                (ServoCommand::MoveStop, &[][..]),
                (ServoCommand::MoveTimeWrite, &[0x2C, 0x01, 0x2C, 0x01][..]),
            ] {
                let bytes = ServoFrame::new(id, cmd, params).encode();
                assert!(validate_checksum(bytes.as_slice()).is_ok());
            }
        }
    }

    #[test]
    fn test_excess_params_truncated() {
        let frame = ServoFrame::new(1, ServoCommand::IdWrite, &[2, 3, 4, 5]);
        assert_eq!(frame.param_len, 1);
        assert_eq!(frame.data_length(), 4);
    }

    #[test]
    fn test_command_table_lengths() {
        assert_eq!(ServoCommand::MoveTimeWrite.data_length(), 7);
        assert_eq!(ServoCommand::IdWrite.data_length(), 4);
        assert_eq!(ServoCommand::PosRead.data_length(), 3);
        assert_eq!(ServoCommand::LoadOrUnloadWrite.data_length(), 4);
        assert_eq!(ServoCommand::try_from(28).unwrap(), ServoCommand::PosRead);
        assert!(ServoCommand::try_from(0x40).is_err());
    }
}
