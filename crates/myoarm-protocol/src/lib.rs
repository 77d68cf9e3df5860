//! # Myoarm Protocol
//!
//! 假肢机械臂串行协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `checksum`: 舵机总线校验和计算/校验
//! - `servo`: 舵机总线帧构建与逐字节解析
//! - `gyro`: 串口陀螺仪帧解析与主机指令
//! - `upstream`: 上位机遥测帧编码
//!
//! ## 字节序
//!
//! 三条链路的字节序并不一致，这是设备侧协议的既成事实：
//! - 舵机总线参数为小端（低字节在前）
//! - 陀螺仪轴数据为小端 i16
//! - 上位机遥测为大端（高字节在前）
//!
//! 本模块提供了对应的转换工具函数。

pub mod checksum;
pub mod gyro;
pub mod servo;
pub mod upstream;

// 重新导出常用类型
pub use checksum::{checksum, validate_checksum};
pub use gyro::{
    Acceleration, Angle, AngularRate, GyroCommand, GyroFeed, GyroFrameParser, GyroRecordKind,
};
pub use servo::{
    ServoCommand, ServoFeed, ServoFrame, ServoFrameParser, ServoRejection, BROADCAST_ID,
    SERVO_FRAME_HEADER,
};
pub use upstream::{TelemetryKind, UpstreamFrame, ACK_SIGNAL, SYNC_SIGNAL};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: u8 },
}

/// 字节拆分/合成工具函数
///
/// 舵机总线的 16 位参数按低字节在前发送，
/// 上位机遥测按高字节在前发送。两侧共用这组函数。
///
/// 取 16 位值的低字节
pub fn low_byte(value: u16) -> u8 {
    value as u8
}

/// 取 16 位值的高字节
pub fn high_byte(value: u16) -> u8 {
    (value >> 8) as u8
}

/// 高低字节合成 16 位值（高字节在前）
pub fn bytes_to_u16(high: u8, low: u8) -> u16 {
    ((high as u16) << 8) | (low as u16)
}

/// 小端字节对转 i16（陀螺仪轴数据、舵机位置返回值）
pub fn bytes_to_i16_le(low: u8, high: u8) -> i16 {
    i16::from_le_bytes([low, high])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_high_byte() {
        assert_eq!(low_byte(0x0CE4), 0xE4);
        assert_eq!(high_byte(0x0CE4), 0x0C);
    }

    #[test]
    fn test_bytes_to_u16() {
        assert_eq!(bytes_to_u16(0x0C, 0xE4), 0x0CE4);
    }

    #[test]
    fn test_bytes_to_i16_le_negative() {
        assert_eq!(bytes_to_i16_le(0xFF, 0xFF), -1);
        assert_eq!(bytes_to_i16_le(0x2C, 0x01), 300);
    }

    #[test]
    fn test_roundtrip_u16() {
        let original = 0xBEEF;
        let assembled = bytes_to_u16(high_byte(original), low_byte(original));
        assert_eq!(original, assembled);
    }
}
