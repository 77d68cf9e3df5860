//! 舵机总线校验和
//!
//! Checksum = ~(ID + LEN + CMD + P0 + ... + PN)，括号内求和超过 255 时取最低字节，
//! "~" 为按位取反。求和范围是完整帧中偏移 2 起的 LEN 个字节
//! （ID、长度、指令、参数），不含两个帧头和校验和本身。

use crate::ProtocolError;
use crate::servo::{MAX_DATA_LENGTH, MIN_DATA_LENGTH};

/// 对完整帧字节计算校验和
///
/// `frame` 必须至少包含帧头两字节与长度字段（偏移 3），且长度字段已经过
/// [3, 7] 范围校验 —— 解析器在进入校验阶段之前保证这一点。
pub fn checksum(frame: &[u8]) -> u8 {
    let len = frame[3] as usize;

    // 累加使用 u16，超过 255 时自然截断到低字节
    let mut sum: u16 = 0;
    for &b in &frame[2..2 + len] {
        sum = sum.wrapping_add(b as u16);
    }

    !(sum as u8)
}

/// 校验完整帧的尾部校验和字节
///
/// 校验失败是数据完整性错误，可恢复：调用方丢弃该帧等待下一帧即可。
/// 长度字段越界时求和范围无定义，返回 `InvalidValue` 而不是陷入越界。
pub fn validate_checksum(frame: &[u8]) -> Result<(), ProtocolError> {
    if frame.len() < 4 {
        return Err(ProtocolError::InvalidLength {
            expected: 4,
            actual: frame.len(),
        });
    }

    let len = frame[3];
    if !(MIN_DATA_LENGTH..=MAX_DATA_LENGTH).contains(&len) {
        return Err(ProtocolError::InvalidValue {
            field: "data_length",
            value: len,
        });
    }

    // 帧总长 = LEN + 3（两个帧头 + LEN 个计数字节 + 校验和）
    let total = len as usize + 3;
    if frame.len() < total {
        return Err(ProtocolError::InvalidLength {
            expected: total,
            actual: frame.len(),
        });
    }

    let expected = checksum(frame);
    let actual = frame[total - 1];
    if expected != actual {
        return Err(ProtocolError::ChecksumMismatch { expected, actual });
    }

    Ok(())
}
