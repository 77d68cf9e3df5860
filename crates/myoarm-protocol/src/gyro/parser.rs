//! 陀螺仪逐字节解析状态机
//!
//! 名义上只有 "搜帧头" 与 "累积" 两个状态，实际仅以缓冲下标区分：
//! 每个字节先写入 `buf[idx]`，随后检查位置 0 是否为帧头 —— 不是则下标清零，
//! 刚写入的违例字节自然成为下一轮位置 0 的候选。帧头重对齐依赖这一
//! 先写后查的次序。

use super::{
    Acceleration, Angle, AngularRate, GYRO_FRAME_HEADER, GYRO_FRAME_LEN, GyroRecordKind,
};

/// 单字节喂入的结果
///
/// 下游（校准例程等）依赖完成状态轮询，因此解析器显式返回结果
/// 而不是静默累积。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroFeed {
    /// 位置 0 不是帧头，缓冲已重启（违例字节成为新的帧头候选）
    Rejected,
    /// 不足 11 字节，继续累积
    Incomplete,
    /// 一帧完成且对应记录已更新，下标已清零
    Complete(GyroRecordKind),
}

/// 陀螺仪帧解析器
///
/// 持有三份持久解码记录（加速度、角速度、角度），按子类型分发更新；
/// 对外暴露 "最新有效帧" 语义，单写者（接收侧）单读者（主线）。
#[derive(Debug, Default)]
pub struct GyroFrameParser {
    buf: [u8; GYRO_FRAME_LEN],
    idx: usize,

    acceleration: Acceleration,
    angular_rate: AngularRate,
    angle: Angle,

    /// 成功解码的帧计数，校准例程据此判断数据流存活
    frames_decoded: u64,
}

impl GyroFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一个接收字节，每个接收字节恰好调用一次
    pub fn feed_byte(&mut self, byte: u8) -> GyroFeed {
        self.buf[self.idx] = byte;
        self.idx += 1;

        // 帧头不对则重新搜索 0x55，包括帧中途发现的情况
        if self.buf[0] != GYRO_FRAME_HEADER {
            self.idx = 0;
            return GyroFeed::Rejected;
        }

        if self.idx < GYRO_FRAME_LEN {
            return GyroFeed::Incomplete;
        }

        // 11 字节集齐：按子类型把 8 字节载荷拷入对应记录
        self.idx = 0;
        match GyroRecordKind::try_from(self.buf[1]) {
            Ok(kind) => {
                let (axes, reserved) = Self::decode_payload(&self.buf);
                match kind {
                    GyroRecordKind::Acceleration => {
                        self.acceleration = Acceleration { raw: axes, reserved };
                    }
                    GyroRecordKind::AngularRate => {
                        self.angular_rate = AngularRate { raw: axes, reserved };
                    }
                    GyroRecordKind::Angle => {
                        self.angle = Angle { raw: axes, reserved };
                    }
                }
                self.frames_decoded += 1;
                GyroFeed::Complete(kind)
            }
            // 未知子类型：静默丢弃整帧，下标照常清零
            Err(_) => GyroFeed::Rejected,
        }
    }

    fn decode_payload(buf: &[u8; GYRO_FRAME_LEN]) -> ([i16; 3], i16) {
        let axes = [
            i16::from_le_bytes([buf[2], buf[3]]),
            i16::from_le_bytes([buf[4], buf[5]]),
            i16::from_le_bytes([buf[6], buf[7]]),
        ];
        let reserved = i16::from_le_bytes([buf[8], buf[9]]);
        (axes, reserved)
    }

    /// 最新加速度记录
    pub fn acceleration(&self) -> Acceleration {
        self.acceleration
    }

    /// 最新角速度记录
    pub fn angular_rate(&self) -> AngularRate {
        self.angular_rate
    }

    /// 最新角度记录
    pub fn angle(&self) -> Angle {
        self.angle
    }

    /// 当前累积字节数（帧完成后立即为 0）
    pub fn pending_len(&self) -> usize {
        self.idx
    }

    /// 累计成功解码帧数
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angular_rate_frame(x: i16, y: i16, z: i16) -> [u8; 11] {
        let mut f = [0u8; 11];
        f[0] = 0x55;
        f[1] = 0x52;
        f[2..4].copy_from_slice(&x.to_le_bytes());
        f[4..6].copy_from_slice(&y.to_le_bytes());
        f[6..8].copy_from_slice(&z.to_le_bytes());
        // f[8..10] 保留字段，f[10] 本协议无校验和，留 0
        f
    }

    #[test]
    fn test_complete_frame_updates_angular_rate() {
        let mut parser = GyroFrameParser::new();
        let frame = angular_rate_frame(100, 200, 300);

        for &b in &frame[..10] {
            assert_ne!(parser.feed_byte(b), GyroFeed::Complete(GyroRecordKind::AngularRate));
        }
        assert_eq!(
            parser.feed_byte(frame[10]),
            GyroFeed::Complete(GyroRecordKind::AngularRate)
        );

        assert_eq!(parser.angular_rate().raw, [100, 200, 300]);
        // 第 11 字节之后下标立即回零
        assert_eq!(parser.pending_len(), 0);
    }

    #[test]
    fn test_garbage_byte_discarded_then_frame_parses() {
        let mut parser = GyroFrameParser::new();
        assert_eq!(parser.feed_byte(0x12), GyroFeed::Rejected);

        let mut frame = angular_rate_frame(1, 2, 3);
        frame[1] = 0x51; // 加速度包
        for &b in &frame {
            parser.feed_byte(b);
        }
        assert_eq!(parser.acceleration().raw, [1, 2, 3]);
    }

    #[test]
    fn test_unknown_subtype_dropped_silently() {
        let mut parser = GyroFrameParser::new();
        let mut frame = angular_rate_frame(7, 8, 9);
        frame[1] = 0x54;

        let mut last = GyroFeed::Incomplete;
        for &b in &frame {
            last = parser.feed_byte(b);
        }
        assert_eq!(last, GyroFeed::Rejected);
        assert_eq!(parser.pending_len(), 0);
        // 任何记录都未被污染
        assert_eq!(parser.angular_rate().raw, [0, 0, 0]);
        assert_eq!(parser.acceleration().raw, [0, 0, 0]);
        assert_eq!(parser.angle().raw, [0, 0, 0]);
    }

    #[test]
    fn test_midstream_resync() {
        let mut parser = GyroFrameParser::new();
        // 半截帧后线路恢复：0x55 开头但字节流在第 4 字节断开，
        // 随后的完整帧字节会被并入同一缓冲 —— 协议无校验和，
        // 解析器只能依赖帧头重对齐，这里验证它不会卡死。
        for &b in &[0x55u8, 0x52, 0x01] {
            parser.feed_byte(b);
        }
        let frame = angular_rate_frame(100, 200, 300);
        for &b in &frame {
            parser.feed_byte(b);
        }
        // 错位帧吸收了 8 个字节后完成一帧（内容已损坏，这正是协议弱点），
        // 剩余字节重新开始累积
        assert!(parser.pending_len() < GYRO_FRAME_LEN);
    }

    #[test]
    fn test_reserved_field_decoded() {
        let mut parser = GyroFrameParser::new();
        let mut frame = angular_rate_frame(0, 0, 0);
        frame[1] = 0x53;
        frame[8..10].copy_from_slice(&(-7i16).to_le_bytes());
        for &b in &frame {
            parser.feed_byte(b);
        }
        assert_eq!(parser.angle().reserved, -7);
    }
}
