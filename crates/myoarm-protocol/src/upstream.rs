//! 上位机遥测帧编码
//!
//! 固定 13 字节出站帧：
//!
//! ```text
//! | 0x55 | 0x55 | TYPE | D0H D0L | D1H D1L | D2H D2L | D3H D3L | 0x78 |
//! ```
//!
//! TYPE 0 为模拟量（肌电传感器 ADC），1 为运动量（陀螺仪角度/角速度）。
//! 每次发送即时构建，不保留。
//!
//! 与上位机的同步握手：设备先发同步字节 0x56，上位机经另一条链路
//! （虚拟串口）回 0x57 应答；当前采样节拍内未收到应答则跳过该次发送。

use crate::{ProtocolError, high_byte, low_byte};

/// 帧头字节
pub const UPSTREAM_FRAME_HEADER: u8 = 0x55;

/// 帧尾字节
pub const UPSTREAM_FRAME_STOP: u8 = 0x78;

/// 帧总长
pub const UPSTREAM_FRAME_LEN: usize = 13;

/// 同步字节（设备 → 上位机）
pub const SYNC_SIGNAL: u8 = 0x56;

/// 应答字节（上位机 → 设备）
pub const ACK_SIGNAL: u8 = 0x57;

/// 遥测数据类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TelemetryKind {
    /// 肌电传感器 ADC 电压值
    Analog = 0,
    /// 陀螺仪角度/角速度值
    Motion = 1,
}

impl TryFrom<u8> for TelemetryKind {
    type Error = ProtocolError;

    /// 未识别的类型标签是失败结果，不发送任何内容
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TelemetryKind::Analog),
            1 => Ok(TelemetryKind::Motion),
            _ => Err(ProtocolError::InvalidValue {
                field: "telemetry_kind",
                value,
            }),
        }
    }
}

/// 上位机遥测帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamFrame {
    pub kind: TelemetryKind,
    /// 已经归一到 u16 的四个通道值
    pub values: [u16; 4],
}

impl UpstreamFrame {
    /// 模拟量帧：u16 直接透传
    pub fn analog(values: [u16; 4]) -> Self {
        Self {
            kind: TelemetryKind::Analog,
            values,
        }
    }

    /// 运动量帧：负值钳到 0，放大 100 倍后收窄为 u16
    pub fn motion(values: [f32; 4]) -> Self {
        Self {
            kind: TelemetryKind::Motion,
            values: values.map(|v| (v.max(0.0) * 100.0) as u16),
        }
    }

    /// 序列化为 13 字节线上格式，数值高字节在前
    pub fn encode(&self) -> [u8; UPSTREAM_FRAME_LEN] {
        let mut buf = [0u8; UPSTREAM_FRAME_LEN];
        buf[0] = UPSTREAM_FRAME_HEADER;
        buf[1] = UPSTREAM_FRAME_HEADER;
        buf[2] = self.kind as u8;
        for (i, &v) in self.values.iter().enumerate() {
            buf[3 + i * 2] = high_byte(v);
            buf[4 + i * 2] = low_byte(v);
        }
        buf[12] = UPSTREAM_FRAME_STOP;
        buf
    }
}
