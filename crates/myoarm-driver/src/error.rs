//! 驱动层错误类型定义
//!
//! 字节层解析器从不上抛 —— 畸形输入就地复位静默等待下一个合法帧；
//! 只有指令层操作（读位置、校准等）向调用方暴露失败，并区分
//! "超时" 与 "校验失败"，调用方据此决定重试还是放弃。

use myoarm_protocol::ProtocolError;
use myoarm_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口传输错误
    #[error("Serial transport error: {0}")]
    Serial(#[from] SerialError),

    /// 协议编码/解码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 回包等待超出重试预算
    #[error("Receive timeout: retry budget exhausted")]
    ReceiveTimeout,

    /// 回包校验和不匹配（与超时是不同的失败，调用方可能选择立即重发）
    #[error("Reply checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}
