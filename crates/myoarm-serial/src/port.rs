//! 真实串口后端（`serialport` crate）
//!
//! 舵机总线 115200 8N1，陀螺仪 9600 8N1。单字节读取的超时由
//! 底层串口超时承担，上层把 `TimedOut` 折叠为 [`SerialError::Timeout`]。

use crate::{SerialAdapter, SerialError};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

/// 舵机总线默认波特率
pub const SERVO_BUS_BAUD: u32 = 115_200;

/// 陀螺仪链路默认波特率
pub const GYRO_BAUD: u32 = 9_600;

/// `serialport` 后端适配器
pub struct PortAdapter {
    port: Box<dyn serialport::SerialPort>,
    /// 单字节读缓冲，避免每次调用分配
    byte: [u8; 1],
}

impl PortAdapter {
    /// 打开串口
    ///
    /// 默认 10ms 接收超时：轮询式单字节读取下，超时决定接收循环的
    /// 最大空转粒度，取值与解析周期同量级即可。
    pub fn open(path: &str, baud: u32) -> Result<Self, SerialError> {
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(10))
            .open()
            .map_err(|e| SerialError::Device(e.to_string()))?;
        debug!(path, baud, "serial port opened");

        Ok(Self {
            port,
            byte: [0u8; 1],
        })
    }

    /// 克隆句柄：同一物理串口的收发两端分属不同线程时使用
    pub fn try_clone(&self) -> Result<Self, SerialError> {
        let port = self
            .port
            .try_clone()
            .map_err(|e| SerialError::Device(e.to_string()))?;
        Ok(Self {
            port,
            byte: [0u8; 1],
        })
    }
}

impl SerialAdapter for PortAdapter {
    fn send_all(&mut self, buf: &[u8]) -> Result<(), SerialError> {
        self.port.write_all(buf)?;
        Ok(())
    }

    fn recv_byte(&mut self) -> Result<u8, SerialError> {
        match self.port.read_exact(&mut self.byte) {
            Ok(()) => Ok(self.byte[0]),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(SerialError::Timeout),
            Err(e) => Err(SerialError::Io(e)),
        }
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        // set_timeout 只有在句柄失效时才会失败，此处记录后继续
        if let Err(e) = self.port.set_timeout(timeout) {
            debug!(error = %e, "failed to update serial receive timeout");
        }
    }
}
