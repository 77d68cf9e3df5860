//! # Myoarm Serial Adapter Layer
//!
//! 串口硬件抽象层，提供统一的字节流接口抽象。
//!
//! 接收端以单字节为粒度：设备侧固件的接收中断一次只收一个字符，
//! 解析器也以此为输入契约，适配层保持同样的粒度。发送端为阻塞整包发送。

use std::time::Duration;
use thiserror::Error;

pub mod mock;

pub use mock::MockSerialAdapter;

#[cfg(feature = "port")]
pub mod port;

#[cfg(feature = "port")]
pub use port::PortAdapter;

/// 串口适配层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Read timeout")]
    Timeout,
    #[error("Port closed")]
    Closed,
    #[error("Device Error: {0}")]
    Device(String),
}

impl SerialError {
    /// 超时是正常瞬态（安静总线），不算故障
    pub fn is_timeout(&self) -> bool {
        matches!(self, SerialError::Timeout)
    }
}

/// 串口适配器接口
///
/// 发送为阻塞整包写出；接收为单字节、带超时。
pub trait SerialAdapter {
    /// 阻塞发送整个缓冲区
    fn send_all(&mut self, buf: &[u8]) -> Result<(), SerialError>;

    /// 接收一个字节（受当前接收超时约束）
    fn recv_byte(&mut self) -> Result<u8, SerialError>;

    /// 设置接收超时
    fn set_receive_timeout(&mut self, _timeout: Duration) {}

    /// 非阻塞尝试接收：超时折叠为 `None`
    fn try_recv_byte(&mut self) -> Result<Option<u8>, SerialError> {
        match self.recv_byte() {
            Ok(b) => Ok(Some(b)),
            Err(SerialError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// 对 Box<dyn SerialAdapter> 的透传实现，方便运行期选择后端
impl<T: SerialAdapter + ?Sized> SerialAdapter for Box<T> {
    fn send_all(&mut self, buf: &[u8]) -> Result<(), SerialError> {
        (**self).send_all(buf)
    }

    fn recv_byte(&mut self) -> Result<u8, SerialError> {
        (**self).recv_byte()
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        (**self).set_receive_timeout(timeout)
    }
}
