//! Mock 串口适配器（无硬件依赖）
//!
//! 测试与 `--mock` 运行模式共用：RX 侧按脚本回放字节，TX 侧全量捕获。
//! 脚本耗尽后接收返回超时，与安静总线行为一致。

use crate::{SerialAdapter, SerialError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 脚本化的 Mock 串口
///
/// 内部状态用 `Arc<Mutex>` 共享，克隆出的句柄观察同一条总线 ——
/// 测试里一端注入 RX 字节、另一端检查 TX 捕获。
#[derive(Clone, Default)]
pub struct MockSerialAdapter {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    rx_script: VecDeque<u8>,
    tx_captured: Vec<u8>,
    /// 每发出一包后自动注入的回包（读指令仿真）
    auto_reply: Option<Vec<u8>>,
}

impl MockSerialAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加接收脚本字节
    pub fn push_rx(&self, bytes: &[u8]) {
        let mut st = self.inner.lock().unwrap();
        st.rx_script.extend(bytes.iter().copied());
    }

    /// 设定自动回包：每次 `send_all` 之后把这些字节排入接收脚本
    pub fn set_auto_reply(&self, bytes: &[u8]) {
        let mut st = self.inner.lock().unwrap();
        st.auto_reply = Some(bytes.to_vec());
    }

    /// 取走目前捕获到的全部发送字节
    pub fn take_tx(&self) -> Vec<u8> {
        let mut st = self.inner.lock().unwrap();
        std::mem::take(&mut st.tx_captured)
    }

    /// 剩余未消费的接收脚本长度
    pub fn rx_remaining(&self) -> usize {
        self.inner.lock().unwrap().rx_script.len()
    }
}

impl SerialAdapter for MockSerialAdapter {
    fn send_all(&mut self, buf: &[u8]) -> Result<(), SerialError> {
        let mut st = self.inner.lock().unwrap();
        st.tx_captured.extend_from_slice(buf);
        if let Some(reply) = st.auto_reply.clone() {
            st.rx_script.extend(reply);
        }
        Ok(())
    }

    fn recv_byte(&mut self) -> Result<u8, SerialError> {
        let mut st = self.inner.lock().unwrap();
        st.rx_script.pop_front().ok_or(SerialError::Timeout)
    }

    fn set_receive_timeout(&mut self, _timeout: Duration) {
        // 脚本模式下超时立即生效，无需配置
    }
}
