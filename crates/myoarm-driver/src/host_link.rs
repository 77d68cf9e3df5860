//! 上位机遥测链路
//!
//! 与上位机的握手：设备发同步字节 0x56，上位机经虚拟串口回 0x57，
//! 接收回调置位应答标志。未收到应答期间每个采样节拍的发送被跳过
//! （跳过不是错误，是握手未完成的正常状态）。

use crate::error::DriverError;
use crate::state::ArmContext;
use myoarm_protocol::upstream::{ACK_SIGNAL, SYNC_SIGNAL, UpstreamFrame};
use myoarm_serial::SerialAdapter;
use std::sync::Arc;
use tracing::{debug, trace};

/// 上位机链路
pub struct HostLink<A: SerialAdapter> {
    adapter: A,
    ctx: Arc<ArmContext>,
}

impl<A: SerialAdapter> HostLink<A> {
    pub fn new(adapter: A, ctx: Arc<ArmContext>) -> Self {
        Self { adapter, ctx }
    }

    /// 发送同步字节，开启握手
    pub fn send_sync(&mut self) -> Result<(), DriverError> {
        self.adapter.send_all(&[SYNC_SIGNAL])?;
        debug!("sync signal sent, waiting for host ack");
        Ok(())
    }

    /// 发送模拟量遥测帧
    ///
    /// 返回 `Ok(true)` 表示已发送，`Ok(false)` 表示握手未完成本次跳过。
    pub fn send_analog(&mut self, values: [u16; 4]) -> Result<bool, DriverError> {
        self.send_frame(UpstreamFrame::analog(values))
    }

    /// 发送运动量遥测帧（负值钳零、放大 100 倍后收窄）
    pub fn send_motion(&mut self, values: [f32; 4]) -> Result<bool, DriverError> {
        self.send_frame(UpstreamFrame::motion(values))
    }

    fn send_frame(&mut self, frame: UpstreamFrame) -> Result<bool, DriverError> {
        if !self.ctx.host_acked() {
            trace!("host not acked yet, skip this tick's transmission");
            return Ok(false);
        }
        self.adapter.send_all(&frame.encode())?;
        Ok(true)
    }
}

/// 上位机方向的接收回调：识别应答字节并置位标志
///
/// 应答经由另一条传输链路（虚拟串口）到达，这里只认 0x57，其余字节忽略。
pub fn handle_host_byte(ctx: &ArmContext, byte: u8) {
    if byte == ACK_SIGNAL {
        ctx.set_host_acked();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myoarm_serial::MockSerialAdapter;

    #[test]
    fn test_transmission_skipped_until_ack() {
        let ctx = ArmContext::new();
        let mock = MockSerialAdapter::new();
        let mut link = HostLink::new(mock.clone(), ctx.clone());

        assert!(!link.send_analog([1, 2, 3, 4]).unwrap());
        assert!(mock.take_tx().is_empty());

        // 无关字节不触发应答
        handle_host_byte(&ctx, 0x00);
        assert!(!link.send_analog([1, 2, 3, 4]).unwrap());

        handle_host_byte(&ctx, ACK_SIGNAL);
        assert!(link.send_analog([3300, 0, 0, 0]).unwrap());

        let tx = mock.take_tx();
        assert_eq!(tx.len(), 13);
        assert_eq!(&tx[..5], &[0x55, 0x55, 0, 0x0C, 0xE4]);
        assert_eq!(tx[12], 0x78);
    }

    #[test]
    fn test_sync_byte_on_wire() {
        let ctx = ArmContext::new();
        let mock = MockSerialAdapter::new();
        let mut link = HostLink::new(mock.clone(), ctx);
        link.send_sync().unwrap();
        assert_eq!(mock.take_tx(), vec![SYNC_SIGNAL]);
    }
}
