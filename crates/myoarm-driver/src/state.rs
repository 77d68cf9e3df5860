//! 共享状态上下文
//!
//! 接收线程/采样节拍是唯一写者，主线（指令层、CLI）是读者。
//! 快照经 `ArcSwap` 整体替换，读路径无锁（load 即最新一致快照）；
//! 标志位用原子布尔。除解析器的互斥包装外没有其他锁。

use arc_swap::ArcSwap;
use myoarm_protocol::{GyroFrameParser, ServoFrameParser};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 解析器的共享包装：接收循环喂字节，指令层查询/认领
pub type SharedServoParser = Arc<Mutex<ServoFrameParser>>;
pub type SharedGyroParser = Arc<Mutex<GyroFrameParser>>;

/// 滤波后的模拟量快照（4 路肌电传感器 + 基准电压）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalogSnapshot {
    pub sensors: [u16; 4],
    pub vref: u16,
}

/// 滤波后的运动量快照（角度 3 轴 + 角速度 3 轴，物理单位）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionSnapshot {
    /// 姿态角（度）
    pub angle_deg: [f32; 3],
    /// 角速度（°/s）
    pub rate_dps: [f32; 3],
}

/// 驱动共享上下文
pub struct ArmContext {
    analog: ArcSwap<AnalogSnapshot>,
    motion: ArcSwap<MotionSnapshot>,
    /// 硬件初始化完成前所有采样节拍为空操作
    hardware_ready: AtomicBool,
    /// 上位机应答标志：收到 0x57 前跳过遥测发送
    host_ack: AtomicBool,
}

impl ArmContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            analog: ArcSwap::from_pointee(AnalogSnapshot::default()),
            motion: ArcSwap::from_pointee(MotionSnapshot::default()),
            hardware_ready: AtomicBool::new(false),
            host_ack: AtomicBool::new(false),
        })
    }

    /// 最新模拟量快照（无锁读取）
    pub fn analog(&self) -> Arc<AnalogSnapshot> {
        self.analog.load_full()
    }

    /// 最新运动量快照（无锁读取）
    pub fn motion(&self) -> Arc<MotionSnapshot> {
        self.motion.load_full()
    }

    pub fn store_analog(&self, snapshot: AnalogSnapshot) {
        self.analog.store(Arc::new(snapshot));
    }

    pub fn store_motion(&self, snapshot: MotionSnapshot) {
        self.motion.store(Arc::new(snapshot));
    }

    pub fn is_hardware_ready(&self) -> bool {
        self.hardware_ready.load(Ordering::Acquire)
    }

    pub fn set_hardware_ready(&self, ready: bool) {
        self.hardware_ready.store(ready, Ordering::Release);
    }

    pub fn host_acked(&self) -> bool {
        self.host_ack.load(Ordering::Acquire)
    }

    pub fn set_host_acked(&self) {
        self.host_ack.store(true, Ordering::Release);
    }
}

impl Default for ArmContext {
    fn default() -> Self {
        Self {
            analog: ArcSwap::from_pointee(AnalogSnapshot::default()),
            motion: ArcSwap::from_pointee(MotionSnapshot::default()),
            hardware_ready: AtomicBool::new(false),
            host_ack: AtomicBool::new(false),
        }
    }
}
