//! 驱动层模块
//!
//! 本模块提供假肢机械臂的设备驱动功能，包括：
//! - 舵机总线指令层（移动、设 ID、加载/卸载、读位置）
//! - 陀螺仪链路指令与上电校准
//! - 周期采样调度（均值滤波 + 上位机遥测）
//! - 接收线程管理与状态同步（ArcSwap 无锁读取）
//!
//! 并发模型沿用设备端的 "中断 vs 主线" 划分：接收线程是唯一写者，
//! 指令层/查询方是读者；阻塞等待都有有限预算，从不无限期阻塞。

mod driver;
mod error;
pub mod filter;
pub mod gyro_link;
pub mod host_link;
pub mod pipeline;
pub mod sampler;
pub mod servo_bus;
pub mod state;

pub use driver::{ArmDriver, ArmDriverParts};
pub use error::DriverError;
pub use filter::{MEAN_FILTER_LEN, MeanFilterF32, MeanFilterU16};
pub use gyro_link::{GyroLink, GyroLinkConfig};
pub use host_link::HostLink;
pub use pipeline::{TickConfig, gyro_rx_loop, host_rx_loop, servo_rx_loop, tick_loop};
pub use sampler::{AdcReading, AdcSource, MockAdcSource, SampleDispatcher, TelemetryEvent, TimerId};
pub use servo_bus::{ServoBus, ServoBusConfig};
pub use state::{AnalogSnapshot, ArmContext, MotionSnapshot, SharedGyroParser, SharedServoParser};
