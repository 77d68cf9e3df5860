//! # Myoarm CLI
//!
//! 假肢机械臂命令行工具（one-shot 模式：连接 → 执行 → 断开）。
//!
//! ```bash
//! # 真实串口
//! myoarm-cli --servo-port /dev/ttyUSB0 move --id 1 --position 500 --time 1000
//! myoarm-cli --servo-port /dev/ttyUSB0 position --id 1
//!
//! # Mock 总线（无硬件，演示/CI）
//! myoarm-cli --mock position --id 1
//! myoarm-cli --mock monitor --frequency 5
//! ```

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

mod rig;

use myoarm_driver::servo_bus::{SERVO_MOVE_TIME_MAX, SERVO_POSITION_MAX};
use rig::{PortConfig, Rig};

/// Myoarm CLI - 假肢机械臂命令行工具
#[derive(Parser, Debug)]
#[command(name = "myoarm-cli")]
#[command(about = "Command-line interface for myoarm prosthetic arm control", long_about = None)]
#[command(version)]
struct Cli {
    /// 舵机总线串口
    #[arg(long, global = true, default_value = "/dev/ttyUSB0")]
    servo_port: String,

    /// 陀螺仪串口
    #[arg(long, global = true, default_value = "/dev/ttyUSB1")]
    gyro_port: String,

    /// 上位机链路串口（虚拟串口）
    #[arg(long, global = true, default_value = "/dev/ttyACM0")]
    host_port: String,

    /// 使用 Mock 总线（无硬件）
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 转动舵机到目标位置
    Move {
        /// 舵机 ID（0~253，254 广播）
        #[arg(long)]
        id: u8,
        /// 目标位置 0~1000（对应 0~240 度）
        #[arg(long)]
        position: i16,
        /// 转动时间（毫秒，0~30000）
        #[arg(long, default_value_t = 1000)]
        time: u16,
    },

    /// 读取舵机当前位置
    Position {
        #[arg(long)]
        id: u8,
    },

    /// 重写舵机 ID（掉电保存）
    SetId {
        #[arg(long)]
        old: u8,
        #[arg(long)]
        new: u8,
    },

    /// 加载电机（有力矩输出）
    Load {
        #[arg(long)]
        id: u8,
    },

    /// 卸载电机（断电无力矩）
    Unload {
        #[arg(long)]
        id: u8,
    },

    /// 0~6 号舵机归位
    Home,

    /// 陀螺仪上电校准（加速度校准 + Z 轴归零）
    Calibrate,

    /// 监控遥测快照
    Monitor {
        /// 刷新频率（Hz）
        #[arg(short, long, default_value_t = 10)]
        frequency: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let rig = build_rig(&cli)?;
    run_command(&cli.command, rig)
}

fn build_rig(cli: &Cli) -> Result<Rig> {
    if cli.mock {
        return rig::spawn_mock();
    }

    #[cfg(feature = "port")]
    {
        rig::spawn_ports(&PortConfig {
            servo_port: cli.servo_port.clone(),
            gyro_port: cli.gyro_port.clone(),
            host_port: cli.host_port.clone(),
        })
    }
    #[cfg(not(feature = "port"))]
    {
        bail!("built without the `port` feature; use --mock")
    }
}

fn run_command(command: &Commands, mut rig: Rig) -> Result<()> {
    match command {
        Commands::Move { id, position, time } => {
            if !(0..=SERVO_POSITION_MAX).contains(position) {
                bail!("position out of range 0..={SERVO_POSITION_MAX}");
            }
            if *time > SERVO_MOVE_TIME_MAX {
                bail!("time out of range 0..={SERVO_MOVE_TIME_MAX}");
            }
            rig.servo_bus.move_immediately(*id, *position, *time)?;
            info!(id, position, time, "move issued");
        }

        Commands::Position { id } => {
            let position = rig.servo_bus.read_position(*id)?;
            println!("servo {id}: position {position}");
        }

        Commands::SetId { old, new } => {
            rig.servo_bus.set_id(*old, *new)?;
            info!(old, new, "id rewritten");
        }

        Commands::Load { id } => {
            rig.servo_bus.load(*id)?;
            info!(id, "motor loaded");
        }

        Commands::Unload { id } => {
            rig.servo_bus.unload(*id)?;
            info!(id, "motor unloaded");
        }

        Commands::Home => {
            rig.servo_bus.move_all_home()?;
            info!("all servos homed");
        }

        Commands::Calibrate => {
            // Mock 模式下持续注入角度帧，让校准轮询在预算内满足
            let feeder = rig.mock.as_ref().map(|mock| {
                let gyro = mock.gyro.clone();
                std::thread::spawn(move || {
                    let mut frame = [0u8; 11];
                    frame[0] = 0x55;
                    frame[1] = 0x53;
                    for _ in 0..20 {
                        gyro.push_rx(&frame);
                        std::thread::sleep(Duration::from_millis(10));
                    }
                })
            });
            let result = rig.gyro_link.calibrate();
            if let Some(handle) = feeder {
                let _ = handle.join();
            }
            result?;
            println!("gyroscope calibrated");
        }

        Commands::Monitor { frequency } => {
            monitor(&rig, *frequency)?;
        }
    }

    rig.driver.stop();
    Ok(())
}

/// 周期打印遥测快照，Ctrl-C 退出
fn monitor(rig: &Rig, frequency: u32) -> Result<()> {
    let ctx = rig.driver.context();
    ctx.set_hardware_ready(true);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::Release);
        })?;
    }

    let period = Duration::from_millis(1000 / frequency.max(1) as u64);
    while running.load(Ordering::Acquire) {
        let analog = ctx.analog();
        let motion = ctx.motion();
        println!(
            "emg [{:4} {:4} {:4} {:4}] vref {:4} | angle [{:7.2} {:7.2} {:7.2}] rate [{:7.2} {:7.2} {:7.2}]",
            analog.sensors[0],
            analog.sensors[1],
            analog.sensors[2],
            analog.sensors[3],
            analog.vref,
            motion.angle_deg[0],
            motion.angle_deg[1],
            motion.angle_deg[2],
            motion.rate_dps[0],
            motion.rate_dps[1],
            motion.rate_dps[2],
        );
        std::thread::sleep(period);
    }

    Ok(())
}
