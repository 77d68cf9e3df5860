//! 链路装配
//!
//! 根据命令行参数选择真实串口或 Mock 总线，装配驱动后台线程，
//! 并构造指令层句柄。Mock 模式无硬件依赖，用于演示与 CI。

use anyhow::{Context, Result};
use myoarm_driver::{
    AdcReading, ArmDriver, ArmDriverParts, GyroLink, MockAdcSource, ServoBus, TickConfig,
};
use myoarm_serial::{MockSerialAdapter, SerialAdapter};
use tracing::info;

/// 串口路径配置
#[derive(Debug, Clone)]
pub struct PortConfig {
    pub servo_port: String,
    pub gyro_port: String,
    pub host_port: String,
}

/// 装配完成的运行环境
pub struct Rig {
    pub driver: ArmDriver,
    pub servo_bus: ServoBus<Box<dyn SerialAdapter + Send>>,
    pub gyro_link: GyroLink<Box<dyn SerialAdapter + Send>>,
    /// Mock 模式下保留注入句柄（真实串口时为 None）
    pub mock: Option<MockHandles>,
}

/// Mock 模式的注入句柄
pub struct MockHandles {
    /// 陀螺仪接收脚本（校准命令需要注入角度帧）
    pub gyro: MockSerialAdapter,
}

/// Mock 总线装配：舵机读位置自动回包，上位机应答预置
pub fn spawn_mock() -> Result<Rig> {
    let servo_mock = MockSerialAdapter::new();
    let gyro_mock = MockSerialAdapter::new();
    let host_rx_mock = MockSerialAdapter::new();
    let host_tx_mock = MockSerialAdapter::new();

    // 读指令自动回包：位置 500（演示值）
    let mut reply = vec![0x55, 0x55, 1, 5, 28];
    reply.extend_from_slice(&500i16.to_le_bytes());
    let sum: u16 = reply[2..].iter().map(|&b| b as u16).sum();
    reply.push(!(sum as u8));
    servo_mock.set_auto_reply(&reply);

    // 上位机立即应答握手
    host_rx_mock.push_rx(&[0x57]);

    let adc = MockAdcSource::new(AdcReading {
        sensors: [3300, 2900, 1500, 1000],
        vref: 800,
    });

    let parts = ArmDriverParts {
        servo_rx: Box::new(servo_mock.clone()),
        gyro_rx: Box::new(gyro_mock.clone()),
        host_rx: Box::new(host_rx_mock.clone()),
        host_tx: Box::new(host_tx_mock),
        adc: Box::new(adc),
    };
    let driver = ArmDriver::spawn(parts, TickConfig::default());
    info!("mock rig spawned");

    let servo_bus = ServoBus::new(
        Box::new(servo_mock.clone()) as Box<dyn SerialAdapter + Send>,
        driver.servo_parser(),
    );
    let gyro_link = GyroLink::new(
        Box::new(gyro_mock.clone()) as Box<dyn SerialAdapter + Send>,
        driver.gyro_parser(),
    );

    Ok(Rig {
        driver,
        servo_bus,
        gyro_link,
        mock: Some(MockHandles { gyro: gyro_mock }),
    })
}

/// 真实串口装配
#[cfg(feature = "port")]
pub fn spawn_ports(config: &PortConfig) -> Result<Rig> {
    use myoarm_serial::port::{GYRO_BAUD, PortAdapter, SERVO_BUS_BAUD};

    let servo = PortAdapter::open(&config.servo_port, SERVO_BUS_BAUD)
        .with_context(|| format!("open servo bus {}", config.servo_port))?;
    let servo_rx = servo.try_clone().context("clone servo port")?;

    let gyro = PortAdapter::open(&config.gyro_port, GYRO_BAUD)
        .with_context(|| format!("open gyro link {}", config.gyro_port))?;
    let gyro_rx = gyro.try_clone().context("clone gyro port")?;

    let host = PortAdapter::open(&config.host_port, SERVO_BUS_BAUD)
        .with_context(|| format!("open host link {}", config.host_port))?;
    let host_rx = host.try_clone().context("clone host port")?;

    let parts = ArmDriverParts {
        servo_rx: Box::new(servo_rx),
        gyro_rx: Box::new(gyro_rx),
        host_rx: Box::new(host_rx),
        host_tx: Box::new(host),
        adc: Box::new(MockAdcSource::new(AdcReading::default())),
    };
    let driver = ArmDriver::spawn(parts, TickConfig::default());
    info!(servo = %config.servo_port, gyro = %config.gyro_port, "port rig spawned");

    let servo_bus = ServoBus::new(
        Box::new(servo) as Box<dyn SerialAdapter + Send>,
        driver.servo_parser(),
    );
    let gyro_link = GyroLink::new(
        Box::new(gyro) as Box<dyn SerialAdapter + Send>,
        driver.gyro_parser(),
    );

    Ok(Rig {
        driver,
        servo_bus,
        gyro_link,
        mock: None,
    })
}
