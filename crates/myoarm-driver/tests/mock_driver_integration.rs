//! 全链路集成测试（Mock 串口，无硬件）
//!
//! 启动完整驱动（3 条接收线程 + 节拍线程），通过 Mock 串口注入
//! 陀螺仪帧、舵机回包与上位机应答，验证快照发布、遥测发送与
//! 指令层读回路径。

use myoarm_driver::{
    AdcReading, ArmDriver, ArmDriverParts, MockAdcSource, ServoBus, ServoBusConfig,
    TelemetryEvent, TickConfig,
};
use myoarm_serial::MockSerialAdapter;
use std::time::Duration;

struct MockRig {
    driver: ArmDriver,
    servo_bus_mock: MockSerialAdapter,
    gyro_mock: MockSerialAdapter,
    host_rx_mock: MockSerialAdapter,
    host_tx_mock: MockSerialAdapter,
}

fn spawn_rig() -> MockRig {
    let servo_bus_mock = MockSerialAdapter::new();
    let gyro_mock = MockSerialAdapter::new();
    let host_rx_mock = MockSerialAdapter::new();
    let host_tx_mock = MockSerialAdapter::new();

    let adc = MockAdcSource::new(AdcReading {
        sensors: [300, 600, 900, 1200],
        vref: 300,
    });

    let parts = ArmDriverParts {
        servo_rx: Box::new(servo_bus_mock.clone()),
        gyro_rx: Box::new(gyro_mock.clone()),
        host_rx: Box::new(host_rx_mock.clone()),
        host_tx: Box::new(host_tx_mock.clone()),
        adc: Box::new(adc),
    };
    let driver = ArmDriver::spawn(parts, TickConfig::default());

    MockRig {
        driver,
        servo_bus_mock,
        gyro_mock,
        host_rx_mock,
        host_tx_mock,
    }
}

fn angle_frame(x: i16, y: i16, z: i16) -> [u8; 11] {
    let mut f = [0u8; 11];
    f[0] = 0x55;
    f[1] = 0x53;
    f[2..4].copy_from_slice(&x.to_le_bytes());
    f[4..6].copy_from_slice(&y.to_le_bytes());
    f[6..8].copy_from_slice(&z.to_le_bytes());
    f
}

fn pos_reply(id: u8, position: i16) -> Vec<u8> {
    let mut bytes = vec![0x55, 0x55, id, 5, 28];
    bytes.extend_from_slice(&position.to_le_bytes());
    let sum: u16 = bytes[2..].iter().map(|&b| b as u16).sum();
    bytes.push(!(sum as u8));
    bytes
}

#[test]
fn test_full_pipeline_with_mock_bus() {
    let rig = spawn_rig();
    let ctx = rig.driver.context();
    let events = rig.driver.events();

    // 初始化完成前节拍空转：除启动时的同步字节外不应有任何遥测发出
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(rig.host_tx_mock.take_tx(), vec![0x56]);

    ctx.set_hardware_ready(true);

    // 上位机握手：注入应答字节
    rig.host_rx_mock.push_rx(&[0x57]);

    // 注入三帧角度包（X = 90°）
    for _ in 0..3 {
        rig.gyro_mock.push_rx(&angle_frame(16384, 0, 0));
    }

    // 等待节拍循环跑过若干运动量周期（20Hz → 50ms/拍）
    std::thread::sleep(Duration::from_millis(200));

    // 模拟量快照已按均值滤波收敛方向更新
    let analog = ctx.analog();
    assert!(analog.sensors[0] > 0);
    assert!(analog.sensors[3] > analog.sensors[0]);

    // 运动量快照反映注入的角度帧
    let motion = ctx.motion();
    assert!(motion.angle_deg[0] > 0.0, "angle_x = {}", motion.angle_deg[0]);

    // 遥测帧已发出（13 字节整数倍）
    let tx = rig.host_tx_mock.take_tx();
    assert!(!tx.is_empty());
    assert_eq!(tx.len() % 13, 0);
    assert_eq!(tx[0], 0x55);
    assert_eq!(tx[12], 0x78);

    // 事件通道同步收到遥测事件
    let mut saw_analog = false;
    let mut saw_motion = false;
    while let Ok(event) = events.try_recv() {
        match event {
            TelemetryEvent::Analog(_) => saw_analog = true,
            TelemetryEvent::Motion(_) => saw_motion = true,
        }
    }
    assert!(saw_analog);
    assert!(saw_motion);

    rig.driver.stop();
}

#[test]
fn test_read_position_through_rx_thread() {
    let rig = spawn_rig();

    let mut bus = ServoBus::with_config(
        rig.servo_bus_mock.clone(),
        rig.driver.servo_parser(),
        ServoBusConfig {
            retry_budget: 1000,
            poll_interval: Duration::from_micros(100),
        },
    );

    // 回包在指令帧写出后才进入接收脚本，再由接收线程喂入解析器
    rig.servo_bus_mock.set_auto_reply(&pos_reply(3, 456));
    assert_eq!(bus.read_position(3).unwrap(), 456);

    // 指令帧确实写上了总线
    let tx = rig.servo_bus_mock.take_tx();
    assert_eq!(&tx[..5], &[0x55, 0x55, 3, 3, 28]);

    rig.driver.stop();
}

#[test]
fn test_read_position_timeout_on_quiet_bus() {
    let rig = spawn_rig();

    let mut bus = ServoBus::with_config(
        rig.servo_bus_mock.clone(),
        rig.driver.servo_parser(),
        ServoBusConfig {
            retry_budget: 20,
            poll_interval: Duration::from_micros(100),
        },
    );

    // 总线安静：有限预算耗尽后报超时，不挂起不崩溃
    let err = bus.read_position(1).unwrap_err();
    assert!(matches!(err, myoarm_driver::DriverError::ReceiveTimeout));

    rig.driver.stop();
}
