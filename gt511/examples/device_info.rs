//! Device info example

use gt511::{Device, DeviceModel, SerialTransport};

#[tokio::main]
async fn main() -> gt511::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let port = std::env::var("GT511_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let baud = std::env::var("GT511_BAUD")
        .ok()
        .and_then(|b| b.parse().ok())
        .unwrap_or(9600);
    let model: DeviceModel = std::env::var("GT511_MODEL")
        .unwrap_or_else(|_| "GT511C3".to_string())
        .parse()?;

    let transport = SerialTransport::open(port, baud)?;
    let mut device = Device::new(transport, model);

    let info = device.open_with_info().await?;
    println!("Firmware:      {}", info.firmware_version);
    println!("ISO area max:  {}", info.iso_area_max_size);
    println!("Serial number: {}", info.serial_number);

    let count = device.enroll_count().await?;
    println!(
        "Enrolled:      {} / {}",
        count,
        device.profile().max_fingerprints
    );

    device.close().await?;

    Ok(())
}
