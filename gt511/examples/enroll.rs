//! Enrollment example

use std::time::Duration;

use gt511::{Device, DeviceModel, EnrollOptions, Enrollment, SerialTransport};

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
    let id: u32 = std::env::args()
        .nth(1)
        .and_then(|id| id.parse().ok())
        .unwrap_or(0);

    let transport = SerialTransport::open(port, baud)?;
    let mut device = Device::new(transport, model);

    let enrollment = Enrollment::new(id)
        .with_options(EnrollOptions::default().with_finger_timeout(Duration::from_secs(15)));
    let mut progress = enrollment.subscribe();

    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = *progress.borrow();
            println!("-> {:?}", state);
        }
    });

    match enrollment.run(&mut device).await {
        Ok(()) => println!("Enrolled finger into slot {}", id),
        Err(e) => println!("Enrollment failed: {}", e.primary()),
    }

    device.close().await?;

    Ok(())
}
