//! High-level device interface

use std::time::Duration;

use bytes::Bytes;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info};

use gt511_core::{
    constants::{DEFAULT_POLL_INTERVAL_MS, DEVICE_INFO_FRAME_SIZE},
    DataPacket, Opcode,
};
use gt511_transport::Transport;
use gt511_types::{BaudRate, DeviceInfo, DeviceModel, DeviceProfile};

use crate::channel::Channel;
use crate::enroll::{Enrollment, Stage};
use crate::error::{Error, Result};

/// Finger state to wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerTarget {
    Pressed,
    Released,
}

impl FingerTarget {
    fn pressed(self) -> bool {
        matches!(self, Self::Pressed)
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Pressed => "finger press",
            Self::Released => "finger release",
        }
    }
}

/// GT-511 fingerprint sensor
///
/// Every operation is one exchange with the sensor, issued and settled
/// before the next one can start.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use gt511::{Device, DeviceModel, StreamTransport};
///
/// #[tokio::main]
/// async fn main() -> gt511::Result<()> {
///     let transport = StreamTransport::connect_tcp("192.168.1.50", 4001, Duration::from_secs(5)).await?;
///     let mut device = Device::new(transport, DeviceModel::GT511C3);
///
///     let info = device.open_with_info().await?;
///     println!("Sensor: {}", info);
///
///     device.switch_led(true).await?;
///     let id = device.identify().await?;
///     println!("Matched id {}", id);
///     device.switch_led(false).await?;
///
///     Ok(())
/// }
/// ```
pub struct Device<T> {
    channel: Channel<T>,
    model: DeviceModel,
    profile: DeviceProfile,
    poll_interval: Duration,
    info: Option<DeviceInfo>,
}

impl<T: Transport> Device<T> {
    /// Create a device on top of an open transport
    pub fn new(transport: T, model: DeviceModel) -> Self {
        Self {
            channel: Channel::new(transport),
            model,
            profile: model.profile(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            info: None,
        }
    }

    /// Set the timeout of plain command/response exchanges
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.channel.set_command_timeout(timeout);
        self
    }

    /// Set the timeout of matching, capturing, enrolling and erasing
    pub fn with_slow_command_timeout(mut self, timeout: Duration) -> Self {
        self.channel.set_slow_command_timeout(timeout);
        self
    }

    /// Set the timeout of data transfers (templates, images, device info)
    pub fn with_data_timeout(mut self, timeout: Duration) -> Self {
        self.channel.set_data_timeout(timeout);
        self
    }

    /// Set the default finger presence polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn model(&self) -> DeviceModel {
        self.model
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Information reported by the last [`Device::open_with_info`]
    pub fn info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.channel.transport_mut()
    }

    pub fn into_transport(self) -> T {
        self.channel.into_transport()
    }

    pub fn channel(&self) -> &Channel<T> {
        &self.channel
    }

    /// Unblock the device after an abandoned operation
    pub fn recover(&mut self) {
        self.channel.recover();
    }

    /// Initialise the sensor
    pub async fn open(&mut self) -> Result<()> {
        self.command(Opcode::Open, 0).await?;
        info!("Opened {} on {}", self.model, self.channel.transport().describe());
        Ok(())
    }

    /// Initialise the sensor and read its firmware and serial number
    pub async fn open_with_info(&mut self) -> Result<DeviceInfo> {
        let payload = self
            .channel
            .request_data(Opcode::Open, 1, DEVICE_INFO_FRAME_SIZE)
            .await?;

        let info = DeviceInfo::parse(&payload)?;
        info!("Opened {}: {}", self.model, info);

        self.info = Some(info.clone());
        Ok(info)
    }

    /// Put the sensor back to its idle state
    pub async fn close(&mut self) -> Result<()> {
        self.command(Opcode::Close, 0).await?;
        Ok(())
    }

    /// Switch the backlight used for capturing
    pub async fn switch_led(&mut self, on: bool) -> Result<()> {
        self.command(Opcode::CmosLed, u32::from(on)).await?;
        Ok(())
    }

    /// Number of enrolled fingerprints
    pub async fn enroll_count(&mut self) -> Result<u16> {
        self.command(Opcode::GetEnrollCount, 0).await
    }

    /// Succeeds if `id` holds a template
    pub async fn check_enrolled(&mut self, id: u32) -> Result<()> {
        self.command(Opcode::CheckEnrolled, id).await?;
        Ok(())
    }

    /// Begin enrolling into slot `id`
    pub async fn enroll_start(&mut self, id: u32) -> Result<()> {
        self.command(Opcode::EnrollStart, id).await?;
        Ok(())
    }

    /// Merge the last capture into the template being enrolled
    pub async fn enroll(&mut self, stage: Stage) -> Result<()> {
        self.command(stage.opcode(), 0).await?;
        Ok(())
    }

    /// Succeeds if a finger is on the sensor
    ///
    /// The sensor reports presence as parameter 0; anything else means no
    /// finger and fails with [`Error::FingerNotPressed`].
    pub async fn is_press_finger(&mut self) -> Result<()> {
        if self.finger_pressed().await? {
            Ok(())
        } else {
            Err(Error::FingerNotPressed)
        }
    }

    /// Check whether a finger is on the sensor
    pub async fn finger_pressed(&mut self) -> Result<bool> {
        let param = self.command(Opcode::IsPressFinger, 0).await?;
        Ok(param == 0)
    }

    /// Poll at the configured interval until the finger reaches `target`
    pub async fn wait_for_finger(&mut self, timeout: Duration, target: FingerTarget) -> Result<()> {
        let interval = self.poll_interval;
        self.wait_for_finger_every(timeout, target, interval).await
    }

    /// Poll every `poll_interval` until the finger reaches `target`
    ///
    /// The first poll happens one interval after the call. Fails with
    /// [`Error::Timeout`] once `timeout` has elapsed; a poll still waiting
    /// for its reply at that point gives up with it and leaves the reply
    /// owed (see [`Channel`]). Failed polls count as "no change", for
    /// either target.
    pub async fn wait_for_finger_every(
        &mut self,
        timeout: Duration,
        target: FingerTarget,
        poll_interval: Duration,
    ) -> Result<()> {
        let deadline_at = Instant::now() + timeout;
        let deadline = sleep_until(deadline_at);
        tokio::pin!(deadline);

        let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut polls = 0u32;
        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => {
                    debug!(polls, "Gave up waiting for {}", target.describe());
                    return Err(Error::Timeout {
                        waiting_for: target.describe(),
                        millis: timeout.as_millis() as u64,
                    });
                }
                _ = ticker.tick() => {}
            }

            polls += 1;
            let limit = deadline_at.saturating_duration_since(Instant::now());
            match self
                .channel
                .send_command_within(Opcode::IsPressFinger, 0, limit)
                .await
            {
                Ok(param) if (param == 0) == target.pressed() => {
                    debug!(polls, "Got {}", target.describe());
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Finger poll failed"),
            }
        }
    }

    /// 1:1 match of the captured finger against slot `id`
    pub async fn verify(&mut self, id: u32) -> Result<()> {
        self.command(Opcode::Verify, id).await?;
        Ok(())
    }

    /// 1:N match of the captured finger, returning the matching id
    pub async fn identify(&mut self) -> Result<u16> {
        self.command(Opcode::Identify, 0).await
    }

    /// Capture a finger image, `best` trading speed for quality
    pub async fn capture_finger(&mut self, best: bool) -> Result<()> {
        self.command(Opcode::CaptureFinger, u32::from(best)).await?;
        Ok(())
    }

    /// Delete the template in slot `id`
    pub async fn delete_id(&mut self, id: u32) -> Result<()> {
        self.command(Opcode::DeleteId, id).await?;
        Ok(())
    }

    /// Delete every template
    pub async fn delete_all(&mut self) -> Result<()> {
        self.command(Opcode::DeleteAll, 0).await?;
        Ok(())
    }

    /// Build a template from the last capture without storing it
    pub async fn make_template(&mut self) -> Result<Bytes> {
        let frame_len = DataPacket::frame_len(self.profile.template_size);
        self.channel
            .request_data(Opcode::MakeTemplate, 0, frame_len)
            .await
    }

    /// Download the template stored in slot `id`
    pub async fn get_template(&mut self, id: u32) -> Result<Bytes> {
        let frame_len = DataPacket::frame_len(self.profile.template_size);
        self.channel
            .request_data(Opcode::GetTemplate, id, frame_len)
            .await
    }

    /// Download the last captured image (8-bit grayscale)
    pub async fn get_image(&mut self) -> Result<Bytes> {
        let frame_len = DataPacket::frame_len(self.profile.image_bytes());
        self.channel.request_data(Opcode::GetImage, 0, frame_len).await
    }

    /// Capture and download a low resolution preview image
    pub async fn get_raw_image(&mut self) -> Result<Bytes> {
        let frame_len = DataPacket::frame_len(self.profile.raw_image_bytes());
        self.channel
            .request_data(Opcode::GetRawImage, 0, frame_len)
            .await
    }

    /// Store `template` in slot `id`
    pub async fn set_template(&mut self, id: u32, template: &[u8]) -> Result<()> {
        self.check_template(template)?;
        self.channel
            .command_with_data(Opcode::SetTemplate, id, template)
            .await?;
        Ok(())
    }

    /// 1:1 match of `template` against slot `id`
    pub async fn verify_template(&mut self, id: u32, template: &[u8]) -> Result<()> {
        self.check_template(template)?;
        self.channel
            .command_with_data(Opcode::VerifyTemplate, id, template)
            .await?;
        Ok(())
    }

    /// 1:N match of `template`, returning the matching id
    pub async fn identify_template(&mut self, template: &[u8]) -> Result<u16> {
        self.check_template(template)?;
        self.channel
            .command_with_data(Opcode::IdentifyTemplate, 0, template)
            .await
    }

    /// Switch sensor and transport to a new line speed
    ///
    /// Rejected without talking to the sensor if `rate` is the current
    /// speed or not one the sensor supports. The transport is only
    /// reconfigured after the sensor acknowledged; if that reconfiguration
    /// fails the two ends disagree and the session is unusable.
    pub async fn change_baud_rate(&mut self, rate: u32) -> Result<()> {
        let current = self.channel.transport().baud_rate();
        if rate == current {
            return Err(gt511_types::Error::Validation(format!(
                "baud rate already set to {}",
                rate
            ))
            .into());
        }

        let baud = BaudRate::try_from(rate)?;

        self.command(Opcode::ChangeBaudrate, baud.as_u32()).await?;
        self.channel
            .transport_mut()
            .set_baud_rate(baud.as_u32())
            .await?;

        info!("Line speed changed from {} to {}", current, baud);
        Ok(())
    }

    /// Run the three-capture enrollment workflow into slot `id`
    ///
    /// Use [`Enrollment`] directly to change delays or watch progress.
    pub async fn enroll_finger(&mut self, id: u32) -> Result<()> {
        Enrollment::new(id).run(self).await
    }

    async fn command(&mut self, command: Opcode, param: u32) -> Result<u16> {
        self.channel.send_command(command, param).await
    }

    fn check_template(&self, template: &[u8]) -> Result<()> {
        if template.len() != self.profile.template_size {
            return Err(gt511_types::Error::Validation(format!(
                "{} templates are {} bytes, got {}",
                self.model,
                self.profile.template_size,
                template.len()
            ))
            .into());
        }
        Ok(())
    }
}
