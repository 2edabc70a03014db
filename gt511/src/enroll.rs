//! Three-capture enrollment workflow
//!
//! Enrollment is a fixed sequence of [`Step`]s. [`Enrollment::plan`] lists
//! them and [`Enrollment::run`] executes them in order against a
//! [`Device`]. The first failing step ends the run: the backlight is
//! switched off once and the step's error is returned. Progress can be
//! followed through [`Enrollment::subscribe`].

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use gt511_core::Opcode;
use gt511_transport::Transport;

use crate::device::{Device, FingerTarget};
use crate::error::{Error, Result};

/// One of the three captures merged into a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    First,
    Second,
    Third,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::First, Stage::Second, Stage::Third];

    /// 1, 2 or 3
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }

    /// Command that merges this capture
    pub fn opcode(self) -> Opcode {
        match self {
            Self::First => Opcode::Enroll1,
            Self::Second => Opcode::Enroll2,
            Self::Third => Opcode::Enroll3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Instruction for the person at the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    PressFinger,
    ReleaseFinger,
    StageDone(Stage),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PressFinger => write!(f, "press finger"),
            Self::ReleaseFinger => write!(f, "release finger"),
            Self::StageDone(stage) => write!(f, "enroll {} done", stage),
        }
    }
}

/// A single step of the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Open,
    Led(bool),
    Notify(Notice),
    WaitPress(Stage),
    Start,
    Capture(Stage),
    Enroll(Stage),
    /// Keep the backlight off long enough to be seen
    Blink,
    WaitRelease(Stage),
    /// Pause between a release and the next press
    Settle,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Led(on) => write!(f, "led {}", if *on { "on" } else { "off" }),
            Self::Notify(notice) => write!(f, "notify '{}'", notice),
            Self::WaitPress(stage) => write!(f, "wait for press {}", stage),
            Self::Start => write!(f, "enroll start"),
            Self::Capture(stage) => write!(f, "capture {}", stage),
            Self::Enroll(stage) => write!(f, "enroll {}", stage),
            Self::Blink => write!(f, "blink"),
            Self::WaitRelease(stage) => write!(f, "wait for release {}", stage),
            Self::Settle => write!(f, "settle"),
        }
    }
}

/// Progress of an enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollState {
    Idle,
    Opened,
    LedOn,
    AwaitingPress(Stage),
    Starting,
    Capturing(Stage),
    Enrolling(Stage),
    AwaitingRelease(Stage),
    Done,
    Failed(Step),
}

/// Timing of the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollOptions {
    /// How long to wait for each press and release
    pub finger_timeout: Duration,
    pub blink_delay: Duration,
    pub settle_delay: Duration,
    /// Finger presence polling interval
    pub poll_interval: Duration,
}

impl Default for EnrollOptions {
    fn default() -> Self {
        Self {
            finger_timeout: Duration::from_secs(10),
            blink_delay: Duration::from_millis(100),
            settle_delay: Duration::from_millis(500),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

impl EnrollOptions {
    pub fn with_finger_timeout(mut self, timeout: Duration) -> Self {
        self.finger_timeout = timeout;
        self
    }

    pub fn with_blink_delay(mut self, delay: Duration) -> Self {
        self.blink_delay = delay;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Enrollment of one finger into one template slot
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use gt511::{Device, DeviceModel, Enrollment, EnrollOptions, StreamTransport};
///
/// #[tokio::main]
/// async fn main() -> gt511::Result<()> {
///     let transport = StreamTransport::connect_tcp("192.168.1.50", 4001, Duration::from_secs(5)).await?;
///     let mut device = Device::new(transport, DeviceModel::GT511C3);
///
///     let enrollment = Enrollment::new(4)
///         .with_options(EnrollOptions::default().with_finger_timeout(Duration::from_secs(20)));
///     let mut progress = enrollment.subscribe();
///
///     tokio::spawn(async move {
///         while progress.changed().await.is_ok() {
///             println!("{:?}", *progress.borrow());
///         }
///     });
///
///     enrollment.run(&mut device).await
/// }
/// ```
pub struct Enrollment {
    id: u32,
    options: EnrollOptions,
    state: watch::Sender<EnrollState>,
}

impl Enrollment {
    pub fn new(id: u32) -> Self {
        let (state, _) = watch::channel(EnrollState::Idle);
        Self {
            id,
            options: EnrollOptions::default(),
            state,
        }
    }

    pub fn with_options(mut self, options: EnrollOptions) -> Self {
        self.options = options;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn options(&self) -> &EnrollOptions {
        &self.options
    }

    /// Follow the progress of [`Enrollment::run`]
    pub fn subscribe(&self) -> watch::Receiver<EnrollState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> EnrollState {
        *self.state.borrow()
    }

    /// Every step of the workflow, in execution order
    pub fn plan() -> Vec<Step> {
        let mut steps = vec![Step::Open, Step::Led(true)];

        for stage in Stage::ALL {
            steps.push(Step::Notify(Notice::PressFinger));
            steps.push(Step::WaitPress(stage));
            if stage == Stage::First {
                steps.push(Step::Start);
            }
            steps.extend([
                Step::Capture(stage),
                Step::Enroll(stage),
                Step::Notify(Notice::StageDone(stage)),
                Step::Led(false),
            ]);
            if stage != Stage::Third {
                steps.extend([
                    Step::Blink,
                    Step::Led(true),
                    Step::Notify(Notice::ReleaseFinger),
                    Step::WaitRelease(stage),
                    Step::Settle,
                ]);
            }
        }

        steps
    }

    /// Execute the workflow
    ///
    /// Stops at the first failing step and switches the backlight off.
    /// Returns that step's error, or [`Error::CleanupFailed`] if switching
    /// the backlight off failed as well.
    pub async fn run<T: Transport>(self, device: &mut Device<T>) -> Result<()> {
        info!(id = self.id, "Starting enrollment");

        for step in Self::plan() {
            self.enter(step);

            if let Err(e) = self.execute(step, device).await {
                warn!(id = self.id, %step, error = %e, "Enrollment step failed");
                self.state.send_replace(EnrollState::Failed(step));

                return match device.switch_led(false).await {
                    Ok(()) => Err(e),
                    Err(cleanup) => Err(Error::CleanupFailed {
                        original: Box::new(e),
                        cleanup: Box::new(cleanup),
                    }),
                };
            }

            self.complete(step);
        }

        self.state.send_replace(EnrollState::Done);
        info!(id = self.id, "Enrollment complete");
        Ok(())
    }

    async fn execute<T: Transport>(&self, step: Step, device: &mut Device<T>) -> Result<()> {
        debug!(%step, "Enrollment step");

        match step {
            Step::Open => device.open().await,
            Step::Led(on) => device.switch_led(on).await,
            Step::Notify(notice) => {
                info!(id = self.id, "{}", notice);
                Ok(())
            }
            Step::WaitPress(_) => self.wait(device, FingerTarget::Pressed).await,
            Step::Start => device.enroll_start(self.id).await,
            Step::Capture(_) => device.capture_finger(true).await,
            Step::Enroll(stage) => device.enroll(stage).await,
            Step::Blink => {
                sleep(self.options.blink_delay).await;
                Ok(())
            }
            Step::WaitRelease(_) => self.wait(device, FingerTarget::Released).await,
            Step::Settle => {
                sleep(self.options.settle_delay).await;
                Ok(())
            }
        }
    }

    async fn wait<T: Transport>(&self, device: &mut Device<T>, target: FingerTarget) -> Result<()> {
        device
            .wait_for_finger_every(self.options.finger_timeout, target, self.options.poll_interval)
            .await
    }

    fn enter(&self, step: Step) {
        let next = match step {
            Step::WaitPress(stage) => EnrollState::AwaitingPress(stage),
            Step::Start => EnrollState::Starting,
            Step::Capture(stage) => EnrollState::Capturing(stage),
            Step::Enroll(stage) => EnrollState::Enrolling(stage),
            Step::WaitRelease(stage) => EnrollState::AwaitingRelease(stage),
            _ => return,
        };
        self.state.send_replace(next);
    }

    fn complete(&self, step: Step) {
        match step {
            Step::Open => {
                self.state.send_replace(EnrollState::Opened);
            }
            Step::Led(true) if self.state() == EnrollState::Opened => {
                self.state.send_replace(EnrollState::LedOn);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Incoming, MockSensor, Reply};
    use gt511_core::NackReason;
    use gt511_types::DeviceModel;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Sensor that acknowledges everything and alternates between a
    /// pressed and a released finger, starting with pressed
    fn cooperative(fail: Option<Opcode>) -> Device<MockSensor> {
        let pressed = AtomicBool::new(false);
        let sensor = MockSensor::new(move |incoming| match incoming {
            Incoming::Command(cmd) if Some(cmd.opcode) == fail => Reply::Nack(NackReason::EnrollFailed),
            Incoming::Command(cmd) if cmd.opcode == Opcode::IsPressFinger => {
                let now_pressed = !pressed.fetch_xor(true, Ordering::SeqCst);
                Reply::Ack(if now_pressed { 0 } else { 1 })
            }
            _ => Reply::Ack(0),
        });
        Device::new(sensor, DeviceModel::GT511C3)
    }

    #[test]
    fn test_plan() {
        let plan = Enrollment::plan();

        assert_eq!(
            &plan[..8],
            &[
                Step::Open,
                Step::Led(true),
                Step::Notify(Notice::PressFinger),
                Step::WaitPress(Stage::First),
                Step::Start,
                Step::Capture(Stage::First),
                Step::Enroll(Stage::First),
                Step::Notify(Notice::StageDone(Stage::First)),
            ]
        );
        assert_eq!(
            &plan[plan.len() - 5..],
            &[
                Step::WaitPress(Stage::Third),
                Step::Capture(Stage::Third),
                Step::Enroll(Stage::Third),
                Step::Notify(Notice::StageDone(Stage::Third)),
                Step::Led(false),
            ]
        );
        assert_eq!(plan.iter().filter(|s| **s == Step::Start).count(), 1);
        assert_eq!(plan.iter().filter(|s| **s == Step::Settle).count(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Notice::StageDone(Stage::Second).to_string(), "enroll 2 done");
        assert_eq!(Step::Led(false).to_string(), "led off");
        assert_eq!(Step::WaitRelease(Stage::First).to_string(), "wait for release 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrollment_success() {
        let mut device = cooperative(None);
        let enrollment = Enrollment::new(7);
        let progress = enrollment.subscribe();

        enrollment.run(&mut device).await.unwrap();

        use Opcode::*;
        assert_eq!(
            device.transport().opcodes(),
            vec![
                Open,
                CmosLed,
                IsPressFinger,
                EnrollStart,
                CaptureFinger,
                Enroll1,
                CmosLed,
                CmosLed,
                IsPressFinger,
                IsPressFinger,
                CaptureFinger,
                Enroll2,
                CmosLed,
                CmosLed,
                IsPressFinger,
                IsPressFinger,
                CaptureFinger,
                Enroll3,
                CmosLed,
            ]
        );

        let commands = device.transport().commands();
        assert_eq!(commands[3], (EnrollStart, 7));
        assert_eq!(commands[4], (CaptureFinger, 1));
        assert_eq!(commands.last(), Some(&(CmosLed, 0)));
        assert_eq!(*progress.borrow(), EnrollState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrollment_timing() {
        let mut device = cooperative(None);
        let options = EnrollOptions::default().with_poll_interval(Duration::from_millis(200));

        let start = tokio::time::Instant::now();
        Enrollment::new(1)
            .with_options(options)
            .run(&mut device)
            .await
            .unwrap();

        // Five finger waits resolving on their first poll, two blinks, two settles
        assert_eq!(
            start.elapsed(),
            Duration::from_millis(5 * 200 + 2 * 100 + 2 * 500)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_at_second_stage() {
        let mut device = cooperative(Some(Opcode::Enroll2));
        let enrollment = Enrollment::new(2);
        let progress = enrollment.subscribe();

        let err = enrollment.run(&mut device).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Nack {
                command: Opcode::Enroll2,
                reason: NackReason::EnrollFailed
            }
        ));

        let commands = device.transport().commands();
        let failed_at = commands
            .iter()
            .position(|(op, _)| *op == Opcode::Enroll2)
            .unwrap();
        assert_eq!(&commands[failed_at + 1..], &[(Opcode::CmosLed, 0)]);
        assert!(!device.transport().opcodes().contains(&Opcode::Enroll3));
        assert_eq!(*progress.borrow(), EnrollState::Failed(Step::Enroll(Stage::Second)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finger_never_pressed() {
        let mut device = Device::new(MockSensor::new(|_| Reply::Ack(1)), DeviceModel::GT511C1);
        let options = EnrollOptions::default().with_finger_timeout(Duration::from_secs(3));
        let enrollment = Enrollment::new(0).with_options(options);
        let progress = enrollment.subscribe();

        let err = enrollment.run(&mut device).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(
            *progress.borrow(),
            EnrollState::Failed(Step::WaitPress(Stage::First))
        );
        assert!(!device.transport().opcodes().contains(&Opcode::EnrollStart));
        assert_eq!(device.transport().commands().last(), Some(&(Opcode::CmosLed, 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_failure() {
        let led_off_fails = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&led_off_fails);
        let sensor = MockSensor::new(move |incoming| match incoming {
            Incoming::Command(cmd) if cmd.opcode == Opcode::Open => Reply::Ack(0),
            Incoming::Command(cmd) if cmd.opcode == Opcode::CmosLed && cmd.param == 1 => {
                flag.store(true, Ordering::SeqCst);
                Reply::Nack(NackReason::DeviceError)
            }
            _ => Reply::Nack(NackReason::CommunicationError),
        });
        let mut device = Device::new(sensor, DeviceModel::GT511C3);

        let err = Enrollment::new(3).run(&mut device).await.unwrap_err();

        assert!(led_off_fails.load(Ordering::SeqCst));
        match &err {
            Error::CleanupFailed { original, cleanup } => {
                assert_eq!(original.nack_reason(), Some(NackReason::DeviceError));
                assert_eq!(cleanup.nack_reason(), Some(NackReason::CommunicationError));
            }
            other => panic!("expected a cleanup failure, got {:?}", other),
        }
        assert_eq!(err.primary().nack_reason(), Some(NackReason::DeviceError));
        assert_eq!(
            device.transport().commands(),
            vec![(Opcode::Open, 0), (Opcode::CmosLed, 1), (Opcode::CmosLed, 0)]
        );
    }

    #[test]
    fn test_initial_state() {
        let enrollment = Enrollment::new(5);
        assert_eq!(enrollment.state(), EnrollState::Idle);
        assert_eq!(enrollment.id(), 5);
        assert_eq!(enrollment.options(), &EnrollOptions::default());
    }
}
