use std::time::Duration;

use super::{CaptureError, ImageSource};
use crate::cable::CableType;
use crate::synthetic;

/// Scripted camera for tests and demos.
///
/// Starts without permission and stopped, like a freshly installed app:
/// call [`MockCamera::request_permission`] and [`MockCamera::start`] first.
pub struct MockCamera {
    has_permission: bool,
    running: bool,
    deny_permission: bool,
    fail_capture: bool,
    capture_delay: Duration,
    subject: CableType,
    captured: u64,
}

impl MockCamera {
    pub fn new(subject: CableType) -> Self {
        Self {
            has_permission: false,
            running: false,
            deny_permission: false,
            fail_capture: false,
            capture_delay: Duration::ZERO,
            subject,
            captured: 0,
        }
    }

    /// Permission requests will be refused.
    pub fn denying_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    /// Every capture fails once running.
    pub fn failing_capture(mut self) -> Self {
        self.fail_capture = true;
        self
    }

    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// Cable type drawn into later captures.
    pub fn point_at(&mut self, subject: CableType) {
        self.subject = subject;
    }

    pub fn request_permission(&mut self) -> bool {
        self.has_permission = !self.deny_permission;
        self.has_permission
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        if !self.has_permission {
            return Err(CaptureError::PermissionDenied);
        }
        self.running = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Convenience: grant permission and start.
    pub fn ready(mut self) -> Result<Self, CaptureError> {
        if !self.request_permission() {
            return Err(CaptureError::PermissionDenied);
        }
        self.start()?;
        Ok(self)
    }
}

impl ImageSource for MockCamera {
    fn name(&self) -> &str {
        "mock-camera"
    }

    fn capture_image(&mut self) -> Result<Vec<u8>, CaptureError> {
        if !self.has_permission {
            return Err(CaptureError::PermissionDenied);
        }
        if !self.running {
            return Err(CaptureError::SessionNotRunning);
        }
        if self.fail_capture {
            return Err(CaptureError::CaptureFailed("mock capture failure".into()));
        }
        if !self.capture_delay.is_zero() {
            std::thread::sleep(self.capture_delay);
        }
        self.captured += 1;
        synthetic::cable_image(self.subject, 160, 120, self.captured)
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }
}
