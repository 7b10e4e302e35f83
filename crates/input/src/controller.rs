use handspace_common::{Hand, Transform};
use serde::{Deserialize, Serialize};

/// One hand's raw controller state as read from the device.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSample {
    pub trigger: f32,
    pub secondary: f32,
    /// Forward thumbstick deflection, -1.0 to 1.0.
    pub thumbstick: f32,
    /// `None` while tracking is lost.
    pub pose: Option<Transform>,
}

impl ControllerSample {
    pub fn tracked(pose: Transform) -> Self {
        Self {
            pose: Some(pose),
            ..Self::default()
        }
    }

    pub fn with_trigger(mut self, trigger: f32) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_secondary(mut self, secondary: f32) -> Self {
        self.secondary = secondary;
        self
    }

    pub fn with_thumbstick(mut self, thumbstick: f32) -> Self {
        self.thumbstick = thumbstick;
        self
    }
}

/// Both controllers for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInput {
    pub left: ControllerSample,
    pub right: ControllerSample,
}

impl RawInput {
    pub fn hand(&self, hand: Hand) -> &ControllerSample {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn hand_mut(&mut self, hand: Hand) -> &mut ControllerSample {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }
}

/// Trigger click with hysteresis: engages at `on`, releases below `off`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickDebouncer {
    on: f32,
    off: f32,
    clicked: bool,
}

impl ClickDebouncer {
    pub fn new(on: f32, off: f32) -> Self {
        Self {
            on,
            off,
            clicked: false,
        }
    }

    pub fn update(&mut self, trigger: f32) -> bool {
        if self.clicked {
            if trigger < self.off {
                self.clicked = false;
            }
        } else if trigger >= self.on {
            self.clicked = true;
        }
        self.clicked
    }

    pub fn is_clicked(&self) -> bool {
        self.clicked
    }
}
