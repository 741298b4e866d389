use crate::constants::HOTBAR_SLOTS;
use crate::error::HostError;
use crate::geometry::Rotation;
use crate::input::MouseButton;

/// Actuation port into the host. Every call may fail; callers in the engine
/// treat failures as a no-op for the current tick.
pub trait HostControls {
    fn select_slot(&mut self, slot: usize) -> Result<(), HostError>;
    fn set_rotation(&mut self, rotation: Rotation) -> Result<(), HostError>;
    fn press(&mut self, button: MouseButton) -> Result<(), HostError>;
    fn release(&mut self, button: MouseButton) -> Result<(), HostError>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HostEvent {
    Select(usize),
    Rotate(Rotation),
    Press(MouseButton),
    Release(MouseButton),
}

/// In-memory host that records every request. Handy for embedding tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingHost {
    pub events: Vec<HostEvent>,
    pub reject_input: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presses(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, HostEvent::Press(_)))
            .count()
    }

    pub fn releases(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, HostEvent::Release(_)))
            .count()
    }

    pub fn selections(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|event| match event {
                HostEvent::Select(slot) => Some(*slot),
                _ => None,
            })
            .collect()
    }

    pub fn rotations(&self) -> Vec<Rotation> {
        self.events
            .iter()
            .filter_map(|event| match event {
                HostEvent::Rotate(rotation) => Some(*rotation),
                _ => None,
            })
            .collect()
    }
}

impl HostControls for RecordingHost {
    fn select_slot(&mut self, slot: usize) -> Result<(), HostError> {
        if slot >= HOTBAR_SLOTS {
            return Err(HostError::SlotOutOfRange {
                slot,
                slots: HOTBAR_SLOTS,
            });
        }
        self.events.push(HostEvent::Select(slot));
        Ok(())
    }

    fn set_rotation(&mut self, rotation: Rotation) -> Result<(), HostError> {
        self.events.push(HostEvent::Rotate(rotation));
        Ok(())
    }

    fn press(&mut self, button: MouseButton) -> Result<(), HostError> {
        if self.reject_input {
            return Err(HostError::InputRejected {
                reason: "recording host rejects input".to_string(),
            });
        }
        self.events.push(HostEvent::Press(button));
        Ok(())
    }

    fn release(&mut self, button: MouseButton) -> Result<(), HostError> {
        if self.reject_input {
            return Err(HostError::Unavailable);
        }
        self.events.push(HostEvent::Release(button));
        Ok(())
    }
}
