use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    StepBack,
    StepForward,
    TogglePlay,
    Restart,
    NextScenario,
    Quit,
}

const ACTION_COUNT: usize = 6;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::StepBack,
        InputAction::StepForward,
        InputAction::TogglePlay,
        InputAction::Restart,
        InputAction::NextScenario,
        InputAction::Quit,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::StepBack => 0,
            InputAction::StepForward => 1,
            InputAction::TogglePlay => 2,
            InputAction::Restart => 3,
            InputAction::NextScenario => 4,
            InputAction::Quit => 5,
        }
    }

    pub fn from_key(key: PhysicalKey) -> Option<InputAction> {
        match key {
            PhysicalKey::Code(KeyCode::ArrowLeft) | PhysicalKey::Code(KeyCode::KeyA) => {
                Some(InputAction::StepBack)
            }
            PhysicalKey::Code(KeyCode::ArrowRight) | PhysicalKey::Code(KeyCode::KeyD) => {
                Some(InputAction::StepForward)
            }
            PhysicalKey::Code(KeyCode::Space) => Some(InputAction::TogglePlay),
            PhysicalKey::Code(KeyCode::Home) => Some(InputAction::Restart),
            PhysicalKey::Code(KeyCode::Tab) => Some(InputAction::NextScenario),
            PhysicalKey::Code(KeyCode::Escape) => Some(InputAction::Quit),
            _ => None,
        }
    }
}

/// Edge-triggered key state: a held key reports one press until released.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionEdges {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionEdges {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    /// Actions pressed since the last call, in declaration order.
    pub(crate) fn take_pressed(&mut self) -> Vec<InputAction> {
        let pressed = InputAction::ALL
            .into_iter()
            .filter(|action| self.pressed[action.index()])
            .collect();
        self.pressed = [false; ACTION_COUNT];
        pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_key_reports_a_single_press() {
        let mut edges = ActionEdges::default();
        edges.set(InputAction::StepForward, true);
        assert_eq!(edges.take_pressed(), vec![InputAction::StepForward]);

        edges.set(InputAction::StepForward, true);
        assert!(edges.take_pressed().is_empty());
        assert!(edges.is_down(InputAction::StepForward));

        edges.set(InputAction::StepForward, false);
        edges.set(InputAction::StepForward, true);
        assert_eq!(edges.take_pressed(), vec![InputAction::StepForward]);
    }

    #[test]
    fn arrows_space_and_tab_map_to_playback_actions() {
        assert_eq!(
            InputAction::from_key(PhysicalKey::Code(KeyCode::ArrowLeft)),
            Some(InputAction::StepBack)
        );
        assert_eq!(
            InputAction::from_key(PhysicalKey::Code(KeyCode::Space)),
            Some(InputAction::TogglePlay)
        );
        assert_eq!(
            InputAction::from_key(PhysicalKey::Code(KeyCode::Tab)),
            Some(InputAction::NextScenario)
        );
        assert_eq!(InputAction::from_key(PhysicalKey::Code(KeyCode::KeyQ)), None);
    }

    #[test]
    fn simultaneous_presses_come_out_in_fixed_order() {
        let mut edges = ActionEdges::default();
        edges.set(InputAction::Quit, true);
        edges.set(InputAction::StepBack, true);
        assert_eq!(
            edges.take_pressed(),
            vec![InputAction::StepBack, InputAction::Quit]
        );
    }
}
