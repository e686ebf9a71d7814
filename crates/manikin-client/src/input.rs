use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Semantic action names mapped from physical inputs via bindings.yaml.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputBindings {
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub actions: HashMap<String, Vec<InputTrigger>>,
}

/// A single physical trigger, written in YAML as `key: W` or
/// `mouse: Right`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTrigger {
    Key(String),
    Mouse(String),
}

impl Default for InputBindings {
    fn default() -> Self {
        let mut actions = HashMap::new();
        actions.insert("move_forward".into(), vec![InputTrigger::Key("W".into())]);
        actions.insert("move_backward".into(), vec![InputTrigger::Key("S".into())]);
        actions.insert("move_left".into(), vec![InputTrigger::Key("A".into())]);
        actions.insert("move_right".into(), vec![InputTrigger::Key("D".into())]);
        actions.insert("jump".into(), vec![InputTrigger::Key("Space".into())]);
        actions.insert("sprint".into(), vec![InputTrigger::Key("ShiftLeft".into())]);
        actions.insert("look".into(), vec![InputTrigger::Mouse("Right".into())]);

        Self { actions }
    }
}

/// Load input bindings from a YAML file, with defaults as fallback.
pub fn load_bindings(project_root: &Path) -> InputBindings {
    let path = project_root.join("input/bindings.yaml");
    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(bindings) => {
                    tracing::info!("Loaded input bindings from {:?}", path);
                    return bindings;
                }
                Err(e) => tracing::warn!("Failed to parse bindings.yaml: {}", e),
            },
            Err(e) => tracing::warn!("Failed to read bindings.yaml: {}", e),
        }
    }
    tracing::info!("Using default input bindings");
    InputBindings::default()
}

/// Maps key name strings to winit KeyCode.
fn key_name_to_code(name: &str) -> Option<KeyCode> {
    match name {
        "A" => Some(KeyCode::KeyA),
        "D" => Some(KeyCode::KeyD),
        "E" => Some(KeyCode::KeyE),
        "Q" => Some(KeyCode::KeyQ),
        "R" => Some(KeyCode::KeyR),
        "S" => Some(KeyCode::KeyS),
        "W" => Some(KeyCode::KeyW),
        "Space" => Some(KeyCode::Space),
        "ShiftLeft" => Some(KeyCode::ShiftLeft),
        "ShiftRight" => Some(KeyCode::ShiftRight),
        "ControlLeft" => Some(KeyCode::ControlLeft),
        "ControlRight" => Some(KeyCode::ControlRight),
        "Escape" => Some(KeyCode::Escape),
        "Enter" => Some(KeyCode::Enter),
        "Tab" => Some(KeyCode::Tab),
        "ArrowUp" => Some(KeyCode::ArrowUp),
        "ArrowDown" => Some(KeyCode::ArrowDown),
        "ArrowLeft" => Some(KeyCode::ArrowLeft),
        "ArrowRight" => Some(KeyCode::ArrowRight),
        _ => None,
    }
}

fn mouse_name_to_button(name: &str) -> Option<MouseButton> {
    match name {
        "Left" => Some(MouseButton::Left),
        "Right" => Some(MouseButton::Right),
        "Middle" => Some(MouseButton::Middle),
        _ => None,
    }
}

/// Central input state, updated from winit events and read by the
/// controllers once per frame. Keydown repeats from the OS are filtered
/// by the held-set check, so just-pressed fires once per physical press.
pub struct InputState {
    bindings: InputBindings,
    // Raw key state
    keys_held: HashSet<KeyCode>,
    keys_just_pressed: HashSet<KeyCode>,
    keys_just_released: HashSet<KeyCode>,
    // Raw mouse state
    mouse_buttons_held: HashSet<MouseButton>,
    mouse_buttons_just_pressed: HashSet<MouseButton>,
    // Mouse motion accumulated this frame
    mouse_delta: Vec2,
    // Whether the cursor is captured (pointer-lock analog)
    pub cursor_captured: bool,
}

impl InputState {
    pub fn new(bindings: InputBindings) -> Self {
        Self {
            bindings,
            keys_held: HashSet::new(),
            keys_just_pressed: HashSet::new(),
            keys_just_released: HashSet::new(),
            mouse_buttons_held: HashSet::new(),
            mouse_buttons_just_pressed: HashSet::new(),
            mouse_delta: Vec2::ZERO,
            cursor_captured: false,
        }
    }

    /// Call at the end of each frame to clear transient state.
    pub fn begin_frame(&mut self) {
        self.keys_just_pressed.clear();
        self.keys_just_released.clear();
        self.mouse_buttons_just_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    /// Process a winit WindowEvent.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if !self.keys_held.contains(&key_code) {
                                self.keys_just_pressed.insert(key_code);
                            }
                            self.keys_held.insert(key_code);
                        }
                        ElementState::Released => {
                            self.keys_held.remove(&key_code);
                            self.keys_just_released.insert(key_code);
                        }
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    if !self.mouse_buttons_held.contains(button) {
                        self.mouse_buttons_just_pressed.insert(*button);
                    }
                    self.mouse_buttons_held.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_buttons_held.remove(button);
                }
            },
            _ => {}
        }
    }

    /// Process a winit DeviceEvent (for raw mouse motion).
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.mouse_delta.x += delta.0 as f32;
            self.mouse_delta.y += delta.1 as f32;
        }
    }

    /// Check if a semantic action is currently held.
    pub fn pressed(&self, action: &str) -> bool {
        let Some(triggers) = self.bindings.actions.get(action) else {
            return false;
        };
        triggers.iter().any(|trigger| match trigger {
            InputTrigger::Key(name) => key_name_to_code(name)
                .is_some_and(|code| self.keys_held.contains(&code)),
            InputTrigger::Mouse(name) => mouse_name_to_button(name)
                .is_some_and(|btn| self.mouse_buttons_held.contains(&btn)),
        })
    }

    /// Check if a semantic action was just pressed this frame.
    pub fn just_pressed(&self, action: &str) -> bool {
        let Some(triggers) = self.bindings.actions.get(action) else {
            return false;
        };
        triggers.iter().any(|trigger| match trigger {
            InputTrigger::Key(name) => key_name_to_code(name)
                .is_some_and(|code| self.keys_just_pressed.contains(&code)),
            InputTrigger::Mouse(name) => mouse_name_to_button(name)
                .is_some_and(|btn| self.mouse_buttons_just_pressed.contains(&btn)),
        })
    }

    /// Get a 2D movement axis from WASD-style bindings. Normalized so
    /// diagonals are not faster.
    pub fn axis_2d(&self, forward: &str, backward: &str, left: &str, right: &str) -> Vec2 {
        let mut axis = Vec2::ZERO;
        if self.pressed(forward) {
            axis.y += 1.0;
        }
        if self.pressed(backward) {
            axis.y -= 1.0;
        }
        if self.pressed(left) {
            axis.x -= 1.0;
        }
        if self.pressed(right) {
            axis.x += 1.0;
        }
        if axis != Vec2::ZERO {
            axis = axis.normalize();
        }
        axis
    }

    /// Get raw mouse delta accumulated this frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Check if a raw mouse button went down this frame.
    pub fn mouse_just_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons_just_pressed.contains(&button)
    }

    /// Check if a raw key is held.
    pub fn key_held(&self, code: KeyCode) -> bool {
        self.keys_held.contains(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let bindings = InputBindings::default();
        assert!(bindings.actions.contains_key("move_forward"));
        assert!(bindings.actions.contains_key("jump"));
        assert!(bindings.actions.contains_key("look"));
    }

    #[test]
    fn test_parse_bindings_yaml() {
        let yaml = r#"
actions:
  jump:
    - key: Space
  look:
    - mouse: Right
"#;
        let bindings: InputBindings = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            bindings.actions["jump"][0],
            InputTrigger::Key(ref k) if k == "Space"
        ));
        assert!(matches!(
            bindings.actions["look"][0],
            InputTrigger::Mouse(ref m) if m == "Right"
        ));
    }

    #[test]
    fn test_key_name_mapping() {
        assert_eq!(key_name_to_code("W"), Some(KeyCode::KeyW));
        assert_eq!(key_name_to_code("Space"), Some(KeyCode::Space));
        assert_eq!(key_name_to_code("Invalid"), None);
        assert_eq!(mouse_name_to_button("Right"), Some(MouseButton::Right));
    }

    #[test]
    fn test_input_state_pressed() {
        let mut state = InputState::new(InputBindings::default());
        assert!(!state.pressed("move_forward"));

        state.keys_held.insert(KeyCode::KeyW);
        assert!(state.pressed("move_forward"));
    }

    #[test]
    fn test_axis_2d_diagonal_normalized() {
        let mut state = InputState::new(InputBindings::default());
        state.keys_held.insert(KeyCode::KeyW);
        state.keys_held.insert(KeyCode::KeyD);

        let axis = state.axis_2d("move_forward", "move_backward", "move_left", "move_right");
        assert!(axis.y > 0.0);
        assert!(axis.x > 0.0);
        assert!((axis.length() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_mouse_just_pressed_is_transient() {
        let mut state = InputState::new(InputBindings::default());
        assert!(!state.mouse_just_pressed(MouseButton::Left));

        state.mouse_buttons_just_pressed.insert(MouseButton::Left);
        state.mouse_buttons_held.insert(MouseButton::Left);
        assert!(state.mouse_just_pressed(MouseButton::Left));

        state.begin_frame();
        assert!(!state.mouse_just_pressed(MouseButton::Left));
        assert!(state.mouse_buttons_held.contains(&MouseButton::Left));
    }

    #[test]
    fn test_begin_frame_clears_transients() {
        let mut state = InputState::new(InputBindings::default());
        state.keys_just_pressed.insert(KeyCode::Space);
        state.mouse_delta = Vec2::new(3.0, -2.0);

        assert!(state.just_pressed("jump"));
        state.begin_frame();
        assert!(!state.just_pressed("jump"));
        assert_eq!(state.mouse_delta(), Vec2::ZERO);
    }
}
