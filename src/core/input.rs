//! 输入处理
//!
//! 把 winit 的窗口事件转换为轨道相机操作和应用层动作：
//! - 滚轮：沿视线推拉
//! - 左键拖动：绕世界 X / Y 轴旋转，每次事件一个步长
//! - Space：切换连续渲染
//! - Escape：退出
//! - 1..4：把所有绘制项切换到对应的渲染模式

use tracing::{debug, trace};
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::component::OrbitCamera;
use crate::geometry::RenderMode;
use crate::math::Vector3;

/// 输入事件处理后需要应用层执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// 没有可见变化
    None,
    /// 相机已改变，需要重绘
    Redraw,
    /// 切换连续渲染
    ToggleContinuous,
    /// 把所有绘制项切换到这个渲染模式
    SetRenderMode(RenderMode),
    /// 关闭窗口
    Exit,
}

/// 轨道相机的输入状态
#[derive(Debug, Default)]
pub struct OrbitInput {
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl OrbitInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// 分发一个窗口事件
    pub fn handle_window_event(&mut self, camera: &mut OrbitCamera, event: &WindowEvent) -> InputAction {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.on_mouse_button(*button, *state);
                InputAction::None
            }
            WindowEvent::CursorMoved { position, .. } => self.on_cursor_moved(camera, position.x, position.y),
            WindowEvent::MouseWheel { delta, .. } => self.on_mouse_wheel(camera, *delta),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => self.on_key(*code, *state),
            _ => InputAction::None,
        }
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }

        self.dragging = state == ElementState::Pressed;
        if !self.dragging {
            self.last_cursor = None;
        }
    }

    /// 光标移动，拖动时按位移方向旋转相机
    pub fn on_cursor_moved(&mut self, camera: &mut OrbitCamera, x: f64, y: f64) -> InputAction {
        let previous = self.last_cursor.replace((x, y));
        if !self.dragging {
            return InputAction::None;
        }

        match previous {
            Some((px, py)) => {
                if Self::rotate(camera, x - px, y - py) {
                    InputAction::Redraw
                } else {
                    InputAction::None
                }
            }
            None => InputAction::None,
        }
    }

    /// 水平位移绕 Y 轴、垂直位移绕 X 轴，各转一个步长
    fn rotate(camera: &mut OrbitCamera, dx: f64, dy: f64) -> bool {
        let mut moved = false;

        if dx > 0.0 {
            camera.move_rotation(&-Vector3::y());
            moved = true;
        } else if dx < 0.0 {
            camera.move_rotation(&Vector3::y());
            moved = true;
        }

        if dy > 0.0 {
            camera.move_rotation(&-Vector3::x());
            moved = true;
        } else if dy < 0.0 {
            camera.move_rotation(&Vector3::x());
            moved = true;
        }

        if moved {
            camera.update_view();
            trace!(dx, dy, "Camera rotated");
        }
        moved
    }

    /// 滚轮向前靠近目标，向后远离
    pub fn on_mouse_wheel(&mut self, camera: &mut OrbitCamera, delta: MouseScrollDelta) -> InputAction {
        let amount = match delta {
            MouseScrollDelta::LineDelta(_, y) => y as f64,
            MouseScrollDelta::PixelDelta(position) => position.y,
        };

        let multi = if amount > 0.0 {
            1.0
        } else if amount < 0.0 {
            -1.0
        } else {
            return InputAction::None;
        };

        if camera.move_position(multi) {
            camera.update_view();
            InputAction::Redraw
        } else {
            debug!("Camera too close to target, zoom ignored");
            InputAction::None
        }
    }

    pub fn on_key(&mut self, code: KeyCode, state: ElementState) -> InputAction {
        if state != ElementState::Pressed {
            return InputAction::None;
        }

        match code {
            KeyCode::Space => InputAction::ToggleContinuous,
            KeyCode::Escape => InputAction::Exit,
            KeyCode::Digit1 => InputAction::SetRenderMode(RenderMode::ALL[0]),
            KeyCode::Digit2 => InputAction::SetRenderMode(RenderMode::ALL[1]),
            KeyCode::Digit3 => InputAction::SetRenderMode(RenderMode::ALL[2]),
            KeyCode::Digit4 => InputAction::SetRenderMode(RenderMode::ALL[3]),
            _ => InputAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CameraConfig;

    fn camera() -> OrbitCamera {
        let mut camera = OrbitCamera::new(&CameraConfig::default(), 1200, 800);
        camera
            .setup_initial(Vector3::zeros(), Vector3::new(0.0, 0.0, 2.5))
            .unwrap();
        camera
    }

    #[test]
    fn test_drag_rotates_only_while_pressed() {
        let mut cam = camera();
        let mut input = OrbitInput::new();

        assert_eq!(input.on_cursor_moved(&mut cam, 10.0, 10.0), InputAction::None);
        assert_eq!(input.on_cursor_moved(&mut cam, 20.0, 10.0), InputAction::None);
        assert_eq!(cam.position(), Vector3::new(0.0, 0.0, 2.5));

        input.on_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(input.is_dragging());
        assert_eq!(input.on_cursor_moved(&mut cam, 30.0, 10.0), InputAction::Redraw);

        // 向右拖动：绕 -Y 旋转，相机移到 -X 一侧
        assert!(cam.position().x < 0.0);
        assert!((cam.position().norm() - 2.5).abs() < 1e-4);

        input.on_mouse_button(MouseButton::Left, ElementState::Released);
        assert!(!input.is_dragging());
    }

    #[test]
    fn test_vertical_drag() {
        let mut cam = camera();
        let mut input = OrbitInput::new();
        input.on_mouse_button(MouseButton::Left, ElementState::Pressed);

        input.on_cursor_moved(&mut cam, 0.0, 0.0);
        assert_eq!(input.on_cursor_moved(&mut cam, 0.0, -5.0), InputAction::Redraw);
        assert!(cam.position().y < 0.0);

        // 没有位移不算移动
        assert_eq!(input.on_cursor_moved(&mut cam, 0.0, -5.0), InputAction::None);
    }

    #[test]
    fn test_wheel_zoom() {
        let mut cam = camera();
        let mut input = OrbitInput::new();

        let action = input.on_mouse_wheel(&mut cam, MouseScrollDelta::LineDelta(0.0, 1.0));
        assert_eq!(action, InputAction::Redraw);
        assert!(cam.position().z < 2.5);

        let before = cam.position().z;
        input.on_mouse_wheel(&mut cam, MouseScrollDelta::LineDelta(0.0, -1.0));
        assert!(cam.position().z > before);

        assert_eq!(
            input.on_mouse_wheel(&mut cam, MouseScrollDelta::LineDelta(0.0, 0.0)),
            InputAction::None
        );
    }

    #[test]
    fn test_keys() {
        let mut input = OrbitInput::new();

        assert_eq!(input.on_key(KeyCode::Space, ElementState::Pressed), InputAction::ToggleContinuous);
        assert_eq!(input.on_key(KeyCode::Space, ElementState::Released), InputAction::None);
        assert_eq!(input.on_key(KeyCode::Escape, ElementState::Pressed), InputAction::Exit);
        assert_eq!(
            input.on_key(KeyCode::Digit2, ElementState::Pressed),
            InputAction::SetRenderMode(RenderMode::Wireframe)
        );
        assert_eq!(
            input.on_key(KeyCode::Digit4, ElementState::Pressed),
            InputAction::SetRenderMode(RenderMode::SolidFrontOnly)
        );
        assert_eq!(input.on_key(KeyCode::KeyA, ElementState::Pressed), InputAction::None);
    }
}
