//! MovingPoint 组件
//!
//! 可移动的点：相机的观察目标就是一个 MovingPoint。

use crate::math::{Color, Vector3};

/// 带颜色和步长的点
///
/// 所有 setter 都返回值是否真正发生了变化，调用方据此决定是否需要重新计算矩阵。
#[derive(Debug, Clone, PartialEq)]
pub struct MovingPoint {
    position: Vector3,
    color: Color,
    step: f32,
    point_size: f32,
}

impl MovingPoint {
    /// 在指定位置创建
    pub fn new(position: Vector3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3) -> bool {
        if self.position == position {
            return false;
        }
        self.position = position;
        true
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) -> bool {
        if self.color == color {
            return false;
        }
        self.color = color;
        true
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn set_step(&mut self, step: f32) -> bool {
        if self.step == step {
            return false;
        }
        self.step = step;
        true
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn set_point_size(&mut self, size: f32) -> bool {
        if self.point_size == size {
            return false;
        }
        self.point_size = size;
        true
    }

    /// 沿方向移动 `step` 个单位
    pub fn translate(&mut self, direction: &Vector3) -> bool {
        let next = self.position + direction * self.step;
        self.set_position(next)
    }
}

impl Default for MovingPoint {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            color: Color::WHITE,
            step: 1.0,
            point_size: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = MovingPoint::default();
        assert_eq!(p.position(), Vector3::zeros());
        assert_eq!(p.color(), Color::WHITE);
        assert_eq!(p.step(), 1.0);
        assert_eq!(p.point_size(), 5.0);
    }

    #[test]
    fn test_setters_report_change() {
        let mut p = MovingPoint::default();
        assert!(p.set_position(Vector3::new(1.0, 0.0, 0.0)));
        assert!(!p.set_position(Vector3::new(1.0, 0.0, 0.0)));
        assert!(!p.set_color(Color::WHITE));
        assert!(p.set_color(Color::RED));
        assert!(p.set_step(0.5));
        assert!(p.translate(&Vector3::y()));
        assert_eq!(p.position(), Vector3::new(1.0, 0.5, 0.0));
    }
}
