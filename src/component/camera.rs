//! 轨道相机
//!
//! 相机始终注视一个目标点，鼠标拖动时绕目标旋转，滚轮沿视线推拉。
//! 管理视图矩阵、投影矩阵以及它们的乘积。

use super::MovingPoint;
use crate::core::config::CameraConfig;
use crate::core::error::{Result, SandboxError};
use crate::math::{matrix, quaternion, utils, Matrix4, Vector3};

/// 推拉后与目标之间保留的最小距离（再加上近裁剪面）
const MIN_TARGET_DISTANCE: f32 = 0.5;

/// 视线与上向量夹角过小时的阈值
const UP_PARALLEL_THRESHOLD: f32 = 0.95;

/// 轨道相机
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// 观察目标
    target: MovingPoint,

    /// 相机位置
    position: Vector3,

    /// 相机坐标系：上向量
    up: Vector3,

    /// 相机坐标系：右向量
    right: Vector3,

    /// 垂直视场角（弧度）
    fov: f32,

    /// 近裁剪面距离
    near: f32,

    /// 远裁剪面距离
    far: f32,

    /// 推拉步长，值越大每次移动越小
    position_step: f32,

    /// 每次旋转的角度（弧度）
    rotation_step: f32,

    /// 视口尺寸
    viewport: (u32, u32),

    view: Matrix4,
    projection: Matrix4,
    view_projection: Matrix4,
}

impl OrbitCamera {
    /// 根据配置创建相机
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            target: MovingPoint::default(),
            position: Vector3::new(0.0, 0.0, 1.0),
            up: Vector3::y(),
            right: Vector3::x(),
            fov: utils::deg_to_rad(config.fov_degrees),
            near: config.near,
            far: config.far,
            position_step: config.position_step,
            rotation_step: utils::deg_to_rad(config.rotation_step_degrees),
            viewport: (width.max(1), height.max(1)),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            view_projection: Matrix4::identity(),
        };
        camera.update_projection();
        camera
    }

    /// 设置初始目标和位置，并重建所有矩阵
    pub fn setup_initial(&mut self, target: Vector3, position: Vector3) -> Result<()> {
        self.target.set_position(target);
        self.position = position;
        self.check_axes()?;
        self.update_projection();
        self.update_view();
        Ok(())
    }

    // ========== 位置相关 ==========

    /// 获取相机位置
    pub fn position(&self) -> Vector3 {
        self.position
    }

    /// 获取目标位置
    pub fn target(&self) -> Vector3 {
        self.target.position()
    }

    /// 获取目标点
    pub fn target_point(&self) -> &MovingPoint {
        &self.target
    }

    // ========== 相机坐标系向量 ==========

    /// 获取上向量
    pub fn up(&self) -> Vector3 {
        self.up
    }

    /// 获取右向量
    pub fn right(&self) -> Vector3 {
        self.right
    }

    /// 重新正交化相机坐标系
    ///
    /// 位置与目标重合时把位置沿 +X 挪开；视线几乎平行于上向量时改用 +X 作为上向量。
    pub fn check_axes(&mut self) -> Result<()> {
        let target = self.target.position();
        if self.position == target {
            self.position = target + Vector3::x();
        }

        let look = (target - self.position).normalize();
        if look.dot(&self.up).abs() > UP_PARALLEL_THRESHOLD {
            self.up = Vector3::x();
        }

        let right = look.cross(&self.up).normalize();
        if right.iter().any(|c| c.is_nan()) {
            return Err(SandboxError::Runtime(format!(
                "Camera right axis is NaN (position {:?}, target {:?})",
                self.position, target
            )));
        }

        self.right = right;
        self.up = right.cross(&look).normalize();
        Ok(())
    }

    // ========== 视锥体属性 ==========

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// 宽高比
    pub fn aspect(&self) -> f32 {
        self.viewport.0 as f32 / self.viewport.1 as f32
    }

    /// 窗口尺寸变化时调用，随后需要 `update_projection`
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    // ========== 获取矩阵 ==========

    pub fn view(&self) -> &Matrix4 {
        &self.view
    }

    pub fn projection(&self) -> &Matrix4 {
        &self.projection
    }

    pub fn view_projection(&self) -> &Matrix4 {
        &self.view_projection
    }

    /// 模型矩阵对应的 MVP
    pub fn mvp(&self, model: &Matrix4) -> Matrix4 {
        self.view_projection * model
    }

    // ========== 更新矩阵 ==========

    /// 重新计算视图矩阵
    pub fn update_view(&mut self) {
        self.view = matrix::look_at_rh(&self.position, &self.target.position(), &self.up);
        self.view_projection = self.projection * self.view;
    }

    /// 根据视口宽高比重新计算投影矩阵
    pub fn update_projection(&mut self) {
        self.projection = matrix::perspective_fov_rh(self.fov, self.aspect(), self.near, self.far);
        self.view_projection = self.projection * self.view;
    }

    // ========== 相机移动 ==========

    /// 绕目标点旋转一个步长
    ///
    /// 只修改位置和坐标轴，调用方随后需要 `update_view`。
    pub fn move_rotation(&mut self, axis: &Vector3) {
        let target = self.target.position();
        let q = quaternion::from_axis_angle(axis, self.rotation_step);

        self.position = q * (self.position - target) + target;
        self.up = q * self.up;
        self.right = (target - self.position).cross(&self.up).normalize();
    }

    /// 沿视线推拉
    ///
    /// `multi` 为正时靠近目标。距离目标过近时忽略这次移动，返回 false。
    pub fn move_position(&mut self, multi: f32) -> bool {
        let target = self.target.position();
        let v = target - self.position;
        let distance = v.norm();
        if distance <= 0.0 {
            return false;
        }

        let next = self.position + v / distance * (distance / self.position_step) * multi;
        if (target - next).norm() < MIN_TARGET_DISTANCE + self.near {
            return false;
        }

        self.position = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Vector4, utils::approx_eq_vec3};

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&CameraConfig::default(), 1200, 800)
    }

    #[test]
    fn test_setup_initial() {
        let mut cam = camera();
        cam.setup_initial(Vector3::zeros(), Vector3::new(0.0, 0.0, 2.5)).unwrap();

        assert_eq!(cam.right(), Vector3::x());
        assert_eq!(cam.up(), Vector3::y());

        // 目标点投影到屏幕中心
        let clip = cam.view_projection() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.x.abs() < 1e-6);
        assert!(clip.y.abs() < 1e-6);
    }

    #[test]
    fn test_check_axes_coincident_position() {
        let mut cam = camera();
        cam.setup_initial(Vector3::new(1.0, 1.0, 1.0), Vector3::new(1.0, 1.0, 1.0)).unwrap();
        assert_eq!(cam.position(), Vector3::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn test_check_axes_parallel_up() {
        let mut cam = camera();
        cam.setup_initial(Vector3::zeros(), Vector3::new(0.0, 5.0, 0.0)).unwrap();

        // 视线沿 -Y，上向量被替换为 X 后再正交化
        assert!(cam.up().dot(&(cam.target() - cam.position()).normalize()).abs() < 1e-6);
        assert!(approx_eq_vec3(&cam.up(), &Vector3::x(), 1e-6));
    }

    #[test]
    fn test_move_rotation_keeps_distance() {
        let mut cam = camera();
        cam.setup_initial(Vector3::zeros(), Vector3::new(0.0, 0.0, 2.5)).unwrap();

        for _ in 0..90 {
            cam.move_rotation(&Vector3::y());
        }
        cam.update_view();

        assert!((cam.position().norm() - 2.5).abs() < 1e-3);
        assert!(approx_eq_vec3(&cam.position(), &Vector3::new(2.5, 0.0, 0.0), 1e-3));
    }

    #[test]
    fn test_move_position() {
        let mut cam = camera();
        cam.setup_initial(Vector3::zeros(), Vector3::new(0.0, 0.0, 10.0)).unwrap();

        // 每次移动距离的 1/10
        assert!(cam.move_position(1.0));
        assert!(approx_eq_vec3(&cam.position(), &Vector3::new(0.0, 0.0, 9.0), 1e-5));

        assert!(cam.move_position(-1.0));
        assert!(approx_eq_vec3(&cam.position(), &Vector3::new(0.0, 0.0, 9.9), 1e-5));
    }

    #[test]
    fn test_move_position_min_distance() {
        let mut cam = camera();
        cam.setup_initial(Vector3::zeros(), Vector3::new(0.0, 0.0, 0.55)).unwrap();

        assert!(!cam.move_position(1.0));
        assert_eq!(cam.position(), Vector3::new(0.0, 0.0, 0.55));
    }

    #[test]
    fn test_viewport_updates_projection() {
        let mut cam = camera();
        cam.setup_initial(Vector3::zeros(), Vector3::new(0.0, 0.0, 2.5)).unwrap();
        let before = *cam.projection();

        cam.set_viewport(800, 800);
        cam.update_projection();

        assert!((cam.aspect() - 1.0).abs() < 1e-6);
        assert_ne!(before, *cam.projection());
        assert_eq!(cam.mvp(&Matrix4::identity()), *cam.view_projection());
    }
}
