//! 统一的数学库模块
//!
//! 提供图形编程常用的数学类型和函数。
//! 基于 `nalgebra` 但提供了更友好的 API。
//!
//! # 约定
//!
//! - 右手坐标系，列向量：`v' = M * v`
//! - 投影矩阵把深度映射到 Direct3D 的 [0, 1] 区间
//! - 上传到 GPU 的矩阵按列主序排列，HLSL 中使用 `mul(MVP, v)`

pub use nalgebra::{
    Matrix4 as Mat4, Point3, UnitQuaternion,
    Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4,
};

// 类型别名，使用更简洁的名称
pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix4 = Mat4<f32>;
pub type Quaternion = UnitQuaternion<f32>;

/// 颜色类型（RGBA，范围 0.0-1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// 创建新的颜色
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 创建 RGB 颜色（alpha = 1.0）
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// 从 0xAARRGGBB 创建颜色
    pub fn from_argb(argb: u32) -> Self {
        let channel = |shift: u32| ((argb >> shift) & 0xFF) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0), channel(24))
    }

    /// 转换为 0xAARRGGBB
    pub fn to_argb(&self) -> u32 {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.a) << 24) | (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// 转换为 `[r, g, b, a]`，用于 ClearRenderTargetView
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// 转换为 Vector3（忽略 alpha）
    pub fn to_vec3(&self) -> Vector3 {
        Vector3::new(self.r, self.g, self.b)
    }

    // 预定义颜色，取值与 CSS 命名颜色一致
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const LIME: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);
    pub const GRAY: Color = Color::rgb(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0);
    pub const LIGHT_GRAY: Color = Color::rgb(211.0 / 255.0, 211.0 / 255.0, 211.0 / 255.0);
    pub const PURPLE: Color = Color::rgb(128.0 / 255.0, 0.0, 128.0 / 255.0);
    pub const BROWN: Color = Color::rgb(165.0 / 255.0, 42.0 / 255.0, 42.0 / 255.0);
    pub const CADET_BLUE: Color = Color::rgb(95.0 / 255.0, 158.0 / 255.0, 160.0 / 255.0);
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Color::new(c[0], c[1], c[2], c[3])
    }
}

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// 角度转弧度的系数
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// 弧度转角度的系数
    pub const RAD_TO_DEG: f32 = 180.0 / PI;

    /// 浮点数比较的 epsilon
    pub const EPSILON: f32 = 1e-6;
}

/// 数学工具函数
pub mod utils {
    use super::*;

    /// 角度转弧度
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// 检查两个浮点数是否近似相等
    pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() < epsilon
    }

    /// 检查两个向量是否近似相等
    pub fn approx_eq_vec3(a: &Vector3, b: &Vector3, epsilon: f32) -> bool {
        (a - b).iter().all(|d| d.abs() < epsilon)
    }
}

/// 矩阵辅助函数
pub mod matrix {
    use super::*;

    /// 平移矩阵
    pub fn translation(v: &Vector3) -> Matrix4 {
        Matrix4::new_translation(v)
    }

    /// 右手坐标系透视投影，深度范围 [0, 1]
    ///
    /// 与 `XMMatrixPerspectiveFovRH` 相同，只是按列向量约定转置。
    pub fn perspective_fov_rh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
        let f = 1.0 / (fov_y * 0.5).tan();
        let range = far / (near - far);

        Matrix4::new(
            f / aspect, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, range, range * near,
            0.0, 0.0, -1.0, 0.0,
        )
    }

    /// 右手坐标系视图矩阵
    pub fn look_at_rh(eye: &Vector3, target: &Vector3, up: &Vector3) -> Matrix4 {
        Matrix4::look_at_rh(&Point3::from(*eye), &Point3::from(*target), up)
    }

    /// 转换为上传给 GPU 的 16 个 float（列主序）
    pub fn to_gpu_matrix(m: &Matrix4) -> [f32; 16] {
        let mut out = [0.0f32; 16];
        out.copy_from_slice(m.as_slice());
        out
    }
}

/// 四元数辅助函数
pub mod quaternion {
    use super::*;
    use nalgebra::Unit;

    /// 从轴角创建四元数
    pub fn from_axis_angle(axis: &Vector3, angle: f32) -> Quaternion {
        Quaternion::from_axis_angle(&Unit::new_normalize(*axis), angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::utils::approx_eq;

    #[test]
    fn test_color_argb() {
        let c = Color::from_argb(0xFF00FF00);
        assert_eq!(c, Color::LIME);
        assert_eq!(c.to_argb(), 0xFF00FF00);
        assert_eq!(Color::from_argb(0x000000FF).a, 0.0);
        assert_eq!(Color::BROWN.to_argb(), 0xFFA52A2A);
    }

    #[test]
    fn test_perspective_depth_range() {
        let near = 0.01;
        let far = 100.0;
        let proj = matrix::perspective_fov_rh(45.0 * constants::DEG_TO_RAD, 1.5, near, far);

        // 右手坐标系中相机看向 -Z
        let at_near = proj * Vector4::new(0.0, 0.0, -near, 1.0);
        let at_far = proj * Vector4::new(0.0, 0.0, -far, 1.0);

        assert!(approx_eq(at_near.z / at_near.w, 0.0, 1e-5));
        assert!(approx_eq(at_far.z / at_far.w, 1.0, 1e-5));
    }

    #[test]
    fn test_look_at_maps_target_to_forward() {
        let eye = Vector3::new(0.0, 0.0, 2.5);
        let view = matrix::look_at_rh(&eye, &Vector3::zeros(), &Vector3::y());
        let p = view * Vector4::new(0.0, 0.0, 0.0, 1.0);

        assert!(approx_eq(p.x, 0.0, 1e-6));
        assert!(approx_eq(p.z, -2.5, 1e-6));
    }

    #[test]
    fn test_gpu_matrix_is_column_major() {
        let m = matrix::translation(&Vector3::new(1.0, 2.0, 3.0));
        let gpu = matrix::to_gpu_matrix(&m);

        // 平移位于第 4 列，列主序下是第 12..15 个元素
        assert_eq!(&gpu[12..16], &[1.0, 2.0, 3.0, 1.0]);
        assert_eq!(gpu[0], 1.0);
        assert_eq!(gpu[3], 0.0);
    }

    #[test]
    fn test_quaternion_rotation() {
        let q = quaternion::from_axis_angle(&Vector3::y(), constants::PI / 2.0);
        let v = q * Vector3::x();
        assert!(utils::approx_eq_vec3(&v, &Vector3::new(0.0, 0.0, -1.0), 1e-6));
    }
}
