//! 组件模块
//!
//! 提供轨道相机以及作为相机目标的可移动点。

mod camera;
mod moving_point;

pub use camera::OrbitCamera;
pub use moving_point::MovingPoint;
