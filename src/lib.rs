//! D3D Sandbox - 分步骤的 Direct3D 渲染沙盒
//!
//! 按课程顺序逐步引入 Direct3D 的渲染概念：非索引绘制、索引绘制、MVP 变换、
//! 纹理、实例化以及多个绘制集的批量绘制。同时提供两个后端：
//! Direct3D 11（immediate context）和 Direct3D 12（command list + descriptor heap）。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（日志、配置、错误处理、场景、输入）
//! - `math`: 数学库（nalgebra 别名、投影矩阵、颜色）
//! - `component`: 轨道相机与移动点
//! - `geometry`: 顶点格式、输入布局、内置数据集与位图
//! - `renderer`: 平台无关的绘制集描述、着色器源码、帧同步和统一渲染器
//! - `gfx`: 图形后端（仅 Windows）
//!
//! 除 `gfx` 外的所有模块都与平台无关，可以在任何操作系统上测试。

pub mod core;
pub mod math;
pub mod component;
pub mod geometry;
pub mod renderer;
pub mod gfx;
