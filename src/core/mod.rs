//! 核心功能模块
//!
//! 本模块提供了沙盒的基础功能，包括日志系统、配置管理、错误处理、场景描述和输入处理。
//! 这些模块独立于具体的图形 API，可以在任何渲染后端中使用。
//!
//! # 模块组织
//!
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `config`：配置管理，支持从配置文件加载沙盒设置
//! - `error`：错误处理，定义统一的错误类型
//! - `scene`：场景描述，内置课程预设以及 scene.toml 解析
//! - `input`：把窗口事件转换为轨道相机操作

pub mod log;
pub mod config;
pub mod error;
pub mod scene;
pub mod input;

// 重新导出常用类型，方便使用
pub use error::{Result, SandboxError, ConfigError, GraphicsError, DataError};
pub use config::{Config, GraphicsBackend};
pub use scene::SceneConfig;
pub use input::{OrbitInput, InputAction};
