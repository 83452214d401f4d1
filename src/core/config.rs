//! 配置管理模块
//!
//! 提供沙盒配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 1200
//! height = 800
//! title = "D3D Sandbox"
//! resizable = true
//!
//! [graphics]
//! backend = "d3d12"   # 或 "d3d11"
//! back_buffer_count = 4
//! debug_layer = true
//! allow_tearing = true
//! sync_interval = 0
//! clear_color = [0.0, 0.2, 0.4, 1.0]
//! continuous_render = false
//!
//! [camera]
//! fov_degrees = 45.0
//! near = 0.01
//! far = 100000.0
//! position_step = 10.0
//! rotation_step_degrees = 1.0
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 沙盒配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 相机配置
    #[serde(default)]
    pub camera: CameraConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 场景名称或场景文件路径（由 `--scene` 覆盖）
    #[serde(default = "default_scene")]
    pub scene: String,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: GraphicsBackend,

    /// 交换链后台缓冲数量
    #[serde(default = "default_back_buffer_count")]
    pub back_buffer_count: u32,

    /// 是否启用调试层
    #[serde(default = "default_debug_layer")]
    pub debug_layer: bool,

    /// 是否启用 GPU-based validation（仅 D3D12）
    #[serde(default)]
    pub gpu_validation: bool,

    /// 是否允许撕裂（Present 时使用 ALLOW_TEARING）
    #[serde(default = "default_allow_tearing")]
    pub allow_tearing: bool,

    /// Present 同步间隔，0 表示不等待垂直同步
    #[serde(default)]
    pub sync_interval: u32,

    /// 背景清除颜色（RGBA）
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],

    /// 是否连续渲染（否则仅在需要时重绘）
    #[serde(default)]
    pub continuous_render: bool,
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsBackend {
    /// Direct3D 11（immediate context）
    D3d11,
    /// Direct3D 12（command list + descriptor heap）
    D3d12,
}

/// 相机配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 垂直视场角（角度）
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,

    /// 近裁剪面
    #[serde(default = "default_near")]
    pub near: f32,

    /// 远裁剪面
    #[serde(default = "default_far")]
    pub far: f32,

    /// 滚轮缩放步长，值越大每次移动越小
    #[serde(default = "default_position_step")]
    pub position_step: f32,

    /// 每次旋转的角度（角度）
    #[serde(default = "default_rotation_step")]
    pub rotation_step_degrees: f32,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 1200 }
fn default_height() -> u32 { 800 }
fn default_title() -> String { "D3D Sandbox".to_string() }
fn default_resizable() -> bool { true }
fn default_backend() -> GraphicsBackend { GraphicsBackend::D3d12 }
fn default_back_buffer_count() -> u32 { 4 }
fn default_debug_layer() -> bool { cfg!(debug_assertions) }
fn default_allow_tearing() -> bool { true }
fn default_clear_color() -> [f32; 4] { [0.0, 0.2, 0.4, 1.0] }
fn default_fov() -> f32 { 45.0 }
fn default_near() -> f32 { 0.01 }
fn default_far() -> f32 { 100_000.0 }
fn default_position_step() -> f32 { 10.0 }
fn default_rotation_step() -> f32 { 1.0 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "d3d_sandbox.log".to_string() }
fn default_scene() -> String { "l5b".to_string() }

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            graphics: GraphicsConfig::default(),
            camera: CameraConfig::default(),
            logging: LoggingConfig::default(),
            scene: default_scene(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            back_buffer_count: default_back_buffer_count(),
            debug_layer: default_debug_layer(),
            gpu_validation: false,
            allow_tearing: default_allow_tearing(),
            sync_interval: 0,
            clear_color: default_clear_color(),
            continuous_render: false,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
            position_step: default_position_step(),
            rotation_step_degrees: default_rotation_step(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use d3d_sandbox::core::Config;
    ///
    /// let config = Config::from_file("config.toml")?;
    /// # Ok::<(), d3d_sandbox::core::SandboxError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--d3d11` / `--d3d12`: 选择图形后端
    /// - `--width <value>` / `--height <value>`: 窗口尺寸
    /// - `--buffers <value>`: 后台缓冲数量
    /// - `--scene <name|path>`: 场景预设名或场景文件
    /// - `--continuous`: 连续渲染
    /// - `--no-debug-layer`: 关闭调试层
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--d3d11") {
            self.graphics.backend = GraphicsBackend::D3d11;
        }

        if args.iter().any(|a| a == "--d3d12") {
            self.graphics.backend = GraphicsBackend::D3d12;
        }

        if args.iter().any(|a| a == "--continuous") {
            self.graphics.continuous_render = true;
        }

        if args.iter().any(|a| a == "--no-debug-layer") {
            self.graphics.debug_layer = false;
        }

        if let Some(width) = parse_flag_value(&args, "--width") {
            self.window.width = width;
        }

        if let Some(height) = parse_flag_value(&args, "--height") {
            self.window.height = height;
        }

        if let Some(buffers) = parse_flag_value(&args, "--buffers") {
            self.graphics.back_buffer_count = buffers;
        }

        if let Some(idx) = args.iter().position(|a| a == "--scene") {
            if let Some(scene) = args.get(idx + 1) {
                self.scene = scene.clone();
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(invalid("window.width/height", "Window dimensions must be greater than 0"));
        }

        // DXGI flip model 至少需要 2 个缓冲，最多 16 个
        if !(2..=16).contains(&self.graphics.back_buffer_count) {
            return Err(invalid("graphics.back_buffer_count", "Back buffer count must be between 2 and 16"));
        }

        if self.graphics.sync_interval > 4 {
            return Err(invalid("graphics.sync_interval", "Sync interval must be between 0 and 4"));
        }

        let camera = &self.camera;
        if camera.near <= 0.0 || camera.near >= camera.far {
            return Err(invalid("camera.near/far", "Near plane must be positive and smaller than far plane"));
        }

        if camera.fov_degrees <= 0.0 || camera.fov_degrees >= 180.0 {
            return Err(invalid("camera.fov_degrees", "Field of view must be in (0, 180) degrees"));
        }

        if camera.position_step <= 0.0 {
            return Err(invalid("camera.position_step", "Position step must be greater than 0"));
        }

        Ok(())
    }
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<u32> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1)?.parse().ok()
}

fn invalid(field: &str, reason: &str) -> super::error::SandboxError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

impl GraphicsBackend {
    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            GraphicsBackend::D3d11 => "Direct3D 11",
            GraphicsBackend::D3d12 => "Direct3D 12",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 1200);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.graphics.backend, GraphicsBackend::D3d12);
        assert_eq!(config.graphics.back_buffer_count, 4);
        assert_eq!(config.graphics.clear_color, [0.0, 0.2, 0.4, 1.0]);
        assert_eq!(config.scene, "l5b");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.back_buffer_count = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.camera.near = 200_000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sync_interval_validation() {
        let mut config = Config::default();
        config.graphics.sync_interval = 4;
        assert!(config.validate().is_ok());

        config.graphics.sync_interval = 5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("graphics.sync_interval"));
    }

    #[test]
    fn test_fov_validation() {
        for fov in [0.0, -10.0, 180.0, 270.0] {
            let mut config = Config::default();
            config.camera.fov_degrees = fov;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("camera.fov_degrees"), "fov {}", fov);
        }

        let mut config = Config::default();
        config.camera.fov_degrees = 179.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_position_step_validation() {
        for step in [0.0, -1.0] {
            let mut config = Config::default();
            config.camera.position_step = step;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("camera.position_step"), "step {}", step);
        }
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args([
            "d3d_sandbox", "--d3d11", "--width", "640", "--buffers", "3", "--scene", "l2", "--continuous",
        ]);

        assert_eq!(config.graphics.backend, GraphicsBackend::D3d11);
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.graphics.back_buffer_count, 3);
        assert_eq!(config.scene, "l2");
        assert!(config.graphics.continuous_render);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [graphics]
            backend = "d3d11"

            [camera]
            fov_degrees = 60.0
            "#,
        )
        .unwrap();

        assert_eq!(config.graphics.backend, GraphicsBackend::D3d11);
        assert_eq!(config.graphics.back_buffer_count, 4);
        assert_eq!(config.camera.fov_degrees, 60.0);
        assert_eq!(config.camera.near, 0.01);
        assert_eq!(config.window.title, "D3D Sandbox");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml_str("[graphics]\nbackend = \"vulkan\"").is_err());
    }
}
