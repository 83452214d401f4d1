//! 错误处理模块
//!
//! 定义了沙盒中使用的统一错误类型。
//!
//! 原生图形 API 的任何失败返回值都会立即转换为 `SandboxError` 并通过 `?` 向上传播，
//! 不做重试也不做恢复，由 `main` 负责记录日志并退出。

use std::fmt;

/// 沙盒统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, SandboxError>;

/// 沙盒的错误类型
#[derive(Debug)]
pub enum SandboxError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// 数据集 / 位图 / 绘制集描述错误
    Data(DataError),

    /// IO 错误
    Io(std::io::Error),

    /// 日志系统错误
    Log(String),

    /// 初始化错误
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置项缺失
    MissingField(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// 设备创建失败
    DeviceCreation(String),

    /// 交换链错误
    SwapchainError(String),

    /// 着色器编译失败
    ShaderCompilation(String),

    /// 资源创建失败
    ResourceCreation(String),

    /// 渲染命令执行失败
    CommandExecution(String),

    /// 调试层报告了 Error / Corruption 级别的消息
    DebugLayer { location: String, message: String },
}

/// 数据相关的错误
#[derive(Debug)]
pub enum DataError {
    /// 位图数据不合法（例如像素数不是宽度的整数倍）
    InvalidBitmap(String),

    /// 不支持的像素格式
    UnsupportedPixelFormat(String),

    /// 未知的内置位图编号
    UnknownBitmap(u32),

    /// 不支持的图元拓扑
    UnsupportedTopology(String),

    /// 绘制集描述无效
    InvalidDrawSet(String),

    /// 网格的输入布局与着色器的输入签名不一致
    LayoutMismatch { shader: String, layout: String },

    /// 子绘制集下标越界
    IndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxError::Config(e) => write!(f, "Configuration error: {}", e),
            SandboxError::Graphics(e) => write!(f, "Graphics error: {}", e),
            SandboxError::Data(e) => write!(f, "Data error: {}", e),
            SandboxError::Io(e) => write!(f, "IO error: {}", e),
            SandboxError::Log(msg) => write!(f, "Log error: {}", msg),
            SandboxError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            SandboxError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {}", field),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::SwapchainError(msg) => write!(f, "Swapchain error: {}", msg),
            GraphicsError::ShaderCompilation(msg) => write!(f, "Shader compilation failed: {}", msg),
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::CommandExecution(msg) => write!(f, "Command execution failed: {}", msg),
            GraphicsError::DebugLayer { location, message } => {
                write!(f, "Debug layer error at {}: {}", location, message)
            }
        }
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::InvalidBitmap(msg) => write!(f, "Invalid bitmap: {}", msg),
            DataError::UnsupportedPixelFormat(msg) => write!(f, "Unsupported pixel format: {}", msg),
            DataError::UnknownBitmap(kind) => write!(f, "Unknown hard-coded bitmap: {}", kind),
            DataError::UnsupportedTopology(msg) => write!(f, "Unsupported topology: {}", msg),
            DataError::InvalidDrawSet(msg) => write!(f, "Invalid draw set: {}", msg),
            DataError::LayoutMismatch { shader, layout } => {
                write!(f, "Shader {} cannot read a mesh with input layout {}", shader, layout)
            }
            DataError::IndexOutOfRange { index, len } => {
                write!(f, "Draw item index {} out of range (len {})", index, len)
            }
        }
    }
}

impl std::error::Error for SandboxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SandboxError::Io(e) => Some(e),
            SandboxError::Config(e) => Some(e),
            SandboxError::Graphics(e) => Some(e),
            SandboxError::Data(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}
impl std::error::Error for DataError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for SandboxError {
    fn from(err: std::io::Error) -> Self {
        SandboxError::Io(err)
    }
}

impl From<ConfigError> for SandboxError {
    fn from(err: ConfigError) -> Self {
        SandboxError::Config(err)
    }
}

impl From<GraphicsError> for SandboxError {
    fn from(err: GraphicsError) -> Self {
        SandboxError::Graphics(err)
    }
}

impl From<DataError> for SandboxError {
    fn from(err: DataError) -> Self {
        SandboxError::Data(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: SandboxError = DataError::IndexOutOfRange { index: 3, len: 2 }.into();
        assert_eq!(err.to_string(), "Data error: Draw item index 3 out of range (len 2)");

        let err: SandboxError = GraphicsError::DebugLayer {
            location: "resize".to_string(),
            message: "boom".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Graphics error: Debug layer error at resize: boom");
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;

        let err: SandboxError = ConfigError::MissingField("window".to_string()).into();
        assert!(err.source().is_some());

        let err = SandboxError::Runtime("x".to_string());
        assert!(err.source().is_none());
    }
}
