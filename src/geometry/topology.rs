//! 图元拓扑
//!
//! 输入装配阶段使用的拓扑，以及 PSO 需要的拓扑类别。

use serde::{Deserialize, Serialize};

use crate::core::error::{DataError, Result};

/// 图元拓扑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    LineList,
    TriangleList,
    PointList,
    LineStrip,
    TriangleStrip,
}

/// 管线状态对象中的拓扑类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopologyType {
    Line,
    Triangle,
}

impl Topology {
    /// 创建 PSO 时使用的拓扑类别
    ///
    /// 目前只有线列表和三角形列表有对应的管线。
    pub fn pipeline_type(&self) -> Result<PrimitiveTopologyType> {
        match self {
            Topology::LineList => Ok(PrimitiveTopologyType::Line),
            Topology::TriangleList => Ok(PrimitiveTopologyType::Triangle),
            other => Err(DataError::UnsupportedTopology(format!("{:?}", other)).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_type() {
        assert_eq!(Topology::LineList.pipeline_type().unwrap(), PrimitiveTopologyType::Line);
        assert_eq!(Topology::TriangleList.pipeline_type().unwrap(), PrimitiveTopologyType::Triangle);
        assert!(Topology::PointList.pipeline_type().is_err());
        assert!(Topology::TriangleStrip.pipeline_type().is_err());
    }
}
