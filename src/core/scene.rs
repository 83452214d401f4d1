//! 场景配置模块
//!
//! 场景描述相机的初始位置和若干绘制集。可以从 TOML 文件加载，
//! 也可以直接使用内置的课程预设：
//!
//! | 预设 | 内容 |
//! |------|------|
//! | `l0a` / `l0b` | 非索引线段，无 MVP |
//! | `l1` | 索引线段 |
//! | `l2` | 索引线段 + MVP |
//! | `l3` | 纹理三角形（交错缓冲 / 分离缓冲） |
//! | `l4` | 实例化纹理三角形 |
//! | `l5a` / `l5b` | 多项绘制集（非实例化 / 实例化） |
//! | `box` | POSITION/NORMAL/TEXCOORD 立方体 |
//! | `axes` | 彩色坐标轴 |
//!
//! ```toml
//! [camera]
//! position = [1.0, 0.5, 3.0]
//! target = [1.0, 0.5, 0.0]
//!
//! [[draw_sets]]
//! [[draw_sets.items]]
//! shader = "float3B"
//! dataset = { name = "triang1", param = 0.5 }
//! bitmap = { kind = 2 }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{ConfigError, Result, SandboxError};
use crate::geometry::{BitmapSource, Dataset, Instances, RenderMode};
use crate::math::Vector3;
use crate::renderer::draw_set::{DrawItem, DrawSetDesc};
use crate::renderer::shaders::ShaderKind;

/// 内置预设名称
pub const PRESETS: [&str; 10] = ["l0a", "l0b", "l1", "l2", "l3", "l4", "l5a", "l5b", "box", "axes"];

/// 相机初始状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCamera {
    /// 观察目标
    #[serde(default)]
    pub target: [f32; 3],

    /// 相机位置
    #[serde(default = "default_camera_position")]
    pub position: [f32; 3],
}

fn default_camera_position() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}

impl Default for SceneCamera {
    fn default() -> Self {
        Self {
            target: [0.0; 3],
            position: default_camera_position(),
        }
    }
}

impl SceneCamera {
    fn at(position: [f32; 3], target: [f32; 3]) -> Self {
        Self { target, position }
    }

    pub fn target(&self) -> Vector3 {
        Vector3::from(self.target)
    }

    pub fn position(&self) -> Vector3 {
        Vector3::from(self.position)
    }
}

/// 绘制项配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneItem {
    pub shader: ShaderKind,

    pub dataset: Dataset,

    /// 纹理来源，着色器需要纹理时必须提供
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitmap: Option<BitmapSource>,

    /// 逐实例数据
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<Instances>,

    #[serde(default)]
    pub render_mode: RenderMode,

    /// 模型平移
    #[serde(default)]
    pub translation: [f32; 3],
}

impl SceneItem {
    fn new(shader: ShaderKind, dataset: Dataset) -> Self {
        Self {
            shader,
            dataset,
            bitmap: None,
            instances: None,
            render_mode: RenderMode::Solid,
            translation: [0.0; 3],
        }
    }

    fn bitmap(mut self, kind: u32) -> Self {
        self.bitmap = Some(BitmapSource::HardCoded { kind });
        self
    }

    fn instances(mut self, instances: Instances) -> Self {
        self.instances = Some(instances);
        self
    }

    fn render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// 生成网格、加载位图，得到平台无关的绘制项
    pub fn build(&self) -> Result<DrawItem> {
        let mut mesh = self.dataset.build();
        if let Some(instances) = &self.instances {
            mesh = mesh.with_instances(instances.build());
        }

        let mut item = DrawItem::new(self.shader, mesh)
            .with_render_mode(self.render_mode)
            .with_translation(Vector3::from(self.translation));

        if let Some(source) = &self.bitmap {
            item = item.with_texture(source.load()?);
        }

        Ok(item)
    }
}

/// 绘制集配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDrawSet {
    #[serde(default)]
    pub items: Vec<SceneItem>,
}

impl SceneDrawSet {
    fn of(items: Vec<SceneItem>) -> Self {
        Self { items }
    }
}

/// 场景配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// 相机配置
    #[serde(default)]
    pub camera: SceneCamera,

    /// 按顺序绘制的绘制集
    #[serde(default)]
    pub draw_sets: Vec<SceneDrawSet>,
}

impl SceneConfig {
    /// 内置预设
    pub fn preset(name: &str) -> Result<Self> {
        use Dataset::*;
        use ShaderKind as S;

        let tex_triang1 = |param| SceneItem::new(S::Float3B, Triang1 { param }).bitmap(2);
        let tex_triang2 = |param| SceneItem::new(S::Float3B, Triang2 { param }).bitmap(2);
        let inst_triang1 = |param| {
            SceneItem::new(S::Float3Instance, Triang1 { param })
                .bitmap(2)
                .instances(Instances::Instance1)
        };
        let inst_triang2 = |param| {
            SceneItem::new(S::Float3Instance, Triang2 { param })
                .bitmap(2)
                .instances(Instances::Instance1)
        };

        let scene = match name.to_ascii_lowercase().as_str() {
            "l0a" => Self {
                camera: SceneCamera::default(),
                draw_sets: vec![SceneDrawSet::of(vec![SceneItem::new(
                    S::Float2NoMvs3,
                    Line1Direct { param: -0.95 },
                )])],
            },
            "l0b" => Self {
                camera: SceneCamera::default(),
                draw_sets: vec![
                    SceneDrawSet::of(vec![SceneItem::new(S::Float2NoMvs3, Line1Direct { param: -0.95 })]),
                    SceneDrawSet::of(vec![SceneItem::new(S::Float2NoMvs3, Line1Direct { param: -0.75 })]),
                ],
            },
            "l1" => Self {
                camera: SceneCamera::default(),
                draw_sets: vec![SceneDrawSet::of(vec![SceneItem::new(
                    S::Float2NoMvs3,
                    Line1 { param: -0.95 },
                )])],
            },
            "l2" => Self {
                camera: SceneCamera::at([0.0, 0.0, 2.5], [0.0; 3]),
                draw_sets: vec![SceneDrawSet::of(vec![SceneItem::new(S::Float2, Line1 { param: -0.95 })])],
            },
            "l3" => Self {
                camera: SceneCamera::at([1.0, 0.5, 3.0], [1.0, 0.5, 0.0]),
                draw_sets: vec![
                    SceneDrawSet::of(vec![tex_triang1(0.5)]),
                    SceneDrawSet::of(vec![tex_triang2(0.0)]),
                ],
            },
            "l4" => Self {
                camera: SceneCamera::at([1.0, 2.0, 8.0], [1.0, 2.0, 1.05]),
                draw_sets: vec![
                    SceneDrawSet::of(vec![inst_triang1(0.3)]),
                    SceneDrawSet::of(vec![inst_triang2(1.2)]),
                ],
            },
            "l5a" => Self {
                camera: SceneCamera::at([1.0, 0.75, 4.0], [1.0, 0.75, 1.05]),
                draw_sets: vec![
                    SceneDrawSet::of(vec![tex_triang1(0.3), tex_triang1(0.6), tex_triang1(0.9)]),
                    SceneDrawSet::of(vec![tex_triang2(1.2), tex_triang2(1.5), tex_triang2(1.8)]),
                ],
            },
            "l5b" => Self {
                camera: SceneCamera::at([1.0, 2.0, 8.0], [1.0, 2.0, 1.05]),
                draw_sets: vec![
                    SceneDrawSet::of(vec![inst_triang1(0.3), inst_triang1(0.6), inst_triang1(0.9)]),
                    SceneDrawSet::of(vec![
                        inst_triang2(1.2).render_mode(RenderMode::Wireframe),
                        inst_triang2(1.5),
                        inst_triang2(1.8),
                    ]),
                ],
            },
            "box" => Self {
                camera: SceneCamera::at([1.5, 1.5, 3.0], [0.0; 3]),
                draw_sets: vec![SceneDrawSet::of(vec![
                    SceneItem::new(S::Float3VsInput, Cube { param: 1.0 }).bitmap(2),
                ])],
            },
            "axes" => Self {
                camera: SceneCamera::at([2.0, 1.5, 3.0], [0.0; 3]),
                draw_sets: vec![SceneDrawSet::of(vec![SceneItem::new(S::Float3D, AxesXyz)])],
            },
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "scene".to_string(),
                    reason: format!("Unknown scene preset '{}', expected one of {:?}", other, PRESETS),
                }
                .into())
            }
        };

        Ok(scene)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| {
            SandboxError::Config(ConfigError::ParseError(format!(
                "Failed to parse scene config: {}",
                e
            )))
        })
    }

    /// 从文件加载场景配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            SandboxError::Config(ConfigError::FileNotFound(format!(
                "Failed to read scene config file '{}': {}",
                path.display(),
                e
            )))
        })?;

        Self::from_toml_str(&contents)
    }

    /// 从文件加载，如果文件不存在或解析失败则使用 `l5b` 预设
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::from_file(path) {
                Ok(config) => {
                    tracing::info!("Loaded scene config from: {}", path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load scene config: {}, using defaults", e);
                }
            }
        } else {
            tracing::info!("Scene config not found, using defaults");
        }

        Self::preset("l5b").unwrap_or_default()
    }

    /// 按预设名或文件路径加载
    ///
    /// 先匹配预设名，否则当作 TOML 文件路径。
    pub fn load(name_or_path: &str) -> Result<Self> {
        if PRESETS.contains(&name_or_path.to_ascii_lowercase().as_str()) {
            tracing::info!("Using built-in scene preset: {}", name_or_path);
            return Self::preset(name_or_path);
        }

        let scene = Self::from_file(name_or_path)?;
        tracing::info!("Loaded scene config from: {}", name_or_path);
        Ok(scene)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self).map_err(|e| {
            SandboxError::Config(ConfigError::ParseError(format!(
                "Failed to serialize scene config: {}",
                e
            )))
        })?;

        fs::write(path, contents).map_err(|e| {
            SandboxError::Config(ConfigError::FileNotFound(format!(
                "Failed to write scene config to '{}': {}",
                path.display(),
                e
            )))
        })?;

        tracing::info!("Saved scene config to: {}", path.display());
        Ok(())
    }

    /// 生成绘制集描述，并逐个校验
    pub fn into_draw_sets(&self) -> Result<Vec<DrawSetDesc>> {
        if self.draw_sets.is_empty() {
            return Err(ConfigError::MissingField("draw_sets".to_string()).into());
        }

        self.draw_sets
            .iter()
            .map(|set| {
                let items = set.items.iter().map(SceneItem::build).collect::<Result<Vec<_>>>()?;
                let desc = DrawSetDesc::new(items);
                desc.validate()?;
                Ok(desc)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::draw_set::DrawSetLevel;

    #[test]
    fn test_all_presets_valid() {
        for name in PRESETS {
            let scene = SceneConfig::preset(name).unwrap();
            let sets = scene.into_draw_sets().unwrap();
            assert!(!sets.is_empty(), "{} has no draw sets", name);
        }
    }

    #[test]
    fn test_preset_levels() {
        let level = |name: &str| {
            SceneConfig::preset(name)
                .unwrap()
                .into_draw_sets()
                .unwrap()
                .iter()
                .map(|set| set.level().unwrap())
                .collect::<Vec<_>>()
        };

        assert_eq!(level("l0a"), vec![DrawSetLevel::L0]);
        assert_eq!(level("l0b"), vec![DrawSetLevel::L0, DrawSetLevel::L0]);
        assert_eq!(level("l1"), vec![DrawSetLevel::L1]);
        assert_eq!(level("l2"), vec![DrawSetLevel::L2]);
        assert_eq!(level("l3"), vec![DrawSetLevel::L3, DrawSetLevel::L3]);
        assert_eq!(level("l4"), vec![DrawSetLevel::L4, DrawSetLevel::L4]);
        assert_eq!(level("l5b"), vec![DrawSetLevel::L5, DrawSetLevel::L5]);
    }

    #[test]
    fn test_l5b_render_modes_and_camera() {
        let scene = SceneConfig::preset("L5B").unwrap();
        assert_eq!(scene.camera.position, [1.0, 2.0, 8.0]);
        assert_eq!(scene.camera.target, [1.0, 2.0, 1.05]);

        let sets = scene.into_draw_sets().unwrap();
        assert_eq!(sets[1].item(0).unwrap().render_mode, RenderMode::Wireframe);
        assert_eq!(sets[1].item(1).unwrap().render_mode, RenderMode::Solid);
        assert_eq!(sets[0].item(2).unwrap().mesh.instance_count(), 10);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(
            SceneConfig::preset("l9"),
            Err(SandboxError::Config(ConfigError::InvalidValue { .. }))
        ));
        assert!(SceneConfig::load("no/such/scene.toml").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let scene = SceneConfig::from_toml_str(
            r#"
            [camera]
            position = [1.0, 0.5, 3.0]
            target = [1.0, 0.5, 0.0]

            [[draw_sets]]
            [[draw_sets.items]]
            shader = "float3_Instance"
            dataset = { name = "triang2", param = 1.2 }
            bitmap = { kind = 2 }
            instances = "instance1"
            render_mode = "wireframe"
            translation = [0.5, 0.0, 0.0]

            [[draw_sets]]
            [[draw_sets.items]]
            shader = "float3_VsInput"
            dataset = { name = "box" }
            bitmap = { kind = 1 }
            "#,
        )
        .unwrap();

        assert_eq!(scene.camera.position(), Vector3::new(1.0, 0.5, 3.0));
        assert_eq!(scene.draw_sets.len(), 2);

        let item = &scene.draw_sets[0].items[0];
        assert_eq!(item.shader, ShaderKind::Float3Instance);
        assert_eq!(item.dataset, Dataset::Triang2 { param: 1.2 });
        assert_eq!(item.instances, Some(Instances::Instance1));
        assert_eq!(item.render_mode, RenderMode::Wireframe);
        assert_eq!(scene.draw_sets[1].items[0].dataset, Dataset::Cube { param: 1.0 });

        let sets = scene.into_draw_sets().unwrap();
        assert_eq!(sets[0].item(0).unwrap().model()[(0, 3)], 0.5);
    }

    #[test]
    fn test_missing_texture_rejected() {
        let scene = SceneConfig::from_toml_str(
            r#"
            [[draw_sets]]
            [[draw_sets.items]]
            shader = "float3B"
            dataset = { name = "triang1", param = 0.5 }
            "#,
        )
        .unwrap();

        assert_eq!(scene.camera, SceneCamera::default());
        assert!(scene.into_draw_sets().is_err());
        assert!(SceneConfig::default().into_draw_sets().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join("d3d_sandbox_test_scene.toml");
        let scene = SceneConfig::preset("l3").unwrap();
        scene.save_to_file(&path).unwrap();

        let loaded = SceneConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded, scene);
        let _ = fs::remove_file(&path);
    }
}
