//! 网格、图元与访问器

use crate::render::defines::ShaderDefines;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 访问器元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    /// 每个元素的分量数
    pub fn components(&self) -> usize {
        match self {
            ElementType::Scalar => 1,
            ElementType::Vec2 => 2,
            ElementType::Vec3 => 3,
            ElementType::Vec4 | ElementType::Mat2 => 4,
            ElementType::Mat3 => 9,
            ElementType::Mat4 => 16,
        }
    }

    /// glTF 中的类型名
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Scalar => "SCALAR",
            ElementType::Vec2 => "VEC2",
            ElementType::Vec3 => "VEC3",
            ElementType::Vec4 => "VEC4",
            ElementType::Mat2 => "MAT2",
            ElementType::Mat3 => "MAT3",
            ElementType::Mat4 => "MAT4",
        }
    }
}

/// 访问器分量类型（取值与 GL 枚举一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ComponentType {
    Byte = 5120,
    UnsignedByte = 5121,
    Short = 5122,
    UnsignedShort = 5123,
    UnsignedInt = 5125,
    Float = 5126,
}

/// 访问器
///
/// 数据在加载阶段已经解交错并转换为 `f32`，原始缓冲视图只保留索引，
/// GPU 绑定时需要它。
#[derive(Debug, Clone)]
pub struct Accessor {
    /// 元素个数
    pub count: usize,
    /// 元素类型
    pub element_type: ElementType,
    /// 分量类型
    pub component_type: ComponentType,
    /// 是否归一化
    pub normalized: bool,
    /// 缓冲视图索引，稀疏或纯CPU访问器为 `None`
    pub buffer_view: Option<usize>,
    data: Vec<f32>,
}

impl Accessor {
    /// 由已解码的数据创建访问器，元素个数由数据长度推导
    pub fn new(element_type: ElementType, component_type: ComponentType, data: Vec<f32>) -> Self {
        let count = data.len() / element_type.components();
        Self {
            count,
            element_type,
            component_type,
            normalized: false,
            buffer_view: None,
            data,
        }
    }

    /// 标量浮点访问器，常用于动画时间轴
    pub fn scalars(data: Vec<f32>) -> Self {
        Self::new(ElementType::Scalar, ComponentType::Float, data)
    }

    /// 设置缓冲视图
    pub fn with_buffer_view(mut self, buffer_view: usize) -> Self {
        self.buffer_view = Some(buffer_view);
        self
    }

    /// 解交错后的连续数据
    pub fn deinterlaced_view(&self) -> &[f32] {
        &self.data
    }

    /// 读取第 `index` 个元素
    pub fn element(&self, index: usize) -> Option<&[f32]> {
        let stride = self.element_type.components();
        self.data.get(index * stride..(index + 1) * stride)
    }

    /// 各分量的最小值与最大值
    pub fn bounds(&self) -> Option<(Vec<f32>, Vec<f32>)> {
        let stride = self.element_type.components();
        let mut chunks = self.data.chunks_exact(stride);
        let first = chunks.next()?;
        let mut min = first.to_vec();
        let mut max = first.to_vec();
        for chunk in chunks {
            for (i, value) in chunk.iter().enumerate() {
                min[i] = min[i].min(*value);
                max[i] = max[i].max(*value);
            }
        }
        Some((min, max))
    }
}

/// 图元拓扑（取值与 GL 枚举一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum PrimitiveMode {
    Points = 0,
    Lines = 1,
    LineLoop = 2,
    LineStrip = 3,
    #[default]
    Triangles = 4,
    TriangleStrip = 5,
    TriangleFan = 6,
}

/// 顶点属性：着色器中的名称与访问器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// 着色器中的名称，如 `a_position`
    pub name: String,
    /// 访问器索引
    pub accessor: usize,
}

/// 材质变体映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMapping {
    /// 替换用的材质
    pub material: usize,
    /// 命中的变体索引
    pub variants: Vec<usize>,
}

/// 几何图元
#[derive(Debug, Clone)]
pub struct Primitive {
    /// 顶点属性（含变形目标）
    pub attributes: Vec<VertexAttribute>,
    /// 索引访问器
    pub indices: Option<usize>,
    /// 材质
    pub material: Option<usize>,
    /// 拓扑
    pub mode: PrimitiveMode,
    /// 变形目标个数
    pub target_count: usize,
    /// 材质变体映射
    pub mappings: Vec<VariantMapping>,
    /// 包围盒中心（模型空间），用于深度排序
    pub centroid: Vec3,
    /// 无法绘制的图元（例如缺少 POSITION）
    pub skip: bool,
    pub has_joints: bool,
    pub has_weights: bool,
    pub has_normals: bool,
    defines: ShaderDefines,
}

impl Primitive {
    /// 顶点着色器标识
    pub const SHADER_IDENTIFIER: &'static str = "primitive.vert";
    /// 支持的最大变形目标数
    pub const MAX_MORPH_TARGETS: usize = 8;

    /// 由 glTF 属性表构建图元
    ///
    /// `attributes` 和 `targets` 使用 glTF 语义名（`POSITION`、`TEXCOORD_0` 等）。
    pub fn new(
        attributes: &[(&str, usize)],
        targets: &[Vec<(&str, usize)>],
        indices: Option<usize>,
        material: Option<usize>,
        accessors: &[Accessor],
    ) -> Self {
        let mut defines = ShaderDefines::new();
        let mut gl_attributes = Vec::with_capacity(attributes.len());
        let mut centroid = Vec3::ZERO;
        let mut has_position = false;

        for (semantic, accessor_index) in attributes {
            let Some(accessor) = accessors.get(*accessor_index) else {
                tracing::warn!(
                    target: "scene",
                    "Attribute {semantic} references missing accessor {accessor_index}"
                );
                continue;
            };

            if *semantic == "POSITION" {
                has_position = true;
                if let Some((min, max)) = accessor.bounds() {
                    if min.len() >= 3 {
                        centroid = (Vec3::new(min[0], min[1], min[2])
                            + Vec3::new(max[0], max[1], max[2]))
                            * 0.5;
                    }
                }
            }

            defines.flag(&format!("HAS_{}_{}", semantic, accessor.element_type.name()));
            gl_attributes.push(VertexAttribute {
                name: format!("a_{}", semantic.to_ascii_lowercase()),
                accessor: *accessor_index,
            });
        }

        let target_count = targets.len().min(Self::MAX_MORPH_TARGETS);
        if targets.len() > Self::MAX_MORPH_TARGETS {
            tracing::warn!(
                target: "scene",
                "Primitive has {} morph targets, only {} are used",
                targets.len(),
                Self::MAX_MORPH_TARGETS
            );
        }
        for (index, target) in targets.iter().take(target_count).enumerate() {
            for (semantic, accessor_index) in target {
                let lower = semantic.to_ascii_lowercase();
                if index == 0 {
                    defines.flag(&format!("HAS_MORPH_TARGET_{semantic}"));
                }
                gl_attributes.push(VertexAttribute {
                    name: format!("a_target_{lower}{index}"),
                    accessor: *accessor_index,
                });
            }
        }

        let has_semantic = |prefix: &str| attributes.iter().any(|(s, _)| s.starts_with(prefix));

        Self {
            has_joints: has_semantic("JOINTS_"),
            has_weights: has_semantic("WEIGHTS_"),
            has_normals: has_semantic("NORMAL"),
            attributes: gl_attributes,
            indices,
            material,
            mode: PrimitiveMode::Triangles,
            target_count,
            mappings: Vec::new(),
            centroid,
            skip: !has_position,
            defines,
        }
    }

    /// 顶点阶段的图元宏
    pub fn defines(&self) -> &ShaderDefines {
        &self.defines
    }

    pub fn shader_identifier(&self) -> &'static str {
        Self::SHADER_IDENTIFIER
    }

    /// 根据当前变体解析实际使用的材质
    pub fn effective_material(&self, variant: Option<usize>) -> Option<usize> {
        let variant = match variant {
            Some(v) => v,
            None => return self.material,
        };
        self.mappings
            .iter()
            .rev()
            .find(|mapping| mapping.variants.contains(&variant))
            .map(|mapping| mapping.material)
            .or(self.material)
    }
}

/// 网格
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    /// 默认变形权重
    pub weights: Vec<f32>,
    /// 动画写入的权重
    pub weights_animated: Option<Vec<f32>>,
}

impl Mesh {
    /// 默认权重全为 0，个数取各图元变形目标数的最大值
    pub fn new(primitives: Vec<Primitive>) -> Self {
        let target_count = primitives
            .iter()
            .map(|primitive| primitive.target_count)
            .max()
            .unwrap_or(0);
        Self {
            primitives,
            weights: vec![0.0; target_count],
            ..Default::default()
        }
    }

    /// 当前生效的变形权重
    pub fn current_weights(&self) -> &[f32] {
        self.weights_animated.as_deref().unwrap_or(&self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions() -> Accessor {
        Accessor::new(
            ElementType::Vec3,
            ComponentType::Float,
            vec![0.0, 0.0, 0.0, 2.0, 4.0, -2.0, 1.0, 1.0, 1.0],
        )
        .with_buffer_view(0)
    }

    #[test]
    fn test_accessor_elements() {
        let accessor = positions();
        assert_eq!(accessor.count, 3);
        assert_eq!(accessor.element(1), Some(&[2.0, 4.0, -2.0][..]));
        assert_eq!(accessor.element(3), None);
    }

    #[test]
    fn test_primitive_defines_and_centroid() {
        let accessors = vec![
            positions(),
            Accessor::new(ElementType::Vec3, ComponentType::Float, vec![0.0; 9]),
        ];
        let primitive = Primitive::new(
            &[("POSITION", 0), ("NORMAL", 1)],
            &[vec![("POSITION", 1)]],
            None,
            Some(0),
            &accessors,
        );

        assert!(!primitive.skip);
        assert!(primitive.has_normals);
        assert!(!primitive.has_joints);
        assert!(primitive.defines().contains("HAS_POSITION_VEC3 1"));
        assert!(primitive.defines().contains("HAS_NORMAL_VEC3 1"));
        assert!(primitive.defines().contains("HAS_MORPH_TARGET_POSITION 1"));
        assert_eq!(primitive.centroid, Vec3::new(1.0, 2.0, -1.0));

        let names: Vec<&str> = primitive.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a_position", "a_normal", "a_target_position0"]);
    }

    #[test]
    fn test_primitive_without_position_is_skipped() {
        let accessors = vec![positions()];
        let primitive = Primitive::new(&[("NORMAL", 0)], &[], None, Some(0), &accessors);
        assert!(primitive.skip);
    }

    #[test]
    fn test_effective_material() {
        let mut primitive = Primitive::new(&[], &[], None, Some(0), &[]);
        primitive.mappings = vec![
            VariantMapping {
                material: 1,
                variants: vec![0, 2],
            },
            VariantMapping {
                material: 2,
                variants: vec![1],
            },
        ];

        assert_eq!(primitive.effective_material(None), Some(0));
        assert_eq!(primitive.effective_material(Some(0)), Some(1));
        assert_eq!(primitive.effective_material(Some(1)), Some(2));
        assert_eq!(primitive.effective_material(Some(5)), Some(0));
    }

    #[test]
    fn test_default_weights_follow_morph_targets() {
        let accessors = vec![positions()];
        let morphed = Primitive::new(
            &[("POSITION", 0)],
            &[vec![("POSITION", 0)], vec![("POSITION", 0)], vec![("POSITION", 0)]],
            None,
            None,
            &accessors,
        );
        let plain = Primitive::new(&[("POSITION", 0)], &[], None, None, &accessors);

        let mesh = Mesh::new(vec![plain.clone(), morphed]);
        assert_eq!(mesh.current_weights(), &[0.0, 0.0, 0.0]);
        assert!(Mesh::new(vec![plain]).current_weights().is_empty());
    }

    #[test]
    fn test_mesh_weights() {
        let mut mesh = Mesh::new(Vec::new());
        mesh.weights = vec![0.5, 0.5];
        assert_eq!(mesh.current_weights(), &[0.5, 0.5]);
        mesh.weights_animated = Some(vec![1.0, 0.0]);
        assert_eq!(mesh.current_weights(), &[1.0, 0.0]);
    }
}
