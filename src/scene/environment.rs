use crate::render::backend::TextureHandle;

/// 预过滤的环境光照资源
///
/// 贴图由外部的 IBL 预计算生成，这里只持有句柄。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// 漫反射（Lambertian）立方体贴图
    pub diffuse_env_map: TextureHandle,
    /// 镜面（GGX）立方体贴图
    pub specular_env_map: TextureHandle,
    /// GGX BRDF 查找表
    pub lut: TextureHandle,
    /// 光泽（Charlie）立方体贴图
    pub sheen_env_map: TextureHandle,
    /// Charlie BRDF 查找表
    pub sheen_lut: TextureHandle,
    /// 光泽能量补偿查找表
    pub sheen_e_lut: TextureHandle,
    /// 镜面贴图的 mip 层数
    pub mip_count: u32,
}
