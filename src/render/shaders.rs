//! 内置 GLSL 着色器源码

use super::shader_cache::ShaderCache;
use crate::config::ShaderCacheSettings;

/// (标识, 源码) 表，`#include` 在缓存构造时展开
pub const DEFAULT_SHADER_SOURCES: [(&str, &str); 6] = [
    ("functions.glsl", include_str!("shaders/functions.glsl")),
    ("tonemapping.glsl", include_str!("shaders/tonemapping.glsl")),
    ("primitive.vert", include_str!("shaders/primitive.vert")),
    ("pbr.frag", include_str!("shaders/pbr.frag")),
    ("cubemap.vert", include_str!("shaders/cubemap.vert")),
    ("cubemap.frag", include_str!("shaders/cubemap.frag")),
];

/// 以内置源码创建缓存
pub fn default_shader_cache(settings: ShaderCacheSettings) -> ShaderCache {
    ShaderCache::new(DEFAULT_SHADER_SOURCES, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes_expanded() {
        let cache = default_shader_cache(ShaderCacheSettings::default());
        let pbr = cache.source("pbr.frag").unwrap();

        assert!(!pbr.contains("#include"));
        assert!(pbr.contains("vec3 toneMap(vec3 color)"));
        assert!(pbr.contains("float clampedDot(vec3 x, vec3 y)"));
    }
}
