//! 着色器排列缓存
//!
//! 把 (源码标识, 有序宏列表) 映射到已编译的着色器，把 (顶点哈希, 片元哈希)
//! 映射到已链接的程序。同一排列在图元之间和帧之间只编译一次。
//!
//! ## 设计原则
//!
//! 1. **缓存键生成**: 标识与宏列表拼接后的SHA256哈希（64字符hex）
//! 2. **源码处理**: 构造时展开 `#include <name>`；编译时在版本指令之后注入 `#define`
//! 3. **失败记忆**: 编译/链接失败只记录一次日志，之后直接返回 `None`，不再重复编译
//! 4. **释放**: [`ShaderCache::destroy`] 只释放一次全部程序与着色器
//!
//! ```text
//! select_shader(id, defines) ──► ShaderHash ──┐
//!                                             ├──► get_shader_program ──► ShaderProgram
//! select_shader(id, defines) ──► ShaderHash ──┘
//! ```

use super::backend::{
    GpuContext, ProgramHandle, ProgramInterface, RenderCommand, ShaderHandle, ShaderStage,
    UniformLocation, UniformValue,
};
use super::defines::ShaderDefines;
use crate::config::{KeyMode, ShaderCacheSettings};
use crate::core::error::RenderError;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// 着色器排列哈希（64字符hex字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHash(String);

impl ShaderHash {
    /// 计算排列哈希
    pub fn compute(identifier: &str, defines: &ShaderDefines, mode: KeyMode) -> Self {
        let mut entries: Vec<&str> = defines.iter().collect();
        if mode == KeyMode::Canonical {
            entries.sort_unstable();
        }

        let mut hasher = Sha256::new();
        hasher.update(identifier.as_bytes());
        for define in entries {
            hasher.update(b"\n");
            hasher.update(define.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShaderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 日志中只显示前缀
        write!(f, "{}", &self.0[..self.0.len().min(12)])
    }
}

/// 程序缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub vertex: ShaderHash,
    pub fragment: ShaderHash,
}

/// 着色器缓存统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderCacheStats {
    /// 缓存命中次数
    pub hits: u64,
    /// 缓存未命中次数（触发编译或链接）
    pub misses: u64,
    /// 编译失败的排列数
    pub compile_failures: u64,
    /// 链接失败的程序数
    pub link_failures: u64,
}

impl ShaderCacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }
}

/// 已链接的程序及其接口
#[derive(Debug)]
pub struct ShaderProgram {
    handle: ProgramHandle,
    interface: ProgramInterface,
    reported_uniforms: HashSet<String>,
}

impl ShaderProgram {
    fn new(handle: ProgramHandle, interface: ProgramInterface) -> Self {
        Self {
            handle,
            interface,
            reported_uniforms: HashSet::new(),
        }
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// uniform 位置；不存在时每个名称只记录一次日志
    pub fn uniform_location(&mut self, name: &str) -> Option<UniformLocation> {
        if let Some(location) = self.interface.uniforms.get(name) {
            return Some(*location);
        }
        if self.reported_uniforms.insert(name.to_string()) {
            tracing::debug!(
                target: "shader_cache",
                "Uniform {} does not exist in program {}",
                name,
                self.handle.0
            );
        }
        None
    }

    /// 顶点属性位置
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.interface.attributes.get(name).copied()
    }

    /// 按名称写入 uniform，位置不存在时跳过
    pub fn set_uniform(
        &mut self,
        gpu: &mut dyn GpuContext,
        name: &str,
        value: UniformValue,
    ) -> bool {
        match self.uniform_location(name) {
            Some(location) => {
                gpu.submit(RenderCommand::SetUniform { location, value });
                true
            }
            None => false,
        }
    }
}

fn parse_include(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?.trim();
    rest.strip_prefix('<')
        .and_then(|r| r.strip_suffix('>'))
        .or_else(|| rest.strip_prefix('"').and_then(|r| r.strip_suffix('"')))
}

fn expand_includes(
    source: &str,
    sources: &HashMap<String, String>,
    included: &mut HashSet<String>,
    out: &mut String,
) {
    for line in source.lines() {
        match parse_include(line) {
            Some(name) => {
                if !included.insert(name.to_string()) {
                    continue;
                }
                match sources.get(name) {
                    Some(inner) => expand_includes(inner, sources, included, out),
                    None => tracing::warn!(target: "shader_cache", "Include {name} not found"),
                }
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
}

/// 着色器排列缓存
#[derive(Debug)]
pub struct ShaderCache {
    settings: ShaderCacheSettings,
    /// 标识 -> 展开后的源码
    sources: HashMap<String, String>,
    shaders: HashMap<ShaderHash, ShaderHandle>,
    programs: HashMap<ProgramKey, ShaderProgram>,
    failed_shaders: HashSet<ShaderHash>,
    failed_programs: HashSet<ProgramKey>,
    stats: ShaderCacheStats,
    destroyed: bool,
}

impl ShaderCache {
    /// 创建缓存并展开源码中的 `#include`
    pub fn new<I, K, V>(sources: I, settings: ShaderCacheSettings) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let raw: HashMap<String, String> = sources
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let sources = raw
            .iter()
            .map(|(identifier, source)| {
                let mut included = HashSet::from([identifier.clone()]);
                let mut expanded = String::with_capacity(source.len());
                expand_includes(source, &raw, &mut included, &mut expanded);
                (identifier.clone(), expanded)
            })
            .collect();

        Self {
            settings,
            sources,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            failed_shaders: HashSet::new(),
            failed_programs: HashSet::new(),
            stats: ShaderCacheStats::default(),
            destroyed: false,
        }
    }

    /// 计算排列哈希（不编译）
    pub fn permutation_hash(&self, identifier: &str, defines: &ShaderDefines) -> ShaderHash {
        ShaderHash::compute(identifier, defines, self.settings.key_mode)
    }

    /// 已注册的展开后源码
    pub fn source(&self, identifier: &str) -> Option<&str> {
        self.sources.get(identifier).map(String::as_str)
    }

    /// 生成注入宏之后的完整源码
    fn inject_defines(&self, source: &str, defines: &ShaderDefines) -> String {
        let define_block: String = defines
            .iter()
            .map(|define| format!("#define {define}\n"))
            .collect();

        let trimmed = source.trim_start();
        if trimmed.starts_with("#version") {
            let (version, body) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
            format!("{version}\n{define_block}{body}")
        } else {
            format!("{}\n{define_block}{source}", self.settings.version_directive)
        }
    }

    /// 选择着色器排列，未命中时编译
    ///
    /// 源码未注册或编译失败时返回 `None`；失败只记录一次。
    pub fn select_shader(
        &mut self,
        gpu: &mut dyn GpuContext,
        identifier: &str,
        defines: &ShaderDefines,
    ) -> Option<ShaderHash> {
        if self.destroyed {
            return None;
        }

        let hash = self.permutation_hash(identifier, defines);
        if self.shaders.contains_key(&hash) {
            self.stats.hits += 1;
            return Some(hash);
        }
        if self.failed_shaders.contains(&hash) {
            return None;
        }

        self.stats.misses += 1;
        let Some(source) = self.sources.get(identifier) else {
            let error = RenderError::MissingShaderSource(identifier.to_string());
            tracing::error!(target: "shader_cache", "{error}");
            self.failed_shaders.insert(hash);
            return None;
        };

        let full_source = self.inject_defines(source, defines);
        let stage = ShaderStage::from_identifier(identifier);
        match gpu.compile_shader(identifier, stage, &full_source) {
            Ok(shader) => {
                tracing::debug!(
                    target: "shader_cache",
                    "Compiled {} permutation {} ({} defines)",
                    identifier,
                    hash,
                    defines.len()
                );
                self.shaders.insert(hash.clone(), shader);
                Some(hash)
            }
            Err(error) => {
                tracing::error!(target: "shader_cache", "{error}");
                self.stats.compile_failures += 1;
                self.failed_shaders.insert(hash);
                None
            }
        }
    }

    /// 获取链接后的程序，首次出现的组合会被链接并缓存
    pub fn get_shader_program(
        &mut self,
        gpu: &mut dyn GpuContext,
        vertex: &ShaderHash,
        fragment: &ShaderHash,
    ) -> Option<&mut ShaderProgram> {
        let key = ProgramKey {
            vertex: vertex.clone(),
            fragment: fragment.clone(),
        };

        if self.programs.contains_key(&key) {
            self.stats.hits += 1;
            return self.programs.get_mut(&key);
        }
        if self.failed_programs.contains(&key) {
            return None;
        }

        let (Some(vs), Some(fs)) = (self.shaders.get(vertex), self.shaders.get(fragment)) else {
            return None;
        };

        self.stats.misses += 1;
        match gpu.link_program(*vs, *fs) {
            Ok(handle) => {
                let interface = gpu.program_interface(handle);
                tracing::debug!(
                    target: "shader_cache",
                    "Linked program {} ({} uniforms, {} attributes)",
                    handle.0,
                    interface.uniforms.len(),
                    interface.attributes.len()
                );
                Some(
                    self.programs
                        .entry(key)
                        .or_insert_with(|| ShaderProgram::new(handle, interface)),
                )
            }
            Err(error) => {
                tracing::error!(
                    target: "shader_cache",
                    "{} (vertex {}, fragment {})",
                    error,
                    vertex,
                    fragment
                );
                self.stats.link_failures += 1;
                self.failed_programs.insert(key);
                None
            }
        }
    }

    /// 一次解析顶点与片元排列并返回程序
    pub fn resolve(
        &mut self,
        gpu: &mut dyn GpuContext,
        vertex_identifier: &str,
        vertex_defines: &ShaderDefines,
        fragment_identifier: &str,
        fragment_defines: &ShaderDefines,
    ) -> Option<&mut ShaderProgram> {
        let vertex = self.select_shader(gpu, vertex_identifier, vertex_defines)?;
        let fragment = self.select_shader(gpu, fragment_identifier, fragment_defines)?;
        self.get_shader_program(gpu, &vertex, &fragment)
    }

    pub fn stats(&self) -> &ShaderCacheStats {
        &self.stats
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// 释放所有程序、着色器与源码映射，重复调用无效
    pub fn destroy(&mut self, gpu: &mut dyn GpuContext) {
        if self.destroyed {
            return;
        }

        for (_, program) in self.programs.drain() {
            gpu.delete_program(program.handle);
        }
        for (_, shader) in self.shaders.drain() {
            gpu.delete_shader(shader);
        }
        self.sources.clear();
        self.failed_shaders.clear();
        self.failed_programs.clear();
        self.destroyed = true;

        tracing::info!(target: "shader_cache", "Shader cache destroyed");
    }
}
