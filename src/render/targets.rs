//! 透射采样渲染目标
//!
//! 固定分辨率的不透明场景捕获纹理（带 mipmap）及其深度纹理，和采样数可变的
//! 多重采样颜色/深度渲染缓冲。两个帧缓冲：多重采样渲染目标与单采样解析目标。
//! 捕获分辨率不随视口变化。

use super::backend::{
    Attachment, FramebufferHandle, GpuContext, RenderbufferDescriptor, RenderbufferHandle,
    TextureDescriptor, TextureFormat, TextureHandle,
};

/// 捕获纹理边长
pub const CAPTURE_SIZE: u32 = 1024;

/// 透射采样渲染目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargets {
    /// 不透明场景捕获纹理，透射材质从中采样
    pub opaque_texture: TextureHandle,
    pub opaque_depth_texture: TextureHandle,
    pub color_renderbuffer: RenderbufferHandle,
    pub depth_renderbuffer: RenderbufferHandle,
    /// 单采样解析目标
    pub opaque_framebuffer: FramebufferHandle,
    /// 多重采样渲染目标
    pub msaa_framebuffer: FramebufferHandle,
    samples: u32,
}

fn renderbuffer_descriptors(samples: u32) -> [RenderbufferDescriptor; 2] {
    [
        RenderbufferDescriptor {
            label: "transmission_msaa_color",
            width: CAPTURE_SIZE,
            height: CAPTURE_SIZE,
            samples,
            format: TextureFormat::Rgba8,
        },
        RenderbufferDescriptor {
            label: "transmission_msaa_depth",
            width: CAPTURE_SIZE,
            height: CAPTURE_SIZE,
            samples,
            format: TextureFormat::Depth16,
        },
    ]
}

/// 实际采样数：请求值与设备上限取小
pub fn effective_samples(requested: u32, max_samples: u32) -> u32 {
    requested.min(max_samples)
}

impl RenderTargets {
    /// 分配全部目标
    pub fn new(gpu: &mut dyn GpuContext, requested_samples: u32) -> Self {
        let samples = effective_samples(requested_samples, gpu.max_samples());

        let opaque_texture = gpu.create_texture(&TextureDescriptor {
            label: "transmission_opaque",
            width: CAPTURE_SIZE,
            height: CAPTURE_SIZE,
            format: TextureFormat::Rgba8,
            mipmapped: true,
        });
        let opaque_depth_texture = gpu.create_texture(&TextureDescriptor {
            label: "transmission_opaque_depth",
            width: CAPTURE_SIZE,
            height: CAPTURE_SIZE,
            format: TextureFormat::Depth16,
            mipmapped: false,
        });

        let [color_desc, depth_desc] = renderbuffer_descriptors(samples);
        let color_renderbuffer = gpu.create_renderbuffer(&color_desc);
        let depth_renderbuffer = gpu.create_renderbuffer(&depth_desc);

        let msaa_framebuffer = gpu.create_framebuffer(
            Attachment::Renderbuffer(color_renderbuffer),
            Attachment::Renderbuffer(depth_renderbuffer),
        );
        let opaque_framebuffer = gpu.create_framebuffer(
            Attachment::Texture(opaque_texture),
            Attachment::Texture(opaque_depth_texture),
        );

        tracing::info!(
            target: "render",
            "Created {}x{} transmission targets with {} samples",
            CAPTURE_SIZE,
            CAPTURE_SIZE,
            samples
        );

        Self {
            opaque_texture,
            opaque_depth_texture,
            color_renderbuffer,
            depth_renderbuffer,
            opaque_framebuffer,
            msaa_framebuffer,
            samples,
        }
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn size(&self) -> (u32, u32) {
        (CAPTURE_SIZE, CAPTURE_SIZE)
    }

    /// 采样数变化时重新分配渲染缓冲存储，返回是否发生了变化
    pub fn set_samples(&mut self, gpu: &mut dyn GpuContext, requested_samples: u32) -> bool {
        let samples = effective_samples(requested_samples, gpu.max_samples());
        if samples == self.samples {
            return false;
        }

        let [color_desc, depth_desc] = renderbuffer_descriptors(samples);
        gpu.resize_renderbuffer(self.color_renderbuffer, &color_desc);
        gpu.resize_renderbuffer(self.depth_renderbuffer, &depth_desc);
        tracing::debug!(
            target: "render",
            "Transmission sample count {} -> {}",
            self.samples,
            samples
        );
        self.samples = samples;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::RecordingBackend;

    #[test]
    fn test_samples_clamped_to_device() {
        let mut gpu = RecordingBackend::with_max_samples(2);
        let targets = RenderTargets::new(&mut gpu, 8);

        assert_eq!(targets.samples(), 2);
        assert_eq!(gpu.framebuffer_count(), 2);
        let color = gpu
            .renderbuffer_descriptor(targets.color_renderbuffer)
            .unwrap();
        assert_eq!(color.samples, 2);
        assert_eq!((color.width, color.height), (CAPTURE_SIZE, CAPTURE_SIZE));
        assert!(gpu
            .texture_descriptor(targets.opaque_texture)
            .unwrap()
            .mipmapped);
    }

    #[test]
    fn test_sample_change_reallocates_storage() {
        let mut gpu = RecordingBackend::with_max_samples(8);
        let mut targets = RenderTargets::new(&mut gpu, 4);

        assert!(!targets.set_samples(&mut gpu, 4));
        assert!(targets.set_samples(&mut gpu, 2));
        assert_eq!(targets.samples(), 2);
        assert_eq!(
            gpu.renderbuffer_descriptor(targets.depth_renderbuffer)
                .unwrap()
                .samples,
            2
        );
        // 帧缓冲不重建
        assert_eq!(gpu.framebuffer_count(), 2);
    }
}
