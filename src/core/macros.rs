//! 核心宏定义
//!
//! 配置与场景数据结构的默认值大多是字面量，统一用宏生成 `Default`。

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use gltf_viewer_core::impl_default;
///
/// struct Exposure {
///     value: f32,
///     auto: bool,
/// }
///
/// impl_default!(Exposure {
///     value: 1.0,
///     auto: false,
/// });
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

/// 同时实现Default和new()的宏
#[macro_export]
macro_rules! impl_default_and_new {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }

        impl $struct_name {
            pub fn new() -> Self {
                Self::default()
            }
        }
    };
}

#[cfg(test)]
mod tests {

    struct Cursor {
        key: usize,
        time: f32,
    }

    impl_default_and_new!(Cursor {
        key: 0,
        time: 0.0,
    });

    #[test]
    fn test_impl_default_and_new() {
        let a = Cursor::default();
        let b = Cursor::new();

        assert_eq!(a.key, 0);
        assert_eq!(a.time, 0.0);
        assert_eq!(b.key, 0);
        assert_eq!(b.time, 0.0);
    }
}
