//! 公共宏

/// 按字段列表生成 `Default` 实现
///
/// 配置结构和关节规格的默认值都通过它声明，字段顺序与结构体定义保持一致。
///
/// ```rust
/// use physics2d_bridge::impl_default;
///
/// struct SpringParams {
///     stiffness: f32,
///     damping: f32,
/// }
///
/// impl_default!(SpringParams {
///     stiffness: 0.0,
///     damping: 0.7,
/// });
///
/// assert_eq!(SpringParams::default().damping, 0.7);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
