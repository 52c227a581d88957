//! Settings Tests
//!
//! Tests for:
//! - Defaults of the renderer configuration
//! - Loading settings from JSON, with missing fields defaulted

use umbra::renderer::{CascadeSplit, PostProcessSettings, RendererSettings, ShadowSettings, VisibilitySettings};

#[test]
fn defaults() {
    let settings = RendererSettings::default();
    assert_eq!(settings.frames_in_flight, 3);
    assert_eq!(settings.shadow.cascade_count, 4);
    assert_eq!(settings.shadow.split, CascadeSplit::Linear);
    assert_eq!(settings.visibility.max_leaf_elements, 20);
    assert_eq!(settings.gbuffer_format, wgpu::TextureFormat::Rgba16Float);
    assert_eq!(settings.output_format, wgpu::TextureFormat::Bgra8Unorm);
}

#[test]
fn shadow_settings_from_json() -> anyhow::Result<()> {
    let shadow: ShadowSettings = serde_json::from_str(r#"{ "map_size": 4096, "split": { "Practical": { "lambda": 0.75 } } }"#)?;
    assert_eq!(shadow.map_size, 4096);
    assert_eq!(shadow.split, CascadeSplit::Practical { lambda: 0.75 });
    assert_eq!(shadow.cascade_count, ShadowSettings::default().cascade_count, "missing fields use defaults");
    Ok(())
}

#[test]
fn visibility_settings_round_trip() -> anyhow::Result<()> {
    let settings = VisibilitySettings {
        culling_epsilon: 0.5,
        max_leaf_elements: 8,
        max_depth: 6,
    };
    let json = serde_json::to_string(&settings)?;
    let back: VisibilitySettings = serde_json::from_str(&json)?;
    assert_eq!(back, settings);

    let post: PostProcessSettings = serde_json::from_str("{}")?;
    assert_eq!(post.gamma, 2.2);
    Ok(())
}
