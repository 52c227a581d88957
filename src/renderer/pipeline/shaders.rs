//! Shader Library
//!
//! WGSL sources are embedded with `rust-embed` and rendered through a
//! minijinja environment before use. Templates see a single context,
//! [`ShaderDefines`], so compile-time constants such as the cascade count
//! stay in one place:
//!
//! ```wgsl
//! const CASCADE_COUNT: u32 = {{ cascade_count }}u;
//! ```
//!
//! Rendered sources are cached by name. The backend deduplicates compiled
//! modules by hashing the final source, so two templates rendering to the
//! same WGSL share one module.

use std::borrow::Cow;
use std::rc::Rc;

use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior};
use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::errors::{Result, UmbraError};

use super::config::ShaderStage;

#[derive(RustEmbed)]
#[folder = "src/renderer/pipeline/shaders"]
struct ShaderAssets;

/// Template context shared by every shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShaderDefines {
    pub cascade_count: u32,
}

fn shader_filename(name: &str) -> Cow<'_, str> {
    if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    }
}

/// Raw template text of `name`.
fn load_source(name: &str) -> Result<String> {
    let filename = shader_filename(name);

    // Debug builds pick up edits without a rebuild.
    #[cfg(debug_assertions)]
    {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("src/renderer/pipeline/shaders")
            .join(filename.as_ref());
        if let Ok(bytes) = std::fs::read(&path) {
            return String::from_utf8(bytes).map_err(|_| UmbraError::ShaderEncoding(name.to_owned()));
        }
    }

    let file = ShaderAssets::get(&filename).ok_or_else(|| UmbraError::ShaderNotFound(name.to_owned()))?;
    String::from_utf8(file.data.into_owned()).map_err(|_| UmbraError::ShaderEncoding(name.to_owned()))
}

/// Loader for `{% include %}` chunks.
fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    match load_source(name) {
        Ok(source) => Ok(Some(source)),
        Err(UmbraError::ShaderNotFound(_)) => Ok(None),
        Err(e) => Err(Error::new(ErrorKind::InvalidOperation, e.to_string())),
    }
}

pub struct ShaderLibrary {
    env: Environment<'static>,
    defines: ShaderDefines,
    rendered: FxHashMap<String, Rc<str>>,
}

impl ShaderLibrary {
    #[must_use]
    pub fn new(defines: ShaderDefines) -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_loader(shader_loader);

        Self {
            env,
            defines,
            rendered: FxHashMap::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn defines(&self) -> ShaderDefines {
        self.defines
    }

    /// Rendered WGSL of template `name` (with or without `.wgsl`).
    pub fn source(&mut self, name: &str) -> Result<Rc<str>> {
        if let Some(source) = self.rendered.get(name) {
            return Ok(Rc::clone(source));
        }

        let raw = load_source(name)?;
        let source: Rc<str> = Rc::from(self.env.render_str(&raw, self.defines)?);

        log::debug!("ShaderLibrary: rendered '{name}' ({} bytes)", source.len());
        self.rendered.insert(name.to_owned(), Rc::clone(&source));
        Ok(source)
    }

    /// Convenience for building a [`ShaderStage`].
    pub fn stage(&mut self, name: &str, entry_point: &'static str) -> Result<ShaderStage> {
        Ok(ShaderStage {
            label: Cow::Owned(format!("{name}:{entry_point}")),
            source: self.source(name)?,
            entry_point,
        })
    }

    /// Number of rendered templates held.
    #[inline]
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.rendered.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_shader_receives_cascade_count() {
        let mut library = ShaderLibrary::new(ShaderDefines { cascade_count: 3 });
        let source = library.source("shadow").unwrap();
        assert!(source.contains("CASCADE_COUNT: u32 = 3u"));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn sources_are_cached() {
        let mut library = ShaderLibrary::new(ShaderDefines { cascade_count: 4 });
        let a = library.source("post_process").unwrap();
        let b = library.source("post_process").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(library.cached_count(), 1);
    }

    #[test]
    fn unknown_shader_is_reported() {
        let mut library = ShaderLibrary::new(ShaderDefines { cascade_count: 4 });
        assert!(matches!(library.source("missing"), Err(UmbraError::ShaderNotFound(_))));
    }
}
