//! Resolves a small on-disk shader library end to end.

use std::fs;
use std::path::PathBuf;

use glsl_include::{IncludeResolver, IncludeWarning, NamedStrings};
use pretty_assertions::assert_eq;

const FRAGMENT: &str = "#version 330 core
#extension GL_ARB_shading_language_include : require

#include </lighting/phong.glsl>
#include </common/math.glsl>
#include <common/relative.glsl>

out vec4 frag_color;

void main() {
    frag_color = vec4(phong(vec3(0.0, 0.0, 1.0)), 1.0);
}";

struct ScratchDir(PathBuf);

impl ScratchDir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "glsl-include-it-{}-{name}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("common")).unwrap();
        fs::create_dir_all(dir.join("lighting")).unwrap();
        Self(dir)
    }

    fn write(&self, relative: &str, text: &str) {
        fs::write(self.0.join(relative), text).unwrap();
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

#[test]
fn fragment_shader_flattens_against_directory() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = ScratchDir::new("fragment");
    dir.write("common/math.glsl", "float saturate(float x) { return clamp(x, 0.0, 1.0); }");
    dir.write(
        "lighting/phong.glsl",
        "#include </common/math.glsl>\nvec3 phong(vec3 n) { return vec3(saturate(n.z)); }",
    );

    let strings = NamedStrings::from_dir(&dir.0).unwrap();
    let resolved = IncludeResolver::new(&strings).resolve(FRAGMENT);

    assert_eq!(
        resolved.source,
        "#version 330 core

float saturate(float x) { return clamp(x, 0.0, 1.0); }
vec3 phong(vec3 n) { return vec3(saturate(n.z)); }

out vec4 frag_color;

void main() {
    frag_color = vec4(phong(vec3(0.0, 0.0, 1.0)), 1.0);
}
"
    );
    assert_eq!(
        resolved.warnings,
        vec![IncludeWarning::Malformed {
            line: "#include <common/relative.glsl>".to_owned()
        }]
    );
}

#[test]
fn separate_resolve_calls_do_not_share_visited_paths() {
    let strings: NamedStrings = [("/common/version.glsl", "#version 330 core")]
        .into_iter()
        .collect();
    let resolver = IncludeResolver::new(&strings);

    let vertex = resolver.resolve("#include </common/version.glsl>\nvoid main() {}");
    let fragment = resolver.resolve("#include </common/version.glsl>\nvoid main() {}");

    assert_eq!(vertex.source, "#version 330 core\nvoid main() {}\n");
    assert_eq!(vertex, fragment);
}
