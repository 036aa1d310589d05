//! `#include` resolution for GLSL source.
//!
//! Implements the CPU-side fallback for `GL_ARB_shading_language_include`:
//! every `#include </path>` line is replaced by the (recursively resolved)
//! named string registered under `/path`, the extension directive enabling
//! the mechanism is stripped, and all other lines pass through untouched.
//!
//! Each path is expanded at most once per top-level call. The first
//! reference wins; later references, including cyclic ones, produce no
//! output at all.
//!
//! ```
//! use glsl_include::{resolve_includes, NamedStrings};
//!
//! let mut strings = NamedStrings::new();
//! strings.insert("/common.glsl", "float sq(float x) { return x * x; }").unwrap();
//!
//! let source = "#version 330\n#include </common.glsl>\nvoid main() {}";
//! let flattened = resolve_includes(source, &strings);
//!
//! assert_eq!(
//!     flattened,
//!     "#version 330\nfloat sq(float x) { return x * x; }\nvoid main() {}\n",
//! );
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::named_strings::NamedStringSource;

/// Name of the extension whose directive is dropped from resolved source.
pub const INCLUDE_EXTENSION: &str = "GL_ARB_shading_language_include";

/// Default for [`ResolveOptions::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// How directive lines are recognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DirectiveMatching {
    /// Any line starting with `#` that contains the word `extension` is an
    /// extension directive, otherwise any such line containing `include` is
    /// an include directive. Compatible with existing shader corpora.
    #[default]
    Substring,
    /// Only the directive name right after `#` counts, so
    /// `#define HAS_include_guard` is left alone.
    Token,
}

/// Knobs for an [`IncludeResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Directive recognition mode.
    pub matching: DirectiveMatching,
    /// Deepest include nesting that is still expanded. The top-level source
    /// is depth 0, a file it includes is depth 1, and so on.
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            matching: DirectiveMatching::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ResolveOptions {
    /// Sets the directive recognition mode.
    #[must_use]
    pub fn with_matching(mut self, matching: DirectiveMatching) -> Self {
        self.matching = matching;
        self
    }

    /// Sets the maximum include nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// A problem found while resolving. The offending line is always dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeWarning {
    /// Missing angle bracket, or an empty or relative path.
    Malformed {
        /// The trimmed directive line.
        line: String,
    },
    /// No named string is registered under the path.
    Unknown {
        /// The requested path.
        path: String,
    },
    /// The include sits deeper than [`ResolveOptions::max_depth`].
    TooDeep {
        /// The requested path.
        path: String,
        /// The configured limit.
        max_depth: usize,
    },
}

impl fmt::Display for IncludeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { line } => write!(f, "Malformed #include: {line}"),
            Self::Unknown { path } => write!(f, "Unknown #include <{path}>"),
            Self::TooDeep { path, max_depth } => write!(
                f,
                "#include <{path}> nested too deeply (limit {max_depth})"
            ),
        }
    }
}

/// Output of [`IncludeResolver::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    /// The flattened source.
    pub source: String,
    /// Warnings in the order they were raised.
    pub warnings: Vec<IncludeWarning>,
}

/// Resolves includes in `source`, recording every expanded path in
/// `already_visited`.
///
/// Paths already present in `already_visited` are treated as expanded and
/// dropped. Pass the same set to several calls to share deduplication across
/// them.
pub fn resolve<S>(source: &str, strings: &S, already_visited: &mut HashSet<String>) -> String
where
    S: NamedStringSource + ?Sized,
{
    IncludeResolver::new(strings)
        .resolve_with(source, already_visited)
        .source
}

/// Resolves includes in `source` with a fresh visited set and default
/// options.
pub fn resolve_includes<S>(source: &str, strings: &S) -> String
where
    S: NamedStringSource + ?Sized,
{
    resolve(source, strings, &mut HashSet::new())
}

/// Reusable include resolver bound to a registry.
#[derive(Debug)]
pub struct IncludeResolver<'a, S: ?Sized> {
    strings: &'a S,
    options: ResolveOptions,
}

impl<S: ?Sized> Clone for IncludeResolver<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for IncludeResolver<'_, S> {}

impl<'a, S: NamedStringSource + ?Sized> IncludeResolver<'a, S> {
    /// Creates a resolver with default options.
    pub fn new(strings: &'a S) -> Self {
        Self::with_options(strings, ResolveOptions::default())
    }

    /// Creates a resolver with explicit options.
    pub fn with_options(strings: &'a S, options: ResolveOptions) -> Self {
        Self { strings, options }
    }

    /// The options in effect.
    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    /// Resolves `source` with a fresh visited set.
    pub fn resolve(&self, source: &str) -> Resolved {
        self.resolve_with(source, &mut HashSet::new())
    }

    /// Resolves `source`, sharing `visited` with the caller.
    pub fn resolve_with(&self, source: &str, visited: &mut HashSet<String>) -> Resolved {
        let mut pass = Pass {
            strings: self.strings,
            options: self.options,
            visited,
            output: String::with_capacity(source.len()),
            warnings: Vec::new(),
        };
        pass.expand(source, 0);

        Resolved {
            source: pass.output,
            warnings: pass.warnings,
        }
    }
}

/// How a single line is handled.
#[derive(Debug, PartialEq, Eq)]
enum Line<'l> {
    /// Copied to the output followed by a newline.
    Keep,
    /// Dropped without a trace.
    Drop,
    /// An include directive; holds the trimmed line.
    Include(&'l str),
}

fn classify(trimmed: &str, matching: DirectiveMatching) -> Line<'_> {
    let Some(directive) = trimmed.strip_prefix('#') else {
        return Line::Keep;
    };

    let (is_extension, is_include) = match matching {
        DirectiveMatching::Substring => {
            (trimmed.contains("extension"), trimmed.contains("include"))
        }
        DirectiveMatching::Token => {
            let name = directive
                .trim_start()
                .split(|c: char| c.is_whitespace() || c == '<' || c == '"')
                .next()
                .unwrap_or_default();
            (name == "extension", name == "include")
        }
    };

    if is_extension {
        if trimmed.contains(INCLUDE_EXTENSION) {
            Line::Drop
        } else {
            Line::Keep
        }
    } else if is_include {
        Line::Include(trimmed)
    } else {
        Line::Keep
    }
}

/// Trims the C locale's whitespace set only. Other Unicode spaces are part
/// of the line.
fn trim_c_space(line: &str) -> &str {
    line.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r'))
}

/// The path between the first `<` and the first `>`, if it is absolute.
fn include_path(trimmed: &str) -> Option<&str> {
    let left = trimmed.find('<')?;
    let right = trimmed.find('>')?;
    let path = trimmed.get(left + 1..right)?;
    path.starts_with('/').then_some(path)
}

/// State of one top-level resolution.
struct Pass<'r, 'v, S: ?Sized> {
    strings: &'r S,
    options: ResolveOptions,
    visited: &'v mut HashSet<String>,
    output: String,
    warnings: Vec<IncludeWarning>,
}

impl<S: NamedStringSource + ?Sized> Pass<'_, '_, S> {
    fn expand(&mut self, source: &str, depth: usize) {
        for line in source.split('\n') {
            match classify(trim_c_space(line), self.options.matching) {
                Line::Keep => {
                    self.output.push_str(line);
                    self.output.push('\n');
                }
                Line::Drop => {}
                Line::Include(trimmed) => self.include(trimmed, depth),
            }
        }
    }

    fn include(&mut self, trimmed: &str, depth: usize) {
        let Some(path) = include_path(trimmed) else {
            self.warn(IncludeWarning::Malformed {
                line: trimmed.to_owned(),
            });
            return;
        };

        if self.visited.contains(path) {
            return;
        }

        if depth >= self.options.max_depth {
            self.warn(IncludeWarning::TooDeep {
                path: path.to_owned(),
                max_depth: self.options.max_depth,
            });
            return;
        }

        self.visited.insert(path.to_owned());

        let strings = self.strings;
        match strings.named_string(path) {
            Some(text) => self.expand(text, depth + 1),
            None => {
                self.warn(IncludeWarning::Unknown {
                    path: path.to_owned(),
                });
                self.expand("", depth + 1);
            }
        }
    }

    fn warn(&mut self, warning: IncludeWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }
}
