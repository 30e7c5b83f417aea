//! Source normalization applied to chunk text before embedding.
//!
//! The embedder sees comment-free, whitespace-collapsed text. Chunks
//! themselves keep the verbatim source.

use std::sync::OnceLock;

use regex::Regex;

/// Which comment syntax to strip for a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `// line` and `/* block */`.
    CFamily,
    /// `# line`.
    Hash,
    /// Both of the above (PHP).
    Mixed,
}

/// Map a language name (case-insensitive) to its comment syntax.
///
/// Unknown languages get C-family stripping.
pub fn comment_style(language: &str) -> CommentStyle {
    match language.to_ascii_lowercase().as_str() {
        "python" | "ruby" | "shell" | "bash" | "sh" | "zsh" | "perl" | "r" | "yaml" | "toml"
        | "powershell" | "elixir" | "julia" => CommentStyle::Hash,
        "php" => CommentStyle::Mixed,
        _ => CommentStyle::CFamily,
    }
}

fn line_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)//.*$").expect("valid regex"))
}

fn block_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"))
}

fn hash_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)#.*$").expect("valid regex"))
}

/// Remove comments in the given style. String literals are not parsed, so a
/// comment marker inside a string also truncates that line.
pub fn strip_comments(text: &str, style: CommentStyle) -> String {
    match style {
        CommentStyle::CFamily => {
            let without_blocks = block_comment_re().replace_all(text, " ");
            line_comment_re().replace_all(&without_blocks, "").into_owned()
        }
        CommentStyle::Hash => hash_comment_re().replace_all(text, "").into_owned(),
        CommentStyle::Mixed => {
            let c_stripped = strip_comments(text, CommentStyle::CFamily);
            hash_comment_re().replace_all(&c_stripped, "").into_owned()
        }
    }
}

/// Collapse every whitespace run into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip comments for `language`, then collapse whitespace.
pub fn normalize_source(text: &str, language: &str) -> String {
    collapse_whitespace(&strip_comments(text, comment_style(language)))
}

/// Text handed to the embedder for one chunk.
///
/// Falls back to the whitespace-collapsed raw text when stripping leaves
/// nothing, so comment-only chunks still embed to a non-zero vector.
pub fn embedding_input(chunk_text: &str, language: &str, strip_comments: bool) -> String {
    if strip_comments {
        let normalized = normalize_source(chunk_text, language);
        if !normalized.is_empty() {
            return normalized;
        }
    }
    collapse_whitespace(chunk_text)
}

/// Guess a language name from a file extension (without the dot).
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let lang = match ext.to_ascii_lowercase().as_str() {
        "py" | "pyw" => "python",
        "rs" => "rust",
        "java" => "java",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "kt" | "kts" => "kotlin",
        "swift" => "swift",
        "scala" => "scala",
        "rb" => "ruby",
        "php" => "php",
        "sh" | "bash" | "zsh" => "shell",
        "pl" | "pm" => "perl",
        "r" => "r",
        "lua" => "lua",
        "dart" => "dart",
        _ => return None,
    };
    Some(lang)
}
