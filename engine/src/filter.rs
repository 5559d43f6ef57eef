//! Extension allow-list filtering.
//!
//! One `ExtensionRule` is shared by the zip, copy, and move phases; each
//! phase decides independently whether to apply it. Only leaf files are
//! ever filtered. Directories are walked regardless, and a directory whose
//! files are all excluded simply contributes nothing.

use std::collections::HashSet;
use std::path::Path;

/// Case-normalized allow-list of file extensions.
///
/// Extensions are stored lowercase without the leading dot. An empty rule
/// allows every file; a file without an extension never matches a
/// non-empty rule.
#[derive(Debug, Clone)]
pub struct ExtensionRule {
    extensions: HashSet<String>,
}

impl ExtensionRule {
    /// Build a rule from extension names, accepted with or without a
    /// leading dot and in any case.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        ExtensionRule { extensions }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// True when the file's extension is on the allow-list.
    pub fn allows(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.contains(&ext.to_ascii_lowercase()),
            None => false,
        }
    }

    /// Phase-aware inclusion check: when the phase's filter flag is off,
    /// every file passes.
    pub fn include(&self, path: &Path, phase_active: bool) -> bool {
        !phase_active || self.allows(path)
    }
}

impl Default for ExtensionRule {
    /// The built-in catalogue of document, media, config, and source-code
    /// extensions considered worth keeping.
    fn default() -> Self {
        ExtensionRule::new(DEFAULT_EXTENSIONS.iter().copied())
    }
}

/// Extensions admitted by the default rule.
const DEFAULT_EXTENSIONS: &[&str] = &[
    // Text & documents
    "txt", "csv", "tsv", "md", "rtf",
    "pdf", "doc", "docx", "odt",
    "xls", "xlsx", "ods",
    "ppt", "pptx", "odp",
    // Configuration
    "json", "yaml", "yml", "ini", "toml", "conf", "cfg", "env",
    // Images
    "png", "jpg", "jpeg", "svg", "gif", "bmp", "tiff", "webp", "ico",
    // Audio
    "mp3", "wav", "flac", "ogg", "aac", "m4a", "wma", "amr",
    // Video
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "mpg", "mpeg",
    // Archives
    "zip", "tar", "gz", "bz2", "xz", "7z", "rar",
    // Fonts
    "ttf", "otf", "woff", "woff2",
    // XML
    "xml", "xsd", "dtd",
    // Web
    "html", "htm", "css",
    // Python
    "py", "pyi", "pyx", "pxd", "pxi",
    // C / C++
    "c", "h", "cpp", "hpp", "cc", "hh", "cxx", "hxx",
    // JavaScript / TypeScript / web frameworks
    "js", "mjs", "cjs", "ts", "tsx", "jsx", "vue", "svelte", "astro",
    // C# / .NET
    "cs", "csx", "cshtml",
    // Other languages
    "java", "kt", "kts", "go", "rs", "swift", "rb", "php", "phtml",
    // Shell / scripting
    "sh", "bash", "zsh", "bat", "cmd",
    "ps1", "psm1", "psd1",
    // Databases / data formats
    "sql", "db", "sqlite", "geojson", "parquet", "avro",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_rule_matches_case_insensitively() {
        let rule = ExtensionRule::default();
        assert!(rule.allows(&PathBuf::from("report.txt")));
        assert!(rule.allows(&PathBuf::from("REPORT.TXT")));
        assert!(rule.allows(&PathBuf::from("photos/holiday.JPEG")));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let rule = ExtensionRule::default();
        assert!(!rule.allows(&PathBuf::from("setup.exe")));
        assert!(!rule.allows(&PathBuf::from("core.dump")));
    }

    #[test]
    fn test_file_without_extension_rejected() {
        let rule = ExtensionRule::default();
        assert!(!rule.allows(&PathBuf::from("Makefile")));
        // A leading dot is a hidden-file marker, not an extension.
        assert!(!rule.allows(&PathBuf::from(".env")));
        assert!(rule.allows(&PathBuf::from("prod.env")));
    }

    #[test]
    fn test_empty_rule_allows_everything() {
        let rule = ExtensionRule::new(Vec::<String>::new());
        assert!(rule.is_empty());
        assert!(rule.allows(&PathBuf::from("anything.exe")));
        assert!(rule.allows(&PathBuf::from("no_extension")));
    }

    #[test]
    fn test_inactive_phase_passes_everything() {
        let rule = ExtensionRule::default();
        assert!(rule.include(&PathBuf::from("setup.exe"), false));
        assert!(!rule.include(&PathBuf::from("setup.exe"), true));
    }

    #[test]
    fn test_leading_dot_and_case_normalized_on_build() {
        let rule = ExtensionRule::new([".TXT", "Log"]);
        assert_eq!(rule.len(), 2);
        assert!(rule.allows(&PathBuf::from("a.txt")));
        assert!(rule.allows(&PathBuf::from("b.LOG")));
        assert!(!rule.allows(&PathBuf::from("c.md")));
    }
}
