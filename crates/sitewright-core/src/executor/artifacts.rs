//! Artifact extraction from backend output
//!
//! The backend reports file side effects only in prose, so extraction is a
//! best-effort text heuristic. It sits behind a narrow trait so a structured
//! tool-call log can replace it without touching executor control flow.
//! Extracted paths are advisory, never authoritative.

/// Pulls artifact paths out of a step's textual output
pub trait ArtifactExtractor: Send + Sync {
    fn extract(&self, output: &str) -> Vec<String>;
}

/// Marker words that typically precede a reported file path
const MARKERS: &[&str] = &[
    "created", "creating", "create", "wrote", "writing", "write", "saved", "saving", "updated",
];

/// Default extractor matching "created/writing <path>" style phrases
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl ArtifactExtractor for PatternExtractor {
    fn extract(&self, output: &str) -> Vec<String> {
        let mut paths = Vec::new();

        for line in output.lines() {
            let words: Vec<&str> = line.split_whitespace().collect();
            let Some(marker_idx) = words.iter().position(|w| {
                let word = w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                MARKERS.contains(&word.as_str())
            }) else {
                continue;
            };

            if let Some(path) = words[marker_idx + 1..].iter().find_map(|w| clean_path(w))
                && !paths.contains(&path)
            {
                paths.push(path);
            }
        }

        paths
    }
}

/// Strip quoting/punctuation and keep only tokens that plausibly are paths
fn clean_path(token: &str) -> Option<String> {
    let cleaned = token
        .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '(' | ')' | ',' | ';' | ':' | '*'))
        .trim_end_matches('.');

    if cleaned.is_empty() || cleaned.starts_with("http") {
        return None;
    }

    let looks_like_path = cleaned.contains('/')
        || (cleaned.contains('.') && !cleaned.starts_with('.') && !cleaned.ends_with('.'));

    looks_like_path.then(|| cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(output: &str) -> Vec<String> {
        PatternExtractor.extract(output)
    }

    #[test]
    fn test_extracts_created_paths() {
        let output = "I scaffolded the project.\n\
                      created package.json\n\
                      Created file src/app/layout.tsx\n\
                      Writing `src/styles/tokens.css` next.";
        assert_eq!(
            extract(output),
            vec!["package.json", "src/app/layout.tsx", "src/styles/tokens.css"]
        );
    }

    #[test]
    fn test_ignores_prose_without_paths() {
        let output = "I created a plan with three sections and wrote some notes.";
        assert!(extract(output).is_empty());
    }

    #[test]
    fn test_ignores_urls() {
        let output = "created https://example.com/page";
        assert!(extract(output).is_empty());
    }

    #[test]
    fn test_deduplicates_paths() {
        let output = "created src/app/page.tsx\nupdated src/app/page.tsx";
        assert_eq!(extract(output), vec!["src/app/page.tsx"]);
    }

    #[test]
    fn test_strips_punctuation() {
        let output = "- Wrote \"export-manifest.json\", listing all pages.";
        assert_eq!(extract(output), vec!["export-manifest.json"]);
    }

    #[test]
    fn test_empty_output() {
        assert!(extract("").is_empty());
    }
}
