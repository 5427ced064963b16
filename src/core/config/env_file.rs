use std::env;
use std::fs;
use std::path::Path;

/// The one secret key the deployment docs require.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Parses a `.env` file into `KEY=VALUE` pairs.
///
/// Blank lines and `#` comments are skipped, an optional `export ` prefix is
/// stripped, and values may carry matching single or double quotes. A missing
/// file yields no entries.
pub fn parse_env_file(path: &Path) -> Vec<(String, String)> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        entries.push((key.to_string(), unquote(value.trim()).to_string()));
    }
    entries
}

/// Exports parsed entries into the process environment. Variables already
/// present in the environment win over the file.
pub fn load_into_env(path: &Path) {
    for (key, value) in parse_env_file(path) {
        if env::var_os(&key).is_none() {
            env::set_var(&key, &value);
        }
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_env(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_pairs_and_skips_comments() {
        let file = write_env(
            "# demo secrets\nOPENAI_API_KEY=sk-test\n\nexport OTHER_KEY=abc\nNOT_A_PAIR\n",
        );

        let entries = parse_env_file(file.path());

        assert_eq!(
            entries,
            vec![
                ("OPENAI_API_KEY".to_string(), "sk-test".to_string()),
                ("OTHER_KEY".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn strips_matching_quotes_only() {
        let file = write_env("A=\"quoted\"\nB='single'\nC=\"mismatched'\n");

        let entries = parse_env_file(file.path());

        assert_eq!(entries[0].1, "quoted");
        assert_eq!(entries[1].1, "single");
        assert_eq!(entries[2].1, "\"mismatched'");
    }

    #[test]
    fn missing_file_yields_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let entries = parse_env_file(&dir.path().join("absent.env"));
        assert!(entries.is_empty());
    }

    #[test]
    fn value_may_contain_equals_sign() {
        let file = write_env("KEY=a=b=c\n");
        let entries = parse_env_file(file.path());
        assert_eq!(entries[0].1, "a=b=c");
    }
}
