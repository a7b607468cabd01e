use std::iter::repeat;
use std::path::{Path, PathBuf};

use base64::engine::GeneralPurpose;
use mongodb::options::ClientOptions;

pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .zip(repeat(root.as_ref()))
        .map(|(b, a)| a.join(b))
        .find(|it: &PathBuf| search(it))
}

pub fn base64_engine() -> GeneralPurpose {
    base64::engine::GeneralPurpose::new(
        &base64::alphabet::URL_SAFE,
        base64::engine::GeneralPurposeConfig::new(),
    )
}

/// Database named in the connection string path, e.g. `mongodb://host/school` selects `school`.
pub fn database_name(options: &ClientOptions, fallback: impl ToString) -> String {
    options
        .default_database
        .clone()
        .filter(|it| !it.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    #[test]
    fn first_existing_subpath_wins() {
        let root = std::env::temp_dir();
        let found = find_first_subpath(&root, &["missing.yml", "present.yml"], |p: &Path| {
            p.ends_with("present.yml")
        });
        assert_eq!(found, Some(root.join("present.yml")));

        let none = find_first_subpath(&root, &["a", "b"], |_: &Path| false);
        assert_eq!(none, None);
    }

    #[test]
    fn base64_engine_is_url_safe() {
        let encoded = base64_engine().encode([0xfb, 0xff, 0xfe]);
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        assert_eq!(base64_engine().decode(encoded).unwrap(), vec![0xfb, 0xff, 0xfe]);
    }

    #[tokio::test]
    async fn database_name_comes_from_uri_path() {
        let options = ClientOptions::parse("mongodb://localhost:27017/guitar_school?retryWrites=true")
            .await
            .unwrap();
        assert_eq!(database_name(&options, "fallback"), "guitar_school");
    }

    #[tokio::test]
    async fn database_name_falls_back_without_path() {
        let options = ClientOptions::parse("mongodb://localhost:27017/").await.unwrap();
        assert_eq!(database_name(&options, "fallback"), "fallback");
    }
}
