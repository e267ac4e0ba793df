// Platform-specific temporary directory detection
use std::path::PathBuf;

/// System and user temporary directories that exist on this machine.
pub fn get_default_temp_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    #[cfg(windows)]
    {
        let windir = std::env::var("SystemRoot")
            .or_else(|_| std::env::var("WINDIR"))
            .unwrap_or_else(|_| "C:\\Windows".to_string());
        dirs.push(PathBuf::from(windir).join("Temp"));

        if let Ok(localappdata) = std::env::var("LOCALAPPDATA") {
            dirs.push(PathBuf::from(localappdata).join("Temp"));
        }
        if let Ok(temp) = std::env::var("TEMP") {
            dirs.push(PathBuf::from(temp));
        }
    }

    #[cfg(unix)]
    {
        dirs.push(PathBuf::from("/tmp"));
        if let Ok(tmpdir) = std::env::var("TMPDIR") {
            dirs.push(PathBuf::from(tmpdir));
        }
    }

    dirs.push(std::env::temp_dir());

    let mut unique: Vec<PathBuf> = dirs.into_iter().filter(|d| d.is_dir()).collect();
    unique.sort();
    unique.dedup();
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_exist_and_are_unique() {
        let dirs = get_default_temp_directories();
        assert!(dirs.iter().all(|d| d.is_dir()));

        let mut deduped = dirs.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), dirs.len());
    }
}
