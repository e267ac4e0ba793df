// Browser cache locations
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCache {
    pub browser: &'static str,
    pub path: PathBuf,
    /// `path` holds one directory per profile, each with its own
    /// `cache2/entries` folder.
    pub per_profile: bool,
}

impl BrowserCache {
    /// Cache directories to empty. For per-profile browsers every profile
    /// with a cache folder is listed.
    pub fn targets(&self) -> Vec<PathBuf> {
        if !self.per_profile {
            return vec![self.path.clone()];
        }

        let Ok(entries) = fs::read_dir(&self.path) else {
            return Vec::new();
        };
        let mut targets: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().join("cache2").join("entries"))
            .filter(|path| path.is_dir())
            .collect();
        targets.sort();
        targets
    }
}

fn chromium_cache(browser: &'static str, user_data: &Path) -> BrowserCache {
    BrowserCache {
        browser,
        path: user_data.join("Default").join("Cache"),
        per_profile: false,
    }
}

/// Cache locations of Chrome, Edge and Firefox for the current user. Paths
/// are returned whether or not they exist.
pub fn browser_cache_locations() -> Vec<BrowserCache> {
    let mut caches = Vec::new();

    #[cfg(windows)]
    {
        if let Some(local) = dirs::data_local_dir() {
            caches.push(chromium_cache("Chrome", &local.join("Google").join("Chrome").join("User Data")));
            caches.push(chromium_cache("Edge", &local.join("Microsoft").join("Edge").join("User Data")));
        }
        if let Some(roaming) = dirs::data_dir() {
            caches.push(BrowserCache {
                browser: "Firefox",
                path: roaming.join("Mozilla").join("Firefox").join("Profiles"),
                per_profile: true,
            });
        }
    }

    #[cfg(not(windows))]
    {
        if let Some(cache) = dirs::cache_dir() {
            caches.push(chromium_cache("Chrome", &cache.join("google-chrome")));
            caches.push(chromium_cache("Edge", &cache.join("microsoft-edge")));
            caches.push(BrowserCache {
                browser: "Firefox",
                path: cache.join("mozilla").join("firefox"),
                per_profile: true,
            });
        }
    }

    caches
}
