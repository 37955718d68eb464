use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};
use which::which;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Launch settings for one browser session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdpConfig {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: Option<String>,
    pub no_sandbox: bool,
    pub request_timeout_ms: u64,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            headless: resolve_headless_default(),
            executable: None,
            user_data_dir: None,
            viewport_width: 1280,
            viewport_height: 720,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            no_sandbox: false,
            request_timeout_ms: 30_000,
        }
    }
}

impl CdpConfig {
    /// Settings for driving the user's own, already logged-in browser profile.
    pub fn headful_profile(user_data_dir: Option<PathBuf>) -> Self {
        Self {
            headless: false,
            user_data_dir,
            user_agent: None,
            ..Self::default()
        }
    }

    /// Configured executable, else whatever Chrome can be found on this machine.
    pub fn resolved_executable(&self) -> Option<PathBuf> {
        self.executable
            .as_ref()
            .filter(|path| path.exists())
            .cloned()
            .or_else(detect_chrome_executable)
    }
}

fn resolve_headless_default() -> bool {
    match env::var("LINKPILOT_HEADLESS") {
        Ok(value) => {
            let lower = value.to_ascii_lowercase();
            !matches!(lower.as_str(), "0" | "false" | "no" | "off")
        }
        Err(_) => true,
    }
}

pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("LINKPILOT_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| Path::new(candidate).exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        ["ProgramFiles", "ProgramFiles(x86)", "LocalAppData"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .map(|root| PathBuf::from(root).join("Google/Chrome/Application/chrome.exe"))
            .collect()
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/snap/bin/chromium"),
        ]
    }
}
