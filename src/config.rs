use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;

use crate::navigator::NavigatorOptions;

fn default_site_name() -> String {
    "Security Blog".to_string()
}

fn default_list_url() -> String {
    "/blog/".to_string()
}

fn default_manifest_path() -> String {
    "/blog/posts.json".to_string()
}

fn default_post_path_template() -> String {
    "/blog/{slug}/".to_string()
}

fn default_error_dismiss_secs() -> u64 {
    5
}

#[derive(Deserialize)]
pub struct Site {
    pub base_url: String,
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default = "default_list_url")]
    pub list_url: String,
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    #[serde(default = "default_post_path_template")]
    pub post_path_template: String,
}

#[derive(Deserialize)]
pub struct Navigation {
    #[serde(default = "default_error_dismiss_secs")]
    pub error_dismiss_secs: u64,
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for Navigation {
    fn default() -> Self {
        Navigation {
            error_dismiss_secs: default_error_dismiss_secs(),
            fetch_timeout_secs: None,
        }
    }
}

#[derive(Deserialize)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone, Debug, PartialEq)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize)]
pub struct Config {
    pub site: Site,
    #[serde(default)]
    pub navigation: Navigation,
    pub log: Option<Log>,
}

impl Config {
    pub fn navigator_options(&self) -> NavigatorOptions {
        NavigatorOptions {
            site_name: self.site.name.clone(),
            list_url: self.site.list_url.clone(),
            manifest_path: self.site.manifest_path.clone(),
            post_path_template: self.site.post_path_template.clone(),
            error_dismiss: Duration::from_secs(self.navigation.error_dismiss_secs),
            fetch_timeout: self.navigation.fetch_timeout_secs.map(Duration::from_secs),
        }
    }
}

fn parse_path(path: PathBuf) -> io::Result<PathBuf> {
    if path.starts_with("${exe_dir}") {
        let cur_exe = env::current_exe()?;
        let exe_dir = cur_exe.parent().and_then(|p| p.to_str()).unwrap_or(".");
        let str_path = path.to_string_lossy();
        Ok(PathBuf::from(str_path.replace("${exe_dir}", exe_dir)))
    } else {
        Ok(path)
    }
}

pub fn parse_config(cfg_content: &str) -> io::Result<Config> {
    match toml::from_str::<Config>(cfg_content) {
        Ok(cfg) => Ok(cfg),
        Err(e) => Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    }
}

pub fn read_config(cfg_path: &PathBuf) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    let mut cfg = parse_config(&cfg_content)?;

    if let Some(ref mut log) = cfg.log {
        if let Some(location) = log.location.take() {
            log.location = Some(parse_path(location)?);
        }
    }

    Ok(cfg)
}
