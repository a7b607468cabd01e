use crate::error::ConfigurationError;
use crate::util;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_NAME: &str = "guitar_portal";
pub const DEFAULT_AVATAR: &str = "/images/default-avatar.png";

fn default_mongodb_uri() -> String {
    env::var("MONGODB_URI").unwrap_or("mongodb://localhost:27017".to_string())
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or(DEFAULT_DATABASE_NAME.to_string())
}

fn default_public_content() -> PathBuf {
    PathBuf::from(env::var("PUBLIC_CONTENT_PATH").unwrap_or("./public".to_string()))
}

fn default_teacher_usernames() -> Vec<String> {
    match env::var("TEACHER_USERNAMES") {
        Ok(names) => names
            .split(',')
            .map(str::trim)
            .filter(|it| !it.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => vec![],
    }
}

fn default_canonical_host() -> Option<HostRedirect> {
    Some(HostRedirect {
        from: "phucnguyenguitar.com".to_string(),
        to: "www.phucnguyenguitar.com".to_string(),
    })
}

fn default_avatar() -> String {
    env::var("DEFAULT_AVATAR").unwrap_or(DEFAULT_AVATAR.to_string())
}

fn default_true() -> bool {
    true
}

/// Requests for host `from` are permanently redirected to `https://{to}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRedirect {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,

    #[serde(default = "default_public_content")]
    pub public_content: PathBuf,

    /// Accounts registered with one of these usernames become teachers.
    #[serde(default = "default_teacher_usernames")]
    pub teacher_usernames: Vec<String>,

    #[serde(default = "default_canonical_host")]
    pub canonical_host: Option<HostRedirect>,

    #[serde(default = "default_avatar")]
    pub default_avatar: String,

    /// Absence and makeup requests are stored as approved right away.
    #[serde(default)]
    pub auto_approve_requests: bool,

    #[serde(default = "default_true")]
    pub secure_cookies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join("settings.yml"),
            mongodb_uri: default_mongodb_uri(),
            mongodb_db: default_mongodb_db(),
            public_content: default_public_content(),
            teacher_usernames: default_teacher_usernames(),
            canonical_host: default_canonical_host(),
            default_avatar: default_avatar(),
            auto_approve_requests: false,
            secure_cookies: true,
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or("./config".to_string()))
}

impl Config {
    pub fn load() -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(
            config_dir(),
            &["settings.yml", "settings.yaml"],
            Path::exists,
        )
        .ok_or_else(|| ConfigurationError::NotFound(config_dir()))?;

        let file = File::open(&config_file)?;
        let mut config: Config = serde_yaml::from_reader(BufReader::new(file))?;
        config.file_path = config_file;

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }

    pub fn is_teacher_username(&self, username: impl AsRef<str>) -> bool {
        self.teacher_usernames
            .iter()
            .any(|it| it == username.as_ref())
    }
}
