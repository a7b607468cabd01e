use std::convert::TryInto;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use crate::error::SecurityError;

const PASSWORD_SALT: &str = "password.salt";
const JWT_SECRET: &str = "jwt.secret";

pub type Salt = [u8; 16];
pub type JwtSecret = [u8; 32];

/// Server-wide secrets: the password salt and the key signing `auth-token` cookies.
#[derive(Clone)]
pub struct Security {
    pub salt: Salt,
    pub jwt_secret: JwtSecret,
}

impl std::fmt::Debug for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Security { .. }")
    }
}

#[inline]
fn security_dir() -> PathBuf {
    PathBuf::from(env::var("SECURITY_DIR").unwrap_or("./security".to_string()))
}

fn load_or_generate<const N: usize>(path: &Path) -> Result<[u8; N], SecurityError>
where
    rand::distributions::Standard: rand::distributions::Distribution<[u8; N]>,
{
    match fs::read(path) {
        Ok(bytes) => {
            tracing::info!("Loaded '{}'.", path.display());
            bytes
                .try_into()
                .map_err(|_| SecurityError::Corrupt(path.to_path_buf()))
        }
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(SecurityError::Io(e)),
        Err(_) if cfg!(feature = "generate-security") => {
            tracing::info!("'{}' not found. Generating a new one.", path.display());
            let value: [u8; N] = rand::random();
            fs::write(path, value)?;
            Ok(value)
        }
        Err(_) => Err(SecurityError::Missing(path.to_path_buf())),
    }
}

impl Security {
    pub fn load() -> Result<Security, SecurityError> {
        let dir = security_dir();

        if cfg!(feature = "generate-security") {
            fs::create_dir_all(&dir)?;
        }

        tracing::info!("Loading password salt...");
        let salt = load_or_generate(&dir.join(PASSWORD_SALT))?;

        tracing::info!("Loading JWT signing key...");
        let jwt_secret = load_or_generate(&dir.join(JWT_SECRET))?;

        Ok(Security { salt, jwt_secret })
    }

    /// Fresh in-memory secrets that are never written to disk.
    pub fn ephemeral() -> Security {
        Security {
            salt: rand::random(),
            jwt_secret: rand::random(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_generated_once_and_reloaded() {
        let path = env::temp_dir().join(format!("guitar_portal_salt_{}", rand::random::<u32>()));

        let generated: Salt = load_or_generate(&path).expect("salt should be generated");
        let loaded: Salt = load_or_generate(&path).expect("salt should be loaded");
        assert_eq!(generated, loaded);

        fs::write(&path, [1u8, 2, 3]).unwrap();
        assert!(matches!(
            load_or_generate::<16>(&path),
            Err(SecurityError::Corrupt(_))
        ));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn unreadable_secrets_are_not_replaced() {
        let dir = env::temp_dir().join(format!("guitar_portal_secret_dir_{}", rand::random::<u32>()));
        fs::create_dir_all(&dir).unwrap();

        assert!(matches!(
            load_or_generate::<16>(&dir),
            Err(SecurityError::Io(_))
        ));
        assert!(dir.is_dir());

        let _ = fs::remove_dir(dir);
    }
}
