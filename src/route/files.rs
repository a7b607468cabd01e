use std::path::PathBuf;

use rocket::fs::NamedFile;
use rocket::State;

use crate::config::Config;

pub async fn app_index_file(c: &Config) -> Option<NamedFile> {
    let index = c.public_content.join("index.html");
    match NamedFile::open(&index).await {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!("'{}' can't be served: {}", index.display(), e);
            None
        }
    }
}

#[get("/")]
pub async fn app(c: &State<Config>) -> Option<NamedFile> {
    app_index_file(c).await
}

/// Front-end assets, falling back to `index.html` for client-side routes. `/api` is never served from here.
#[get("/<path..>", rank = 10)]
pub async fn app_path(path: PathBuf, c: &State<Config>) -> Option<NamedFile> {
    if path.starts_with("api") {
        return None;
    }

    match NamedFile::open(c.public_content.join(&path)).await {
        Ok(file) => Some(file),
        Err(_) => app_index_file(c).await,
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::route::test_util::client_with;
    use rocket::http::Status;
    use std::fs;

    fn public_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("guitar-portal-{}-{}", name, std::process::id()));
        fs::create_dir_all(dir.join("assets")).unwrap();
        fs::write(dir.join("index.html"), "<html>portal</html>").unwrap();
        fs::write(dir.join("assets/app.js"), "console.log('portal')").unwrap();
        dir
    }

    #[rocket::async_test]
    async fn spa_routes_fall_back_to_index() {
        let mut config = Config::default();
        config.public_content = public_dir("spa");
        let client = client_with(config).await;

        let asset = client.get("/assets/app.js").dispatch().await;
        assert_eq!(asset.status(), Status::Ok);
        assert_eq!(asset.into_string().await.as_deref(), Some("console.log('portal')"));

        let route = client.get("/lop-hoc/lich").dispatch().await;
        assert_eq!(route.status(), Status::Ok);
        assert_eq!(route.into_string().await.as_deref(), Some("<html>portal</html>"));
    }

    #[rocket::async_test]
    async fn unknown_api_paths_are_not_the_app() {
        let mut config = Config::default();
        config.public_content = public_dir("api");
        let client = client_with(config).await;

        let response = client.get("/api/nothing-here").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
