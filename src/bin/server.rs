use tracing::Level;

#[rocket::main]
async fn main() {
    #[cfg(debug_assertions)]
    let level = Some(Level::DEBUG);
    #[cfg(not(debug_assertions))]
    let level = Some(Level::INFO);

    let r = match guitar_portal::create(level).await {
        Ok(it) => it,
        Err(e) => {
            tracing::error!("Unable to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = r.launch().await {
        tracing::error!("Error launching server: {}", e);
    }
}
