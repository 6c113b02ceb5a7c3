use clipfolio::AppSettings;

#[tokio::main]
async fn main() {
    let settings = AppSettings::load_or_default().await;

    if let Err(e) = clipfolio::run(settings).await {
        eprintln!("[Engine] Fatal: {}", e);
        std::process::exit(1);
    }
}
