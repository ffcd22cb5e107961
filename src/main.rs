#[actix_web::main]
async fn main() -> std::io::Result<()> {
    trade_report_server::run().await
}
