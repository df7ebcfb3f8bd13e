//! Binary entrypoint for the MyBot admin CLI.

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let code = mybot_admin::run().await;
    std::process::exit(code);
}
