use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match krishi_mitra::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("startup failed: {e}");
            eprintln!("krishi-mitra: {e}");
            ExitCode::FAILURE
        }
    }
}
