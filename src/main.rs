use std::process::ExitCode;

fn main() -> ExitCode {
    quadcrop::init_tracing();

    match quadcrop::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
