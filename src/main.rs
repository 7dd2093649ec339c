//! packetgov CLI binary.
//!
//! Minimal entrypoint: all logic lives in the library; main.rs only maps
//! the CLI result to a process exit code.

fn main() {
    // cli::run() handles ALL output including errors.
    if let Err(code) = packetgov::cli::run() {
        std::process::exit(code.as_i32());
    }
}
