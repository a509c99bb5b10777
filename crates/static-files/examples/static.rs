use trillium_static_files::{crate_relative_path, StaticConfig, StaticFileHandler};

pub fn main() {
    env_logger::init();

    let config = match StaticConfig::new(crate_relative_path!("tests/files")) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };

    trillium_smol::run((trillium_logger::logger(), StaticFileHandler::new(config)));
}
