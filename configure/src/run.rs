use std::io::Write;

use anyhow::{bail, Result};
use trsync_config_core::{
    client::HttpDirectoryClient,
    config::default_config_file_path,
    registry::{Registry, SharedRegistry},
    security::PasswordSetterClient,
};

use crate::{app::App, opt::Opt};

pub fn build_registry(opt: &Opt) -> Result<SharedRegistry> {
    let config_file_path = match &opt.config {
        Some(config_file_path) => config_file_path.clone(),
        None => default_config_file_path()?,
    };
    log::info!("Use config file '{}'", config_file_path.display());

    let mut registry = Registry::new(config_file_path, Box::new(HttpDirectoryClient::new()?));
    match (opt.password_setter_port, &opt.password_setter_token) {
        (Some(port), Some(token)) => {
            log::info!("Passwords are delegated to password setter on port {}", port);
            registry = registry.with_password_store(Box::new(PasswordSetterClient::on_loopback(
                port, token,
            )?));
        }
        (None, None) => {}
        _ => bail!("Password setter port and token must be given together"),
    }

    Ok(registry.shared())
}

pub fn run(opt: Opt, out: &mut dyn Write) -> Result<()> {
    let app = App::new(build_registry(&opt)?);
    app.load(out)?;
    app.execute(opt.command, out)
}
